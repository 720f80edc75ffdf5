use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use dodge_runtime::{get_context_with, FrameOutcome, GameConfig, GameContext, Renderer};

/// Degrees of rotation per pixel of pointer drag.
const DRAG_SENSITIVITY: f32 = 0.4;

const DEFAULT_CONTEXT_ID: u32 = 0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let context = get_context_with(DEFAULT_CONTEXT_ID, GameConfig::default(), options.seed);
    context.set_game_over_callback(|score| {
        println!("Game over! Final score: {score}");
    });

    if options.headless {
        run_headless(context, options.frames)
    } else {
        let fallback_context = context.clone();
        let frames = options.frames;
        match run_interactive(context) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --headless mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(fallback_context, frames)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn run_headless(context: GameContext, frames: u64) -> Result<()> {
    let mut ticked = 0;
    for _ in 0..frames {
        ticked += 1;
        if let FrameOutcome::GameOver(_) = context.tick() {
            break;
        }
    }
    println!(
        "Session ended after {ticked} frames (score {})",
        context.score()
    );
    context.on_surface_destroyed();
    Ok(())
}

fn run_interactive(context: GameContext) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Dodge Runtime")
            .with_inner_size(LogicalSize::new(600.0, 800.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(Arc::clone(&window)))?;
    let size = window.inner_size();
    context.on_surface_created(size.width, size.height);

    let mut app = AppState {
        renderer,
        context,
        cursor: Vec2::ZERO,
        angles: (0.0, 0.0),
        drag: None,
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    app.shutdown();

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

struct AppState {
    renderer: Renderer,
    context: GameContext,
    cursor: Vec2,
    angles: (f32, f32),
    drag: Option<DragState>,
    last_error: Option<anyhow::Error>,
}

/// Pointer gesture in progress, translated into transform updates.
struct DragState {
    origin: Vec2,
    start_angles: (f32, f32),
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                        self.context.on_surface_changed(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                        self.context
                            .on_surface_changed(new_inner_size.width, new_inner_size.height);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input, control_flow);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.handle_mouse_button(*state, *button)?;
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let pos = Vec2::new(position.x as f32, position.y as f32);
                        self.handle_cursor(pos)?;
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                self.context.tick();
                let snapshot = self.context.state_snapshot();
                self.renderer.update_globals(self.context.transform_matrix());
                if let Err(err) = self.renderer.render(&snapshot) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.window().inner_size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput, control_flow: &mut ControlFlow) {
        if input.state != ElementState::Pressed {
            return;
        }
        // One step per key event, matching the fire-and-forget commands.
        match input.virtual_keycode {
            Some(VirtualKeyCode::Left | VirtualKeyCode::A) => self.context.move_left(),
            Some(VirtualKeyCode::Right | VirtualKeyCode::D) => self.context.move_right(),
            Some(VirtualKeyCode::R) => self.context.restart_game(),
            Some(VirtualKeyCode::Escape) => control_flow.set_exit(),
            _ => {}
        }
    }

    fn handle_mouse_button(&mut self, state: ElementState, button: MouseButton) -> Result<()> {
        if button != MouseButton::Left {
            return Ok(());
        }
        match state {
            ElementState::Pressed => {
                self.context
                    .update_transform_matrix(0, self.angles.0, self.angles.1)?;
                self.drag = Some(DragState {
                    origin: self.cursor,
                    start_angles: self.angles,
                });
            }
            ElementState::Released => {
                if self.drag.take().is_some() {
                    self.context
                        .update_transform_matrix(1, self.angles.0, self.angles.1)?;
                }
            }
        }
        Ok(())
    }

    fn handle_cursor(&mut self, position: Vec2) -> Result<()> {
        self.cursor = position;
        let Some(drag) = self.drag.as_ref() else {
            return Ok(());
        };
        let delta = position - drag.origin;
        self.angles = (
            drag.start_angles.0 + delta.y * DRAG_SENSITIVITY,
            drag.start_angles.1 + delta.x * DRAG_SENSITIVITY,
        );
        self.context
            .update_transform_matrix(2, self.angles.0, self.angles.1)?;
        Ok(())
    }

    fn shutdown(&mut self) {
        println!("Final score: {}", self.context.score());
        self.context.on_surface_destroyed();
    }
}

struct CliOptions {
    seed: Option<u64>,
    headless: bool,
    frames: u64,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut seed = None;
        let mut headless = false;
        let mut frames = 3600;
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--headless" => headless = true,
                "--seed" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--seed requires a value"))?;
                    seed = Some(value.parse().map_err(|_| anyhow!("invalid seed: {value}"))?);
                }
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames requires a value"))?;
                    frames = value
                        .parse()
                        .map_err(|_| anyhow!("invalid frame count: {value}"))?;
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: dodge-runtime [--seed N] [--headless] [--frames N]"
                    ));
                }
            }
        }
        Ok(Self {
            seed,
            headless,
            frames,
        })
    }
}
