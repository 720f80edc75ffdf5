use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};

use crate::game::{FrameOutcome, GameConfig, GameState};
use crate::session::GameSession;
use crate::transform::{TransformTracker, UnknownPointerPhase};

/// Opaque handle to one game instance, the Rust rendering of the handle
/// the module boundary used to pass around.
///
/// Handles are cheap to clone; clones obtained for the same id alias the
/// same session. All control operations are methods on the handle.
#[derive(Clone)]
pub struct GameContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: u32,
    session: Mutex<GameSession>,
    transform: Mutex<TransformTracker>,
    surface: RwLock<Option<(u32, u32)>>,
}

impl GameContext {
    fn new(id: u32, config: GameConfig, seed: Option<u64>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                session: Mutex::new(GameSession::with_seed(config, seed)),
                transform: Mutex::new(TransformTracker::new()),
                surface: RwLock::new(None),
            }),
        }
    }

    /// Numeric identifier this context was registered under.
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    pub fn move_left(&self) {
        self.inner.session.lock().move_left();
    }

    pub fn move_right(&self) {
        self.inner.session.lock().move_right();
    }

    pub fn restart_game(&self) {
        self.inner.session.lock().restart();
    }

    /// Registers the callback invoked with the final score when the game
    /// ends. Replaces any previously registered callback.
    pub fn set_game_over_callback<F>(&self, callback: F)
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.inner.session.lock().set_game_over_hook(callback);
    }

    /// Feeds one pointer event into the render transform.
    pub fn update_transform_matrix(
        &self,
        event_type: i32,
        x_angle: f32,
        y_angle: f32,
    ) -> Result<(), UnknownPointerPhase> {
        self.inner
            .transform
            .lock()
            .update(event_type, x_angle, y_angle)
    }

    /// Current render transform driven by pointer events.
    pub fn transform_matrix(&self) -> Mat4 {
        self.inner.transform.lock().matrix()
    }

    /// Advances the session by one frame.
    pub fn tick(&self) -> FrameOutcome {
        self.inner.session.lock().tick()
    }

    /// Snapshot of the simulation state for rendering or inspection.
    pub fn state_snapshot(&self) -> GameState {
        self.inner.session.lock().state().clone()
    }

    pub fn score(&self) -> u32 {
        self.inner.session.lock().score()
    }

    pub fn is_over(&self) -> bool {
        self.inner.session.lock().is_over()
    }

    /// Records the surface backing this context and resets the session,
    /// mirroring the surface-created callback of the original module.
    pub fn on_surface_created(&self, width: u32, height: u32) {
        info!("surface created for context {} ({width}x{height})", self.id());
        *self.inner.surface.write() = Some((width.max(1), height.max(1)));
        self.inner.session.lock().restart();
    }

    pub fn on_surface_changed(&self, width: u32, height: u32) {
        *self.inner.surface.write() = Some((width.max(1), height.max(1)));
    }

    /// Clears the surface binding and removes the context from the
    /// registry. Outstanding handle clones stay usable.
    pub fn on_surface_destroyed(&self) {
        info!("surface destroyed for context {}", self.id());
        *self.inner.surface.write() = None;
        drop_context(self.id());
    }

    pub fn surface_size(&self) -> Option<(u32, u32)> {
        *self.inner.surface.read()
    }
}

static REGISTRY: RwLock<Option<HashMap<u32, GameContext>>> = RwLock::new(None);

/// Returns the context registered under `id`, creating it on first use.
pub fn get_context(id: u32) -> GameContext {
    get_context_with(id, GameConfig::default(), None)
}

/// As [`get_context`], with explicit configuration and RNG seed for
/// contexts created by this call.
pub fn get_context_with(id: u32, config: GameConfig, seed: Option<u64>) -> GameContext {
    let mut guard = REGISTRY.write();
    let registry = guard.get_or_insert_with(HashMap::new);
    registry
        .entry(id)
        .or_insert_with(|| {
            debug!("creating context {id}");
            GameContext::new(id, config, seed)
        })
        .clone()
}

/// Removes the context registered under `id`. Existing handles remain
/// valid; a later [`get_context`] with the same id starts fresh.
pub fn drop_context(id: u32) {
    let mut guard = REGISTRY.write();
    if let Some(registry) = guard.as_mut() {
        registry.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Registry tests use distinct id ranges so they stay independent even
    // though the registry is process-global.

    #[test]
    fn same_id_aliases_same_state() {
        let a = get_context(1001);
        let b = get_context(1001);
        let before = a.state_snapshot().player().position.x;
        a.move_right();
        assert!(b.state_snapshot().player().position.x > before);
        drop_context(1001);
    }

    #[test]
    fn distinct_ids_are_independent() {
        let a = get_context(1002);
        let b = get_context(1003);
        a.move_left();
        assert_ne!(
            a.state_snapshot().player().position.x,
            b.state_snapshot().player().position.x
        );
        drop_context(1002);
        drop_context(1003);
    }

    #[test]
    fn dropped_id_starts_fresh() {
        let a = get_context(1004);
        a.move_right();
        drop_context(1004);
        let b = get_context(1004);
        assert_eq!(
            b.state_snapshot().player().position.x,
            b.state_snapshot().config().player_start.x
        );
        // The old handle still works against its own state.
        a.move_right();
        drop_context(1004);
    }

    #[test]
    fn callback_reachable_through_handle() {
        let reported = Arc::new(AtomicU32::new(u32::MAX));
        let ctx = get_context_with(1005, GameConfig::default(), Some(5));
        let hook_score = Arc::clone(&reported);
        ctx.set_game_over_callback(move |final_score| {
            hook_score.store(final_score, Ordering::SeqCst);
        });
        while !matches!(ctx.tick(), FrameOutcome::GameOver(_)) {}
        assert_eq!(reported.load(Ordering::SeqCst), ctx.score());
        drop_context(1005);
    }

    #[test]
    fn surface_lifecycle_resets_session() {
        let ctx = get_context_with(1006, GameConfig::default(), Some(5));
        while !ctx.is_over() {
            ctx.tick();
        }
        ctx.on_surface_created(640, 480);
        assert!(!ctx.is_over());
        assert_eq!(ctx.surface_size(), Some((640, 480)));
        ctx.on_surface_changed(800, 600);
        assert_eq!(ctx.surface_size(), Some((800, 600)));
        ctx.on_surface_destroyed();
        assert_eq!(ctx.surface_size(), None);
    }

    #[test]
    fn transform_flows_through_context() {
        let ctx = get_context(1007);
        ctx.update_transform_matrix(0, 0.0, 90.0).unwrap();
        let matrix = ctx.transform_matrix();
        assert!((matrix.col(0).z + 1.0).abs() < 1e-5);
        assert!(ctx.update_transform_matrix(99, 0.0, 0.0).is_err());
        drop_context(1007);
    }
}
