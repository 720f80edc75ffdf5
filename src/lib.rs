//! Core modules for the falling-obstacle dodge game, rewritten in Rust.
//!
//! The crate exposes the surface the native module declared (context
//! lookup, move commands, restart, the game-over callback slot, and the
//! pointer-driven transform update) as a safe API on a clonable
//! [`GameContext`] handle.  The simulation itself is pure and
//! deterministic, so it can be driven headless in tests and tools just as
//! easily as from the windowed runner.

pub mod context;
pub mod game;
pub mod render;
pub mod session;
pub mod transform;

pub use context::{drop_context, get_context, get_context_with, GameContext};
pub use game::{FrameOutcome, GameConfig, GameObject, GameState};
pub use render::Renderer;
pub use session::{GameOverHook, GameSession};
pub use transform::{PointerPhase, TransformTracker, UnknownPointerPhase};
