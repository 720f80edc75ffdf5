use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::game::{FrameOutcome, GameConfig, GameState};

/// Single-slot callback invoked with the final score when a session ends.
pub type GameOverHook = Box<dyn FnMut(u32) + Send>;

/// One running game behind a context handle.
///
/// Owns the simulation state, the RNG feeding it, and the game-over hook.
/// The hook fires exactly once per session: on the tick that detects the
/// collision. Restarting begins a new session with the same hook slot.
pub struct GameSession {
    state: GameState,
    rng: ChaCha8Rng,
    seed: Option<u64>,
    hook: Option<GameOverHook>,
    hook_fired: bool,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        Self::with_seed(config, None)
    }

    /// Creates a session with a fixed RNG seed for reproducible runs.
    pub fn with_seed(config: GameConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            state: GameState::new(config),
            rng,
            seed,
            hook: None,
            hook_fired: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn score(&self) -> u32 {
        self.state.score()
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn move_left(&mut self) {
        self.state.move_left();
    }

    pub fn move_right(&mut self) {
        self.state.move_right();
    }

    /// Replaces the registered game-over callback.
    ///
    /// The previous callback, if any, is dropped without being invoked.
    pub fn set_game_over_hook<F>(&mut self, hook: F)
    where
        F: FnMut(u32) + Send + 'static,
    {
        if self.hook.is_some() {
            debug!("replacing game-over callback");
        }
        self.hook = Some(Box::new(hook));
    }

    /// Starts a fresh session, keeping the configuration and hook slot.
    pub fn restart(&mut self) {
        info!("restarting game");
        self.state.reset();
        if let Some(seed) = self.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        self.hook_fired = false;
    }

    /// Advances one frame while the session is running.
    ///
    /// A finished session ignores further ticks until [`restart`].
    ///
    /// [`restart`]: GameSession::restart
    pub fn tick(&mut self) -> FrameOutcome {
        let outcome = self.state.step(&mut self.rng);
        if let FrameOutcome::GameOver(score) = outcome {
            if !self.hook_fired {
                self.hook_fired = true;
                if let Some(hook) = self.hook.as_mut() {
                    hook(score);
                } else {
                    debug!("game over with no callback registered (score {score})");
                }
            }
        }
        outcome
    }
}
