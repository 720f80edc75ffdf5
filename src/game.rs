use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tuning parameters for the simulation.
///
/// The defaults reproduce the behavior of the original native module: a
/// 0.15 square player near the bottom of a normalized [-1, 1] field and
/// 0.12 square obstacles falling from above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_player_size")]
    pub player_size: f32,
    #[serde(default = "default_player_start")]
    pub player_start: Vec2,
    #[serde(default = "default_player_step")]
    pub player_step: f32,
    #[serde(default = "default_obstacle_size")]
    pub obstacle_size: f32,
    #[serde(default = "default_obstacle_slots")]
    pub obstacle_slots: usize,
    /// Horizontal spawn range for new obstacles.
    #[serde(default = "default_spawn_range")]
    pub spawn_range: f32,
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f32,
    /// Frames between scheduled spawns.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: u64,
    /// Frames between bonus spawn rolls.
    #[serde(default = "default_bonus_interval")]
    pub bonus_interval: u64,
    /// Percent chance that a bonus roll spawns an obstacle.
    #[serde(default = "default_bonus_chance")]
    pub bonus_chance: u32,
    /// Base fall distance per frame.
    #[serde(default = "default_fall_speed")]
    pub fall_speed: f32,
    /// Extra fall speed per 1000 points of score.
    #[serde(default = "default_fall_speed_scale")]
    pub fall_speed_scale: f32,
    /// Obstacles below this line are retired and scored.
    #[serde(default = "default_despawn_line")]
    pub despawn_line: f32,
    #[serde(default = "default_points_per_dodge")]
    pub points_per_dodge: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_size: default_player_size(),
            player_start: default_player_start(),
            player_step: default_player_step(),
            obstacle_size: default_obstacle_size(),
            obstacle_slots: default_obstacle_slots(),
            spawn_range: default_spawn_range(),
            spawn_height: default_spawn_height(),
            spawn_interval: default_spawn_interval(),
            bonus_interval: default_bonus_interval(),
            bonus_chance: default_bonus_chance(),
            fall_speed: default_fall_speed(),
            fall_speed_scale: default_fall_speed_scale(),
            despawn_line: default_despawn_line(),
            points_per_dodge: default_points_per_dodge(),
        }
    }
}

fn default_player_size() -> f32 {
    0.15
}

fn default_player_start() -> Vec2 {
    Vec2::new(0.0, -0.8)
}

fn default_player_step() -> f32 {
    0.04
}

fn default_obstacle_size() -> f32 {
    0.12
}

fn default_obstacle_slots() -> usize {
    25
}

fn default_spawn_range() -> f32 {
    0.75
}

fn default_spawn_height() -> f32 {
    1.2
}

fn default_spawn_interval() -> u64 {
    25
}

fn default_bonus_interval() -> u64 {
    10
}

fn default_bonus_chance() -> u32 {
    30
}

fn default_fall_speed() -> f32 {
    0.025
}

fn default_fall_speed_scale() -> f32 {
    0.008
}

fn default_despawn_line() -> f32 {
    -1.5
}

fn default_points_per_dodge() -> u32 {
    10
}

/// Axis-aligned rectangle, addressed by its centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub position: Vec2,
    pub width: f32,
    pub height: f32,
}

impl GameObject {
    pub fn square(position: Vec2, size: f32) -> Self {
        Self {
            position,
            width: size,
            height: size,
        }
    }

    pub fn overlaps(&self, other: &GameObject) -> bool {
        (self.position.x - other.position.x).abs() * 2.0 < self.width + other.width
            && (self.position.y - other.position.y).abs() * 2.0 < self.height + other.height
    }
}

/// Obstacle in flight. The fall speed is fixed when the obstacle spawns
/// and does not change with the score afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Obstacle {
    body: GameObject,
    fall_speed: f32,
}

/// Result of advancing the simulation by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Running,
    /// The player collided this frame; the payload is the final score.
    GameOver(u32),
}

/// Complete simulation state for one session.
///
/// Purely deterministic: every random decision flows through the RNG the
/// caller passes to [`GameState::step`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    config: GameConfig,
    player: GameObject,
    obstacles: Vec<Option<Obstacle>>,
    score: u32,
    frame: u64,
    over: bool,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        let player = GameObject::square(config.player_start, config.player_size);
        let obstacles = vec![None; config.obstacle_slots];
        Self {
            config,
            player,
            obstacles,
            score: 0,
            frame: 0,
            over: false,
        }
    }

    /// Restores the initial state, keeping the configuration.
    pub fn reset(&mut self) {
        self.player = GameObject::square(self.config.player_start, self.config.player_size);
        for slot in &mut self.obstacles {
            *slot = None;
        }
        self.score = 0;
        self.frame = 0;
        self.over = false;
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn player(&self) -> &GameObject {
        &self.player
    }

    /// Iterates over the obstacles currently in flight.
    pub fn obstacles(&self) -> impl Iterator<Item = &GameObject> {
        self.obstacles.iter().flatten().map(|obstacle| &obstacle.body)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Moves the player one step to the left, clamped to the field.
    pub fn move_left(&mut self) {
        self.shift_player(-self.config.player_step);
    }

    /// Moves the player one step to the right, clamped to the field.
    pub fn move_right(&mut self) {
        self.shift_player(self.config.player_step);
    }

    fn shift_player(&mut self, delta: f32) {
        if self.over {
            return;
        }
        let limit = 1.0 - self.player.width / 2.0;
        self.player.position.x = (self.player.position.x + delta).clamp(-limit, limit);
    }

    /// Advances the simulation by one frame.
    ///
    /// Returns [`FrameOutcome::GameOver`] on the frame the player collides;
    /// once over, further calls leave the state untouched.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> FrameOutcome {
        if self.over {
            return FrameOutcome::GameOver(self.score);
        }

        self.frame += 1;

        let mut any_active = false;
        for slot in &mut self.obstacles {
            let Some(obstacle) = slot.as_mut() else {
                continue;
            };
            any_active = true;
            obstacle.body.position.y -= obstacle.fall_speed;

            if obstacle.body.overlaps(&self.player) {
                self.over = true;
                log::info!("collision at frame {}, final score {}", self.frame, self.score);
                return FrameOutcome::GameOver(self.score);
            }

            if obstacle.body.position.y < self.config.despawn_line {
                *slot = None;
                self.score += self.config.points_per_dodge;
            }
        }

        // Intervals are clamped so a zero in a deserialized config cannot
        // divide by zero.
        if self.frame % self.config.spawn_interval.max(1) == 0 || !any_active {
            self.spawn_obstacle(rng);
        }
        if self.frame % self.config.bonus_interval.max(1) == 0
            && rng.gen_range(0..100) < self.config.bonus_chance
        {
            self.spawn_obstacle(rng);
        }

        FrameOutcome::Running
    }

    /// Places a new obstacle in the first free slot, if any. The fall
    /// speed is derived from the score at spawn time and stays fixed for
    /// the obstacle's lifetime.
    fn spawn_obstacle<R: Rng>(&mut self, rng: &mut R) {
        let fall_speed = self.config.fall_speed
            + self.score as f32 / 1000.0 * self.config.fall_speed_scale;
        let Some(slot) = self.obstacles.iter_mut().find(|slot| slot.is_none()) else {
            return;
        };
        let x = rng.gen_range(-self.config.spawn_range..=self.config.spawn_range);
        *slot = Some(Obstacle {
            body: GameObject::square(
                Vec2::new(x, self.config.spawn_height),
                self.config.obstacle_size,
            ),
            fall_speed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn obstacle_at(position: Vec2, fall_speed: f32) -> Obstacle {
        Obstacle {
            body: GameObject::square(position, 0.12),
            fall_speed,
        }
    }

    #[test]
    fn overlap_is_symmetric_and_strict() {
        let a = GameObject::square(Vec2::ZERO, 0.2);
        let b = GameObject::square(Vec2::new(0.15, 0.0), 0.2);
        let far = GameObject::square(Vec2::new(0.5, 0.0), 0.2);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&far));
        // Touching edges do not count as a collision.
        let touching = GameObject::square(Vec2::new(0.2, 0.0), 0.2);
        assert!(!a.overlaps(&touching));
    }

    #[test]
    fn player_stays_inside_field() {
        let mut state = GameState::new(GameConfig::default());
        for _ in 0..200 {
            state.move_left();
        }
        let limit = 1.0 - state.player().width / 2.0;
        assert_eq!(state.player().position.x, -limit);
        for _ in 0..400 {
            state.move_right();
        }
        assert_eq!(state.player().position.x, limit);
    }

    #[test]
    fn first_frame_spawns_an_obstacle() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = rng();
        assert_eq!(state.step(&mut rng), FrameOutcome::Running);
        assert_eq!(state.obstacles().count(), 1);
        let spawned = state.obstacles().next().unwrap();
        assert!(spawned.position.x.abs() <= state.config().spawn_range);
    }

    #[test]
    fn dodged_obstacle_scores() {
        let config = GameConfig {
            spawn_interval: 10_000,
            bonus_chance: 0,
            ..GameConfig::default()
        };
        let mut state = GameState::new(config);
        let mut rng = rng();
        // Run until the first obstacle has crossed the despawn line. The
        // player sits at x=0 and the obstacle may fall right onto it, so
        // keep the player out of the way.
        for _ in 0..60 {
            state.move_left();
        }
        let mut scored = false;
        for _ in 0..200 {
            state.step(&mut rng);
            if state.score() > 0 {
                scored = true;
                break;
            }
        }
        assert!(scored, "obstacle should have been dodged and scored");
        assert_eq!(state.score(), state.config().points_per_dodge);
    }

    #[test]
    fn collision_ends_the_session_once() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = rng();
        // Force a collision by dropping an obstacle straight onto the player.
        state.obstacles[0] =
            Some(obstacle_at(state.player.position + Vec2::new(0.0, 0.02), 0.025));
        let outcome = state.step(&mut rng);
        assert_eq!(outcome, FrameOutcome::GameOver(0));
        assert!(state.is_over());

        // Further stepping changes nothing.
        let frame = state.frame();
        assert_eq!(state.step(&mut rng), FrameOutcome::GameOver(0));
        assert_eq!(state.frame(), frame);
    }

    #[test]
    fn movement_ignored_after_game_over() {
        let mut state = GameState::new(GameConfig::default());
        state.over = true;
        let x = state.player().position.x;
        state.move_left();
        state.move_right();
        assert_eq!(state.player().position.x, x);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = rng();
        for _ in 0..50 {
            state.step(&mut rng);
        }
        state.over = true;
        state.reset();
        assert_eq!(state.score(), 0);
        assert_eq!(state.frame(), 0);
        assert!(!state.is_over());
        assert_eq!(state.obstacles().count(), 0);
        assert_eq!(state.player().position, state.config().player_start);
    }

    #[test]
    fn spawn_skipped_when_slots_are_full() {
        let config = GameConfig {
            obstacle_slots: 2,
            ..GameConfig::default()
        };
        let mut state = GameState::new(config);
        let mut rng = rng();
        state.obstacles[0] = Some(obstacle_at(Vec2::new(-0.9, 1.0), 0.025));
        state.obstacles[1] = Some(obstacle_at(Vec2::new(0.9, 1.0), 0.025));
        state.spawn_obstacle(&mut rng);
        assert_eq!(state.obstacles().count(), 2);
    }

    #[test]
    fn fall_speed_fixed_at_spawn_time() {
        let config = GameConfig::default();
        let mut fast = GameState::new(config.clone());
        let mut slow = GameState::new(config);
        fast.score = 1000;
        let mut rng = rng();
        fast.spawn_obstacle(&mut rng);
        slow.spawn_obstacle(&mut rng);
        let fast_speed = fast.obstacles[0].unwrap().fall_speed;
        let slow_speed = slow.obstacles[0].unwrap().fall_speed;
        let expected = slow.config.fall_speed + slow.config.fall_speed_scale;
        assert!((fast_speed - expected).abs() < 1e-6);
        assert!(fast_speed > slow_speed);
    }

    #[test]
    fn in_flight_obstacle_keeps_its_spawn_speed() {
        let config = GameConfig {
            spawn_interval: 10_000,
            bonus_interval: 10_000,
            bonus_chance: 0,
            ..GameConfig::default()
        };
        let mut state = GameState::new(config);
        let mut rng = rng();
        state.obstacles[0] = Some(obstacle_at(Vec2::new(0.9, 1.0), 0.025));

        state.step(&mut rng);
        let y_before = state.obstacles[0].unwrap().body.position.y;
        // A score change after spawn must not accelerate the obstacle.
        state.score = 5000;
        state.step(&mut rng);
        let y_after = state.obstacles[0].unwrap().body.position.y;

        assert!((y_before - y_after - 0.025).abs() < 1e-6);
        assert_eq!(state.obstacles[0].unwrap().fall_speed, 0.025);
    }

    #[test]
    fn zero_intervals_do_not_panic() {
        let config = GameConfig {
            spawn_interval: 0,
            bonus_interval: 0,
            ..GameConfig::default()
        };
        let mut state = GameState::new(config);
        let mut rng = rng();
        for _ in 0..10 {
            state.step(&mut rng);
        }
        assert!(state.frame() > 0);
    }
}
