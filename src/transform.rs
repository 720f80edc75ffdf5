use glam::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of a pointer gesture, decoded from the raw event code delivered
/// across the module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Up,
    Move,
    Cancel,
}

/// Raised when the boundary delivers an event code outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown pointer event type {0}")]
pub struct UnknownPointerPhase(pub i32);

impl PointerPhase {
    pub fn from_raw(raw: i32) -> Result<Self, UnknownPointerPhase> {
        match raw {
            0 => Ok(Self::Down),
            1 => Ok(Self::Up),
            2 => Ok(Self::Move),
            3 => Ok(Self::Cancel),
            other => Err(UnknownPointerPhase(other)),
        }
    }
}

/// Accumulates the orientation driven by pointer events.
///
/// Angles arrive in degrees. A `Down` event begins a gesture from the
/// current orientation, `Move` updates it, `Up` commits, and `Cancel`
/// reverts to the orientation the gesture started from.
#[derive(Debug, Clone, Default)]
pub struct TransformTracker {
    x_angle: f32,
    y_angle: f32,
    gesture_origin: Option<(f32, f32)>,
}

impl TransformTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one pointer event into the tracker.
    pub fn update(
        &mut self,
        event_type: i32,
        x_angle: f32,
        y_angle: f32,
    ) -> Result<(), UnknownPointerPhase> {
        match PointerPhase::from_raw(event_type)? {
            PointerPhase::Down => {
                self.gesture_origin = Some((self.x_angle, self.y_angle));
                self.x_angle = x_angle;
                self.y_angle = y_angle;
            }
            PointerPhase::Move => {
                self.x_angle = x_angle;
                self.y_angle = y_angle;
            }
            PointerPhase::Up => {
                self.x_angle = x_angle;
                self.y_angle = y_angle;
                self.gesture_origin = None;
            }
            PointerPhase::Cancel => {
                if let Some((x, y)) = self.gesture_origin.take() {
                    self.x_angle = x;
                    self.y_angle = y;
                }
            }
        }
        Ok(())
    }

    pub fn angles(&self) -> (f32, f32) {
        (self.x_angle, self.y_angle)
    }

    /// Current orientation as a matrix usable as a scene-level uniform.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.y_angle.to_radians())
            * Mat4::from_rotation_x(self.x_angle.to_radians())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_phases() {
        assert_eq!(PointerPhase::from_raw(0), Ok(PointerPhase::Down));
        assert_eq!(PointerPhase::from_raw(1), Ok(PointerPhase::Up));
        assert_eq!(PointerPhase::from_raw(2), Ok(PointerPhase::Move));
        assert_eq!(PointerPhase::from_raw(3), Ok(PointerPhase::Cancel));
        assert_eq!(PointerPhase::from_raw(9), Err(UnknownPointerPhase(9)));
    }

    #[test]
    fn move_updates_angles() {
        let mut tracker = TransformTracker::new();
        tracker.update(0, 10.0, 20.0).unwrap();
        tracker.update(2, 15.0, 25.0).unwrap();
        assert_eq!(tracker.angles(), (15.0, 25.0));
    }

    #[test]
    fn cancel_reverts_to_gesture_origin() {
        let mut tracker = TransformTracker::new();
        tracker.update(0, 30.0, 40.0).unwrap();
        tracker.update(2, 90.0, 90.0).unwrap();
        tracker.update(3, 0.0, 0.0).unwrap();
        assert_eq!(tracker.angles(), (0.0, 0.0));
    }

    #[test]
    fn up_commits_angles() {
        let mut tracker = TransformTracker::new();
        tracker.update(0, 5.0, 5.0).unwrap();
        tracker.update(1, 45.0, 60.0).unwrap();
        // A later cancel has nothing to revert to.
        tracker.update(3, 0.0, 0.0).unwrap();
        assert_eq!(tracker.angles(), (45.0, 60.0));
    }

    #[test]
    fn identity_matrix_at_rest() {
        let tracker = TransformTracker::new();
        assert_eq!(tracker.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let mut tracker = TransformTracker::new();
        assert!(tracker.update(42, 1.0, 1.0).is_err());
        // State untouched on error.
        assert_eq!(tracker.angles(), (0.0, 0.0));
    }
}
