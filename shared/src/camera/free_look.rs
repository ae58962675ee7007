use super::{orientation_from_yaw_pitch, yaw_pitch_from_orientation};
use crate::{
    constants::PITCH_LIMIT,
    types::{Quat, Vec2},
};

/// Turns pointer drags into yaw/pitch increments. Never touches the camera position.
#[derive(Clone, Debug)]
pub struct FreeLookController {
    sensitivity: f32,
    dragging: bool,
    last: Option<Vec2>,
}

impl FreeLookController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            dragging: false,
            last: None,
        }
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self, screen: Vec2) {
        self.dragging = true;
        self.last = Some(screen);
    }

    /// Records the pointer position without producing a rotation.
    pub fn track(&mut self, screen: Vec2) {
        if self.dragging {
            self.last = Some(screen);
        }
    }

    /// Returns the new orientation for a drag to `screen`, or `None` when not dragging.
    pub fn pointer_move(&mut self, screen: Vec2, orientation: &Quat) -> Option<Quat> {
        if !self.dragging {
            return None;
        }
        let last = self.last.replace(screen)?;
        let delta = screen - last;
        if delta == Vec2::zeros() {
            return None;
        }
        Some(apply_drag(orientation, delta, self.sensitivity))
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.last = None;
    }
}

/// Adds `delta * sensitivity` to yaw (x) and pitch (y), clamping pitch to ±90°.
pub fn apply_drag(orientation: &Quat, delta: Vec2, sensitivity: f32) -> Quat {
    let (yaw, pitch) = yaw_pitch_from_orientation(orientation);
    let yaw = yaw + delta.x * sensitivity;
    let pitch = (pitch + delta.y * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    orientation_from_yaw_pitch(yaw, pitch)
}
