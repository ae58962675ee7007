//! Camera pose ownership.
//!
//! Two controllers can move the camera: [`CameraTransitionController`] (timed flights to a
//! selected cell) and [`FreeLookController`] (pointer drags). [`CameraRig`] is the single
//! owner of the pose and decides, per tick, which of them may write:
//!
//! - `CameraMode::Transitioning`: only the transition writes; drag deltas are swallowed.
//! - `CameraMode::Free`: only free look writes.
//!
//! Conventions match the renderer: the camera looks down its local -Z, +Y is up, and
//! orientations are built yaw-then-pitch with zero roll.

mod free_look;
mod transition;

pub use free_look::FreeLookController;
pub use transition::{CameraTransitionController, TransitionState, TransitionTick};

use crate::{
    constants::{FREE_LOOK_SENSITIVITY, PITCH_LIMIT},
    types::{Point3, Quat, Vec2, Vec3},
};

/// Minimum look direction length considered a valid heading.
const LOOK_EPS: f32 = 1.0e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Point3,
    pub orientation: Quat,
}

impl CameraPose {
    #[inline]
    pub fn new(position: Point3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at `position` facing `target`. Keeps the identity orientation if both coincide.
    pub fn looking_at(position: Point3, target: Point3) -> Self {
        let orientation = look_orientation(&(target - position)).unwrap_or_else(Quat::identity);
        Self::new(position, orientation)
    }

    /// Unit view direction (local -Z in world space).
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.orientation * -Vec3::z()
    }
}

/// Builds an orientation from yaw (about +Y) then pitch (about the local +X). Roll is zero.
#[inline]
pub fn orientation_from_yaw_pitch(yaw: f32, pitch: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), yaw) * Quat::from_axis_angle(&Vec3::x_axis(), pitch)
}

/// Decomposes a zero-roll orientation into `(yaw, pitch)`.
///
/// Yaw is read from the rotated +X axis, which stays horizontal without roll, so it remains
/// defined when looking straight up or down.
pub fn yaw_pitch_from_orientation(orientation: &Quat) -> (f32, f32) {
    let right = orientation * Vec3::x();
    let forward = orientation * -Vec3::z();
    let yaw = (-right.z).atan2(right.x);
    let pitch = forward.y.clamp(-1.0, 1.0).asin();
    (yaw, pitch)
}

/// Orientation looking along `direction`, or `None` for a zero-length direction.
pub fn look_orientation(direction: &Vec3) -> Option<Quat> {
    let length = direction.norm();
    if length <= LOOK_EPS {
        return None;
    }
    let dir = direction / length;
    let yaw = (-dir.x).atan2(-dir.z);
    let pitch = dir.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
    Some(orientation_from_yaw_pitch(yaw, pitch))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMode {
    Free,
    Transitioning,
}

/// Single writer of the active camera pose.
#[derive(Clone, Debug)]
pub struct CameraRig {
    pose: CameraPose,
    transition: CameraTransitionController,
    free_look: FreeLookController,
}

impl CameraRig {
    pub fn new(pose: CameraPose) -> Self {
        Self::with_sensitivity(pose, FREE_LOOK_SENSITIVITY)
    }

    pub fn with_sensitivity(pose: CameraPose, sensitivity: f32) -> Self {
        Self {
            pose,
            transition: CameraTransitionController::default(),
            free_look: FreeLookController::new(sensitivity),
        }
    }

    #[inline]
    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    #[inline]
    pub fn mode(&self) -> CameraMode {
        if self.transition.is_active() {
            CameraMode::Transitioning
        } else {
            CameraMode::Free
        }
    }

    pub fn transition(&self) -> &CameraTransitionController {
        &self.transition
    }

    pub fn is_dragging(&self) -> bool {
        self.free_look.is_dragging()
    }

    /// Starts (or restarts) a flight to `destination`, facing the direction of travel.
    pub fn travel_to(&mut self, destination: Point3, duration: f32) -> CameraPose {
        self.transition
            .request_transition(self.pose, destination, duration)
    }

    /// Starts (or restarts) a flight to an explicit pose.
    pub fn travel_to_pose(&mut self, target: CameraPose, duration: f32) {
        self.transition.request_pose(self.pose, target, duration);
    }

    pub fn pointer_down(&mut self, screen: Vec2) {
        self.free_look.pointer_down(screen);
    }

    /// Applies a drag to the orientation in free mode. Returns whether the pose changed.
    pub fn pointer_move(&mut self, screen: Vec2) -> bool {
        match self.mode() {
            CameraMode::Transitioning => {
                self.free_look.track(screen);
                false
            }
            CameraMode::Free => match self.free_look.pointer_move(screen, &self.pose.orientation) {
                Some(orientation) => {
                    self.pose.orientation = orientation;
                    true
                }
                None => false,
            },
        }
    }

    pub fn pointer_up(&mut self) {
        self.free_look.pointer_up();
    }

    /// Advances the active transition, if any.
    pub fn tick(&mut self, dt: f32) -> TransitionTick {
        self.transition.tick(dt, &mut self.pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn yaw_pitch_round_trip() {
        for &(yaw, pitch) in &[(0.0, 0.0), (1.0, 0.3), (-2.5, -0.7), (3.0, 1.2), (0.4, FRAC_PI_2)] {
            let q = orientation_from_yaw_pitch(yaw, pitch);
            let (y, p) = yaw_pitch_from_orientation(&q);
            assert!((p - pitch).abs() < 1.0e-3, "pitch {p} vs {pitch}");
            assert!((y - yaw).abs() < 1.0e-3, "yaw {y} vs {yaw}");
        }
    }

    #[test]
    fn looking_at_faces_target() {
        let pose = CameraPose::looking_at(Point3::new(0.0, 2.0, 0.0), Point3::new(5.0, 2.0, -5.0));
        let expected = Vec3::new(1.0, 0.0, -1.0).normalize();
        assert!((pose.forward() - expected).norm() < 1.0e-5);

        let (yaw, pitch) = yaw_pitch_from_orientation(&pose.orientation);
        assert!((yaw + FRAC_PI_4).abs() < 1.0e-5);
        assert!(pitch.abs() < 1.0e-5);
    }

    #[test]
    fn drag_is_ignored_while_transitioning() {
        let start = CameraPose::looking_at(Point3::origin(), Point3::new(0.0, 0.0, -1.0));
        let mut rig = CameraRig::new(start);

        rig.travel_to(Point3::new(10.0, 0.0, 0.0), 1.0);
        assert_eq!(rig.mode(), CameraMode::Transitioning);

        rig.pointer_down(Vec2::new(0.0, 0.0));
        assert!(!rig.pointer_move(Vec2::new(120.0, 40.0)));
        assert_eq!(rig.pose(), start);

        assert_eq!(rig.tick(1.0), TransitionTick::Arrived);
        assert_eq!(rig.mode(), CameraMode::Free);
        let arrived = rig.pose();

        // Resuming does not replay the movement that happened during the flight.
        assert!(rig.pointer_move(Vec2::new(125.0, 40.0)));
        let (yaw_before, _) = yaw_pitch_from_orientation(&arrived.orientation);
        let (yaw_after, _) = yaw_pitch_from_orientation(&rig.pose().orientation);
        assert!((yaw_after - yaw_before - 5.0 * FREE_LOOK_SENSITIVITY).abs() < 1.0e-4);
        assert_eq!(rig.pose().position, arrived.position);
    }
}
