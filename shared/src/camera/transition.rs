use super::{CameraPose, look_orientation};
use crate::types::{Point3, Quat};

/// Slerp falls back to nlerp when the two orientations are closer than this.
const SLERP_EPS: f32 = 1.0e-6;

/// An in-flight transition. Only exists while the controller is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionState {
    pub start: CameraPose,
    pub target: CameraPose,
    pub elapsed: f32,
    pub duration: f32,
}

impl TransitionState {
    /// Normalized progress `t` in `[0, 1]`. Non-positive durations complete immediately.
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Pose at progress `t`: linear position, shortest-arc orientation.
    pub fn sample(&self, t: f32) -> CameraPose {
        let start = &self.start.position.coords;
        let position = Point3::from(start.lerp(&self.target.position.coords, t));
        let orientation = self
            .start
            .orientation
            .try_slerp(&self.target.orientation, t, SLERP_EPS)
            .unwrap_or_else(|| self.start.orientation.nlerp(&self.target.orientation, t));
        CameraPose::new(position, orientation)
    }
}

/// Outcome of one [`CameraTransitionController::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionTick {
    /// No transition in flight; the pose was not touched.
    Idle,
    /// The pose was moved to progress `t < 1`.
    Progress(f32),
    /// The pose now equals the target exactly and the controller is idle again.
    Arrived,
}

/// Idle -> Active -> Idle state machine driving timed camera flights.
///
/// A new request always replaces the in-flight one and restarts from the pose the camera
/// has at that moment; targets are never queued or blended.
#[derive(Clone, Debug, Default)]
pub struct CameraTransitionController {
    state: Option<TransitionState>,
}

impl CameraTransitionController {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    #[inline]
    pub fn state(&self) -> Option<&TransitionState> {
        self.state.as_ref()
    }

    /// Flies from `current` to `destination`, ending with the view facing along the travel
    /// direction. Returns the target pose.
    pub fn request_transition(
        &mut self,
        current: CameraPose,
        destination: Point3,
        duration: f32,
    ) -> CameraPose {
        let orientation: Quat =
            look_orientation(&(destination - current.position)).unwrap_or(current.orientation);
        let target = CameraPose::new(destination, orientation);
        self.request_pose(current, target, duration);
        target
    }

    /// Flies from `current` to an explicit `target` pose.
    pub fn request_pose(&mut self, current: CameraPose, target: CameraPose, duration: f32) {
        self.state = Some(TransitionState {
            start: current,
            target,
            elapsed: 0.0,
            duration,
        });
    }

    /// Advances the flight by `dt` seconds and overwrites `pose` with the interpolated result.
    pub fn tick(&mut self, dt: f32, pose: &mut CameraPose) -> TransitionTick {
        let Some(state) = self.state.as_mut() else {
            return TransitionTick::Idle;
        };

        state.elapsed += dt.max(0.0);
        let t = state.progress();

        if t >= 1.0 {
            *pose = state.target;
            self.state = None;
            return TransitionTick::Arrived;
        }

        *pose = state.sample(t);
        TransitionTick::Progress(t)
    }
}
