//! Conversions between the shared crate's nalgebra types and Bevy's glam types.

use bevy::prelude::*;
use venue_shared::{CameraPose, Point3, Quat as NaQuat, Vec3 as NaVec3};

#[inline]
pub fn to_vec3(v: &NaVec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
pub fn point_to_vec3(p: &Point3) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

#[inline]
pub fn to_point(v: Vec3) -> Point3 {
    Point3::new(v.x, v.y, v.z)
}

#[inline]
pub fn to_na_vec3(v: Vec3) -> NaVec3 {
    NaVec3::new(v.x, v.y, v.z)
}

#[inline]
pub fn to_quat(q: &NaQuat) -> Quat {
    let c = q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

pub fn pose_to_transform(pose: &CameraPose) -> Transform {
    Transform {
        translation: point_to_vec3(&pose.position),
        rotation: to_quat(&pose.orientation),
        ..default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_survives_conversion() {
        let na = NaQuat::from_axis_angle(&NaVec3::y_axis(), 0.7);
        let q = to_quat(&na);
        let expected = Quat::from_rotation_y(0.7);
        assert!(q.angle_between(expected) < 1.0e-5);

        let v = to_vec3(&(na * NaVec3::new(0.0, 0.0, -1.0)));
        assert!(v.distance(q * Vec3::NEG_Z) < 1.0e-5);
    }
}
