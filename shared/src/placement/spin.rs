use crate::constants::{SPIN_BASE_RATE, SPIN_RATE_STEP};
use std::f32::consts::TAU;

/// Rotation about +Y of one table item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinState {
    /// Radians in `[0, TAU)`.
    pub angle: f32,
    /// Radians per second.
    pub rate: f32,
}

impl SpinState {
    pub fn new(rate: f32) -> Self {
        Self { angle: 0.0, rate }
    }

    /// State after `dt` seconds.
    #[must_use]
    pub fn advanced(self, dt: f32) -> Self {
        Self {
            angle: (self.angle + self.rate * dt).rem_euclid(TAU),
            rate: self.rate,
        }
    }
}

/// Spin rate of the `item`-th product on a table. Distinct per item position.
pub fn spin_rate(item: usize) -> f32 {
    SPIN_BASE_RATE + item as f32 * SPIN_RATE_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_and_is_pure() {
        let spin = SpinState::new(2.0);
        let next = spin.advanced(4.0);
        assert_eq!(spin.angle, 0.0);
        assert!((next.angle - (8.0 - TAU)).abs() < 1.0e-5);
        assert!((0.0..TAU).contains(&next.angle));

        let backwards = SpinState::new(-1.0).advanced(0.5);
        assert!((backwards.angle - (TAU - 0.5)).abs() < 1.0e-5);
    }

    #[test]
    fn item_rates_differ() {
        assert!(spin_rate(0) < spin_rate(1));
        assert!(spin_rate(1) < spin_rate(2));
    }
}
