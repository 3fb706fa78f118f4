use serde::{Deserialize, Serialize};

use crate::sensor::{AccelSample, LocationSample};

/// Standard gravity used to remove the static component from the
/// accelerometer norm (m/s^2).
pub const STANDARD_GRAVITY: f64 = 9.8;

/// Net vibration magnitude from a raw 3-axis acceleration sample.
///
/// Returns `|sqrt(x^2 + y^2 + z^2) - 9.8|`: the absolute deviation of the
/// measured vector norm from standard gravity, a proxy for net motion once
/// gravity's contribution is removed. Non-finite axes are treated as 0.
/// Result is always >= 0, never clamped beyond that.
pub fn vibration_magnitude(x: f64, y: f64, z: f64) -> f64 {
    let x = if x.is_finite() { x } else { 0.0 };
    let y = if y.is_finite() { y } else { 0.0 };
    let z = if z.is_finite() { z } else { 0.0 };
    let norm = (x * x + y * y + z * z).sqrt();
    (norm - STANDARD_GRAVITY).abs()
}

/// Speed over ground in km/h from a raw m/s reading.
///
/// Providers report `None` when speed is unknown and occasionally emit a
/// transient negative artifact; both map to 0.
pub fn speed_kmh(speed_mps: Option<f64>) -> f64 {
    match speed_mps {
        Some(v) if v.is_finite() && v >= 0.0 => v * 3.6,
        _ => 0.0,
    }
}

/// Derived input consumed once per state-machine update
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionSample {
    pub speed_kmh: f64,
    pub vibration_magnitude: f64,
    pub observed_at_ms: u64,
}

impl MotionSample {
    pub fn new(speed_kmh: f64, vibration_magnitude: f64, observed_at_ms: u64) -> Self {
        Self {
            speed_kmh,
            vibration_magnitude,
            observed_at_ms,
        }
    }

    /// Combine a location fix with the most recent accelerometer sample,
    /// stamped at the location fix's time.
    pub fn from_raw(accel: &AccelSample, location: &LocationSample) -> Self {
        Self {
            speed_kmh: speed_kmh(location.speed_mps),
            vibration_magnitude: vibration_magnitude(accel.x, accel.y, accel.z),
            observed_at_ms: location.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vibration_at_rest_is_zero() {
        assert_relative_eq!(vibration_magnitude(0.0, 0.0, 9.8), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vibration_freefall_reads_gravity() {
        assert_relative_eq!(vibration_magnitude(0.0, 0.0, 0.0), 9.8, epsilon = 1e-9);
    }

    #[test]
    fn test_vibration_non_finite_axis_treated_as_zero() {
        assert_relative_eq!(
            vibration_magnitude(f64::NAN, 0.0, 9.8),
            0.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            vibration_magnitude(f64::INFINITY, f64::NAN, 0.0),
            9.8,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_speed_kmh_conversion() {
        assert_relative_eq!(speed_kmh(Some(2.0)), 7.2, epsilon = 1e-9);
    }

    #[test]
    fn test_speed_kmh_unknown_and_negative() {
        assert_eq!(speed_kmh(None), 0.0);
        assert_eq!(speed_kmh(Some(-1.0)), 0.0);
        assert_eq!(speed_kmh(Some(f64::NAN)), 0.0);
    }

    #[test]
    fn test_from_raw() {
        let accel = AccelSample::new(0.0, 0.0, 11.3, 900);
        let fix = LocationSample::new(59.33, 18.07, Some(5.0), 4.0, 1000);
        let sample = MotionSample::from_raw(&accel, &fix);
        assert_relative_eq!(sample.speed_kmh, 18.0, epsilon = 1e-9);
        assert_relative_eq!(sample.vibration_magnitude, 1.5, epsilon = 1e-9);
        assert_eq!(sample.observed_at_ms, 1000);
    }
}
