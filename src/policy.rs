use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, DetectorResult};

/// Fixed grace period after a confirmed parking before the detector
/// re-arms itself back to monitoring (ms).
pub const PARKED_HOLD_MS: u64 = 5000;

/// Thresholds and durations parameterizing the parking state machine.
///
/// Immutable once constructed; shared by reference with the detector for
/// its lifetime. Fields are private so the validated constructor is the
/// only way in; deserialization funnels through the same validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PolicyFields")]
pub struct DetectionPolicy {
    driving_speed_threshold_kmh: f64,
    parked_speed_threshold_kmh: f64,
    vibration_threshold: f64,
    confirmation_delay_ms: u64,
    sample_interval_ms: u64,
}

/// Raw wire form of a policy, converted into a validated one
#[derive(Debug, Clone, Deserialize)]
struct PolicyFields {
    driving_speed_threshold_kmh: f64,
    parked_speed_threshold_kmh: f64,
    vibration_threshold: f64,
    confirmation_delay_ms: u64,
    sample_interval_ms: u64,
}

impl TryFrom<PolicyFields> for DetectionPolicy {
    type Error = DetectorError;

    fn try_from(fields: PolicyFields) -> DetectorResult<Self> {
        Self::new(
            fields.driving_speed_threshold_kmh,
            fields.parked_speed_threshold_kmh,
            fields.vibration_threshold,
            fields.confirmation_delay_ms,
            fields.sample_interval_ms,
        )
    }
}

impl DetectionPolicy {
    /// Validated constructor. Rejects a degenerate threshold ordering
    /// (`parked >= driving` means driving could never be confirmed stopped)
    /// and a zero sampling interval.
    pub fn new(
        driving_speed_threshold_kmh: f64,
        parked_speed_threshold_kmh: f64,
        vibration_threshold: f64,
        confirmation_delay_ms: u64,
        sample_interval_ms: u64,
    ) -> DetectorResult<Self> {
        if !driving_speed_threshold_kmh.is_finite()
            || !parked_speed_threshold_kmh.is_finite()
            || !vibration_threshold.is_finite()
        {
            return Err(DetectorError::InvalidPolicy(
                "Thresholds must be finite".to_string(),
            ));
        }
        if parked_speed_threshold_kmh >= driving_speed_threshold_kmh {
            return Err(DetectorError::InvalidPolicy(format!(
                "Parked threshold ({parked_speed_threshold_kmh} km/h) must be below driving threshold ({driving_speed_threshold_kmh} km/h)"
            )));
        }
        if sample_interval_ms == 0 {
            return Err(DetectorError::InvalidPolicy(
                "Sample interval must be positive".to_string(),
            ));
        }
        Ok(Self {
            driving_speed_threshold_kmh,
            parked_speed_threshold_kmh,
            vibration_threshold,
            confirmation_delay_ms,
            sample_interval_ms,
        })
    }

    /// Production policy: one minute confirmation delay.
    pub fn default_policy() -> Self {
        Self {
            driving_speed_threshold_kmh: 10.0,
            parked_speed_threshold_kmh: 5.0,
            vibration_threshold: 1.5,
            confirmation_delay_ms: 60_000,
            sample_interval_ms: 1000,
        }
    }

    /// Fast policy for testing and development: 10 second confirmation.
    pub fn fast() -> Self {
        Self {
            confirmation_delay_ms: 10_000,
            ..Self::default_policy()
        }
    }

    /// Speed above which we consider the vehicle driving (km/h).
    pub fn driving_speed_threshold_kmh(&self) -> f64 {
        self.driving_speed_threshold_kmh
    }

    /// Speed below which we consider the vehicle stopped (km/h).
    pub fn parked_speed_threshold_kmh(&self) -> f64 {
        self.parked_speed_threshold_kmh
    }

    /// Vibration magnitude above which the vehicle is in motion.
    pub fn vibration_threshold(&self) -> f64 {
        self.vibration_threshold
    }

    /// Time to wait before confirming a parking (ms).
    pub fn confirmation_delay_ms(&self) -> u64 {
        self.confirmation_delay_ms
    }

    /// Expected cadence of incoming samples (ms).
    pub fn sample_interval_ms(&self) -> u64 {
        self.sample_interval_ms
    }
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}
