use serde::{Deserialize, Serialize};

/// Accelerometer sample from the motion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: u64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self { x, y, z, timestamp_ms }
    }
}

/// Location fix from the location provider
///
/// `speed_mps` is speed over ground in meters per second; providers report
/// `None` when speed is unknown, and occasionally a transient negative value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_mps: Option<f64>,
    pub accuracy: f64,
    pub timestamp_ms: u64,
}

impl LocationSample {
    pub fn new(
        latitude: f64,
        longitude: f64,
        speed_mps: Option<f64>,
        accuracy: f64,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            speed_mps,
            accuracy,
            timestamp_ms,
        }
    }
}
