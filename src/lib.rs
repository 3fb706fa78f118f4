// Parking Detector Core Library
// Turns a stream of derived (speed, vibration) samples into a confirmed
// "vehicle parked" event via a debounced state machine.

pub mod detector;
pub mod error;
pub mod policy;
pub mod sensor;
pub mod signal;

// Re-export public types for downstream callers
pub use detector::{
    DetectorSnapshot, ParkingDetector, ParkingEvent, ParkingState, StatusNotice, TimerKind,
    TimerRequest, TimerToken, Transition,
};
pub use error::{DetectorError, DetectorResult};
pub use policy::DetectionPolicy;
pub use sensor::{AccelSample, LocationSample};
pub use signal::{speed_kmh, vibration_magnitude, MotionSample};
