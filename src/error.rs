use thiserror::Error;

/// Parking detector error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("Invalid detection policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Out-of-order sample: last observed {last_ms} ms, got {got_ms} ms")]
    OutOfOrderSample { last_ms: u64, got_ms: u64 },

    #[error("Monitoring already active")]
    AlreadyMonitoring,
}

/// Result type for detector operations
pub type DetectorResult<T> = Result<T, DetectorError>;
