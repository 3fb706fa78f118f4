use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, DetectorResult};
use crate::policy::{DetectionPolicy, PARKED_HOLD_MS};
use crate::signal::MotionSample;

/// Parking detection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkingState {
    /// Monitoring is off
    Idle,
    /// Waiting for driving to start
    Monitoring,
    /// Driving detected (high speed + vibration)
    Driving,
    /// Stop detected, waiting for confirmation
    PossiblyParked,
    /// Parking confirmed, event emitted
    Parked,
}

/// Terminal event raised once per confirmed parking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParkingEvent {
    Parked,
}

/// Human-readable state-change description for the notification sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub title: String,
    pub body: String,
}

impl StatusNotice {
    fn new(title: &str, body: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            body: body.into(),
        }
    }
}

/// Which deadline a scheduled timer represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Parking confirmation delay, armed on entering PossiblyParked
    Confirmation,
    /// Post-parking grace period, armed on entering Parked
    ParkedHold,
}

/// Identity token for a scheduled timer.
///
/// The generation counter makes a cancelled-then-refired timer detectable:
/// a fire whose token does not match the currently pending one is stale and
/// must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Scheduling request the driver must hand to its timer scheduler:
/// "call `on_timer_fired(token)` after `delay_ms`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRequest {
    pub token: TimerToken,
    pub delay_ms: u64,
}

/// Outcome of one update call.
///
/// The detector never schedules or sleeps itself; a populated `timer` field
/// is a request the caller owns from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ParkingState,
    pub event: Option<ParkingEvent>,
    pub notice: Option<StatusNotice>,
    pub timer: Option<TimerRequest>,
}

impl Transition {
    fn to(state: ParkingState) -> Self {
        Self {
            state,
            event: None,
            notice: None,
            timer: None,
        }
    }

    fn with_notice(mut self, notice: StatusNotice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Snapshot of the detector's externally visible session values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    pub state: ParkingState,
    pub is_monitoring: bool,
    pub speed_kmh: f64,
    pub vibration_level: f64,
}

/// Parking detection state machine.
///
/// Owns all session data: current state, last derived signals and the single
/// pending timer token. Not internally thread-safe; the driver must serialize
/// sample and timer delivery.
pub struct ParkingDetector {
    policy: DetectionPolicy,
    state: ParkingState,
    speed_kmh: f64,
    vibration_level: f64,
    last_observed_at_ms: Option<u64>,
    pending: Option<TimerToken>,
    next_generation: u64,
}

impl ParkingDetector {
    /// Create a new detector in Idle state
    pub fn new(policy: DetectionPolicy) -> Self {
        Self {
            policy,
            state: ParkingState::Idle,
            speed_kmh: 0.0,
            vibration_level: 0.0,
            last_observed_at_ms: None,
            pending: None,
            next_generation: 0,
        }
    }

    /// Begin a monitoring session (Idle -> Monitoring).
    ///
    /// Calling while a session is active is a logic error and leaves the
    /// existing session untouched.
    pub fn start(&mut self) -> DetectorResult<Transition> {
        if self.state != ParkingState::Idle {
            return Err(DetectorError::AlreadyMonitoring);
        }
        self.state = ParkingState::Monitoring;
        Ok(Transition::to(self.state)
            .with_notice(StatusNotice::new("Parking detection active", "Monitoring for parking...")))
    }

    /// End the monitoring session (any state -> Idle). Idempotent.
    ///
    /// Clears the pending timer token before returning, so a timer still in
    /// flight from this session fires as a stale no-op.
    pub fn stop(&mut self) -> Transition {
        self.pending = None;
        self.state = ParkingState::Idle;
        self.speed_kmh = 0.0;
        self.vibration_level = 0.0;
        self.last_observed_at_ms = None;
        Transition::to(self.state)
    }

    /// Feed one derived motion sample through the transition rules.
    ///
    /// Malformed or out-of-order samples are rejected without mutating any
    /// state. Samples delivered while Idle are dropped.
    pub fn on_sample(&mut self, sample: &MotionSample) -> DetectorResult<Transition> {
        if !sample.vibration_magnitude.is_finite() || sample.vibration_magnitude < 0.0 {
            return Err(DetectorError::InvalidSample(format!(
                "Vibration magnitude must be finite and non-negative, got {}",
                sample.vibration_magnitude
            )));
        }
        if !sample.speed_kmh.is_finite() || sample.speed_kmh < 0.0 {
            return Err(DetectorError::InvalidSample(format!(
                "Speed must be finite and non-negative, got {} km/h",
                sample.speed_kmh
            )));
        }

        // No active session: drop without touching anything
        if self.state == ParkingState::Idle {
            return Ok(Transition::to(self.state));
        }

        if let Some(last_ms) = self.last_observed_at_ms {
            if sample.observed_at_ms < last_ms {
                return Err(DetectorError::OutOfOrderSample {
                    last_ms,
                    got_ms: sample.observed_at_ms,
                });
            }
        }

        self.last_observed_at_ms = Some(sample.observed_at_ms);
        self.speed_kmh = sample.speed_kmh;
        self.vibration_level = sample.vibration_magnitude;

        let speed = sample.speed_kmh;
        let vibration = sample.vibration_magnitude;

        // Threshold comparisons are strict: equality never transitions,
        // which keeps the machine from oscillating at exact boundary values.
        let transition = match self.state {
            ParkingState::Monitoring => {
                if speed > self.policy.driving_speed_threshold_kmh()
                    && vibration > self.policy.vibration_threshold()
                {
                    self.state = ParkingState::Driving;
                    Transition::to(self.state).with_notice(StatusNotice::new(
                        "Driving detected",
                        format!("Speed: {speed:.1} km/h"),
                    ))
                } else {
                    Transition::to(self.state)
                }
            }

            ParkingState::Driving => {
                if speed < self.policy.parked_speed_threshold_kmh() {
                    self.state = ParkingState::PossiblyParked;
                    let request =
                        self.arm(TimerKind::Confirmation, self.policy.confirmation_delay_ms());
                    let mut t = Transition::to(self.state).with_notice(StatusNotice::new(
                        "Possible parking",
                        "Awaiting confirmation...",
                    ));
                    t.timer = Some(request);
                    t
                } else {
                    // Non-transitioning refresh with the current speed
                    Transition::to(self.state).with_notice(StatusNotice::new(
                        "Driving",
                        format!("Speed: {speed:.1} km/h"),
                    ))
                }
            }

            ParkingState::PossiblyParked => {
                if speed > self.policy.parked_speed_threshold_kmh() {
                    self.pending = None;
                    self.state = ParkingState::Driving;
                    Transition::to(self.state).with_notice(StatusNotice::new(
                        "Driving again",
                        format!("Speed: {speed:.1} km/h"),
                    ))
                } else {
                    Transition::to(self.state)
                }
            }

            ParkingState::Parked => {
                if speed > self.policy.driving_speed_threshold_kmh() {
                    self.pending = None;
                    self.state = ParkingState::Monitoring;
                    Transition::to(self.state).with_notice(StatusNotice::new(
                        "Parking detection active",
                        "Monitoring for parking...",
                    ))
                } else {
                    Transition::to(self.state)
                }
            }

            // Handled by the early return above
            ParkingState::Idle => Transition::to(self.state),
        };

        Ok(transition)
    }

    /// React to an elapsed timer previously requested via a `TimerRequest`.
    ///
    /// A token that no longer matches the pending one was cancelled by an
    /// intervening transition; the fire is absorbed as a no-op.
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Transition {
        if self.pending != Some(token) {
            return Transition::to(self.state);
        }

        match (token.kind, self.state) {
            (TimerKind::Confirmation, ParkingState::PossiblyParked) => {
                self.state = ParkingState::Parked;
                let hold = self.arm(TimerKind::ParkedHold, PARKED_HOLD_MS);
                let mut t = Transition::to(self.state)
                    .with_notice(StatusNotice::new("Parked!", "Notification sent"));
                t.event = Some(ParkingEvent::Parked);
                t.timer = Some(hold);
                t
            }
            (TimerKind::ParkedHold, ParkingState::Parked) => {
                self.pending = None;
                self.state = ParkingState::Monitoring;
                Transition::to(self.state).with_notice(StatusNotice::new(
                    "Parking detection active",
                    "Monitoring for parking...",
                ))
            }
            // Pending token inconsistent with the current state: absorb
            _ => Transition::to(self.state),
        }
    }

    /// Current state
    pub fn state(&self) -> ParkingState {
        self.state
    }

    /// Whether a monitoring session is active
    pub fn is_monitoring(&self) -> bool {
        self.state != ParkingState::Idle
    }

    /// Last derived speed (km/h)
    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    /// Last derived vibration magnitude
    pub fn vibration_level(&self) -> f64 {
        self.vibration_level
    }

    /// Currently pending timer token, if any
    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.pending
    }

    /// Snapshot of the externally visible session values
    pub fn snapshot(&self) -> DetectorSnapshot {
        DetectorSnapshot {
            state: self.state,
            is_monitoring: self.is_monitoring(),
            speed_kmh: self.speed_kmh,
            vibration_level: self.vibration_level,
        }
    }

    fn arm(&mut self, kind: TimerKind, delay_ms: u64) -> TimerRequest {
        self.next_generation += 1;
        let token = TimerToken {
            kind,
            generation: self.next_generation,
        };
        self.pending = Some(token);
        TimerRequest { token, delay_ms }
    }
}
