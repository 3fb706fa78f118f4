use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};

use parking_detector_rs::{
    speed_kmh, AccelSample, DetectionPolicy, DetectorSnapshot, LocationSample, MotionSample,
    ParkingDetector, ParkingEvent, TimerToken, Transition,
};

#[derive(Parser, Debug)]
#[command(name = "parking_sim")]
#[command(about = "Replay a drive scenario through the parking detector", long_about = None)]
struct Args {
    /// Path to a scenario JSON file (array of readings); a built-in
    /// drive-and-park scenario is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Use the fast policy (10 s confirmation delay instead of 60 s)
    #[arg(long)]
    fast: bool,
}

/// One timestamped reading from the scenario file.
///
/// Mirrors how the providers deliver data: accelerometer and location arrive
/// independently, either may be absent at a given tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    timestamp_ms: u64,
    accel: Option<AccelSample>,
    location: Option<LocationSample>,
}

#[derive(Serialize)]
struct RunSummary {
    run_at: String,
    readings: usize,
    dropped_samples: usize,
    parked_events: usize,
    final_state: DetectorSnapshot,
}

/// Logical timer scheduler: the detector only hands out deadline requests,
/// the driver owns when they elapse on the simulated clock.
struct TimerQueue {
    entries: Vec<(u64, TimerToken)>,
}

impl TimerQueue {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn schedule(&mut self, now_ms: u64, delay_ms: u64, token: TimerToken) {
        self.entries.push((now_ms + delay_ms, token));
        self.entries.sort_by_key(|(fires_at, _)| *fires_at);
    }

    /// Pop the next entry due at or before `now_ms`
    fn pop_due(&mut self, now_ms: u64) -> Option<(u64, TimerToken)> {
        if self.entries.first().is_some_and(|(fires_at, _)| *fires_at <= now_ms) {
            Some(self.entries.remove(0))
        } else {
            None
        }
    }

    fn pop_next(&mut self) -> Option<(u64, TimerToken)> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }
}

struct Driver {
    detector: ParkingDetector,
    timers: TimerQueue,
    last_accel: Option<AccelSample>,
    dropped_samples: usize,
    parked_events: usize,
}

impl Driver {
    fn new(policy: DetectionPolicy) -> Self {
        Self {
            detector: ParkingDetector::new(policy),
            timers: TimerQueue::new(),
            last_accel: None,
            dropped_samples: 0,
            parked_events: 0,
        }
    }

    fn deliver(&mut self, reading: &Reading) {
        self.fire_due(reading.timestamp_ms);

        if let Some(accel) = &reading.accel {
            self.last_accel = Some(accel.clone());
        }

        if let Some(location) = &reading.location {
            // Merge the most recent accelerometer sample with this fix; no
            // accel seen yet means no measured vibration
            let sample = match &self.last_accel {
                Some(accel) => MotionSample::from_raw(accel, location),
                None => MotionSample::new(speed_kmh(location.speed_mps), 0.0, location.timestamp_ms),
            };
            match self.detector.on_sample(&sample) {
                Ok(transition) => self.dispatch(reading.timestamp_ms, transition),
                Err(err) => {
                    self.dropped_samples += 1;
                    log::warn!("Sample at {} ms dropped: {err}", reading.timestamp_ms);
                }
            }
        }
    }

    fn fire_due(&mut self, now_ms: u64) {
        while let Some((fires_at, token)) = self.timers.pop_due(now_ms) {
            let transition = self.detector.on_timer_fired(token);
            self.dispatch(fires_at, transition);
        }
    }

    /// Let remaining timers elapse after the last reading
    fn drain_timers(&mut self) {
        while let Some((fires_at, token)) = self.timers.pop_next() {
            let transition = self.detector.on_timer_fired(token);
            self.dispatch(fires_at, transition);
        }
    }

    fn dispatch(&mut self, now_ms: u64, transition: Transition) {
        if let Some(notice) = &transition.notice {
            log::info!("[{now_ms} ms] {}: {}", notice.title, notice.body);
        }
        if let Some(ParkingEvent::Parked) = transition.event {
            self.parked_events += 1;
            println!("Parking confirmed at {now_ms} ms");
        }
        if let Some(request) = transition.timer {
            self.timers.schedule(now_ms, request.delay_ms, request.token);
        }
    }
}

/// Built-in scenario: pull away, cruise for half a minute, stop and stay
/// stopped long enough for the confirmation delay and hold period to elapse.
fn synthetic_drive(policy: &DetectionPolicy) -> Vec<Reading> {
    let step = policy.sample_interval_ms();
    let mut readings = Vec::new();
    let mut t = 0u64;

    // Shake rides on the gravity axis so the derived vibration magnitude
    // comes out equal to `shake`
    let mut push = |t: u64, speed_mps: f64, shake: f64| {
        readings.push(Reading {
            timestamp_ms: t,
            accel: Some(AccelSample::new(0.0, 0.0, 9.8 + shake, t)),
            location: Some(LocationSample::new(
                59.3293,
                18.0686,
                Some(speed_mps),
                5.0,
                t,
            )),
        });
    };

    // Parked at the curb
    for _ in 0..5 {
        push(t, 0.0, 0.1);
        t += step;
    }
    // Driving: ~15-20 km/h with engine vibration
    for i in 0..30 {
        push(t, 4.2 + 0.05 * (i % 7) as f64, 2.0);
        t += step;
    }
    // Rolling to a stop
    push(t, 1.5, 1.0);
    t += step;
    // Stopped until well past the confirmation delay
    let stopped_ticks = policy.confirmation_delay_ms() / step + 5;
    for _ in 0..stopped_ticks {
        push(t, 0.2, 0.1);
        t += step;
    }

    readings
}

fn load_scenario(path: &PathBuf) -> Result<Vec<Reading>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let readings: Vec<Reading> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
    Ok(readings)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let policy = if args.fast {
        DetectionPolicy::fast()
    } else {
        DetectionPolicy::default_policy()
    };

    let readings = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => synthetic_drive(&policy),
    };
    log::info!(
        "Replaying {} readings (confirmation delay {} ms)",
        readings.len(),
        policy.confirmation_delay_ms()
    );

    let mut driver = Driver::new(policy);
    driver.detector.start()?;

    for reading in &readings {
        driver.deliver(reading);
    }
    driver.drain_timers();

    let summary = RunSummary {
        run_at: Utc::now().to_rfc3339(),
        readings: readings.len(),
        dropped_samples: driver.dropped_samples,
        parked_events: driver.parked_events,
        final_state: driver.detector.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
