//! Simulated rig: a reference clock and an encoder whose pulse rate follows
//! the set-point last commanded to a `SimulatedDriver`.
//!
//! Each producer runs on its own thread and pushes edges into an `EdgeSink`,
//! like GPIO interrupt callbacks would. Both threads are joined on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rotor_traits::{Edge, EdgeSink};

use crate::SimHandle;

// Longest single sleep, so shutdown and set-point changes are noticed quickly.
const MAX_NAP: Duration = Duration::from_millis(20);

/// Shortest pulse period the encoder thread will produce.
pub const MIN_PULSE_PERIOD: Duration = Duration::from_micros(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigCfg {
    /// Reference clock period.
    pub cycle: Duration,
    /// Encoder pulses per second at `full_scale`.
    pub full_speed_pps: u32,
    /// Set-point magnitude that runs at `full_speed_pps`.
    pub full_scale: u32,
}

impl Default for RigCfg {
    fn default() -> Self {
        Self {
            cycle: Duration::from_secs(1),
            full_speed_pps: 400,
            full_scale: 31,
        }
    }
}

impl RigCfg {
    /// Pulse period for a set-point; `None` when the motor stands still.
    /// Never shorter than [`MIN_PULSE_PERIOD`].
    pub fn pulse_period(&self, set_point: i32) -> Option<Duration> {
        if self.full_scale == 0 {
            return None;
        }
        let m = u64::from(set_point.unsigned_abs().min(self.full_scale));
        let pps = m * u64::from(self.full_speed_pps) / u64::from(self.full_scale);
        (pps > 0).then(|| Duration::from_nanos(1_000_000_000 / pps).max(MIN_PULSE_PERIOD))
    }
}

pub struct SimulatedRig {
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl core::fmt::Debug for SimulatedRig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedRig")
            .field("threads", &self.threads.len())
            .finish()
    }
}

fn sleep_until(deadline: Instant, shutdown: &AtomicBool) -> bool {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(MAX_NAP));
    }
}

impl SimulatedRig {
    pub fn start(cfg: RigCfg, motor: SimHandle, sink: Arc<dyn EdgeSink>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));

        let clock_thread = {
            let shutdown = Arc::clone(&shutdown);
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || {
                let mut next = Instant::now() + cfg.cycle;
                while sleep_until(next, &shutdown) {
                    sink.emit(Edge::Clock);
                    next += cfg.cycle;
                }
                tracing::trace!("simulated clock exiting cleanly");
            })
        };

        let encoder_thread = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                let mut next = Instant::now();
                while !shutdown.load(Ordering::Relaxed) {
                    let set_point = motor.commanded();
                    let Some(period) = cfg.pulse_period(set_point) else {
                        std::thread::sleep(MAX_NAP);
                        next = Instant::now();
                        continue;
                    };
                    next += period;
                    if !sleep_until(next, &shutdown) {
                        break;
                    }
                    // Negative set-points turn the shaft backwards.
                    sink.emit(Edge::primary(Some(set_point < 0)));
                }
                tracing::trace!("simulated encoder exiting cleanly");
            })
        };

        tracing::info!(
            cycle_ms = u64::try_from(cfg.cycle.as_millis()).unwrap_or(u64::MAX),
            full_speed_pps = cfg.full_speed_pps,
            "simulated rig started"
        );
        Self {
            shutdown,
            threads: vec![clock_thread, encoder_thread],
        }
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.threads.drain(..) {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "simulated rig thread panicked during shutdown");
            }
        }
    }
}

impl Drop for SimulatedRig {
    fn drop(&mut self) {
        self.stop();
    }
}
