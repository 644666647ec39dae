//! Lap window: the interval between the two most recent measurement
//! boundaries, extrapolated to one full revolution.

use std::time::{Duration, Instant};

use crate::encoder::Boundary;
use crate::fixed_point::Fixed;

#[derive(Debug, Clone)]
pub struct LapWindow {
    start: Instant,
    end: Instant,
    // pulses per revolution / granularity
    factor: i64,
    scale: u32,
}

impl LapWindow {
    pub fn new(now: Instant, factor: u32, scale: u32) -> Self {
        Self {
            start: now,
            end: now,
            factor: i64::from(factor),
            scale,
        }
    }

    /// Slide the window forward, or collapse it on a direction reversal.
    pub fn on_measurement_boundary(&mut self, boundary: Boundary, now: Instant) {
        if boundary.is_reversal() {
            self.collapse(now);
        } else {
            self.start = self.end;
            self.end = now.max(self.end);
        }
    }

    /// Collapse the window when no motion was seen across the delta history.
    pub fn on_cycle_tick(&mut self, all_deltas_zero: bool, now: Instant) {
        if all_deltas_zero {
            self.collapse(now);
        }
    }

    #[inline]
    pub fn collapse(&mut self, now: Instant) {
        self.start = now;
        self.end = now;
    }

    #[inline]
    pub fn lap_duration(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    /// Seconds per revolution at the configured scale.
    pub fn lap_time(&self) -> Fixed {
        Fixed::from_duration(self.lap_duration(), self.scale).mul_int(self.factor)
    }

    #[inline]
    pub fn bounds(&self) -> (Instant, Instant) {
        (self.start, self.end)
    }
}
