//! Per-cycle measurement record.

use std::fmt;

use crate::fixed_point::Fixed;

/// Everything measured during one clock cycle.
///
/// Produced once per tick and never mutated; the next tick supersedes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Ticks since start or the last reset.
    pub counter: u64,
    /// Absolute position in encoder pulses.
    pub position: i64,
    /// Position in revolutions.
    pub rotation: Fixed,
    /// Seconds per revolution extrapolated from the last measurement window.
    pub lap_time: Fixed,
    /// Revolutions per minute.
    pub speed: Fixed,
    /// Seconds since the previous tick.
    pub cycle_time: Fixed,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} pos={} rot={} lap={}s speed={}rpm cycle={}s",
            self.counter, self.position, self.rotation, self.lap_time, self.speed, self.cycle_time
        )
    }
}
