//! Rotational speed in revolutions per minute from a per-cycle position delta.

use crate::fixed_point::Fixed;

#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    // 60 / pulses per revolution, at the internal scale
    rpm_per_pulse_per_sec: Fixed,
    internal_scale: u32,
    scale: u32,
    deadband: Fixed,
}

impl SpeedEstimator {
    pub fn new(pulses_per_rev: u32, internal_scale: u32, scale: u32, deadband_digits: u32) -> Self {
        let rpm_per_pulse_per_sec = Fixed::from_int(60)
            .checked_div(
                Fixed::from_int(i64::from(pulses_per_rev.max(1))),
                internal_scale,
            )
            .unwrap_or(Fixed::zero(internal_scale));
        Self {
            rpm_per_pulse_per_sec,
            internal_scale,
            scale,
            deadband: Fixed::ulp(deadband_digits),
        }
    }

    /// `(delta / cycle_seconds) * (60 / pulses_per_rev)`.
    ///
    /// Zero when no cycle time is known yet, and zero when the magnitude is
    /// below one unit of the last displayed digit.
    pub fn estimate(&self, delta: i64, cycle_seconds: Fixed) -> Fixed {
        let Some(pulses_per_sec) =
            Fixed::from_int(delta).checked_div(cycle_seconds, self.internal_scale)
        else {
            return Fixed::zero(self.scale);
        };
        let rpm = pulses_per_sec.mul(self.rpm_per_pulse_per_sec, self.scale);
        if rpm.abs() < self.deadband {
            Fixed::zero(self.scale)
        } else {
            rpm
        }
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }
}
