//! Absolute pulse position from a quadrature encoder.
//!
//! Only leading edges of the primary channel are counted. The secondary channel
//! level sampled at the same instant gives the direction: high counts down, low
//! counts up.

/// Raised whenever the position lands on a multiple of the measurement
/// granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Secondary channel level at this boundary.
    pub current: bool,
    /// Secondary channel level at the previous boundary.
    pub previous: bool,
}

impl Boundary {
    /// The secondary level flipped between boundaries: the shaft turned around.
    #[inline]
    pub fn is_reversal(&self) -> bool {
        self.current ^ self.previous
    }
}

#[derive(Debug, Clone)]
pub struct EncoderTracker {
    phi: i64,
    granularity: i64,
    boundary_level: bool,
}

impl EncoderTracker {
    pub fn new(granularity: u32) -> Self {
        Self {
            phi: 0,
            granularity: i64::from(granularity.max(1)),
            boundary_level: false,
        }
    }

    /// Count one primary leading edge.
    pub fn on_primary_edge(&mut self, secondary_high: bool) -> Option<Boundary> {
        let step = if secondary_high { -1 } else { 1 };
        self.phi = self.phi.saturating_add(step);
        if self.phi % self.granularity != 0 {
            return None;
        }
        let previous = std::mem::replace(&mut self.boundary_level, secondary_high);
        Some(Boundary {
            current: secondary_high,
            previous,
        })
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.phi
    }

    #[inline]
    pub fn granularity(&self) -> i64 {
        self.granularity
    }

    /// Zero the position. The last boundary level is kept so a reversal
    /// straddling the reset is still recognised.
    pub fn reset(&mut self) {
        self.phi = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_secondary_counts_up_high_counts_down() {
        let mut enc = EncoderTracker::new(100);
        for _ in 0..5 {
            enc.on_primary_edge(false);
        }
        assert_eq!(enc.position(), 5);
        for _ in 0..8 {
            enc.on_primary_edge(true);
        }
        assert_eq!(enc.position(), -3);
    }

    #[test]
    fn boundary_every_granularity_pulses() {
        let mut enc = EncoderTracker::new(100);
        let boundaries = (0..400)
            .filter_map(|_| enc.on_primary_edge(false))
            .count();
        assert_eq!(boundaries, 4);
    }

    #[test]
    fn boundary_carries_previous_level() {
        let mut enc = EncoderTracker::new(2);
        enc.on_primary_edge(false);
        let b = enc.on_primary_edge(false).unwrap();
        assert_eq!(
            b,
            Boundary {
                current: false,
                previous: false
            }
        );
        assert!(!b.is_reversal());

        // Back down through zero with the secondary channel high.
        enc.on_primary_edge(true);
        let b = enc.on_primary_edge(true).unwrap();
        assert_eq!(enc.position(), 0);
        assert!(b.is_reversal());
        let b = {
            enc.on_primary_edge(true);
            enc.on_primary_edge(true).unwrap()
        };
        assert_eq!(enc.position(), -2);
        assert!(!b.is_reversal());
    }

    #[test]
    fn reset_zeroes_position() {
        let mut enc = EncoderTracker::new(100);
        enc.on_primary_edge(false);
        enc.reset();
        assert_eq!(enc.position(), 0);
    }

    #[test]
    fn zero_granularity_is_clamped() {
        let enc = EncoderTracker::new(0);
        assert_eq!(enc.granularity(), 1);
    }
}
