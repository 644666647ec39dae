//! Fixed-capacity history of per-cycle position deltas, newest first.

/// Number of cycles that must show no motion before the lap window collapses.
pub const DELTA_HISTORY: usize = 10;

#[derive(Clone)]
pub struct DeltaRing<const N: usize> {
    buf: [i64; N],
    // Index of the newest entry.
    head: usize,
}

impl<const N: usize> DeltaRing<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "DeltaRing needs at least one slot") };
        Self {
            buf: [0; N],
            head: 0,
        }
    }

    /// Insert the newest delta, evicting the oldest.
    #[inline]
    pub fn push(&mut self, delta: i64) {
        self.head = (self.head + N - 1) % N;
        self.buf[self.head] = delta;
    }

    #[inline]
    pub fn newest(&self) -> i64 {
        self.buf[self.head]
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..N).map(move |i| self.buf[(self.head + i) % N])
    }

    #[inline]
    pub fn all_zero(&self) -> bool {
        self.buf.iter().all(|&d| d == 0)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn clear(&mut self) {
        self.buf = [0; N];
        self.head = 0;
    }
}

impl<const N: usize> Default for DeltaRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for DeltaRing<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_with_constant_length() {
        let ring = DeltaRing::<DELTA_HISTORY>::new();
        assert_eq!(ring.len(), 10);
        assert!(ring.all_zero());
        assert_eq!(ring.iter().count(), 10);
    }

    #[test]
    fn push_is_newest_first_and_evicts_oldest() {
        let mut ring = DeltaRing::<3>::new();
        ring.push(1);
        ring.push(2);
        ring.push(3);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![3, 2, 1]);
        ring.push(4);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![4, 3, 2]);
        assert_eq!(ring.newest(), 4);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn all_zero_needs_a_full_window_of_zeros() {
        let mut ring = DeltaRing::<DELTA_HISTORY>::new();
        ring.push(5);
        for _ in 0..DELTA_HISTORY - 1 {
            ring.push(0);
            assert!(!ring.all_zero());
        }
        ring.push(0);
        assert!(ring.all_zero());
    }

    #[test]
    fn clear_restores_zeros() {
        let mut ring = DeltaRing::<4>::new();
        ring.push(-7);
        ring.clear();
        assert!(ring.all_zero());
        assert_eq!(format!("{ring:?}"), "[0, 0, 0, 0]");
    }
}
