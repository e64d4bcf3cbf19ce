//! Counting-array percentiles.
//!
//! Latencies are whole milliseconds, so a dense array indexed by the latency
//! itself gives exact order statistics in `O(records + max_latency)` without
//! sorting. Memory grows with the largest latency seen for a key, which is
//! only reasonable while latencies stay in the low thousands of milliseconds.

/// Occurrence count per latency value for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountingArray {
    counts: Vec<u64>,
    total: u64,
}

impl CountingArray {
    /// Array able to hold latencies `0..=max_latency`.
    pub fn with_max(max_latency: u64) -> Self {
        Self {
            counts: vec![0; max_latency as usize + 1],
            total: 0,
        }
    }

    /// Counts one observation. Returns `false` if `latency` is beyond the
    /// array, which means the max used for sizing was wrong.
    pub fn record(&mut self, latency: u64) -> bool {
        match self.counts.get_mut(latency as usize) {
            Some(slot) => {
                *slot += 1;
                self.total += 1;
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn max_latency(&self) -> u64 {
        self.counts.len() as u64 - 1
    }

    /// First latency whose cumulative count reaches half the observations
    /// (rounded half up).
    pub fn median(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        let target = (self.total + 1) / 2;
        let mut cumulative = 0u64;
        for (latency, count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return Some(latency as u64);
            }
        }
        None
    }

    /// Scans down from the top, removing each bucket's count, and stops at
    /// the first latency where the observations left below it fit inside
    /// `round(total * 0.99)`.
    pub fn p99(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        let target = (self.total as f64 * 0.99).round() as u64;
        let mut remaining = self.total;
        for (latency, count) in self.counts.iter().enumerate().rev() {
            remaining -= count;
            if remaining <= target {
                return Some(latency as u64);
            }
        }
        None
    }
}
