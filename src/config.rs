/// Which shipped [`crate::wait::WaitStrategy`] an assembly should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategyKind {
    /// Busy-spin then yield. Lowest latency, burns a full core.
    YieldingSpin,
    /// Park on a mutex/condvar. Higher latency, consumer-friendly.
    Blocking,
}

/// Construction-time configuration for a ring/sequencer pair.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring capacity. Must be a power of two.
    pub buffer_size: usize,
    /// Which wait strategy the barrier(s) over this ring should use.
    pub wait_strategy: WaitStrategyKind,
    /// Whether hot-path counters are recorded. Counters are cheap enough
    /// relative to the atomics already on the hot path that turning this
    /// off saves no work today; it exists so a caller can signal intent
    /// and so a future cheaper no-op `Metrics` can be swapped in.
    pub enable_metrics: bool,
}

impl Config {
    /// Builds a configuration.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is zero or not a power of two: an invalid
    /// buffer size is a programming error, not a recoverable condition.
    pub const fn new(buffer_size: usize, wait_strategy: WaitStrategyKind, enable_metrics: bool) -> Self {
        assert!(buffer_size > 0 && buffer_size.is_power_of_two(), "buffer_size must be a power of two");
        Self {
            buffer_size,
            wait_strategy,
            enable_metrics,
        }
    }

    #[inline]
    pub const fn mask(&self) -> usize {
        self.buffer_size - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        LOW_LATENCY_CONFIG
    }
}

/// 4096-slot ring with the yielding spin strategy: lowest latency, highest
/// CPU cost while waiting.
pub const LOW_LATENCY_CONFIG: Config = Config::new(4096, WaitStrategyKind::YieldingSpin, true);

/// 65536-slot ring with the blocking condvar strategy: higher headroom
/// against bursts, a consumer thread parks instead of spinning when idle.
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(65536, WaitStrategyKind::Blocking, true);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two() {
        let _ = Config::new(100, WaitStrategyKind::YieldingSpin, true);
    }

    #[test]
    fn presets_are_valid() {
        assert_eq!(LOW_LATENCY_CONFIG.buffer_size, 4096);
        assert_eq!(HIGH_THROUGHPUT_CONFIG.buffer_size, 65536);
    }

    #[test]
    fn mask_is_buffer_size_minus_one() {
        let config = Config::new(8, WaitStrategyKind::YieldingSpin, false);
        assert_eq!(config.mask(), 7);
    }
}
