//! Simulated service latency.

use std::time::Duration;

/// Per-call delay applied by the mock scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingConfig {
    /// Fixed delay per transport call in milliseconds
    pub latency_ms: u64,
    /// Additional random delay, uniform in `0..=jitter_ms`
    pub jitter_ms: u64,
}

impl TimingConfig {
    /// No delay at all; every call completes on its first poll.
    pub fn instant() -> Self {
        Self::default()
    }

    /// Roughly what the loopback Data Collection Service costs per request.
    pub fn loopback_service() -> Self {
        Self {
            latency_ms: 5,
            jitter_ms: 3,
        }
    }

    pub fn fixed(latency_ms: u64) -> Self {
        Self {
            latency_ms,
            jitter_ms: 0,
        }
    }

    pub fn delay(&self, jitter: u64) -> Duration {
        Duration::from_millis(self.latency_ms + jitter.min(self.jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_clamps_jitter() {
        let timing = TimingConfig {
            latency_ms: 10,
            jitter_ms: 2,
        };
        assert_eq!(timing.delay(0), Duration::from_millis(10));
        assert_eq!(timing.delay(50), Duration::from_millis(12));
        assert_eq!(TimingConfig::instant().delay(3), Duration::ZERO);
    }
}
