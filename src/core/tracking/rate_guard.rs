use crate::domain::models::{RateGuardSettings, RatePolicy};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateVerdict {
    Spaced,
    Burst,
}

#[derive(Debug, Clone)]
pub struct RateGuard {
    min_interval: Duration,
    policy: RatePolicy,
    last_spaced_at: Option<Instant>,
    burst_count: u64,
}

impl RateGuard {
    pub fn new(settings: &RateGuardSettings) -> Self {
        Self {
            min_interval: Duration::from_millis(settings.min_interval_ms),
            policy: settings.policy,
            last_spaced_at: None,
            burst_count: 0,
        }
    }

    // The reference point only moves on spaced samples, so a steady stream of fast
    // updates is still let through once per interval under the drop policy.
    pub fn observe(&mut self, now: Instant) -> RateVerdict {
        if let Some(last) = self.last_spaced_at {
            if now.saturating_duration_since(last) <= self.min_interval {
                self.burst_count += 1;
                return RateVerdict::Burst;
            }
        }
        self.last_spaced_at = Some(now);
        RateVerdict::Spaced
    }

    pub fn should_drop(&self, verdict: RateVerdict) -> bool {
        verdict == RateVerdict::Burst && self.policy == RatePolicy::Drop
    }

    pub fn burst_count(&self) -> u64 {
        self.burst_count
    }
}

#[cfg(test)]
mod tests {
    use super::{RateGuard, RateVerdict};
    use crate::domain::models::{RateGuardSettings, RatePolicy};
    use std::time::Duration;
    use tokio::time::Instant;

    #[test]
    fn first_sample_is_spaced() {
        let mut guard = RateGuard::new(&RateGuardSettings::default());
        assert_eq!(guard.observe(Instant::now()), RateVerdict::Spaced);
        assert_eq!(guard.burst_count(), 0);
    }

    #[test]
    fn fast_samples_are_counted_but_observed() {
        let mut guard = RateGuard::new(&RateGuardSettings::default());
        let start = Instant::now();
        guard.observe(start);
        let verdict = guard.observe(start + Duration::from_millis(40));
        assert_eq!(verdict, RateVerdict::Burst);
        assert!(!guard.should_drop(verdict));
        assert_eq!(guard.burst_count(), 1);
        assert_eq!(
            guard.observe(start + Duration::from_millis(150)),
            RateVerdict::Spaced
        );
    }

    #[test]
    fn drop_policy_discards_bursts() {
        let mut guard = RateGuard::new(&RateGuardSettings {
            min_interval_ms: 100,
            policy: RatePolicy::Drop,
        });
        let start = Instant::now();
        let first = guard.observe(start);
        assert!(!guard.should_drop(first));
        let verdict = guard.observe(start + Duration::from_millis(60));
        assert!(guard.should_drop(verdict));
        // Still measured from the last spaced sample, not the dropped one.
        assert_eq!(
            guard.observe(start + Duration::from_millis(120)),
            RateVerdict::Spaced
        );
    }
}
