//! Growing, capped sleep intervals between run status queries.

use std::time::Duration;

use ab_domain::config::PollingConfig;

/// Multiplicative backoff: `initial`, `initial * m`, `initial * m^2`, ...
/// clamped to `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(cfg: &PollingConfig) -> Self {
        Self {
            initial: cfg.initial_interval(),
            max: cfg.max_interval(),
            multiplier: cfg.multiplier,
        }
    }

    /// Infinite iterator over the sleep intervals.
    pub fn intervals(&self) -> Backoff {
        let max = self.max.max(Duration::from_millis(1));
        let multiplier = if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        };
        Backoff {
            next: self.initial.min(max),
            max,
            multiplier,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        let grown = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max);
        self.next = grown.clamp(current, self.max);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn default_sequence_grows_by_half_and_caps_at_five_seconds() {
        let got: Vec<Duration> = BackoffPolicy::default().intervals().take(7).collect();
        let want = [1.0, 1.5, 2.25, 3.375, 5.0, 5.0, 5.0];
        for (g, w) in got.iter().zip(want) {
            assert!((g.as_secs_f64() - w).abs() < 1e-6, "{g:?} != {w}");
        }
    }

    #[test]
    fn sequence_is_non_decreasing_and_bounded() {
        let policies = [
            BackoffPolicy::default(),
            BackoffPolicy { initial: secs(0.2), max: secs(3.0), multiplier: 2.0 },
            BackoffPolicy { initial: secs(1.0), max: secs(1.0), multiplier: 1.5 },
            BackoffPolicy { initial: secs(0.01), max: secs(60.0), multiplier: 1.01 },
        ];
        for policy in policies {
            let seq: Vec<Duration> = policy.intervals().take(500).collect();
            assert!(seq.windows(2).all(|w| w[0] <= w[1]), "{policy:?}");
            assert!(seq.iter().all(|d| *d <= policy.max), "{policy:?}");
        }
    }

    #[test]
    fn initial_above_cap_is_clamped() {
        let policy = BackoffPolicy { initial: secs(10.0), max: secs(2.0), multiplier: 1.5 };
        assert_eq!(policy.intervals().next(), Some(secs(2.0)));
    }

    #[test]
    fn degenerate_multiplier_means_constant_interval() {
        for multiplier in [0.5, f64::NAN, f64::INFINITY] {
            let policy = BackoffPolicy { initial: secs(1.0), max: secs(5.0), multiplier };
            let seq: Vec<Duration> = policy.intervals().take(4).collect();
            assert!(seq.iter().all(|d| *d == secs(1.0)), "{multiplier}");
        }
    }

    #[test]
    fn huge_cap_does_not_overflow() {
        let policy = BackoffPolicy {
            initial: Duration::from_secs(u64::MAX / 4),
            max: Duration::MAX,
            multiplier: 10.0,
        };
        let seq: Vec<Duration> = policy.intervals().take(3).collect();
        assert!(seq.windows(2).all(|w| w[0] <= w[1]));
    }
}
