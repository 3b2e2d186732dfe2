use std::fmt;
use std::time::Duration;

/// Thresholds the run must stay within to pass.
///
/// Both are strict upper bounds, so a run observing exactly the target value fails. This keeps
/// the verdict consistent with the threshold expressions the platform's dashboards use
/// (`p(95) < target`, `rate < target`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SloTargets {
    /// Maximum acceptable 95th-percentile request latency in milliseconds.
    pub max_p95_ms: f64,
    /// Maximum acceptable fraction of failed requests.
    pub max_error_rate: f64,
}

/// The measured-phase observations compared against [SloTargets] at the end of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct SloReport {
    pub targets: SloTargets,
    pub observed_p95_ms: f64,
    pub observed_error_rate: f64,
    pub total_operations: usize,
    pub failed_operations: usize,
}

impl SloReport {
    pub fn latency_within_target(&self) -> bool {
        self.observed_p95_ms < self.targets.max_p95_ms
    }

    pub fn error_rate_within_target(&self) -> bool {
        self.observed_error_rate < self.targets.max_error_rate
    }

    pub fn passed(&self) -> bool {
        self.latency_within_target() && self.error_rate_within_target()
    }
}

impl fmt::Display for SloReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p95 {:.2}ms (target < {:.0}ms), error rate {:.4} (target < {:.4}), {} operations ({} failed)",
            self.observed_p95_ms,
            self.targets.max_p95_ms,
            self.observed_error_rate,
            self.targets.max_error_rate,
            self.total_operations,
            self.failed_operations,
        )
    }
}

/// Append-only accumulator behind the [crate::report::Reporter] mutex. Writers only ever push,
/// aggregation happens once at finalize time.
#[derive(Debug, Default)]
pub(crate) struct SloSamples {
    latencies_ms: Vec<f64>,
    total: usize,
    failed: usize,
}

impl SloSamples {
    pub(crate) fn observe(&mut self, elapsed: Duration, is_error: bool) {
        self.total += 1;
        if is_error {
            self.failed += 1;
        }
        self.latencies_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub(crate) fn evaluate(&self, targets: SloTargets) -> SloReport {
        let mut sorted = self.latencies_ms.clone();
        sorted.sort_by(f64::total_cmp);

        let observed_error_rate = if self.total == 0 {
            0.0
        } else {
            self.failed as f64 / self.total as f64
        };

        SloReport {
            targets,
            observed_p95_ms: percentile(&sorted, 95.0),
            observed_error_rate,
            total_operations: self.total,
            failed_operations: self.failed,
        }
    }
}

/// Nearest-rank percentile over an ascending-sorted sample set. Returns 0 for an empty set,
/// which only happens when a run recorded no measured traffic at all.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
