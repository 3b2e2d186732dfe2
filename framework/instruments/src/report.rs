mod in_memory_reporter;
mod influx_reporter;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::slo::{SloReport, SloSamples, SloTargets};
use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;
pub use influx_reporter::InfluxReporter;

/// The outcome of one explicit assertion made by a scenario stage.
///
/// Checks are recorded whether they pass or fail, so pass rates can be reported per check name
/// at the end of the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckRecord {
    pub name: String,
    pub passed: bool,
}

impl CheckRecord {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
        }
    }
}

/// A sink for the records produced during a run. Implementations decide what to keep and where
/// to send it; the [Reporter] fans every record out to all configured collectors.
pub trait ReportCollector: Send {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    fn add_check(&mut self, check: &CheckRecord);

    fn finalize(&self);
}

/// Configuration for the [Reporter], assembled by the runner before any hook executes.
pub struct ReportConfig {
    run_id: String,
    slo_targets: Option<SloTargets>,
    collectors: Vec<Box<dyn ReportCollector>>,
}

impl ReportConfig {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            slo_targets: None,
            collectors: Vec::new(),
        }
    }

    /// Enable the pass/fail verdict over the measured phase. Without targets the run still
    /// reports a summary but always completes without a verdict.
    pub fn with_slo_targets(mut self, targets: SloTargets) -> Self {
        self.slo_targets = Some(targets);
        self
    }

    /// Keep all records in memory and print summary tables at the end of the run.
    pub fn enable_summary(self) -> Self {
        self.with_collector(Box::new(InMemoryReporter::new()))
    }

    /// Ship per-operation and per-check points to InfluxDB through a buffered write task.
    pub fn enable_influx(
        self,
        runtime: &tokio::runtime::Runtime,
        shutdown_listener: loadcell_core::prelude::DelegatedShutdownListener,
    ) -> anyhow::Result<Self> {
        let run_id = self.run_id.clone();
        let reporter = InfluxReporter::new(runtime, shutdown_listener, run_id)?;
        Ok(self.with_collector(Box::new(reporter)))
    }

    pub fn with_collector(mut self, collector: Box<dyn ReportCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn init(self) -> Reporter {
        Reporter {
            run_id: self.run_id,
            slo_targets: self.slo_targets,
            measuring: AtomicBool::new(false),
            samples: Mutex::new(SloSamples::default()),
            collectors: Mutex::new(self.collectors),
        }
    }
}

/// Concurrent-writer-safe sink shared by every agent in the run.
///
/// Records are appended under a short mutex hold and aggregated once at finalize time, so
/// callers never coordinate with each other. Operations recorded before
/// [Reporter::start_measurement] (pool warm-up traffic) reach the collectors but are excluded
/// from the SLO verdict.
pub struct Reporter {
    run_id: String,
    slo_targets: Option<SloTargets>,
    measuring: AtomicBool,
    samples: Mutex<SloSamples>,
    collectors: Mutex<Vec<Box<dyn ReportCollector>>>,
}

impl Reporter {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Open the measured window. Called by the runner after global setup completes.
    pub fn start_measurement(&self) {
        self.measuring.store(true, Ordering::Relaxed);
    }

    pub fn add_operation(&self, record: OperationRecord) {
        if self.measuring.load(Ordering::Relaxed) {
            if let Some(elapsed) = record.elapsed {
                self.samples.lock().observe(elapsed, record.is_error);
            }
        }

        let mut collectors = self.collectors.lock();
        for collector in collectors.iter_mut() {
            collector.add_operation(&record);
        }
    }

    pub fn add_check(&self, check: CheckRecord) {
        let mut collectors = self.collectors.lock();
        for collector in collectors.iter_mut() {
            collector.add_check(&check);
        }
    }

    /// Record an assertion outcome and hand the verdict back so callers can branch on it.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        self.add_check(CheckRecord::new(name, passed));
        passed
    }

    /// Flush every collector and evaluate the SLO verdict, if targets were configured.
    pub fn finalize(&self) -> Option<SloReport> {
        let collectors = self.collectors.lock();
        for collector in collectors.iter() {
            collector.finalize();
        }

        self.slo_targets
            .map(|targets| self.samples.lock().evaluate(targets))
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("run_id", &self.run_id)
            .field("slo_targets", &self.slo_targets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CapturingCollector {
        operations: Arc<Mutex<Vec<OperationRecord>>>,
        checks: Arc<Mutex<Vec<CheckRecord>>>,
    }

    impl ReportCollector for CapturingCollector {
        fn add_operation(&mut self, operation_record: &OperationRecord) {
            self.operations.lock().push(operation_record.clone());
        }

        fn add_check(&mut self, check: &CheckRecord) {
            self.checks.lock().push(check.clone());
        }

        fn finalize(&self) {}
    }

    fn reporter_with(collector: CapturingCollector) -> Reporter {
        ReportConfig::new("test-run")
            .with_slo_targets(SloTargets {
                max_p95_ms: 300.0,
                max_error_rate: 0.01,
            })
            .with_collector(Box::new(collector))
            .init()
    }

    fn finished(operation_id: &str, is_error: bool) -> OperationRecord {
        OperationRecord::new(operation_id).finish(is_error)
    }

    #[test]
    fn operations_fan_out_to_collectors() {
        let collector = CapturingCollector::default();
        let reporter = reporter_with(collector.clone());

        reporter.add_operation(finished("tenant_create", false));
        reporter.add_operation(finished("usage_ingest", true));

        let seen = collector.operations.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].operation_id, "tenant_create");
        assert!(seen[1].is_error);
    }

    #[test]
    fn warm_up_traffic_is_excluded_from_the_verdict() {
        let collector = CapturingCollector::default();
        let reporter = reporter_with(collector.clone());

        // Before the measured window opens: visible to collectors, invisible to the verdict.
        reporter.add_operation(finished("tenant_create", true));

        reporter.start_measurement();
        reporter.add_operation(finished("usage_ingest", false));

        let report = reporter.finalize().expect("targets were configured");
        assert_eq!(report.total_operations, 1);
        assert_eq!(report.failed_operations, 0);
        assert_eq!(collector.operations.lock().len(), 2);
    }

    #[test]
    fn check_returns_the_verdict_it_records() {
        let collector = CapturingCollector::default();
        let reporter = reporter_with(collector.clone());

        assert!(reporter.check("tenant_selected_from_pool", true));
        assert!(!reporter.check("usage_ingest_accepted", false));

        let checks = collector.checks.lock();
        assert_eq!(checks.len(), 2);
        assert!(checks[0].passed);
        assert!(!checks[1].passed);
    }

    #[test]
    fn finalize_without_targets_yields_no_verdict() {
        let reporter = ReportConfig::new("test-run").init();
        reporter.start_measurement();
        reporter.add_operation(finished("billing_rate", false));

        assert!(reporter.finalize().is_none());
    }

    #[test]
    fn failed_measured_operations_drive_the_error_rate() {
        let reporter = reporter_with(CapturingCollector::default());
        reporter.start_measurement();

        for n in 0..50 {
            reporter.add_operation(finished("invoice_generate", n == 0));
        }

        let report = reporter.finalize().expect("targets were configured");
        assert_eq!(report.total_operations, 50);
        assert_eq!(report.failed_operations, 1);
        assert_eq!(report.observed_error_rate, 0.02);
        assert!(!report.passed());
    }

    #[test]
    fn unfinished_records_are_not_sampled() {
        let reporter = reporter_with(CapturingCollector::default());
        reporter.start_measurement();

        reporter.add_operation(OperationRecord::new("usage_total"));

        let report = reporter.finalize().expect("targets were configured");
        assert_eq!(report.total_operations, 0);
    }
}
