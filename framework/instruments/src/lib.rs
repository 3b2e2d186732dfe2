use std::collections::HashMap;
use std::time::{Duration, Instant};

pub mod report;
mod slo;

pub mod prelude {
    pub use crate::report::{
        CheckRecord, InMemoryReporter, InfluxReporter, ReportCollector, ReportConfig, Reporter,
    };
    pub use crate::slo::{SloReport, SloTargets};
    pub use crate::OperationRecord;
}

/// One timed request against the platform under test.
///
/// Created just before the request is issued and completed with [OperationRecord::finish] once
/// the response (or transport failure) has been observed. An operation is an error when the
/// transport failed or the service answered with a 4xx/5xx status.
#[derive(Clone, Debug)]
pub struct OperationRecord {
    pub operation_id: String,
    pub attr: HashMap<String, String>,
    pub is_error: bool,
    pub elapsed: Option<Duration>,
    started: Instant,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            attr: HashMap::new(),
            is_error: false,
            elapsed: None,
            started: Instant::now(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr.insert(name.into(), value.into());
        self
    }

    /// Close the record, capturing the elapsed time since construction.
    pub fn finish(mut self, is_error: bool) -> Self {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = is_error;
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }
}
