mod checks_table;
mod operations_table;

use std::collections::BTreeMap;

use tabled::settings::Style;
use tabled::Table;

use crate::report::in_memory_reporter::checks_table::CheckRow;
use crate::report::in_memory_reporter::operations_table::OperationRow;
use crate::report::{CheckRecord, ReportCollector};
use crate::OperationRecord;

/// Keeps every record in memory and prints summary tables at the end of the run.
///
/// This is the default reporter and the right one for interactive use. Records are grouped by
/// operation id and check name, so table size is bounded by the number of distinct operations
/// rather than the number of requests.
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
    check_records: Vec<CheckRecord>,
}

impl Default for InMemoryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self {
            operation_records: Vec::new(),
            check_records: Vec::new(),
        }
    }

    fn print_summary_of_operations(&self) {
        if self.operation_records.is_empty() {
            return;
        }

        println!("\nSummary of operations");

        // BTreeMap keeps the rows in a stable order across runs.
        let mut grouped: BTreeMap<String, Vec<&OperationRecord>> = BTreeMap::new();
        for record in &self.operation_records {
            grouped
                .entry(record.operation_id.clone())
                .or_default()
                .push(record);
        }

        let rows = grouped
            .into_iter()
            .map(|(operation_id, records)| OperationRow::summarise(operation_id, &records))
            .collect::<Vec<_>>();

        let mut table = Table::new(rows);
        table.with(Style::modern());

        println!("{table}");
    }

    fn print_summary_of_checks(&self) {
        if self.check_records.is_empty() {
            return;
        }

        println!("\nSummary of checks");

        let mut grouped: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for check in &self.check_records {
            let entry = grouped.entry(check.name.clone()).or_default();
            if check.passed {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        let rows = grouped
            .into_iter()
            .map(|(check, (passes, failures))| CheckRow::new(check, passes, failures))
            .collect::<Vec<_>>();

        let mut table = Table::new(rows);
        table.with(Style::modern());

        println!("{table}");
    }
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn add_check(&mut self, check: &CheckRecord) {
        self.check_records.push(check.clone());
    }

    fn finalize(&self) {
        self.print_summary_of_operations();
        self.print_summary_of_checks();
    }
}
