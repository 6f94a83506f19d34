mod checks_table;
mod operations_table;

use std::collections::BTreeMap;
use std::time::Duration;

use tabled::settings::Style;
use tabled::Table;

use crate::checks::CheckReport;
use crate::report::in_memory_reporter::checks_table::CheckRow;
use crate::report::in_memory_reporter::operations_table::OperationRow;
use crate::report::ReportCollector;
use crate::OperationRecord;

/// A very basic reporter that keeps all of the operations in memory and prints a summary of the
/// operations and checks at the end of the run.
#[derive(Default)]
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn operation_rows(&self) -> Vec<OperationRow> {
        self.operation_records
            .iter()
            .fold(BTreeMap::<String, Vec<&OperationRecord>>::new(), |mut acc, record| {
                let key = match record.attr.get("path") {
                    Some(path) => format!("{} {}", record.operation_id, path),
                    None => record.operation_id.clone(),
                };
                acc.entry(key).or_default().push(record);
                acc
            })
            .into_iter()
            .map(|(operation_id, operations)| {
                let total_operations = operations.len();
                let total_duration = operations
                    .iter()
                    .map(|record| record.duration())
                    .sum::<Duration>();
                let successful = operations
                    .iter()
                    .filter(|op| !op.is_error)
                    .map(|op| op.duration());

                let (min, max) = successful.fold((None, None), |(min, max), d| {
                    (
                        Some(min.map_or(d, |m: Duration| m.min(d))),
                        Some(max.map_or(d, |m: Duration| m.max(d))),
                    )
                });

                OperationRow {
                    operation_id,
                    total_operations,
                    total_errors: operations.iter().filter(|op| op.is_error).count(),
                    total_duration_ms: as_ms(total_duration),
                    avg_time_ms: as_ms(total_duration) / total_operations as f64,
                    min_time_ms: min.map(as_ms).unwrap_or_default(),
                    max_time_ms: max.map(as_ms).unwrap_or_default(),
                }
            })
            .collect()
    }

    fn print_summary_of_operations(&self) {
        if self.operation_records.is_empty() {
            return;
        }

        println!("\nSummary of operations");
        let mut table = Table::new(self.operation_rows());
        table.with(Style::modern());
        println!("{table}");
    }

    fn print_summary_of_checks(checks: &CheckReport) {
        println!("\nSummary of checks");
        if checks.checks.is_empty() {
            println!("No checks were recorded");
            return;
        }

        let mut table = Table::new(checks.checks.iter().map(CheckRow::from));
        table.with(Style::modern());
        println!("{table}");
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn finalize(&self, checks: &CheckReport) {
        self.print_summary_of_operations();
        Self::print_summary_of_checks(checks);
    }
}
