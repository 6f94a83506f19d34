mod checks;
mod report;

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub use checks::{CheckRecord, CheckReport, CheckSummary, Checks};
pub use report::{ReportCollector, ReportConfig, Reporter};

/// A timed operation, such as one HTTP request, that is reported once it completes.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    started: Instant,
    pub elapsed: Option<Duration>,
    pub is_error: bool,
    pub attr: HashMap<String, String>,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
            attr: HashMap::new(),
        }
    }

    pub fn add_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attr.insert(key.into(), value.into());
    }

    /// The recorded duration, or the time since the operation started if it has not finished.
    pub fn duration(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    fn finish(&mut self, is_error: bool) {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = is_error;
    }
}

/// Stop the clock on `operation_record` and hand it to the reporter.
///
/// The operation is considered failed if `response` is an error.
pub fn report_operation<T, E>(
    reporter: &Reporter,
    mut operation_record: OperationRecord,
    response: &Result<T, E>,
) {
    operation_record.finish(response.is_err());
    reporter.add_operation(&operation_record);
}

/// Like [report_operation], but lets the caller decide whether the operation failed.
///
/// Useful when a transport-level success should still count as a failure, such as an HTTP 5xx.
pub fn report_operation_outcome(
    reporter: &Reporter,
    mut operation_record: OperationRecord,
    is_error: bool,
) {
    operation_record.finish(is_error);
    reporter.add_operation(&operation_record);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_operation_keeps_its_duration() {
        let mut record = OperationRecord::new("http_get");
        record.add_attr("path", "/v1/report");
        record.finish(true);

        let elapsed = record.elapsed.expect("elapsed should be set");
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(elapsed, record.duration());
        assert!(record.is_error);
        assert_eq!(Some(&"/v1/report".to_string()), record.attr.get("path"));
    }
}
