mod in_memory_reporter;

use parking_lot::Mutex;

use crate::checks::CheckReport;
use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;

pub trait ReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    /// Called once at the end of the run with the final check totals.
    fn finalize(&self, checks: &CheckReport);
}

/// Builder for a [Reporter]. Collectors are only created for the outputs that are enabled.
#[derive(Debug, Default)]
pub struct ReportConfig {
    enable_in_memory: bool,
}

impl ReportConfig {
    pub fn enable_in_memory(mut self) -> Self {
        self.enable_in_memory = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut inner: Vec<Box<dyn ReportCollector + Send>> = Vec::new();

        if self.enable_in_memory {
            inner.push(Box::new(InMemoryReporter::new()));
        }

        Reporter {
            inner: Mutex::new(inner),
        }
    }
}

/// Fan-out over the configured collectors. Shared between every worker of a run.
pub struct Reporter {
    inner: Mutex<Vec<Box<dyn ReportCollector + Send>>>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.inner.lock().len())
            .finish()
    }
}

impl Reporter {
    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in self.inner.lock().iter_mut() {
            collector.add_operation(operation_record);
        }
    }

    pub fn finalize(&self, checks: &CheckReport) {
        for collector in self.inner.lock().iter() {
            collector.finalize(checks);
        }
    }
}
