use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One evaluated check. Records are append-only and never modified once created.
#[derive(Debug, Clone)]
pub struct CheckRecord {
    pub label: String,
    pub passed: bool,
    pub worker_id: Option<String>,
    pub recorded_at: SystemTime,
}

/// The pass/fail totals for a single check label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub label: String,
    pub passed: usize,
    pub failed: usize,
}

impl CheckSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

/// Aggregation of every recorded check, grouped by label and sorted by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub checks: Vec<CheckSummary>,
}

impl CheckReport {
    pub fn get(&self, label: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.label == label)
    }

    pub fn total_recorded(&self) -> usize {
        self.checks.iter().map(CheckSummary::total).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.checks.iter().map(|c| c.failed).sum()
    }

    pub fn all_passed(&self) -> bool {
        self.total_failed() == 0
    }
}

/// The shared check ledger for a run.
///
/// Any number of workers may record checks concurrently. Ordering between workers is not
/// preserved but every record is kept.
#[derive(Debug, Default)]
pub struct Checks {
    records: Mutex<Vec<CheckRecord>>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `predicate` and record the outcome under `label`.
    ///
    /// A predicate that returns an error or panics is recorded as a failure. Returns whether the
    /// check passed.
    pub fn check<F>(&self, label: &str, predicate: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<bool>,
    {
        self.check_for(None, label, predicate)
    }

    /// As [Checks::check], also tagging the record with the worker that produced it.
    pub fn check_for<F>(&self, worker_id: Option<&str>, label: &str, predicate: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<bool>,
    {
        let passed = match catch_unwind(AssertUnwindSafe(predicate)) {
            Ok(Ok(passed)) => passed,
            Ok(Err(e)) => {
                log::warn!("Check [{label}] could not be evaluated: {e:?}");
                false
            }
            Err(_) => {
                log::warn!("Check [{label}] panicked while being evaluated");
                false
            }
        };

        self.record(CheckRecord {
            label: label.to_string(),
            passed,
            worker_id: worker_id.map(ToString::to_string),
            recorded_at: SystemTime::now(),
        });

        passed
    }

    pub fn record(&self, record: CheckRecord) {
        self.records.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate everything recorded so far. Safe to call while workers are still recording.
    pub fn report(&self) -> CheckReport {
        let records = self.records.lock();

        let by_label = records
            .iter()
            .fold(BTreeMap::<&str, (usize, usize)>::new(), |mut acc, record| {
                let entry = acc.entry(record.label.as_str()).or_default();
                if record.passed {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
                acc
            });

        CheckReport {
            checks: by_label
                .into_iter()
                .map(|(label, (passed, failed))| CheckSummary {
                    label: label.to_string(),
                    passed,
                    failed,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn report_groups_by_label() {
        let checks = Checks::new();
        checks.check("search status 200", || Ok(true));
        checks.check("search status 200", || Ok(false));
        checks.check("report status 200", || Ok(true));

        assert_eq!(
            CheckReport {
                checks: vec![
                    CheckSummary {
                        label: "report status 200".to_string(),
                        passed: 1,
                        failed: 0,
                    },
                    CheckSummary {
                        label: "search status 200".to_string(),
                        passed: 1,
                        failed: 1,
                    },
                ]
            },
            checks.report()
        );
    }

    #[test]
    fn erroring_predicate_is_recorded_as_failure() {
        let checks = Checks::new();
        let passed = checks.check("bad body", || Err(anyhow::anyhow!("not json")));

        assert!(!passed);
        assert_eq!(1, checks.report().get("bad body").unwrap().failed);
    }

    #[test]
    fn panicking_predicate_is_recorded_as_failure() {
        let checks = Checks::new();
        let passed = checks.check("panics", || panic!("predicate blew up"));

        assert!(!passed);
        assert_eq!(1, checks.report().total_failed());
    }

    #[test]
    fn empty_ledger_reports_nothing() {
        let checks = Checks::new();
        assert!(checks.is_empty());
        assert_eq!(0, checks.report().total_recorded());
        assert!(checks.report().all_passed());
    }

    #[test]
    fn concurrent_checks_are_not_lost() {
        let checks = Arc::new(Checks::new());

        let handles = (0..10)
            .map(|worker| {
                let checks = checks.clone();
                std::thread::spawn(move || {
                    let worker_id = format!("worker-{worker}");
                    for i in 0..100 {
                        checks.check_for(Some(&worker_id), "load", || Ok(i % 2 == 0));
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(1000, checks.len());
        let summary = checks.report();
        let load = summary.get("load").unwrap();
        assert_eq!(500, load.passed);
        assert_eq!(500, load.failed);
    }
}
