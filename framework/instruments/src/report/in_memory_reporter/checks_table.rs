use tabled::Tabled;

use crate::checks::CheckSummary;

#[derive(Tabled)]
pub struct CheckRow {
    #[tabled(rename = "check")]
    pub label: String,
    pub passed: usize,
    pub failed: usize,
    #[tabled(rename = "pass rate", display = "percent")]
    pub pass_rate: f64,
}

impl From<&CheckSummary> for CheckRow {
    fn from(summary: &CheckSummary) -> Self {
        let total = summary.total();
        Self {
            label: summary.label.clone(),
            passed: summary.passed,
            failed: summary.failed,
            pass_rate: if total == 0 {
                0.0
            } else {
                summary.passed as f64 / total as f64 * 100.0
            },
        }
    }
}

fn percent(n: &f64) -> String {
    format!("{:.2}%", n)
}
