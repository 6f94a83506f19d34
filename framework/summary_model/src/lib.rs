use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use sre_tunnel_instruments::CheckReport;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner unless one is passed on the command line.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The duration that the run was configured with, in seconds
    ///
    /// Not set when the run was bounded by an iteration count instead.
    pub run_duration: Option<u64>,
    /// The total number of iterations the run was configured with
    ///
    /// Not set when the run was bounded by a duration instead.
    pub iteration_bound: Option<u64>,
    /// The number of workers started
    pub worker_count: usize,
    /// The number of workers that were still running their behaviour when the run ended
    ///
    /// If some workers exit early, for example because their setup failed or they bailed, then
    /// this will be less than [RunSummary::worker_count].
    pub worker_end_count: usize,
    /// The number of iterations that completed, successfully or not
    pub iterations: u64,
    /// The number of iterations that returned an error or panicked
    pub failed_iterations: u64,
    /// Pass and fail totals for every check label
    pub checks: CheckReport,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that the runner is aware of or
    /// that are included by the scenario itself.
    pub env: HashMap<String, String>,
    /// The version of the runner that was used for this run
    pub runner_version: String,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        scenario_name: String,
        started_at: i64,
        run_duration: Option<u64>,
        iteration_bound: Option<u64>,
        worker_count: usize,
        runner_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            started_at,
            run_duration,
            iteration_bound,
            worker_count,
            worker_end_count: 0,
            iterations: 0,
            failed_iterations: 0,
            checks: CheckReport::default(),
            env: HashMap::with_capacity(0),
            runner_version,
        }
    }

    /// Set the worker end count
    pub fn set_worker_end_count(&mut self, worker_end_count: usize) {
        self.worker_end_count = worker_end_count;
    }

    /// Set the iteration totals
    pub fn set_iterations(&mut self, iterations: u64, failed_iterations: u64) {
        self.iterations = iterations;
        self.failed_iterations = failed_iterations;
    }

    /// Set the final check totals
    pub fn set_checks(&mut self, checks: CheckReport) {
        self.checks = checks;
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to identify the configuration used to run the scenario, so
    /// that runs with the same configuration can be compared. It uses the
    ///     - Scenario name
    ///     - Run duration or iteration bound
    ///     - Worker count
    ///     - Selected environment variables
    ///     - Runner version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());
        if let Some(run_duration) = self.run_duration {
            Digest::update(&mut hasher, b"duration");
            Digest::update(&mut hasher, run_duration.to_le_bytes());
        }
        if let Some(iteration_bound) = self.iteration_bound {
            Digest::update(&mut hasher, b"iterations");
            Digest::update(&mut hasher, iteration_bound.to_le_bytes());
        }
        Digest::update(&mut hasher, (self.worker_count as u64).to_le_bytes());
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.runner_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sre_tunnel_instruments::CheckSummary;

    fn sample_summary(run_id: &str) -> RunSummary {
        let mut summary = RunSummary::new(
            run_id.to_string(),
            "search".to_string(),
            1_700_000_000,
            Some(30),
            None,
            25,
            "0.1.0".to_string(),
        );
        summary.add_env("SRE_URL".to_string(), "http://localhost:8081".to_string());
        summary.set_worker_end_count(25);
        summary.set_iterations(100, 2);
        summary.set_checks(CheckReport {
            checks: vec![CheckSummary {
                label: "search status 200".to_string(),
                passed: 98,
                failed: 2,
            }],
        });
        summary
    }

    #[test]
    fn append_and_load_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.jsonl");

        append_run_summary(&sample_summary("a"), &path).unwrap();
        append_run_summary(&sample_summary("b"), &path).unwrap();

        let loaded = load_summary_runs(&path).unwrap();
        assert_eq!(vec![sample_summary("a"), sample_summary("b")], loaded);
    }

    #[test]
    fn load_single_summary() {
        let mut buf = Vec::new();
        store_run_summary(&sample_summary("a"), &mut buf).unwrap();

        let loaded = load_run_summary(buf.as_slice()).unwrap();
        assert_eq!(sample_summary("a"), loaded);
    }

    #[test]
    fn fingerprint_ignores_run_id_and_results() {
        let first = sample_summary("a");
        let mut second = sample_summary("b");
        second.set_iterations(5, 5);

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_bound() {
        let first = sample_summary("a");
        let mut second = sample_summary("a");
        second.run_duration = None;
        second.iteration_bound = Some(30);

        assert_ne!(first.fingerprint(), second.fingerprint());
    }
}
