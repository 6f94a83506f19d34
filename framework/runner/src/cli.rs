use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct SreTunnelScenarioCli {
    /// Base URL of the service to test.
    ///
    /// Overrides the `SRE_URL` environment variable. When neither is set the default
    /// `http://localhost:8081` is used.
    #[clap(long)]
    pub target_url: Option<String>,

    /// The 1-based group number used by scenarios that partition shared test records between
    /// parallel runs.
    ///
    /// Overrides the `GROUP_NUMBER` environment variable. Defaults to 1.
    #[clap(long)]
    pub group_number: Option<u32>,

    /// The number of workers to run concurrently
    #[clap(long)]
    pub workers: Option<usize>,

    /// The number of seconds to run the scenario for
    ///
    /// Cannot be combined with `--iterations`.
    #[clap(long)]
    pub duration: Option<u64>,

    /// The total number of iterations to run, shared between all workers
    ///
    /// Cannot be combined with `--duration`.
    #[clap(long)]
    pub iterations: Option<u64>,

    /// Per-request timeout for HTTP calls, in seconds
    #[clap(long, default_value = "30")]
    pub request_timeout_s: u64,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// The reporter to use.
    #[arg(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Set the ID of this run
    ///
    /// If not set, a random ID is used.
    #[arg(long, short)]
    pub run_id: Option<String>,

    /// File that the run summary is appended to, one JSON object per line
    #[arg(long, default_value = "run_summary.jsonl")]
    pub summary_file: PathBuf,

    /// Do not write a run summary
    #[arg(long, default_value = "false")]
    pub no_summary: bool,
}

impl Default for SreTunnelScenarioCli {
    fn default() -> Self {
        Self {
            target_url: None,
            group_number: None,
            workers: None,
            duration: None,
            iterations: None,
            request_timeout_s: 30,
            no_progress: false,
            reporter: ReporterOpt::InMemory,
            run_id: None,
            summary_file: PathBuf::from("run_summary.jsonl"),
            no_summary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Keep operations in memory and print summary tables at the end of the run
    #[default]
    InMemory,
    /// Do not report operations, checks are still returned in the run report
    Noop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bounds_and_overrides() {
        let cli = SreTunnelScenarioCli::try_parse_from([
            "search",
            "--target-url",
            "http://sre.test:9000",
            "--workers",
            "4",
            "--iterations",
            "12",
            "--reporter",
            "noop",
            "--no-progress",
        ])
        .unwrap();

        assert_eq!(Some("http://sre.test:9000".to_string()), cli.target_url);
        assert_eq!(Some(4), cli.workers);
        assert_eq!(Some(12), cli.iterations);
        assert_eq!(None, cli.duration);
        assert_eq!(ReporterOpt::Noop, cli.reporter);
        assert!(cli.no_progress);
        assert_eq!(30, cli.request_timeout_s);
    }

    #[test]
    fn defaults_match_parsed_defaults() {
        let parsed = SreTunnelScenarioCli::try_parse_from(["search"]).unwrap();
        let default = SreTunnelScenarioCli::default();

        assert_eq!(default.request_timeout_s, parsed.request_timeout_s);
        assert_eq!(default.summary_file, parsed.summary_file);
        assert_eq!(default.reporter, parsed.reporter);
        assert_eq!(default.no_summary, parsed.no_summary);
    }
}
