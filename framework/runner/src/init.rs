use crate::cli::SreTunnelScenarioCli;
use clap::Parser;

/// Initialise the CLI and logging for the runner.
pub fn init() -> SreTunnelScenarioCli {
    env_logger::init();

    SreTunnelScenarioCli::parse()
}
