/// Errors that abort a run before any worker starts.
///
/// Anything that goes wrong once workers are running is isolated to the iteration it happened in
/// and shows up in the [crate::report::RunReport] instead.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The scenario definition or command line arguments are not valid.
    #[error("Invalid scenario configuration: {0}")]
    Configuration(String),
    /// The global setup hook failed.
    #[error("Scenario setup failed: {0:#}")]
    Setup(#[source] anyhow::Error),
}
