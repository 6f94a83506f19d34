mod cli;
mod context;
mod definition;
mod error;
mod executor;
mod init;
mod progress;
mod report;
mod run;
mod shutdown;
mod target;
mod types;

pub mod prelude {
    pub use crate::cli::{ReporterOpt, SreTunnelScenarioCli};
    pub use crate::context::UserValuesConstraint;
    pub use crate::context::{RunnerContext, WorkerContext};
    pub use crate::definition::{HookResult, RunBound, ScenarioDefinitionBuilder};
    pub use crate::error::RunError;
    pub use crate::executor::Executor;
    pub use crate::report::RunReport;
    pub use crate::run::run;
    pub use crate::target::{
        resolve_base_url, resolve_base_url_with, resolve_group_number, resolve_group_number_with,
        DEFAULT_BASE_URL, GROUP_NUMBER_ENV, SRE_URL_ENV,
    };
    pub use crate::types::TunnelResult;

    pub use sre_tunnel_core::prelude::{ShutdownSignalError, WorkerBailError};
    pub use sre_tunnel_instruments::{CheckReport, CheckSummary, Checks, Reporter};
}
