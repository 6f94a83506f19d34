use sre_tunnel_runner::prelude::UserValuesConstraint;

use crate::context::DefaultScenarioValues;

/// Run-wide values for HTTP scenarios.
///
/// `scenario_values` is written by the setup hook and read by every worker afterwards.
#[derive(Default, Debug)]
pub struct HttpRunnerContext<SV: UserValuesConstraint = DefaultScenarioValues> {
    pub scenario_values: SV,
}

impl<SV: UserValuesConstraint> UserValuesConstraint for HttpRunnerContext<SV> {}
