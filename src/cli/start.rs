use crate::cli::{actions::Action, commands, commands::logging, dispatch, telemetry};
use anyhow::Result;

/// Parse arguments, bring telemetry up at the requested verbosity, and
/// resolve the action to run.
///
/// # Errors
///
/// Returns an error if telemetry initialization or action dispatch fails
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(logging::level_from_matches(&matches))?;

    dispatch::handler(&matches)
}
