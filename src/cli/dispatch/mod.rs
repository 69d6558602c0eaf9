//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let dsn = matches.get_one::<String>(commands::ARG_DSN).cloned();
    let frontend_base_url = matches
        .get_one::<String>(commands::ARG_FRONTEND_URL)
        .cloned()
        .context("missing required argument: --frontend-url")?;
    let jwt_secret = matches
        .get_one::<String>(commands::ARG_JWT_SECRET)
        .cloned()
        .context("missing required argument: --jwt-secret")?;
    let jwt_refresh_secret = matches
        .get_one::<String>(commands::ARG_JWT_REFRESH_SECRET)
        .cloned()
        .context("missing required argument: --jwt-refresh-secret")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        jwt_secret,
        jwt_refresh_secret,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        let command = crate::cli::commands::new();
        let matches = command.try_get_matches_from(vec![
            "teamflow",
            "--port",
            "9000",
            "--frontend-url",
            "https://app.teamflow.dev",
            "--jwt-secret",
            "access-secret",
            "--jwt-refresh-secret",
            "refresh-secret",
        ])?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 9000);
        assert_eq!(args.dsn, None);
        assert_eq!(args.frontend_base_url, "https://app.teamflow.dev");
        assert_eq!(args.jwt_secret, "access-secret");
        assert_eq!(args.jwt_refresh_secret, "refresh-secret");
        Ok(())
    }
}
