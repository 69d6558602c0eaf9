use crate::{
    api,
    auth::{AuthConfig, AuthService, clock::SystemClock, tokens::TokenSigner},
    email::LogMailer,
    store::{AccountStore, MemoryAccountStore, PgAccountStore},
};
use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_base_url: String,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: Arc<dyn AccountStore> = match &args.dsn {
        Some(dsn) => Arc::new(PgAccountStore::connect(dsn).await?),
        None => {
            warn!("no --dsn given, keeping accounts in process memory");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let signer = TokenSigner::new(args.jwt_secret, args.jwt_refresh_secret);
    let config = AuthConfig::new(args.frontend_base_url);
    let service = Arc::new(AuthService::new(
        store,
        Arc::new(LogMailer),
        Arc::new(SystemClock),
        signer,
        config,
    ));

    api::serve(args.port, service).await
}
