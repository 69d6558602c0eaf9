//! Outbound email abstraction.
//!
//! The core hands a recipient, template name, and template data to a
//! `Mailer` and does not care how delivery happens. The default for local
//! dev logs the payload instead of sending real email.

use anyhow::Result;
use serde_json::Value;
use tracing::info;

/// Email delivery abstraction injected into the auth service.
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error so the caller can decide
    /// whether the failure matters for its flow.
    fn send(&self, to: &str, template: &str, data: &Value) -> Result<()>;
}

/// Local dev mailer that logs and returns `Ok(())`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, template: &str, data: &Value) -> Result<()> {
        info!(
            to_email = %to,
            template = %template,
            payload = %data,
            "email send stub"
        );
        Ok(())
    }
}
