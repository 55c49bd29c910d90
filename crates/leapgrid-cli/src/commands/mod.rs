mod clock;
mod decode;
mod quote;
mod snapshot;

use std::sync::Arc;

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use leapgrid_core::http_client::ReqwestHttpClient;
use leapgrid_core::tradier::TradierClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Envelope;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let result = match &cli.command {
        Command::Snapshot(args) => snapshot::run(args, cli).await?,
        Command::Quote(args) => quote::run(args, cli).await?,
        Command::Decode(args) => decode::run(args)?,
        Command::Clock => clock::run(cli).await?,
    };

    Ok(Envelope {
        request_id: Uuid::new_v4().to_string(),
        generated_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .expect("current UTC time is RFC3339 formattable"),
        data: result.data,
        warnings: result.warnings,
    })
}

/// Build the API client from global flags and the `TRADIER_TOKEN` credential.
/// A missing token is fatal before any network traffic.
pub(crate) fn build_client(cli: &Cli) -> Result<TradierClient, CliError> {
    let token = std::env::var("TRADIER_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty())
        .ok_or(CliError::MissingToken)?;

    let mut client = TradierClient::new(Arc::new(ReqwestHttpClient::new()), token)
        .with_timeout_ms(cli.timeout_ms);
    if let Some(base_url) = &cli.base_url {
        client = client.with_base_url(base_url);
    }
    Ok(client)
}
