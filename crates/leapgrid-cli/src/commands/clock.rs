use serde_json::json;

use crate::cli::Cli;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let client = super::build_client(cli)?;

    match client.market_clock().await {
        Some(state) => Ok(CommandResult::ok(json!({ "state": state.as_str() }))),
        None => Ok(CommandResult::ok(json!({ "state": null }))
            .with_warnings(vec![String::from("market clock state unavailable")])),
    }
}
