use serde::Serialize;

use leapgrid_core::domain::Quote;
use leapgrid_core::Symbol;

use crate::cli::{Cli, QuoteArgs};
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<Quote>,
}

pub async fn run(args: &QuoteArgs, cli: &Cli) -> Result<CommandResult, CliError> {
    let symbols = args
        .symbols
        .iter()
        .map(|raw| Symbol::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let client = super::build_client(cli)?;
    let fetched = client.equity_quotes(&symbols).await?;

    let mut warnings = Vec::new();
    for symbol in &symbols {
        if !fetched.contains_key(symbol.as_str()) {
            warnings.push(format!("no quote returned for {symbol}"));
        }
    }

    let data = serde_json::to_value(QuoteResponseData {
        quotes: fetched.into_values().collect(),
    })?;
    Ok(CommandResult::ok(data).with_warnings(warnings))
}
