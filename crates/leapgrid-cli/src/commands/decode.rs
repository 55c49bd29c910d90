use serde::Serialize;

use leapgrid_core::occ::OccSymbol;

use crate::cli::DecodeArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct DecodedOcc {
    code: String,
    root: String,
    expiry: String,
    #[serde(rename = "type")]
    right: &'static str,
    strike: f64,
}

#[derive(Debug, Serialize)]
struct DecodeResponseData {
    contracts: Vec<DecodedOcc>,
}

pub fn run(args: &DecodeArgs) -> Result<CommandResult, CliError> {
    let mut contracts = Vec::new();
    let mut warnings = Vec::new();

    for code in &args.codes {
        match OccSymbol::parse(code) {
            Ok(occ) => contracts.push(DecodedOcc {
                code: occ.as_str().to_owned(),
                root: occ.root().as_str().to_owned(),
                expiry: occ.expiry_iso(),
                right: occ.right().label(),
                strike: occ.strike(),
            }),
            Err(error) => warnings.push(format!("{code}: {error}")),
        }
    }

    let data = serde_json::to_value(DecodeResponseData { contracts })?;
    Ok(CommandResult::ok(data).with_warnings(warnings))
}
