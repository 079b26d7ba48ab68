use clap::{ArgMatches, Command};
use schemars::schema_for;
use terraviz::Descriptor;

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("schema").about("Print the JSON Schema of the descriptor tree written by --format json")
}

pub fn run(_session: &CliSession, _matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let schema = serde_json::to_value(schema_for!(Vec<Descriptor>))?;
    Ok(CommandResult::Schema { schema })
}
