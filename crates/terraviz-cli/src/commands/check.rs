use clap::{ArgMatches, Command};
use terraviz::group_resources;

use crate::commands::{CommandResult, with_input_args};
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    with_input_args(
        Command::new("check")
            .about("Run grouping without rendering and report diagnostics (exit 65 if any)"),
    )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let inputs = session.load_inputs(matches)?;
    let outcome = group_resources(&inputs.catalog, &inputs.config);

    Ok(CommandResult::Checked {
        plan: inputs.plan_path.display().to_string(),
        config: inputs.config_path.display().to_string(),
        resources: inputs.catalog.len(),
        diagnostics: outcome.diagnostics,
    })
}
