use clap::{ArgMatches, Command};
use terraviz::{Diagram, FilesystemIcons};

use crate::commands::{CommandResult, with_input_args};
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    with_input_args(Command::new("tree").about("Print the grouped resource tree"))
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let inputs = session.load_inputs(matches)?;
    let diagram = Diagram::build(&inputs.catalog, &inputs.config, &FilesystemIcons::new());
    Ok(CommandResult::Tree {
        descriptors: diagram.descriptors,
        diagnostics: diagram.diagnostics,
    })
}
