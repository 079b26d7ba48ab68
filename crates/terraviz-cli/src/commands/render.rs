use std::path::Path;

use clap::{Arg, ArgMatches, Command};
use terraviz::{Diagram, DiagramFormat, DiagramWriter, FilesystemIcons};

use crate::commands::{CommandResult, with_input_args};
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

const DEFAULT_OUTPUT: &str = "terraform_diagram";

pub fn command() -> Command {
    with_input_args(Command::new("render").about("Group plan resources and write a diagram"))
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("PATH")
                .default_value(DEFAULT_OUTPUT)
                .help("Output file; the extension is replaced to match --format"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .value_parser(["json", "dot", "png", "svg", "pdf"])
                .default_value("png")
                .help("Output format; png, svg and pdf need Graphviz `dot` on PATH, json and dot do not"),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let format = match matches.get_one::<String>("format") {
        Some(value) => value
            .parse::<DiagramFormat>()
            .map_err(|err| CliError::new(err.to_string(), ExitStatus::Usage))?,
        None => DiagramFormat::default(),
    };
    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(DEFAULT_OUTPUT);

    let inputs = session.load_inputs(matches)?;
    let diagram = Diagram::build(&inputs.catalog, &inputs.config, &FilesystemIcons::new());
    let written = DiagramWriter::new().write(&diagram.descriptors, format, Path::new(output))?;

    Ok(CommandResult::Rendered {
        output: written.display().to_string(),
        format,
        resources: diagram.resources,
        diagnostics: diagram.diagnostics,
    })
}
