use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use crate::commands;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::formatter::{OutputFormat, emit_result};
use crate::util::Verbosity;

const NAME: &str = "terraviz";

pub fn run() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    init_tracing(args.iter().any(|arg| arg == "--verbose"));
    match run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            err.print();
            err.exit_code()
        }
    }
}

/// Parses arguments, dispatches the selected command and returns a
/// `sysexits`-compatible exit code.
pub fn run_cli<I, S>(args: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let command = build_cli();
    let matches = command.try_get_matches_from(args)?;

    let verbosity = Verbosity {
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    };
    let output = if verbosity.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let session = CliSession::bootstrap(verbosity);
    let result = dispatch(&session, &matches)?;
    emit_result(result, output)
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    Command::new(NAME)
        .about("Generate grouped infrastructure diagrams from Terraform plans")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit a JSON result line instead of human-readable text."),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log resolved inputs and grouping passes to stderr."),
        )
        .subcommand_required(true)
        .subcommand(commands::render::command())
        .subcommand(commands::check::command())
        .subcommand(commands::tree::command())
        .subcommand(commands::schema::command())
}

fn dispatch(
    session: &CliSession,
    matches: &ArgMatches,
) -> Result<commands::CommandResult, CliError> {
    match matches.subcommand() {
        Some(("render", sub)) => commands::render::run(session, sub),
        Some(("check", sub)) => commands::check::run(session, sub),
        Some(("tree", sub)) => commands::tree::run(session, sub),
        Some(("schema", sub)) => commands::schema::run(session, sub),
        _ => Err(CliError::new("missing command", ExitStatus::Usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn render_defaults_to_png() {
        let matches = build_cli()
            .try_get_matches_from(["terraviz", "render"])
            .unwrap();
        let (_, render) = matches.subcommand().unwrap();
        assert_eq!(render.get_one::<String>("format").unwrap(), "png");
        assert_eq!(
            render.get_one::<String>("output").unwrap(),
            "terraform_diagram"
        );
    }

    #[test]
    fn unknown_format_is_a_usage_error() {
        let err = run_cli(["terraviz", "render", "--file", "plan.json", "--format", "gif"])
            .unwrap_err();
        assert_eq!(err.status(), ExitStatus::Usage);
    }
}
