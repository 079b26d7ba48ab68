use std::process::ExitCode;

fn main() -> ExitCode {
    terraviz_cli::run()
}
