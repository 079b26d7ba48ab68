use std::path::{Path, PathBuf};

use crate::error::{CliError, ExitStatus};

#[derive(Clone, Copy, Debug, Default)]
pub struct Verbosity {
    pub json: bool,
    pub verbose: bool,
}

/// Checks that an input file exists before anything tries to parse it.
pub fn require_input(value: &str, kind: &str) -> Result<PathBuf, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CliError::new(
            format!("{kind} path must not be empty"),
            ExitStatus::Usage,
        ));
    }

    let path = Path::new(trimmed);
    if !path.is_file() {
        return Err(CliError::new(
            format!("{kind} file not found: {trimmed}"),
            ExitStatus::NoInput,
        ));
    }
    Ok(path.to_path_buf())
}
