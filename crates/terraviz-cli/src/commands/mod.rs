use clap::{Arg, Command};
use serde::Serialize;
use terraviz::{Descriptor, DiagramFormat, Diagnostics};

use crate::context::DEFAULT_CONFIG;
use crate::error::ExitStatus;

pub mod check;
pub mod render;
pub mod schema;
pub mod tree;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    Rendered {
        output: String,
        format: DiagramFormat,
        resources: usize,
        diagnostics: Diagnostics,
    },
    Checked {
        plan: String,
        config: String,
        resources: usize,
        diagnostics: Diagnostics,
    },
    Tree {
        descriptors: Vec<Descriptor>,
        diagnostics: Diagnostics,
    },
    Schema {
        schema: serde_json::Value,
    },
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            CommandResult::Checked { diagnostics, .. } if !diagnostics.is_empty() => {
                ExitStatus::Data
            }
            _ => ExitStatus::Ok,
        }
    }
}

/// Adds the `--file`/`--config` pair shared by every command that reads a plan.
pub(crate) fn with_input_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("file")
                .long("file")
                .value_name("PLAN")
                .required(true)
                .help("Path to the Terraform plan JSON file (terraform show -json)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .default_value(DEFAULT_CONFIG)
                .help("Path to the grouping configuration (.hcl, or .json for the JSON syntax)"),
        )
}
