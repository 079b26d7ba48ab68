use std::process::ExitCode;

use serde_json::json;
use terraviz::{Descriptor, Diagnostics};

use crate::commands::CommandResult;
use crate::error::CliError;

pub enum OutputFormat {
    Text,
    Json,
}

/// Renders a `CommandResult` as human-readable text or a single JSON line and
/// converts the outcome into its exit code.
pub fn emit_result(result: CommandResult, format: OutputFormat) -> Result<ExitCode, CliError> {
    match format {
        OutputFormat::Text => print_text(&result)?,
        OutputFormat::Json => print_json(&result)?,
    };
    Ok(ExitCode::from(result.exit_status().code()))
}

fn print_text(result: &CommandResult) -> Result<(), CliError> {
    match result {
        CommandResult::Rendered {
            output,
            format,
            resources,
            diagnostics,
        } => {
            println!("Diagram generated successfully: {output} ({format})");
            println!(
                "  {resources} resource(s), {} diagnostic(s)",
                diagnostics.len()
            );
            print_diagnostics(diagnostics);
        }
        CommandResult::Checked {
            plan,
            config,
            resources,
            diagnostics,
        } => {
            if diagnostics.is_empty() {
                println!("Check OK: {resources} resource(s) grouped ({plan} with {config})");
            } else {
                println!(
                    "Check FAIL: {} diagnostic(s) across {resources} resource(s) ({plan} with {config})",
                    diagnostics.len()
                );
                print_diagnostics(diagnostics);
            }
        }
        CommandResult::Tree {
            descriptors,
            diagnostics,
        } => {
            println!("Diagram tree ({} top-level node(s))", descriptors.len());
            render_children(descriptors, "");
            if !diagnostics.is_empty() {
                println!("{} diagnostic(s):", diagnostics.len());
                print_diagnostics(diagnostics);
            }
        }
        CommandResult::Schema { schema } => {
            println!("{}", serde_json::to_string_pretty(schema)?);
        }
    }
    Ok(())
}

fn print_json(result: &CommandResult) -> Result<(), CliError> {
    let payload = json!(result);
    println!("{payload}");
    Ok(())
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        println!("  - {diagnostic}");
    }
}

fn render_children(children: &[Descriptor], prefix: &str) {
    for (index, child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let connector = if last { "└──" } else { "├──" };
        println!("{prefix}{connector} {}", descriptor_label(child));
        if child.is_group() {
            let next = format!("{prefix}{}", if last { "    " } else { "│   " });
            render_children(child.children(), &next);
        }
    }
}

fn descriptor_label(descriptor: &Descriptor) -> String {
    match descriptor {
        Descriptor::Group { label, .. } => format!("[{label}]"),
        Descriptor::Leaf {
            address,
            primary_label,
            secondary_label,
            ..
        } => format!("{primary_label}: {secondary_label} ({address})"),
    }
}
