use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dot::to_dot;
use crate::error::TerravizError;
use crate::materialize::Descriptor;

/// Output formats the writer can produce.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    Json,
    Dot,
    #[default]
    Png,
    Svg,
    Pdf,
}

impl DiagramFormat {
    pub const ALL: [DiagramFormat; 5] = [
        DiagramFormat::Json,
        DiagramFormat::Dot,
        DiagramFormat::Png,
        DiagramFormat::Svg,
        DiagramFormat::Pdf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            DiagramFormat::Json => "json",
            DiagramFormat::Dot => "dot",
            DiagramFormat::Png => "png",
            DiagramFormat::Svg => "svg",
            DiagramFormat::Pdf => "pdf",
        }
    }

    /// Whether producing this format requires the external Graphviz layout engine.
    pub fn needs_graphviz(self) -> bool {
        matches!(
            self,
            DiagramFormat::Png | DiagramFormat::Svg | DiagramFormat::Pdf
        )
    }
}

impl fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DiagramFormat {
    type Err = TerravizError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DiagramFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                TerravizError::Render(format!(
                    "unsupported output format '{value}' (expected json, dot, png, svg or pdf)"
                ))
            })
    }
}

/// Writes descriptors to disk in the requested format.
pub struct DiagramWriter {
    graphviz: PathBuf,
}

impl Default for DiagramWriter {
    fn default() -> Self {
        Self {
            graphviz: PathBuf::from("dot"),
        }
    }
}

impl DiagramWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific Graphviz `dot` executable for raster and vector formats.
    pub fn with_graphviz(program: impl Into<PathBuf>) -> Self {
        Self {
            graphviz: program.into(),
        }
    }

    /// Writes the diagram and returns the final path, whose extension always
    /// matches `format`.
    pub fn write(
        &self,
        descriptors: &[Descriptor],
        format: DiagramFormat,
        output: &Path,
    ) -> Result<PathBuf, TerravizError> {
        let target = output.with_extension(format.extension());
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match format {
            DiagramFormat::Json => {
                let body = serde_json::to_string_pretty(descriptors)?;
                fs::write(&target, body)?;
            }
            DiagramFormat::Dot => fs::write(&target, to_dot(descriptors)?)?,
            _ => self.run_graphviz(&to_dot(descriptors)?, format, &target)?,
        }

        tracing::debug!(path = %target.display(), %format, "wrote diagram");
        Ok(target)
    }

    fn run_graphviz(
        &self,
        dot: &str,
        format: DiagramFormat,
        target: &Path,
    ) -> Result<(), TerravizError> {
        let mut child = Command::new(&self.graphviz)
            .arg(format!("-T{}", format.extension()))
            .arg("-o")
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                TerravizError::Render(format!(
                    "failed to launch {}: {err}",
                    self.graphviz.display()
                ))
            })?;

        // Graphviz may exit before reading all of its input; its stderr explains why.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(dot.as_bytes()),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Err(err) = written {
            return Err(TerravizError::Render(format!(
                "{} stopped reading the diagram ({err}) and exited with {}: {}",
                self.graphviz.display(),
                output.status,
                stderr.trim()
            )));
        }
        if !output.status.success() {
            return Err(TerravizError::Render(format!(
                "{} exited with {}: {}",
                self.graphviz.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
