use std::path::PathBuf;

use clap::ArgMatches;
use terraviz::{ResourceCatalog, TypeConfigTable, load_config, load_plan};

use crate::error::{CliError, ExitStatus};
use crate::util::{self, Verbosity};

pub const DEFAULT_CONFIG: &str = "terravisualizer.hcl";

pub struct CliSession {
    pub verbosity: Verbosity,
}

/// Plan catalog and type configuration loaded for one command.
pub struct Inputs {
    pub plan_path: PathBuf,
    pub config_path: PathBuf,
    pub catalog: ResourceCatalog,
    pub config: TypeConfigTable,
}

impl CliSession {
    pub fn bootstrap(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Resolves `--file` and `--config`, then loads both. Missing files are
    /// reported before any parsing happens.
    pub fn load_inputs(&self, matches: &ArgMatches) -> Result<Inputs, CliError> {
        let plan = matches
            .get_one::<String>("file")
            .ok_or_else(|| CliError::new("--file is required", ExitStatus::Usage))?;
        let config = matches
            .get_one::<String>("config")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG);

        let plan_path = util::require_input(plan, "Terraform plan")?;
        let config_path = util::require_input(config, "Configuration")?;

        let config = load_config(&config_path)?;
        let catalog = load_plan(&plan_path)?;

        if self.verbosity.verbose {
            tracing::info!(
                plan = %plan_path.display(),
                config = %config_path.display(),
                resources = catalog.len(),
                configured_types = config.len(),
                "loaded inputs"
            );
        }

        Ok(Inputs {
            plan_path,
            config_path,
            catalog,
            config,
        })
    }
}
