pub mod defaults;

use crate::cli::{CommonArgs, last_frame_bound};
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use pbcwrap::engine::config::{self as core_config, Compound, Mode, ReferenceAtoms};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialWrapSection {
    compound: Option<Compound>,
    refatoms: Option<ReferenceAtoms>,
    selection: Option<String>,
    center: Option<String>,
    first: Option<usize>,
    last: Option<i64>,
}

/// The `[wrap]` table of a TOML config file, with every key optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialWrapConfig {
    wrap: Option<PartialWrapSection>,
}

impl PartialWrapConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Combines file values, `--set` overrides and command-line flags into a [`core_config::WrapConfig`].
    ///
    /// Command-line flags win over `--set`, which wins over the file, which wins over
    /// [`DefaultsConfig`].
    pub fn merge_with_cli(
        mut self,
        mode: Mode,
        args: &CommonArgs,
        center: Option<&String>,
    ) -> Result<core_config::WrapConfig> {
        self.apply_set_values(&args.set_values)?;
        let file = self.wrap.take().unwrap_or_default();
        let defaults = DefaultsConfig::default();

        let center = center.cloned().or(file.center);
        let last = match args.last.or(file.last) {
            Some(last) => last_frame_bound(last)?,
            None => None,
        };

        core_config::WrapConfigBuilder::new()
            .mode(mode)
            .compound(args.compound.or(file.compound).unwrap_or(defaults.compound))
            .reference_atoms(
                args.refatoms
                    .or(file.refatoms)
                    .unwrap_or(defaults.reference_atoms),
            )
            .selection(
                args.selection
                    .clone()
                    .or(file.selection)
                    .unwrap_or(defaults.selection),
            )
            .center(center)
            .first_frame(args.first.or(file.first).unwrap_or(defaults.first_frame))
            .last_frame(last)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let section = self.wrap.get_or_insert_with(Default::default);
            let invalid = |kind: &str| {
                CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
            };

            match key {
                "wrap.compound" => {
                    section.compound =
                        Some(value_str.parse().map_err(|e: core_config::ConfigError| {
                            CliError::Config(e.to_string())
                        })?);
                }
                "wrap.refatoms" => {
                    section.refatoms =
                        Some(value_str.parse().map_err(|e: core_config::ConfigError| {
                            CliError::Config(e.to_string())
                        })?);
                }
                "wrap.selection" => section.selection = Some(value_str.to_string()),
                "wrap.center" => section.center = Some(value_str.to_string()),
                "wrap.first" => {
                    section.first = Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                "wrap.last" => {
                    section.last = Some(value_str.parse().map_err(|_| invalid("integer"))?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
