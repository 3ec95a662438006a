//! TOML tuning file accepted through `--config`.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use restraint_system_dispatcher::DispatchTuning;
use restraint_system_potential_field::FieldTuning;
use serde::Deserialize;

/// Tuning shared by both sides of a match.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Shape of the potential field.
    pub(crate) field: FieldTuning,
    /// Task assignment and local override knobs.
    pub(crate) dispatch: DispatchTuning,
}

impl Config {
    /// Reads and parses a tuning file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parses tuning from TOML text; missing keys keep their defaults.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse tuning toml contents")
    }
}
