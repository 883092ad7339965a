use anyhow::Context;
use fusioncore::config::FusionConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::scenario::ScenarioConfig;

/// Where recorded tables live on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub ground_truth: Option<PathBuf>,
    /// Sensor kind -> JSON record file.
    pub sensors: BTreeMap<String, PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub fusion: FusionConfig,
    /// Recorded inputs; the synthetic scenario is used when absent.
    pub inputs: Option<InputPaths>,
    pub output_dir: Option<PathBuf>,
    pub scenario: ScenarioConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .fusion
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Built-in sensor kinds over a synthetic scenario.
    pub fn from_args(duration_secs: f64, rate_hz: f64, seed: u64) -> Self {
        Self {
            scenario: ScenarioConfig {
                duration_secs,
                rate_hz,
                seed,
                ..ScenarioConfig::default()
            },
            ..Self::default()
        }
    }
}
