use crate::data_io::ScenarioData;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use fusioncore::telemetry::MetricsSnapshot;
use fusioncore::{FusionEngine, FusionOutput};

pub struct WorkflowResult {
    pub output: FusionOutput,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn execute(&self, data: &ScenarioData) -> anyhow::Result<WorkflowResult> {
        let engine =
            FusionEngine::new(self.config.fusion.clone()).context("building fusion engine")?;
        let output = engine
            .fuse(data.ground_truth.as_ref(), &data.sensors)
            .context("fusing sensor data")?;
        Ok(WorkflowResult {
            output,
            metrics: engine.metrics(),
        })
    }
}
