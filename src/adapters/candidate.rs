//! Candidate Adapter
//!
//! Drives the synchronous object-model engine: preset initialiser, field
//! overrides, duration parameter, `model_execute`. The call completes before
//! the returned future is first polled to completion; there is no await point.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AsyncExecutable, EngineKind};
use crate::engines::{CandidateModel, ExperienceValues, SimulationValues};
use crate::error::HarnessError;
use crate::precision::{MathProvider, PrecisionReconciler};
use crate::result::SimulationResult;
use crate::scenario::{Configuration, Preset};

pub struct CandidateAdapter {
    model: CandidateModel,
}

impl CandidateAdapter {
    /// Adapter using the process-wide provider selected by
    /// [`PrecisionReconciler`]. Install the reconciler first.
    pub fn new() -> Self {
        if !PrecisionReconciler::is_installed() {
            warn!("Candidate adapter built before precision reconciliation; using native exp");
        }
        Self::with_math(PrecisionReconciler::provider())
    }

    /// Adapter with an explicit math provider
    pub fn with_math(math: &'static dyn MathProvider) -> Self {
        Self {
            model: CandidateModel::new(math),
        }
    }

    pub fn math(&self) -> &'static dyn MathProvider {
        self.model.math()
    }

    fn prepare(config: &Configuration) -> Result<SimulationValues, HarnessError> {
        let mut sv = SimulationValues::new();
        match config.preset {
            Preset::PreIndustrial1750 => sv.create_1750_state(),
            Preset::ActualPresentDay => sv.create_actual_state(),
        }

        let props = sv.properties_mut().ok_or_else(|| {
            HarnessError::EngineReported("candidate state not initialised".to_string())
        })?;
        for key in Configuration::field_names() {
            if let Some(value) = config.get(key) {
                props.set(key, value)?;
            }
        }
        Ok(sv)
    }
}

impl Default for CandidateAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncExecutable for CandidateAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::Candidate
    }

    async fn execute(
        &self,
        config: &Configuration,
        years: f64,
    ) -> Result<SimulationResult, HarnessError> {
        let sv = Self::prepare(config)?;
        let ev = ExperienceValues::new(years);

        debug!(
            preset = %config.preset,
            years = years,
            math = self.model.math().name(),
            "Candidate execute"
        );

        self.model
            .model_execute(&sv, &ev)
            .map_err(|e| HarnessError::EngineReported(e.to_string()))
    }
}
