//! Candidate Engine
//!
//! Synchronous stateful-object API:
//!
//! ```rust,ignore
//! let mut sv = SimulationValues::new();
//! sv.create_1750_state();          // or create_actual_state()
//! sv.fixed_albedo = true;          // tweak before executing
//! sv.albedo_value = 33.0;
//! let ev = ExperienceValues::new(10_000.0);
//! let result = CandidateModel::new(math).model_execute(&sv, &ev)?;
//! ```

use std::collections::BTreeMap;
use thiserror::Error;

use super::model::{self, Trajectory, PHYSICS_TABLE, RECORD_EVERY, SAMPLE_COUNT};
use crate::precision::MathProvider;
use crate::result::{SimulationResult, StepRecord, TimeSeries};
use crate::scenario::{Configuration, Preset};

pub const CANDIDATE_NAME: &str = "simclimat-candidate";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CandidateError {
    #[error("simulation values not initialised: call create_1750_state() or create_actual_state()")]
    NotInitialised,

    #[error(transparent)]
    Model(#[from] model::ModelError),
}

/// Mutable simulation state, populated by a preset initialiser
#[derive(Debug, Clone, Default)]
pub struct SimulationValues {
    state: Option<Configuration>,
}

impl SimulationValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_1750_state(&mut self) {
        self.state = Some(Configuration::preset(Preset::PreIndustrial1750));
    }

    pub fn create_actual_state(&mut self) {
        self.state = Some(Configuration::preset(Preset::ActualPresentDay));
    }

    pub fn is_initialised(&self) -> bool {
        self.state.is_some()
    }

    /// Mutable access to the properties, `None` before a preset initialiser ran
    pub fn properties_mut(&mut self) -> Option<&mut Configuration> {
        self.state.as_mut()
    }

    pub fn properties(&self) -> Option<&Configuration> {
        self.state.as_ref()
    }
}

/// Duration parameter of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperienceValues {
    pub years: f64,
}

impl ExperienceValues {
    pub fn new(years: f64) -> Self {
        Self { years }
    }
}

/// Candidate model entry point
#[derive(Debug, Clone, Copy)]
pub struct CandidateModel {
    math: &'static dyn MathProvider,
}

impl CandidateModel {
    pub fn new(math: &'static dyn MathProvider) -> Self {
        Self { math }
    }

    pub fn math(&self) -> &'static dyn MathProvider {
        self.math
    }

    /// Run the model to completion on the calling thread
    pub fn model_execute(
        &self,
        sv: &SimulationValues,
        ev: &ExperienceValues,
    ) -> Result<SimulationResult, CandidateError> {
        let config = sv.properties().ok_or(CandidateError::NotInitialised)?;
        let trajectory = model::simulate(config, ev.years, self.math)?;
        Ok(package(&trajectory))
    }
}

fn series(trajectory: &Trajectory, value: impl Fn(&model::Sample) -> f64) -> TimeSeries {
    let mut steps: Vec<StepRecord> = trajectory
        .samples
        .iter()
        .map(|s| StepRecord::new(s.year, value(s)))
        .collect();
    if let Some(first) = steps.first_mut() {
        first.internals = Some(trajectory.first_internals);
    }
    TimeSeries {
        resolution: trajectory.resolution(),
        index_min: 0,
        index_max: SAMPLE_COUNT - 1,
        steps,
    }
}

fn package(trajectory: &Trajectory) -> SimulationResult {
    let initial = trajectory.initial;
    let last = trajectory.last();

    let physics_constants: BTreeMap<String, f64> = PHYSICS_TABLE
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    let variable_constants = BTreeMap::from([
        ("dt".to_string(), trajectory.time_step),
        ("record_every".to_string(), RECORD_EVERY as f64),
        ("samples".to_string(), SAMPLE_COUNT as f64),
    ]);

    SimulationResult {
        name: CANDIDATE_NAME.to_string(),
        start_year: trajectory.start_year,
        end_year: trajectory.start_year + trajectory.years,
        final_temperature: last.temperature,
        final_co2: last.co2,
        final_sea_level: last.sea_level(&initial),
        final_albedo: last.albedo,
        mean_temperature: trajectory.mean_temperature(),
        index_min: 0,
        index_max: SAMPLE_COUNT - 1,
        time_step: trajectory.time_step,
        deadline: trajectory.start_year + trajectory.years,
        physics_constants,
        variable_constants,
        temperature: series(trajectory, |s| s.temperature),
        sea_level: series(trajectory, |s| s.sea_level(&initial)),
        albedo: series(trajectory, |s| s.albedo * 100.0),
        co2_emissions: series(trajectory, |s| s.emissions),
        co2_concentration: series(trajectory, |s| s.co2),
        ice_cap: series(trajectory, |s| s.ice),
    }
}
