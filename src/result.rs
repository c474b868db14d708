//! SimulationResult - what an engine returns for one Configuration
//!
//! Summary scalars, internal bookkeeping and six named time series. Raw
//! results are never mutated; normalization works on a serialized copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-engine result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Engine identity
    pub name: String,

    // Summary
    pub start_year: f64,
    pub end_year: f64,
    pub final_temperature: f64,
    pub final_co2: f64,
    pub final_sea_level: f64,
    pub final_albedo: f64,
    pub mean_temperature: f64,

    // Internal bookkeeping
    pub index_min: usize,
    pub index_max: usize,
    /// Integration step in years
    pub time_step: f64,
    pub deadline: f64,
    pub physics_constants: BTreeMap<String, f64>,
    pub variable_constants: BTreeMap<String, f64>,

    // Series
    pub temperature: TimeSeries,
    pub sea_level: TimeSeries,
    pub albedo: TimeSeries,
    pub co2_emissions: TimeSeries,
    pub co2_concentration: TimeSeries,
    pub ice_cap: TimeSeries,
}

impl SimulationResult {
    /// Names of the series fields, in declaration order
    pub const SERIES: [&'static str; 6] = [
        "temperature",
        "sea_level",
        "albedo",
        "co2_emissions",
        "co2_concentration",
        "ice_cap",
    ];

    pub fn series(&self) -> [(&'static str, &TimeSeries); 6] {
        [
            ("temperature", &self.temperature),
            ("sea_level", &self.sea_level),
            ("albedo", &self.albedo),
            ("co2_emissions", &self.co2_emissions),
            ("co2_concentration", &self.co2_concentration),
            ("ice_cap", &self.ice_cap),
        ]
    }
}

/// One named time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Years between two records
    pub resolution: f64,
    pub index_min: usize,
    pub index_max: usize,
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub year: f64,
    pub value: f64,
    /// Only present on the first record of a series
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub internals: Option<StepInternals>,
}

impl StepRecord {
    pub fn new(year: f64, value: f64) -> Self {
        Self {
            year,
            value,
            internals: None,
        }
    }
}

/// Intermediate quantities of the first integration step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepInternals {
    pub forcing_co2: f64,
    pub forcing_water_vapor: f64,
    pub forcing_albedo: f64,
    pub forcing_solar: f64,
    pub forcing_total: f64,
    pub temperature_eq: f64,
    pub insolation: f64,
    pub albedo_land: f64,
    pub albedo_ocean: f64,
    pub albedo_ice: f64,
    pub ice_fraction: f64,
    pub ocean_uptake: f64,
    pub ocean_solubility: f64,
    pub bio_sink: f64,
    pub bio_storage: f64,
    pub co2_weathering: f64,
    pub co2_volcanic: f64,
    pub co2_anthro: f64,
    pub co2_ocean_flux: f64,
    pub water_vapor_ratio: f64,
}
