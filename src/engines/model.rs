//! Zero-dimensional energy-balance model
//!
//! Both bundled engines integrate the same physics; they differ in how they
//! are invoked and in how they package the trajectory into a
//! [`SimulationResult`](crate::result::SimulationResult).
//!
//! # State
//!
//! ```text
//! temperature ──▶ water vapor ──┐
//!      │                        ├─▶ forcing ─▶ temperature_eq ─▶ temperature
//!      ├──▶ ice cap ─▶ albedo ──┘
//!      ├──▶ deep ocean (heat + CO2 solubility)
//!      └──▶ weathering ─▶ CO2 ◀── anthro + volcanic - bio - ocean
//! ```

use thiserror::Error;

use crate::precision::MathProvider;
use crate::result::StepInternals;
use crate::scenario::{Configuration, Preset};

/// Integration steps per run, independent of the horizon
pub const INTERNAL_STEPS: usize = 1000;
/// Integration steps between two recorded samples
pub const RECORD_EVERY: usize = 10;
/// Recorded samples per run (including the initial state)
pub const SAMPLE_COUNT: usize = INTERNAL_STEPS / RECORD_EVERY + 1;

// ============================================================
// PHYSICS CONSTANTS
// ============================================================

pub const REF_TEMPERATURE: f64 = 14.0;
pub const REF_INSOLATION: f64 = 342.0;
pub const REF_ALBEDO: f64 = 0.33;
pub const REF_DISTANCE: f64 = 1.496e11;
pub const REF_OBLIQUITY: f64 = 23.45;
pub const PREINDUSTRIAL_CO2: f64 = 280.0;

/// K per W/m2
pub const SENSITIVITY: f64 = 0.8;
/// W/m2 per e-fold of CO2
pub const CO2_FORCING: f64 = 5.35;
pub const WATER_VAPOR_FORCING: f64 = 3.0;
pub const WATER_VAPOR_GAIN: f64 = 0.0698;
pub const WATER_VAPOR_MAX_RATIO: f64 = 5.0;
pub const OBLIQUITY_GAIN: f64 = 0.002;

pub const LAND_ALBEDO: f64 = 0.2;
pub const OCEAN_ALBEDO: f64 = 0.08;
pub const ICE_ALBEDO: f64 = 0.13;
pub const ICE_THRESHOLD: f64 = 14.0;
pub const ICE_WIDTH: f64 = 1.5;
pub const ICE_TAU: f64 = 3000.0;

pub const MIXED_LAYER_TAU: f64 = 50.0;
pub const MIXED_LAYER_TAU_NO_OCEAN: f64 = 5.0;
pub const DEEP_OCEAN_TAU: f64 = 1000.0;
pub const OCEAN_COUPLING: f64 = 0.3;
pub const SOLUBILITY_GAIN: f64 = 0.04;

pub const GTC_PER_PPM: f64 = 2.12;
pub const WEATHERING_RATE: f64 = 0.083;
pub const WEATHERING_TEMP_GAIN: f64 = 0.05;
pub const BIO_SINK_RATE: f64 = 0.02;
pub const OCEAN_SINK_RATE: f64 = 0.05;
pub const MIN_CO2: f64 = 10.0;
pub const MAX_CO2: f64 = 100_000.0;

/// Sea level per K of deep-ocean warming, m
pub const THERMAL_EXPANSION: f64 = 0.3;
/// Sea level for a fully melted ice cap, m
pub const ICE_MELT_SEA_LEVEL: f64 = 70.0;

/// Named physics constants, for engines that publish their table
pub const PHYSICS_TABLE: &[(&str, f64)] = &[
    ("sensitivity", SENSITIVITY),
    ("co2_forcing", CO2_FORCING),
    ("water_vapor_forcing", WATER_VAPOR_FORCING),
    ("water_vapor_gain", WATER_VAPOR_GAIN),
    ("ice_threshold", ICE_THRESHOLD),
    ("ice_width", ICE_WIDTH),
    ("ice_tau", ICE_TAU),
    ("mixed_layer_tau", MIXED_LAYER_TAU),
    ("deep_ocean_tau", DEEP_OCEAN_TAU),
    ("gtc_per_ppm", GTC_PER_PPM),
    ("weathering_rate", WEATHERING_RATE),
    ("bio_sink_rate", BIO_SINK_RATE),
    ("ocean_sink_rate", OCEAN_SINK_RATE),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid simulation duration: {0} years")]
    InvalidDuration(f64),
}

// ============================================================
// INITIAL STATE
// ============================================================

/// Preset-dependent starting point of the state vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialState {
    pub temperature: f64,
    pub ice: f64,
}

impl InitialState {
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::PreIndustrial1750 => Self {
                temperature: 13.6,
                ice: 1.0,
            },
            Preset::ActualPresentDay => Self {
                temperature: 14.4,
                ice: 0.97,
            },
        }
    }
}

/// One recorded point of the trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub year: f64,
    pub temperature: f64,
    pub ocean_temperature: f64,
    pub co2: f64,
    pub ice: f64,
    pub albedo: f64,
    /// Anthropogenic + volcanic emissions, GtC/yr
    pub emissions: f64,
    pub bio_storage: f64,
}

impl Sample {
    /// Sea level relative to the initial state
    pub fn sea_level(&self, initial: &InitialState) -> f64 {
        THERMAL_EXPANSION * (self.ocean_temperature - initial.temperature)
            + ICE_MELT_SEA_LEVEL * (initial.ice - self.ice)
    }
}

/// Integrated run
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub initial: InitialState,
    pub start_year: f64,
    pub years: f64,
    /// Integration step, years
    pub time_step: f64,
    pub samples: Vec<Sample>,
    /// Intermediates of the first integration step
    pub first_internals: StepInternals,
}

impl Trajectory {
    pub fn last(&self) -> &Sample {
        // samples always holds SAMPLE_COUNT entries
        &self.samples[self.samples.len() - 1]
    }

    /// Years between two samples
    pub fn resolution(&self) -> f64 {
        self.time_step * RECORD_EVERY as f64
    }

    pub fn mean_temperature(&self) -> f64 {
        let sum: f64 = self.samples.iter().map(|s| s.temperature).sum();
        sum / self.samples.len() as f64
    }
}

// ============================================================
// INTEGRATION
// ============================================================

#[inline]
fn relax(dt: f64, tau: f64) -> f64 {
    (dt / tau).min(1.0)
}

struct State {
    temperature: f64,
    ocean_temperature: f64,
    co2: f64,
    ice: f64,
    albedo: f64,
    bio_storage: f64,
}

impl State {
    fn sample(&self, year: f64, emissions: f64) -> Sample {
        Sample {
            year,
            temperature: self.temperature,
            ocean_temperature: self.ocean_temperature,
            co2: self.co2,
            ice: self.ice,
            albedo: self.albedo,
            emissions,
            bio_storage: self.bio_storage,
        }
    }
}

fn planetary_albedo(config: &Configuration, ice: f64) -> (f64, f64, f64, f64) {
    let albedo_land = LAND_ALBEDO;
    let albedo_ocean = OCEAN_ALBEDO * (1.0 - ice);
    let albedo_ice = ICE_ALBEDO * ice;
    let albedo = if config.fixed_albedo {
        config.albedo_value / 100.0
    } else {
        albedo_land + albedo_ocean + albedo_ice
    };
    (albedo, albedo_land, albedo_ocean, albedo_ice)
}

fn step(
    state: &mut State,
    config: &Configuration,
    dt: f64,
    math: &dyn MathProvider,
) -> StepInternals {
    // Radiation
    let orbital = 1.0
        + config.eccentricity_value * math.cos(config.precession_value.to_radians())
        + OBLIQUITY_GAIN * (config.obliquity_value - REF_OBLIQUITY);
    let distance_ratio = REF_DISTANCE / config.distance_ts_value;
    let insolation = config.solar_power_value / 4.0 * distance_ratio * distance_ratio * orbital;

    // Ice cap and albedo
    let ice_fraction =
        1.0 / (1.0 + math.exp((state.temperature - ICE_THRESHOLD) / ICE_WIDTH));
    state.ice += relax(dt, ICE_TAU) * (ice_fraction - state.ice);
    let (albedo, albedo_land, albedo_ocean, albedo_ice) = planetary_albedo(config, state.ice);
    state.albedo = albedo;

    // Forcing
    let water_vapor_ratio = if config.fixed_water_vapor {
        config.water_vapor_value / 100.0
    } else {
        math.exp(WATER_VAPOR_GAIN * (state.temperature - REF_TEMPERATURE))
            .min(WATER_VAPOR_MAX_RATIO)
    };
    let forcing_co2 = CO2_FORCING * math.ln(state.co2 / PREINDUSTRIAL_CO2);
    let forcing_water_vapor = WATER_VAPOR_FORCING * (water_vapor_ratio - 1.0);
    let forcing_albedo = -insolation * (albedo - REF_ALBEDO);
    let forcing_solar = (1.0 - REF_ALBEDO) * (insolation - REF_INSOLATION);
    let forcing_total = forcing_co2 + forcing_water_vapor + forcing_albedo + forcing_solar;
    let temperature_eq = REF_TEMPERATURE + SENSITIVITY * forcing_total;

    // Ocean heat
    let ocean_uptake = if config.disable_ocean {
        0.0
    } else {
        OCEAN_COUPLING * (state.temperature - state.ocean_temperature)
    };
    if !config.disable_ocean && !config.fixed_ocean {
        state.ocean_temperature +=
            relax(dt, DEEP_OCEAN_TAU) * (state.temperature - state.ocean_temperature);
    }
    let tau = if config.disable_ocean {
        MIXED_LAYER_TAU_NO_OCEAN
    } else {
        MIXED_LAYER_TAU
    };
    state.temperature += relax(dt, tau) * (temperature_eq - ocean_uptake - state.temperature);

    // Carbon
    let excess = state.co2 - PREINDUSTRIAL_CO2;
    let co2_anthro = config.anthro_emission_value;
    let co2_volcanic = config.volcanic_value;
    let co2_weathering = config.weathering_value / 100.0
        * WEATHERING_RATE
        * math.exp(WEATHERING_TEMP_GAIN * (state.temperature - REF_TEMPERATURE))
        * state.co2
        / PREINDUSTRIAL_CO2;
    let bio_sink = if config.disable_biology {
        0.0
    } else {
        config.bio_sink_value / 100.0 * BIO_SINK_RATE * excess
    };
    let ocean_solubility =
        math.exp(-SOLUBILITY_GAIN * (state.ocean_temperature - REF_TEMPERATURE));
    let co2_ocean_flux = if config.disable_ocean {
        0.0
    } else {
        config.ocean_sink_value / 100.0 * OCEAN_SINK_RATE * excess * ocean_solubility
    };
    state.bio_storage += bio_sink * dt * config.bio_storage_value / 100.0;
    if !config.fixed_concentration {
        let net = co2_anthro + co2_volcanic - co2_weathering - bio_sink - co2_ocean_flux;
        state.co2 = (state.co2 + net * dt / GTC_PER_PPM).clamp(MIN_CO2, MAX_CO2);
    }

    StepInternals {
        forcing_co2,
        forcing_water_vapor,
        forcing_albedo,
        forcing_solar,
        forcing_total,
        temperature_eq,
        insolation,
        albedo_land,
        albedo_ocean,
        albedo_ice,
        ice_fraction,
        ocean_uptake,
        ocean_solubility,
        bio_sink,
        bio_storage: state.bio_storage,
        co2_weathering,
        co2_volcanic,
        co2_anthro,
        co2_ocean_flux,
        water_vapor_ratio,
    }
}

/// Integrate `years` of model time from the configuration's preset state.
pub fn simulate(
    config: &Configuration,
    years: f64,
    math: &dyn MathProvider,
) -> Result<Trajectory, ModelError> {
    if !years.is_finite() || years <= 0.0 {
        return Err(ModelError::InvalidDuration(years));
    }

    let initial = InitialState::for_preset(config.preset);
    let dt = years / INTERNAL_STEPS as f64;
    let emissions = config.anthro_emission_value + config.volcanic_value;

    let mut state = State {
        temperature: initial.temperature,
        ocean_temperature: initial.temperature,
        co2: config.concentration_value,
        ice: initial.ice,
        albedo: planetary_albedo(config, initial.ice).0,
        bio_storage: 0.0,
    };

    let mut samples = Vec::with_capacity(SAMPLE_COUNT);
    samples.push(state.sample(config.start_year, emissions));

    let mut first_internals = StepInternals::default();
    for i in 1..=INTERNAL_STEPS {
        let internals = step(&mut state, config, dt, math);
        if i == 1 {
            first_internals = internals;
        }
        if i % RECORD_EVERY == 0 {
            let year = config.start_year + i as f64 * dt;
            samples.push(state.sample(year, emissions));
        }
    }

    Ok(Trajectory {
        initial,
        start_year: config.start_year,
        years,
        time_step: dt,
        samples,
        first_internals,
    })
}
