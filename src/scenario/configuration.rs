//! Configuration - the tunable surface of the simulated climate system
//!
//! A flat record of feedback toggles and numeric tunables. The same value is
//! handed, unmodified, to both engines.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HarnessError;

/// Named canonical starting point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    PreIndustrial1750,
    ActualPresentDay,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::PreIndustrial1750 => "PreIndustrial1750",
            Preset::ActualPresentDay => "ActualPresentDay",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a documented field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Toggle,
    Number,
}

/// Value carried by an override
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Bool(bool),
    Number(f64),
}

impl OverrideValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            OverrideValue::Bool(_) => FieldKind::Toggle,
            OverrideValue::Number(_) => FieldKind::Number,
        }
    }
}

impl From<bool> for OverrideValue {
    fn from(v: bool) -> Self {
        OverrideValue::Bool(v)
    }
}

impl From<f64> for OverrideValue {
    fn from(v: f64) -> Self {
        OverrideValue::Number(v)
    }
}

impl From<i32> for OverrideValue {
    fn from(v: i32) -> Self {
        OverrideValue::Number(f64::from(v))
    }
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideValue::Bool(b) => write!(f, "{}", b),
            OverrideValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// The documented Configuration schema, in declaration order.
pub const FIELDS: &[(&str, FieldKind)] = &[
    ("fixed_albedo", FieldKind::Toggle),
    ("albedo_value", FieldKind::Number),
    ("fixed_concentration", FieldKind::Toggle),
    ("concentration_value", FieldKind::Number),
    ("fixed_water_vapor", FieldKind::Toggle),
    ("water_vapor_value", FieldKind::Number),
    ("disable_biology", FieldKind::Toggle),
    ("fixed_ocean", FieldKind::Toggle),
    ("disable_ocean", FieldKind::Toggle),
    ("bio_sink_value", FieldKind::Number),
    ("ocean_sink_value", FieldKind::Number),
    ("solar_power_value", FieldKind::Number),
    ("distance_ts_value", FieldKind::Number),
    ("obliquity_value", FieldKind::Number),
    ("eccentricity_value", FieldKind::Number),
    ("precession_value", FieldKind::Number),
    ("weathering_value", FieldKind::Number),
    ("anthro_emission_value", FieldKind::Number),
    ("volcanic_value", FieldKind::Number),
    ("bio_storage_value", FieldKind::Number),
    ("start_year", FieldKind::Number),
];

/// Simulation configuration
///
/// Toggles fix or disable a feedback subsystem; the matching `*_value` field
/// is substituted while the toggle is set. Percent-valued fields use 100 as
/// the nominal level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Preset the record was initialised from (not overridable)
    pub preset: Preset,

    pub fixed_albedo: bool,
    /// Planetary albedo in percent
    pub albedo_value: f64,
    pub fixed_concentration: bool,
    /// CO2 concentration in ppm
    pub concentration_value: f64,
    pub fixed_water_vapor: bool,
    /// Water-vapor ratio in percent of present-day
    pub water_vapor_value: f64,
    pub disable_biology: bool,
    pub fixed_ocean: bool,
    pub disable_ocean: bool,
    /// Biological sink strength, percent
    pub bio_sink_value: f64,
    /// Oceanic sink strength, percent
    pub ocean_sink_value: f64,
    /// Solar constant, W/m2
    pub solar_power_value: f64,
    /// Earth-Sun distance, m
    pub distance_ts_value: f64,
    /// Degrees
    pub obliquity_value: f64,
    pub eccentricity_value: f64,
    /// Degrees
    pub precession_value: f64,
    /// Silicate weathering, percent
    pub weathering_value: f64,
    /// Anthropogenic emissions, GtC/yr
    pub anthro_emission_value: f64,
    /// Volcanic degassing, GtC/yr
    pub volcanic_value: f64,
    /// Share of the biological sink that is stored, percent
    pub bio_storage_value: f64,
    pub start_year: f64,
}

impl Configuration {
    /// Canonical values of a preset
    pub fn preset(preset: Preset) -> Self {
        let base = Self {
            preset,
            fixed_albedo: false,
            albedo_value: 33.0,
            fixed_concentration: false,
            concentration_value: 280.0,
            fixed_water_vapor: false,
            water_vapor_value: 100.0,
            disable_biology: false,
            fixed_ocean: false,
            disable_ocean: false,
            bio_sink_value: 35.0,
            ocean_sink_value: 20.0,
            solar_power_value: 1368.0,
            distance_ts_value: 1.496e11,
            obliquity_value: 23.45,
            eccentricity_value: 0.0167,
            precession_value: 102.7,
            weathering_value: 100.0,
            anthro_emission_value: 0.0,
            volcanic_value: 0.083,
            bio_storage_value: 100.0,
            start_year: 1750.0,
        };

        match preset {
            Preset::PreIndustrial1750 => base,
            Preset::ActualPresentDay => Self {
                albedo_value: 32.85,
                concentration_value: 383.0,
                anthro_emission_value: 8.0,
                start_year: 2007.0,
                ..base
            },
        }
    }

    /// Documented field names
    pub fn field_names() -> impl Iterator<Item = &'static str> {
        FIELDS.iter().map(|(name, _)| *name)
    }

    /// Kind of a documented field, `None` when undocumented
    pub fn field_kind(key: &str) -> Option<FieldKind> {
        FIELDS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
    }

    /// Read a field by its documented name
    pub fn get(&self, key: &str) -> Option<OverrideValue> {
        let value = match key {
            "fixed_albedo" => OverrideValue::Bool(self.fixed_albedo),
            "albedo_value" => OverrideValue::Number(self.albedo_value),
            "fixed_concentration" => OverrideValue::Bool(self.fixed_concentration),
            "concentration_value" => OverrideValue::Number(self.concentration_value),
            "fixed_water_vapor" => OverrideValue::Bool(self.fixed_water_vapor),
            "water_vapor_value" => OverrideValue::Number(self.water_vapor_value),
            "disable_biology" => OverrideValue::Bool(self.disable_biology),
            "fixed_ocean" => OverrideValue::Bool(self.fixed_ocean),
            "disable_ocean" => OverrideValue::Bool(self.disable_ocean),
            "bio_sink_value" => OverrideValue::Number(self.bio_sink_value),
            "ocean_sink_value" => OverrideValue::Number(self.ocean_sink_value),
            "solar_power_value" => OverrideValue::Number(self.solar_power_value),
            "distance_ts_value" => OverrideValue::Number(self.distance_ts_value),
            "obliquity_value" => OverrideValue::Number(self.obliquity_value),
            "eccentricity_value" => OverrideValue::Number(self.eccentricity_value),
            "precession_value" => OverrideValue::Number(self.precession_value),
            "weathering_value" => OverrideValue::Number(self.weathering_value),
            "anthro_emission_value" => OverrideValue::Number(self.anthro_emission_value),
            "volcanic_value" => OverrideValue::Number(self.volcanic_value),
            "bio_storage_value" => OverrideValue::Number(self.bio_storage_value),
            "start_year" => OverrideValue::Number(self.start_year),
            _ => return None,
        };
        Some(value)
    }

    /// Write a field by its documented name.
    ///
    /// Only the builder calls this; a built Configuration is never mutated.
    pub(crate) fn set(&mut self, key: &str, value: OverrideValue) -> Result<(), HarnessError> {
        let expected = Self::field_kind(key).ok_or_else(|| {
            HarnessError::Configuration(format!("unknown configuration field `{}`", key))
        })?;
        if expected != value.kind() {
            return Err(HarnessError::Configuration(format!(
                "field `{}` expects a {:?} value, got `{}`",
                key, expected, value
            )));
        }

        match (key, value) {
            ("fixed_albedo", OverrideValue::Bool(v)) => self.fixed_albedo = v,
            ("albedo_value", OverrideValue::Number(v)) => self.albedo_value = v,
            ("fixed_concentration", OverrideValue::Bool(v)) => self.fixed_concentration = v,
            ("concentration_value", OverrideValue::Number(v)) => self.concentration_value = v,
            ("fixed_water_vapor", OverrideValue::Bool(v)) => self.fixed_water_vapor = v,
            ("water_vapor_value", OverrideValue::Number(v)) => self.water_vapor_value = v,
            ("disable_biology", OverrideValue::Bool(v)) => self.disable_biology = v,
            ("fixed_ocean", OverrideValue::Bool(v)) => self.fixed_ocean = v,
            ("disable_ocean", OverrideValue::Bool(v)) => self.disable_ocean = v,
            ("bio_sink_value", OverrideValue::Number(v)) => self.bio_sink_value = v,
            ("ocean_sink_value", OverrideValue::Number(v)) => self.ocean_sink_value = v,
            ("solar_power_value", OverrideValue::Number(v)) => self.solar_power_value = v,
            ("distance_ts_value", OverrideValue::Number(v)) => self.distance_ts_value = v,
            ("obliquity_value", OverrideValue::Number(v)) => self.obliquity_value = v,
            ("eccentricity_value", OverrideValue::Number(v)) => self.eccentricity_value = v,
            ("precession_value", OverrideValue::Number(v)) => self.precession_value = v,
            ("weathering_value", OverrideValue::Number(v)) => self.weathering_value = v,
            ("anthro_emission_value", OverrideValue::Number(v)) => {
                self.anthro_emission_value = v
            }
            ("volcanic_value", OverrideValue::Number(v)) => self.volcanic_value = v,
            ("bio_storage_value", OverrideValue::Number(v)) => self.bio_storage_value = v,
            ("start_year", OverrideValue::Number(v)) => self.start_year = v,
            _ => {
                // FIELDS and this match drifted apart
                return Err(HarnessError::Configuration(format!(
                    "field `{}` is documented but not settable",
                    key
                )));
            }
        }
        Ok(())
    }
}
