//! Scenario model
//!
//! - [`configuration`] - the Configuration record and its documented schema
//! - [`builder`] - preset + overrides into a Configuration
//! - [`suite`] - the hand-authored scenario matrix

pub mod builder;
pub mod configuration;
pub mod suite;

pub use builder::{Overrides, ScenarioBuilder};
pub use configuration::{Configuration, FieldKind, OverrideValue, Preset};
pub use suite::default_suite;

/// Default simulation horizon in years
pub const DEFAULT_HORIZON_YEARS: f64 = 10_000.0;

/// One row of the test matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub preset: Preset,
    pub overrides: Overrides,
    pub horizon_years: f64,
}

impl Scenario {
    pub fn new(name: impl Into<String>, preset: Preset) -> Self {
        Self {
            name: name.into(),
            preset,
            overrides: Overrides::new(),
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<OverrideValue>) -> Self {
        self.overrides = self.overrides.set(key, value);
        self
    }

    pub fn horizon(mut self, years: f64) -> Self {
        self.horizon_years = years;
        self
    }

    /// Build this scenario's Configuration
    pub fn configuration(&self) -> Result<Configuration, crate::error::HarnessError> {
        ScenarioBuilder::build(self.preset, &self.overrides)
    }
}
