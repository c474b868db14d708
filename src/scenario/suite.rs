//! Scenario Matrix
//!
//! Hand-authored on purpose: each row is a reviewable decision about which
//! part of the configuration surface is exercised.

use super::{Preset, Scenario};

/// Start year shared by every present-day row
const PRESENT_DAY_START: f64 = 2007.0;

fn present_day(name: &str) -> Scenario {
    Scenario::new(name, Preset::ActualPresentDay).with("start_year", PRESENT_DAY_START)
}

/// The full equivalence suite
pub fn default_suite() -> Vec<Scenario> {
    vec![
        // Pre-industrial
        Scenario::new("pre_industrial_baseline", Preset::PreIndustrial1750),
        Scenario::new("pre_industrial_fixed_co2", Preset::PreIndustrial1750)
            .with("fixed_concentration", true)
            .with("concentration_value", 280.0),
        Scenario::new("pre_industrial_fixed_albedo", Preset::PreIndustrial1750)
            .with("fixed_albedo", true)
            .with("albedo_value", 33.0),
        // Present day
        present_day("present_day_baseline"),
        present_day("present_day_fixed_water_vapor")
            .with("fixed_water_vapor", true)
            .with("water_vapor_value", 105.0),
        present_day("present_day_disabled_biology").with("disable_biology", true),
        present_day("present_day_fixed_ocean").with("fixed_ocean", true),
        present_day("present_day_disabled_ocean").with("disable_ocean", true),
        present_day("present_day_fixed_albedo")
            .with("fixed_albedo", true)
            .with("albedo_value", 42.0),
        present_day("present_day_bio_sink").with("bio_sink_value", 50.0),
        present_day("present_day_ocean_sink").with("ocean_sink_value", 40.0),
        present_day("present_day_solar_power").with("solar_power_value", 1400.0),
        // Deliberately outside the nominal orbit
        present_day("present_day_sun_distance").with("distance_ts_value", 1.56789e11),
        present_day("present_day_obliquity").with("obliquity_value", 24.5),
        present_day("present_day_eccentricity").with("eccentricity_value", 0.05),
        present_day("present_day_precession").with("precession_value", 270.0),
        present_day("present_day_weathering").with("weathering_value", 150.0),
        present_day("present_day_anthro_emission").with("anthro_emission_value", 20.0),
        present_day("present_day_volcanic").with("volcanic_value", 1.0),
        present_day("present_day_bio_storage").with("bio_storage_value", 50.0),
    ]
}
