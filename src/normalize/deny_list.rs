//! Deny-list - versioned record of what is NOT compared
//!
//! Every revision is a reviewable delta: which field paths it starts to
//! exclude, why, and which paths it adds to the comparable surface. The
//! materialised [`DenyList`] of a version folds all revisions up to it.
//!
//! # Change log
//!
//! | v | Change |
//! |---|--------|
//! | 1 | identity and index bookkeeping are engine-internal |
//! | 2 | time-step size, deadline and constant tables are engine-internal |
//! | 3 | first-step intermediates differ in layout between engines |
//! | 4 | sea level and ice cap series are known divergent |
//! | 5 | emissions, concentration and albedo series + end year are known divergent |

use once_cell::sync::Lazy;
use serde_json::Value;
use std::fmt;

use super::field_path::{FieldPath, leaf_paths};

/// Why a path is excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// Engine bookkeeping with no counterpart in the other engine
    Internal,
    /// Present in both but not stable across runs or layouts
    Unstable,
    /// Compared once, diverges today; kept here until reconciled
    KnownDivergent,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Internal => f.write_str("internal"),
            DenyReason::Unstable => f.write_str("unstable"),
            DenyReason::KnownDivergent => f.write_str("known-divergent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenyRule {
    pub path: &'static str,
    pub reason: DenyReason,
    pub note: &'static str,
}

const fn rule(path: &'static str, reason: DenyReason, note: &'static str) -> DenyRule {
    DenyRule { path, reason, note }
}

/// One entry of the change log
#[derive(Debug, Clone, Copy)]
pub struct Revision {
    pub version: u32,
    pub summary: &'static str,
    pub deny: &'static [DenyRule],
    /// Paths that become part of the comparable surface
    pub compare: &'static [&'static str],
}

/// Declares the first-step intermediates once: their names and the rules denying them
macro_rules! step_internals {
    ($($name:literal),* $(,)?) => {
        /// Intermediates carried by the first record of every series
        pub const STEP_INTERNALS: &[&str] = &[$($name),*];

        const STEP_INTERNAL_RULES: &[DenyRule] = &[$(rule(
            concat!("*.steps.0.", $name),
            DenyReason::Unstable,
            "first-step intermediate",
        )),*];
    };
}

step_internals!(
    "forcing_co2",
    "forcing_water_vapor",
    "forcing_albedo",
    "forcing_solar",
    "forcing_total",
    "temperature_eq",
    "insolation",
    "albedo_land",
    "albedo_ocean",
    "albedo_ice",
    "ice_fraction",
    "ocean_uptake",
    "ocean_solubility",
    "bio_sink",
    "bio_storage",
    "co2_weathering",
    "co2_volcanic",
    "co2_anthro",
    "co2_ocean_flux",
    "water_vapor_ratio",
);

use DenyReason::*;

pub static REVISIONS: &[Revision] = &[
    Revision {
        version: 1,
        summary: "identity and index bookkeeping are engine-internal",
        deny: &[
            rule("name", Internal, "engine identity"),
            rule("index_min", Internal, "reference indexes from 1"),
            rule("index_max", Internal, "reference indexes from 1"),
        ],
        compare: &[
            "start_year",
            "end_year",
            "final_temperature",
            "final_co2",
            "final_sea_level",
            "final_albedo",
            "mean_temperature",
            "*.resolution",
            "*.index_min",
            "*.index_max",
            "*.steps.*.year",
            "*.steps.*.value",
        ],
    },
    Revision {
        version: 2,
        summary: "time-step size, deadline and constant tables are engine-internal",
        deny: &[
            rule("time_step", Internal, "integration step size"),
            rule("deadline", Internal, "reference stores the horizon, candidate the end date"),
            rule("physics_constants", Internal, "table keys differ in case"),
            rule("variable_constants", Internal, "table layout differs"),
        ],
        compare: &[],
    },
    Revision {
        version: 3,
        summary: "first-step intermediates differ in layout between engines",
        deny: STEP_INTERNAL_RULES,
        compare: &[],
    },
    Revision {
        version: 4,
        summary: "sea level and ice cap series are known divergent",
        deny: &[
            rule("sea_level", KnownDivergent, "reference sums sea-level terms in another order"),
            rule("ice_cap", KnownDivergent, "reference reports ice cap in percent"),
        ],
        compare: &[],
    },
    Revision {
        version: 5,
        summary: "emissions, concentration and albedo series + end year are known divergent",
        deny: &[
            rule("co2_emissions", KnownDivergent, "reference reports cumulative emissions"),
            rule("co2_concentration", KnownDivergent, "reference round-trips through GtC"),
            rule("albedo", KnownDivergent, "reference derives albedo from absorption"),
            rule("end_year", KnownDivergent, "derivable; reference accumulates time steps"),
        ],
        compare: &[],
    },
];

/// Materialised deny-list of one version
#[derive(Debug, Clone)]
pub struct DenyList {
    version: u32,
    rules: Vec<(FieldPath, DenyRule)>,
    compared: Vec<FieldPath>,
}

static CURRENT: Lazy<DenyList> = Lazy::new(|| {
    let latest = REVISIONS.last().map_or(0, |r| r.version);
    DenyList::fold(latest)
});

impl DenyList {
    fn fold(version: u32) -> Self {
        let mut rules = Vec::new();
        let mut compared = Vec::new();
        for revision in REVISIONS.iter().filter(|r| r.version <= version) {
            rules.extend(revision.deny.iter().map(|r| (FieldPath::parse(r.path), *r)));
            compared.extend(revision.compare.iter().map(|p| FieldPath::parse(p)));
        }
        Self {
            version,
            rules,
            compared,
        }
    }

    /// The latest revision
    pub fn current() -> &'static DenyList {
        &CURRENT
    }

    /// A historical revision, `None` for an unknown version
    pub fn revision(version: u32) -> Option<DenyList> {
        REVISIONS
            .iter()
            .any(|r| r.version == version)
            .then(|| Self::fold(version))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rules(&self) -> impl Iterator<Item = &DenyRule> {
        self.rules.iter().map(|(_, rule)| rule)
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.rules.iter().map(|(path, _)| path)
    }

    /// Known-divergent registry: rules kept only until the engines agree
    pub fn known_divergent(&self) -> impl Iterator<Item = &DenyRule> {
        self.rules().filter(|r| r.reason == DenyReason::KnownDivergent)
    }

    /// Remove every denied path from `value`; returns the number of entries removed
    pub fn strip(&self, value: &mut Value) -> usize {
        self.rules
            .iter()
            .map(|(path, _)| path.remove_from(value))
            .sum()
    }

    pub fn is_denied(&self, concrete: &[String]) -> bool {
        self.rules.iter().any(|(path, _)| path.covers(concrete))
    }

    pub fn is_compared(&self, concrete: &[String]) -> bool {
        !self.is_denied(concrete) && self.compared.iter().any(|path| path.covers(concrete))
    }

    /// Leaf paths of a raw result that this revision neither denies nor compares.
    ///
    /// Non-empty means an engine started emitting a field nobody has decided
    /// about yet.
    pub fn unclassified_paths(&self, raw: &Value) -> Vec<String> {
        leaf_paths(raw)
            .into_iter()
            .filter(|leaf| {
                !self.is_denied(leaf) && !self.compared.iter().any(|path| path.covers(leaf))
            })
            .map(|leaf| leaf.join("."))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_revisions_are_ordered_and_unique() {
        let versions: Vec<u32> = REVISIONS.iter().map(|r| r.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
        assert_eq!(DenyList::current().version(), 5);
    }

    #[test]
    fn test_no_path_is_denied_twice() {
        let list = DenyList::current();
        let mut seen = FxHashSet::default();
        for rule in list.rules() {
            assert!(seen.insert(rule.path), "{} denied twice", rule.path);
        }
    }

    #[test]
    fn test_step_internal_rules_match_documented_set() {
        let list = DenyList::revision(3).unwrap();
        for name in STEP_INTERNALS {
            let path = format!("*.steps.0.{}", name);
            assert!(list.rules().any(|r| r.path == path), "{} missing", path);
        }
    }

    #[test]
    fn test_step_internals_match_result_model() {
        let json = serde_json::to_value(crate::result::StepInternals::default()).unwrap();
        let keys: FxHashSet<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        let documented: FxHashSet<&str> = STEP_INTERNALS.iter().copied().collect();
        assert_eq!(keys, documented);
    }

    #[test]
    fn test_historical_revision_is_prefix() {
        let v2 = DenyList::revision(2).unwrap();
        assert_eq!(v2.rules().count(), 7);
        assert!(v2.known_divergent().next().is_none());
        assert!(DenyList::revision(99).is_none());
    }

    #[test]
    fn test_known_divergent_registry() {
        let names: Vec<&str> = DenyList::current().known_divergent().map(|r| r.path).collect();
        assert_eq!(
            names,
            vec![
                "sea_level",
                "ice_cap",
                "co2_emissions",
                "co2_concentration",
                "albedo",
                "end_year"
            ]
        );
    }

    #[test]
    fn test_compared_surface_excludes_denied() {
        let list = DenyList::current();
        let end_year = vec!["end_year".to_string()];
        assert!(list.is_denied(&end_year));
        assert!(!list.is_compared(&end_year));

        let temp: Vec<String> = ["temperature", "steps", "3", "value"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(list.is_compared(&temp));
    }

    #[test]
    fn test_unseen_field_is_unclassified() {
        let raw = serde_json::json!({
            "final_temperature": 1.0,
            "name": "x",
            "brand_new_scalar": 2.0,
            "temperature": { "steps": [ { "year": 1.0, "value": 2.0, "mystery": 3.0 } ] },
        });
        let unclassified = DenyList::current().unclassified_paths(&raw);
        assert_eq!(
            unclassified,
            vec![
                "brand_new_scalar".to_string(),
                "temperature.steps.0.mystery".to_string()
            ]
        );
    }
}
