//! Output Normalizer
//!
//! Reduces a raw [`SimulationResult`] to the subset that is meaningful to
//! compare across engines:
//!
//! ```text
//!   SimulationResult ──serialize──▶ Value ──DenyList::strip──▶ NormalizedResult
//!     (untouched)                  (copy)                       (+ version)
//! ```
//!
//! No rounding, no reordering, no tolerance. Applying it twice is a no-op.

pub mod deny_list;
pub mod field_path;

pub use deny_list::{DenyList, DenyReason, DenyRule, REVISIONS, Revision};
pub use field_path::{FieldPath, Segment, leaf_paths};

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::error::HarnessError;
use crate::result::SimulationResult;

/// Comparable view of one engine's output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub deny_list_version: u32,
    pub value: Value,
}

/// Normalize a raw result under `deny_list`; `raw` is left as it was.
pub fn normalize(
    raw: &SimulationResult,
    deny_list: &DenyList,
) -> Result<NormalizedResult, HarnessError> {
    let value = serde_json::to_value(raw)?;
    Ok(normalize_value(value, deny_list))
}

/// Normalize an already-serialized tree
pub fn normalize_value(mut value: Value, deny_list: &DenyList) -> NormalizedResult {
    let removed = deny_list.strip(&mut value);
    trace!(removed, version = deny_list.version(), "Normalized result");
    NormalizedResult {
        deny_list_version: deny_list.version(),
        value,
    }
}

/// Raw-result fields neither denied nor compared under `deny_list`
pub fn unclassified_paths(
    raw: &SimulationResult,
    deny_list: &DenyList,
) -> Result<Vec<String>, HarnessError> {
    let value = serde_json::to_value(raw)?;
    Ok(deny_list.unclassified_paths(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{CandidateModel, ExperienceValues, SimulationValues};
    use crate::precision::POW_EXP;

    fn raw() -> SimulationResult {
        let mut sv = SimulationValues::new();
        sv.create_actual_state();
        CandidateModel::new(&POW_EXP)
            .model_execute(&sv, &ExperienceValues::new(1_000.0))
            .unwrap()
    }

    #[test]
    fn test_normalize_leaves_raw_untouched() {
        let raw = raw();
        let before = raw.clone();
        let normalized = normalize(&raw, DenyList::current()).unwrap();
        assert_eq!(raw, before);
        assert_eq!(normalized.deny_list_version, DenyList::current().version());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let list = DenyList::current();
        let once = normalize(&raw(), list).unwrap();
        let twice = normalize_value(once.value.clone(), list);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_denied_path_survives() {
        let list = DenyList::current();
        let normalized = normalize(&raw(), list).unwrap();
        for path in list.paths() {
            assert!(
                !path.resolves_in(&normalized.value),
                "{} still present after normalize",
                path
            );
        }
    }

    #[test]
    fn test_compared_fields_survive() {
        let normalized = normalize(&raw(), DenyList::current()).unwrap();
        let value = &normalized.value;
        assert!(value.get("final_temperature").is_some());
        assert!(value.get("start_year").is_some());
        let steps = value["temperature"]["steps"].as_array().unwrap();
        assert_eq!(steps[0].as_object().unwrap().len(), 2);
        assert!(value.get("albedo").is_none());
    }

    #[test]
    fn test_older_revision_keeps_later_denials() {
        let v3 = DenyList::revision(3).unwrap();
        let normalized = normalize(&raw(), &v3).unwrap();
        assert_eq!(normalized.deny_list_version, 3);
        assert!(normalized.value.get("sea_level").is_some());
        assert!(normalized.value.get("end_year").is_some());
    }

    #[test]
    fn test_candidate_output_is_fully_classified() {
        assert!(unclassified_paths(&raw(), DenyList::current()).unwrap().is_empty());
    }
}
