//! Equivalence Assertor
//!
//! Strict structural equality of two normalized results:
//!
//! - object key sets must match; key order is irrelevant
//! - arrays must match element by element, in order
//! - numbers match only when bit-identical (`0.0` and `-0.0` differ)
//!
//! The first difference in depth-first, sorted-key order is reported with
//! its path and both values.

use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

use crate::error::HarnessError;
use crate::normalize::NormalizedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MismatchKind {
    ValueDiffers,
    TypeDiffers,
    LengthDiffers,
    MissingInCandidate,
    MissingInReference,
    DenyListVersion,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MismatchKind::ValueDiffers => "value differs",
            MismatchKind::TypeDiffers => "type differs",
            MismatchKind::LengthDiffers => "length differs",
            MismatchKind::MissingInCandidate => "missing in candidate",
            MismatchKind::MissingInReference => "missing in reference",
            MismatchKind::DenyListVersion => "deny-list version differs",
        };
        f.write_str(s)
    }
}

/// First difference between two normalized results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// `temperature.steps[3].value` style; empty for the root
    pub path: String,
    pub kind: MismatchKind,
    pub candidate: Option<Value>,
    pub reference: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(
            f,
            "{} at {} (candidate: {}, reference: {})",
            self.kind,
            path,
            render(self.candidate.as_ref()),
            render(self.reference.as_ref())
        )
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None => "<absent>".to_string(),
        Some(Value::Array(items)) => format!("[{} items]", items.len()),
        Some(Value::Object(map)) => format!("{{{} keys}}", map.len()),
        Some(v) => v.to_string(),
    }
}

/// Fail on the first difference, or on results from different deny-list versions
pub fn assert_equal(
    candidate: &NormalizedResult,
    reference: &NormalizedResult,
) -> Result<(), HarnessError> {
    if candidate.deny_list_version != reference.deny_list_version {
        return Err(HarnessError::EquivalenceMismatch(Box::new(Mismatch {
            path: String::new(),
            kind: MismatchKind::DenyListVersion,
            candidate: Some(Value::from(candidate.deny_list_version)),
            reference: Some(Value::from(reference.deny_list_version)),
        })));
    }

    match first_mismatch(&candidate.value, &reference.value) {
        None => Ok(()),
        Some(mismatch) => Err(HarnessError::EquivalenceMismatch(Box::new(mismatch))),
    }
}

/// First difference between two value trees, `None` when identical
pub fn first_mismatch(candidate: &Value, reference: &Value) -> Option<Mismatch> {
    let mut path = String::new();
    walk(candidate, reference, &mut path)
}

fn mismatch(path: &str, kind: MismatchKind, c: Option<&Value>, r: Option<&Value>) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        kind,
        candidate: c.cloned(),
        reference: r.cloned(),
    }
}

fn walk(candidate: &Value, reference: &Value, path: &mut String) -> Option<Mismatch> {
    match (candidate, reference) {
        (Value::Object(c), Value::Object(r)) => {
            let mut keys: Vec<&String> = c.keys().chain(r.keys()).collect();
            keys.sort_unstable();
            keys.dedup();

            for key in keys {
                let mark = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);

                let found = match (c.get(key), r.get(key)) {
                    (Some(cv), Some(rv)) => walk(cv, rv, path),
                    (None, rv) => Some(mismatch(path, MismatchKind::MissingInCandidate, None, rv)),
                    (cv, None) => Some(mismatch(path, MismatchKind::MissingInReference, cv, None)),
                };
                path.truncate(mark);
                if found.is_some() {
                    return found;
                }
            }
            None
        }
        (Value::Array(c), Value::Array(r)) => {
            for (i, (cv, rv)) in c.iter().zip(r).enumerate() {
                let mark = path.len();
                path.push_str(&format!("[{}]", i));
                let found = walk(cv, rv, path);
                path.truncate(mark);
                if found.is_some() {
                    return found;
                }
            }
            // Common prefix identical: the shorter one is missing elements
            (c.len() != r.len()).then(|| {
                mismatch(
                    path,
                    MismatchKind::LengthDiffers,
                    Some(&Value::from(c.len())),
                    Some(&Value::from(r.len())),
                )
            })
        }
        (Value::Number(c), Value::Number(r)) => (!numbers_identical(c, r))
            .then(|| mismatch(path, MismatchKind::ValueDiffers, Some(candidate), Some(reference))),
        (Value::String(c), Value::String(r)) => (c != r)
            .then(|| mismatch(path, MismatchKind::ValueDiffers, Some(candidate), Some(reference))),
        (Value::Bool(c), Value::Bool(r)) => (c != r)
            .then(|| mismatch(path, MismatchKind::ValueDiffers, Some(candidate), Some(reference))),
        (Value::Null, Value::Null) => None,
        _ => Some(mismatch(
            path,
            MismatchKind::TypeDiffers,
            Some(candidate),
            Some(reference),
        )),
    }
}

fn numbers_identical(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        a.is_f64() && b.is_f64() && a.as_f64().map(f64::to_bits) == b.as_f64().map(f64::to_bits)
    } else {
        a == b
    }
}
