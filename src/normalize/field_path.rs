//! Field path patterns over a JSON-shaped result tree
//!
//! Dotted segments; `*` matches any object key or array index, a numeric
//! segment matches that array index.
//!
//! ```text
//! physics_constants          whole subtree
//! *.steps.0.forcing_co2      one internal of the first record of every series
//! temperature.steps.*.value  every value of one series
//! ```

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Any,
}

impl Segment {
    fn matches(&self, concrete: &str) -> bool {
        match self {
            Segment::Any => true,
            Segment::Key(k) => k == concrete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" => Segment::Any,
                key => Segment::Key(key.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this pattern names `concrete` or one of its ancestors
    pub fn covers(&self, concrete: &[String]) -> bool {
        self.segments.len() <= concrete.len()
            && self
                .segments
                .iter()
                .zip(concrete)
                .all(|(seg, c)| seg.matches(c))
    }

    /// Remove every object entry this pattern resolves to; returns the count.
    ///
    /// Patterns ending on an array index are never removed: dropping an
    /// element would shift its siblings and change what gets compared.
    pub fn remove_from(&self, value: &mut Value) -> usize {
        remove_at(value, &self.segments)
    }

    /// Whether at least one concrete path in `value` matches this pattern
    pub fn resolves_in(&self, value: &Value) -> bool {
        resolves_at(value, &self.segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            match seg {
                Segment::Any => f.write_str("*")?,
                Segment::Key(k) => f.write_str(k)?,
            }
        }
        Ok(())
    }
}

fn index_of(seg: &Segment, items: &[Value]) -> Vec<usize> {
    match seg {
        Segment::Any => (0..items.len()).collect(),
        Segment::Key(k) => k
            .parse::<usize>()
            .ok()
            .filter(|i| *i < items.len())
            .into_iter()
            .collect(),
    }
}

fn remove_at(value: &mut Value, segments: &[Segment]) -> usize {
    let Some((head, rest)) = segments.split_first() else {
        return 0;
    };

    match value {
        Value::Object(map) if rest.is_empty() => match head {
            Segment::Key(k) => usize::from(map.remove(k).is_some()),
            Segment::Any => {
                let removed = map.len();
                map.clear();
                removed
            }
        },
        Value::Object(map) => match head {
            Segment::Key(k) => map.get_mut(k).map_or(0, |child| remove_at(child, rest)),
            Segment::Any => map.values_mut().map(|child| remove_at(child, rest)).sum(),
        },
        Value::Array(items) if !rest.is_empty() => index_of(head, items)
            .into_iter()
            .map(|i| remove_at(&mut items[i], rest))
            .sum(),
        _ => 0,
    }
}

fn resolves_at(value: &Value, segments: &[Segment]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return true;
    };

    match value {
        Value::Object(map) => match head {
            Segment::Key(k) => map.get(k).is_some_and(|child| resolves_at(child, rest)),
            Segment::Any => map.values().any(|child| resolves_at(child, rest)),
        },
        Value::Array(items) => index_of(head, items)
            .into_iter()
            .any(|i| resolves_at(&items[i], rest)),
        _ => false,
    }
}

/// Every leaf path of `value`; array indices are rendered as numbers.
/// Empty objects and arrays count as leaves.
pub fn leaf_paths(value: &Value) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    collect_leaves(value, &mut prefix, &mut out);
    out
}

fn collect_leaves(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, child) in map {
                prefix.push(k.clone());
                collect_leaves(child, prefix, out);
                prefix.pop();
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                prefix.push(i.to_string());
                collect_leaves(child, prefix, out);
                prefix.pop();
            }
        }
        _ => out.push(prefix.clone()),
    }
}
