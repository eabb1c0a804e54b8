//! A complete assignment of state variables, hashed and compared by content.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::value::Value;

/// A mapping from state variable name to [`Value`].
///
/// Backed by a `BTreeMap` rather than a `HashMap` so that two states built from the same
/// key-value pairs in a different order derive equal `Hash`/`Eq`: the map's iteration order is
/// always the sorted key order, independent of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    vars: BTreeMap<String, Value>,
}

impl State {
    /// Builds a state from a name -> value mapping.
    pub fn new(vars: BTreeMap<String, Value>) -> Self {
        State { vars }
    }

    /// Reads the value of a variable, if the state has it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Sets (or inserts) the value of a variable. Only meaningful before the state is submitted
    /// to a [`crate::Planner`]; states produced by search are never mutated in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Builds a fresh state equal to `self` with the given overrides applied on top.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, Value>) -> State {
        let mut vars = self.vars.clone();
        for (k, v) in overrides {
            vars.insert(k.clone(), v.clone());
        }
        State { vars }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// A stable, 6-hex-digit content digest, for display and coarse bucketing only.
    ///
    /// Never use this for equality: two distinct states can share a truncated digest. The
    /// closed/open sets compare and hash full `State` values, not this digest.
    pub fn short_hash(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("{:06x}", hasher.finish() & 0xFFFFFF)
    }

    /// Renders the state as `name:value` pairs, column-wrapped at roughly `width` characters
    /// per line. Used for logging only; has no bearing on search correctness.
    pub fn pretty_str(&self, width: usize) -> String {
        let mut lines = Vec::new();
        let mut line = String::new();
        for (k, v) in self.vars.iter() {
            let entry = format!("{k}:{v}");
            if !line.is_empty() && line.len() + 2 + entry.len() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push_str(", ");
            }
            line.push_str(&entry);
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines.join("\n")
    }
}

impl From<BTreeMap<String, Value>> for State {
    fn from(vars: BTreeMap<String, Value>) -> Self {
        State::new(vars)
    }
}

impl<const N: usize> From<[(&str, Value); N]> for State {
    fn from(pairs: [(&str, Value); N]) -> Self {
        State::new(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(pairs: &[(&str, Value)]) -> State {
        State::new(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn equality_and_hash_are_order_independent() {
        let a = s(&[("x", Value::Int(1)), ("y", Value::Bool(true))]);
        let b = s(&[("y", Value::Bool(true)), ("x", Value::Int(1))]);
        assert_eq!(a, b);

        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn distinct_content_is_not_equal() {
        let a = s(&[("x", Value::Int(1))]);
        let b = s(&[("x", Value::Int(2))]);
        assert_ne!(a, b);
    }

    #[test]
    fn with_overrides_preserves_untouched_keys() {
        let base = s(&[("x", Value::Int(1)), ("y", Value::Int(2))]);
        let mut overrides = BTreeMap::new();
        overrides.insert("y".to_string(), Value::Int(9));
        let next = base.with_overrides(&overrides);
        assert_eq!(next.get("x"), Some(&Value::Int(1)));
        assert_eq!(next.get("y"), Some(&Value::Int(9)));
    }

    #[test]
    fn short_hash_is_stable_across_construction_order() {
        let a = s(&[("x", Value::Int(1)), ("y", Value::Bool(true))]);
        let b = s(&[("y", Value::Bool(true)), ("x", Value::Int(1))]);
        assert_eq!(a.short_hash(), b.short_hash());
        assert_eq!(a.short_hash().len(), 6);
    }
}
