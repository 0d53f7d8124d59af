//! Execution context for one chain run
//!
//! Ordered key/value store used for `{key}` template interpolation.
//! Lookup is by key; insertion order is kept for diagnostics only.

use crate::errors::{AgentError, Result};
use std::collections::{BTreeMap, HashMap};

/// Key holding the run's initial input
pub const INPUT_KEY: &str = "input";

/// Values supplied by the caller before a run starts
pub type SeedContext = BTreeMap<String, String>;

/// Per-run key/value store
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: HashMap<String, String>,
    order: Vec<String>,
}

impl ExecutionContext {
    /// Create context from an optional seed plus the initial input
    ///
    /// `input` is written last, so a seed can never shadow it.
    pub fn new(initial_input: impl Into<String>, seed: Option<&SeedContext>) -> Self {
        let mut ctx = Self::default();
        if let Some(seed) = seed {
            for (k, v) in seed {
                ctx.insert(k.clone(), v.clone());
            }
        }
        ctx.insert(INPUT_KEY.to_string(), initial_input.into());
        ctx
    }

    /// Store a value, returning the one it replaced
    ///
    /// Last write wins: a step that reuses an existing key overwrites it.
    /// The key keeps its original position in the diagnostic order.
    pub(crate) fn insert(&mut self, key: String, value: String) -> Option<String> {
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value)
    }

    /// Get value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if key exists
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in first-insertion order
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|k| self.values.get_key_value(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Substitute every `{key}` in `template`
    ///
    /// Fails on the first placeholder whose key is absent. `{}` and a `{`
    /// without a closing `}` are copied literally.
    pub fn render(&self, template: &str, step: usize) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return Ok(out);
            };

            let key = &after[..close];
            if key.is_empty() {
                out.push_str("{}");
            } else {
                let value = self.get(key).ok_or_else(|| AgentError::MissingContextVariable {
                    key: key.to_string(),
                    step,
                })?;
                out.push_str(value);
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}
