//! Directive parameter interpretation
//!
//! Turns the raw parameter string of a directive into [`ToolInput`]:
//! - no `=`: positional value, keyed by tool identity
//! - `=` and `,`: comma-separated pairs, each split on its first `=`
//! - `=` only: one `key=value` pair, split on the first `=`
//!
//! Expression-style tools bypass all of this and get the raw string.

use crate::tools::implementations::{CALCULATOR_TOOL, MEMORY_TOOL, SEARCH_TOOL};
use crate::tools::types::ToolInput;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Separator between `key=value` pairs
pub const PAIR_SEPARATOR: char = ',';

/// Key used for positional values of tools without an entry
pub const FALLBACK_KEY: &str = "input";

/// How a positional value maps to named parameters for one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalDefault {
    /// Key that receives the positional value
    pub key: String,

    /// Extra parameters always added alongside it
    pub fixed: Vec<(String, String)>,
}

impl PositionalDefault {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fixed: Vec::new(),
        }
    }

    pub fn with_fixed(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fixed.push((key.into(), value.into()));
        self
    }
}

/// Lookup table driving parameter interpretation
#[derive(Debug, Clone)]
pub struct ParamPolicy {
    positional: HashMap<String, PositionalDefault>,
    raw_tools: HashSet<String>,
}

impl Default for ParamPolicy {
    fn default() -> Self {
        Self::empty()
            .with_positional(SEARCH_TOOL, PositionalDefault::new("query"))
            .with_positional(
                MEMORY_TOOL,
                PositionalDefault::new("query").with_fixed("action", "search"),
            )
            .with_raw_tool(CALCULATOR_TOOL)
            .with_raw_tool("my_calculator")
    }
}

impl ParamPolicy {
    /// Policy with no tool-specific entries
    pub fn empty() -> Self {
        Self {
            positional: HashMap::new(),
            raw_tools: HashSet::new(),
        }
    }

    /// Map positional values of `tool` to `default`
    pub fn with_positional(mut self, tool: impl Into<String>, default: PositionalDefault) -> Self {
        self.positional.insert(tool.into(), default);
        self
    }

    /// Pass parameters of `tool` through unsplit
    pub fn with_raw_tool(mut self, tool: impl Into<String>) -> Self {
        self.raw_tools.insert(tool.into());
        self
    }

    /// Whether `tool` receives its parameters unsplit
    pub fn is_raw(&self, tool: &str) -> bool {
        self.raw_tools.contains(tool)
    }

    /// Interpret a directive's parameters for `tool_name`
    pub fn interpret(&self, tool_name: &str, raw: &str) -> ToolInput {
        if self.is_raw(tool_name) {
            return ToolInput::Raw(raw.to_string());
        }

        if raw.contains('=') {
            let pairs = split_pairs(raw);
            if !pairs.is_empty() {
                return ToolInput::Named(pairs);
            }
        }

        self.positional(tool_name, raw)
    }

    fn positional(&self, tool_name: &str, value: &str) -> ToolInput {
        let mut params = BTreeMap::new();
        match self.positional.get(tool_name) {
            Some(default) => {
                for (k, v) in &default.fixed {
                    params.insert(k.clone(), v.clone());
                }
                params.insert(default.key.clone(), value.to_string());
            }
            None => {
                params.insert(FALLBACK_KEY.to_string(), value.to_string());
            }
        }
        ToolInput::Named(params)
    }
}

/// Split `k=v` or `k1=v1,k2=v2` on the first `=` of each pair
///
/// Fragments without `=` and pairs with an empty key are dropped.
fn split_pairs(raw: &str) -> BTreeMap<String, String> {
    let fragments: Vec<&str> = if raw.contains(PAIR_SEPARATOR) {
        raw.split(PAIR_SEPARATOR).collect()
    } else {
        vec![raw]
    };

    fragments
        .into_iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Interpret with the default policy
pub fn interpret(tool_name: &str, raw: &str) -> ToolInput {
    ParamPolicy::default().interpret(tool_name, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_positional() {
        assert_eq!(
            interpret("search", "python编程"),
            ToolInput::named([("query", "python编程")])
        );
    }

    #[test]
    fn test_memory_positional() {
        assert_eq!(
            interpret("memory", "张三"),
            ToolInput::named([("action", "search"), ("query", "张三")])
        );
    }

    #[test]
    fn test_other_tool_positional() {
        assert_eq!(
            interpret("weather", "Beijing"),
            ToolInput::named([("input", "Beijing")])
        );
    }

    #[test]
    fn test_single_pair() {
        assert_eq!(
            interpret("memory", "recall=user info"),
            ToolInput::named([("recall", "user info")])
        );
    }

    #[test]
    fn test_single_pair_splits_on_first_equals() {
        assert_eq!(
            interpret("weather", "filter=a=b"),
            ToolInput::named([("filter", "a=b")])
        );
    }

    #[test]
    fn test_multiple_pairs() {
        assert_eq!(
            interpret("memory", "action=search, query=Python ,limit=3"),
            ToolInput::named([("action", "search"), ("query", "Python"), ("limit", "3")])
        );
    }

    #[test]
    fn test_multiple_pairs_values_keep_equals() {
        assert_eq!(
            interpret("x", "expr=a=b,flag=on"),
            ToolInput::named([("expr", "a=b"), ("flag", "on")])
        );
    }

    #[test]
    fn test_fragments_without_equals_dropped() {
        assert_eq!(
            interpret("x", "a=1,stray,b=2"),
            ToolInput::named([("a", "1"), ("b", "2")])
        );
    }

    #[test]
    fn test_empty_key_falls_back_to_positional() {
        assert_eq!(interpret("x", "=5"), ToolInput::named([("input", "=5")]));
    }

    #[test]
    fn test_period_is_not_a_separator() {
        assert_eq!(
            interpret("x", "url=example.com"),
            ToolInput::named([("url", "example.com")])
        );
    }

    #[test]
    fn test_calculator_gets_raw_string() {
        assert_eq!(interpret("calculator", "2+2"), ToolInput::Raw("2+2".into()));
        assert_eq!(interpret("calculator", "x=1,y=2"), ToolInput::Raw("x=1,y=2".into()));
        assert_eq!(interpret("my_calculator", "sqrt(16)"), ToolInput::Raw("sqrt(16)".into()));
    }

    #[test]
    fn test_custom_policy() {
        let policy = ParamPolicy::empty()
            .with_positional("weather", PositionalDefault::new("city").with_fixed("unit", "c"))
            .with_raw_tool("sql");

        assert_eq!(
            policy.interpret("weather", "Paris"),
            ToolInput::named([("city", "Paris"), ("unit", "c")])
        );
        assert!(policy.is_raw("sql"));
        assert!(!policy.is_raw("calculator"));
        assert_eq!(
            policy.interpret("search", "rust"),
            ToolInput::named([("input", "rust")])
        );
    }
}
