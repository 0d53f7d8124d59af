//! Tool-call directives embedded in model text
//!
//! Scanning (`[TOOL_CALL:name:params]`) and parameter interpretation are
//! separate steps: the scanner never looks inside the parameter string.

pub mod parser;
pub mod params;

// Re-export commonly used types
pub use parser::{parse_directives, strip_directives, Directive, DIRECTIVE_PREFIX};
pub use params::{interpret, ParamPolicy, PositionalDefault};
