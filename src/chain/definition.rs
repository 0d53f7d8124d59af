//! Chain definitions
//!
//! A chain is an ordered list of steps. Each step names a tool, a
//! `{key}` input template and the context key its output is stored under.

use crate::chain::context::INPUT_KEY;
use crate::errors::{AgentError, Result};
use std::collections::HashSet;

/// One step of a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    /// Tool to invoke
    pub tool_name: String,

    /// Input template with `{key}` placeholders
    pub input_template: String,

    /// Context key receiving the step output
    pub output_key: String,
}

impl ChainStep {
    /// Key used when a step does not name one
    pub fn default_output_key(index: usize) -> String {
        format!("step_{}_result", index)
    }
}

/// Validated, non-empty chain
#[derive(Debug, Clone)]
pub struct ChainDefinition {
    name: String,
    description: String,
    steps: Vec<ChainStep>,
}

impl ChainDefinition {
    /// Start building a chain
    pub fn builder(name: impl Into<String>) -> ChainBuilder {
        ChainBuilder {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; empty chains are rejected at build time
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Output keys written by more than one step, in first-seen order
    ///
    /// Later writes overwrite earlier ones during a run.
    pub fn duplicate_output_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for step in &self.steps {
            if !seen.insert(step.output_key.as_str()) && !dups.contains(&step.output_key) {
                dups.push(step.output_key.clone());
            }
        }
        dups
    }
}

/// Builder for [`ChainDefinition`]
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    name: String,
    description: String,
    steps: Vec<ChainStep>,
}

impl ChainBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step stored under `step_<index>_result`
    pub fn step(self, tool_name: impl Into<String>, input_template: impl Into<String>) -> Self {
        let key = ChainStep::default_output_key(self.steps.len());
        self.step_as(tool_name, input_template, key)
    }

    /// Append a step stored under `output_key`
    pub fn step_as(
        mut self,
        tool_name: impl Into<String>,
        input_template: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        self.steps.push(ChainStep {
            tool_name: tool_name.into(),
            input_template: input_template.into(),
            output_key: output_key.into(),
        });
        self
    }

    /// Validate and finish
    ///
    /// Fails when there are no steps or a step writes the reserved `input` key.
    pub fn build(self) -> Result<ChainDefinition> {
        if self.steps.is_empty() {
            return Err(AgentError::EmptyChain(self.name));
        }

        if let Some((step, s)) = self
            .steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.output_key == INPUT_KEY)
        {
            return Err(AgentError::ReservedOutputKey {
                key: s.output_key.clone(),
                step,
            });
        }

        Ok(ChainDefinition {
            name: self.name,
            description: self.description,
            steps: self.steps,
        })
    }
}
