//! Sequential chain runner
//!
//! Runs the steps of a chain strictly in order. Every step renders its
//! template against the context before its tool is touched, so a missing
//! key stops the run without side effects for that step.

use crate::chain::context::{ExecutionContext, SeedContext};
use crate::chain::definition::ChainDefinition;
use crate::errors::{AgentError, Result};
use crate::tools::{ParallelDispatcher, ToolRequest};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a completed chain run
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// Output of the last step
    pub result: String,

    /// Context as it stood after the last step
    pub context: ExecutionContext,
}

/// Runs chains one step at a time
#[derive(Debug, Clone)]
pub struct SequentialChainRunner {
    dispatcher: ParallelDispatcher,
}

impl SequentialChainRunner {
    /// Create runner invoking tools through `dispatcher`
    pub fn new(dispatcher: ParallelDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &ParallelDispatcher {
        &self.dispatcher
    }

    /// Run `chain` from `initial_input`, optionally seeded with extra values
    ///
    /// A tool that is missing, fails or times out does not stop the run: its
    /// error text becomes the step output. A missing template key does.
    pub async fn run(
        &self,
        chain: &ChainDefinition,
        initial_input: &str,
        seed: Option<&SeedContext>,
    ) -> Result<ChainOutput> {
        if chain.is_empty() {
            return Err(AgentError::EmptyChain(chain.name().to_string()));
        }
        for key in chain.duplicate_output_keys() {
            warn!(chain = chain.name(), key = %key, "output key written by several steps");
        }

        let started = Instant::now();
        let mut context = ExecutionContext::new(initial_input, seed);
        let mut result = String::new();

        info!(chain = chain.name(), steps = chain.len(), "running chain");
        for (index, step) in chain.steps().iter().enumerate() {
            let input = context.render(&step.input_template, index)?;

            debug!(step = index, tool = %step.tool_name, "chain step");
            let outcome = self
                .dispatcher
                .execute(ToolRequest::new(step.tool_name.as_str(), input))
                .await;
            if !outcome.success {
                warn!(
                    step = index,
                    tool = %step.tool_name,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "chain step failed, continuing"
                );
            }

            result = outcome.into_text();
            context.insert(step.output_key.clone(), result.clone());
        }

        info!(
            chain = chain.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chain finished"
        );
        Ok(ChainOutput { result, context })
    }
}
