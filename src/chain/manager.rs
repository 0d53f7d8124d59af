//! Named chain registry

use crate::chain::context::SeedContext;
use crate::chain::definition::ChainDefinition;
use crate::chain::runner::{ChainOutput, SequentialChainRunner};
use crate::errors::{AgentError, Result};
use crate::tools::implementations::{CALCULATOR_TOOL, SEARCH_TOOL};
use std::collections::BTreeMap;
use tracing::info;

/// Name of the bundled research chain
pub const RESEARCH_CHAIN: &str = "research_and_calculate";

/// Search for a topic, then evaluate the seeded `expression`
///
/// The search result rides along as a calculator comment, so the second
/// step records what the calculation was based on.
pub fn research_and_calculate() -> Result<ChainDefinition> {
    ChainDefinition::builder(RESEARCH_CHAIN)
        .description("Search for information, then evaluate the seeded 'expression' against it")
        .step_as(SEARCH_TOOL, "{input}", "search_result")
        .step_as(
            CALCULATOR_TOOL,
            "{expression} # based on: {search_result}",
            "calculation_result",
        )
        .build()
}

/// Holds chains by name and runs them
#[derive(Debug, Clone)]
pub struct ChainManager {
    runner: SequentialChainRunner,
    chains: BTreeMap<String, ChainDefinition>,
}

impl ChainManager {
    pub fn new(runner: SequentialChainRunner) -> Self {
        Self {
            runner,
            chains: BTreeMap::new(),
        }
    }

    /// Register a chain, returning the one it replaced
    pub fn register(&mut self, chain: ChainDefinition) -> Option<ChainDefinition> {
        info!(chain = chain.name(), steps = chain.len(), "registered chain");
        self.chains.insert(chain.name().to_string(), chain)
    }

    pub fn get(&self, name: &str) -> Option<&ChainDefinition> {
        self.chains.get(name)
    }

    /// Registered chain names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.chains.keys().map(String::as_str).collect()
    }

    /// Run the chain registered as `name`
    pub async fn execute(
        &self,
        name: &str,
        initial_input: &str,
        seed: Option<&SeedContext>,
    ) -> Result<ChainOutput> {
        let chain = self
            .chains
            .get(name)
            .ok_or_else(|| AgentError::ChainNotFound(name.to_string()))?;
        self.runner.run(chain, initial_input, seed).await
    }
}
