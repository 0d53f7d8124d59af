//! Tool-calling agent - main coordinator
//!
//! Drives the orchestration loop, coordinating:
//! - State machine transitions
//! - Model calls through [`ModelClient`]
//! - Directive parsing and parameter interpretation
//! - Batch execution through the parallel dispatcher
//! - Bounded conversation history

use crate::agent::prompt::build_system_prompt;
use crate::agent::state::{LoopEvent, LoopState};
use crate::directive::{parse_directives, strip_directives, Directive, ParamPolicy};
use crate::errors::Result;
use crate::model::{ConversationState, Message, ModelClient};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::tools::{ParallelDispatcher, Tool, ToolOutcome, ToolRequest};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Agent behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name
    pub name: String,

    /// Base system prompt; a built-in default is used when unset
    pub system_prompt: Option<String>,

    /// Tool rounds before the final answer is forced
    pub max_tool_iterations: usize,

    /// Messages kept in history across runs
    pub max_history_length: usize,

    /// Parse and execute directives at all
    pub enable_tool_calling: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "toolbuddy".to_string(),
            system_prompt: None,
            max_tool_iterations: 3,
            max_history_length: 100,
            enable_tool_calling: true,
        }
    }
}

/// What happened during one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Final answer text
    pub answer: String,

    /// Completed tool rounds
    pub iterations: usize,

    /// Model calls made, including a forced final one
    pub model_calls: usize,

    /// Tool requests dispatched across all rounds
    pub tool_calls: usize,

    /// Whether the iteration cap forced the final call
    pub forced_final: bool,

    /// State the loop ended in
    pub state: LoopState,
}

/// Agent alternating model calls and tool batches
pub struct ToolCallingAgent<M: ModelClient> {
    config: AgentConfig,
    model: M,
    dispatcher: ParallelDispatcher,
    policy: ParamPolicy,
    history: Vec<Message>,
    telemetry: TelemetryCollector,
}

impl<M: ModelClient> ToolCallingAgent<M> {
    /// Create agent; the dispatcher is attached to the agent's telemetry
    pub fn new(config: AgentConfig, model: M, dispatcher: ParallelDispatcher) -> Self {
        let telemetry = TelemetryCollector::new();
        Self {
            config,
            model,
            dispatcher: dispatcher.with_telemetry(telemetry.clone()),
            policy: ParamPolicy::default(),
            history: Vec::new(),
            telemetry,
        }
    }

    /// Replace the parameter interpretation policy
    pub fn with_policy(mut self, policy: ParamPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share an existing telemetry collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.dispatcher = self.dispatcher.with_telemetry(telemetry.clone());
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn dispatcher(&self) -> &ParallelDispatcher {
        &self.dispatcher
    }

    /// Messages kept from earlier runs, oldest first
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Register a tool, replacing one with the same name
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        info!(tool = tool.name(), "tool added");
        self.dispatcher.registry_mut().register(tool);
    }

    /// Remove a tool; false when it was not registered
    pub fn remove_tool(&mut self, name: &str) -> bool {
        self.dispatcher.registry_mut().unregister(name)
    }

    /// Registered tool names, sorted
    pub fn list_tools(&self) -> Vec<String> {
        self.dispatcher.registry().tool_names()
    }

    pub fn has_tools(&self) -> bool {
        !self.dispatcher.registry().is_empty()
    }

    /// System prompt for the current tool set
    pub fn system_prompt(&self) -> String {
        build_system_prompt(
            self.config.system_prompt.as_deref(),
            self.dispatcher.registry(),
            self.config.enable_tool_calling,
        )
    }

    /// Whether runs go through the directive loop
    pub fn tool_calling_active(&self) -> bool {
        self.config.enable_tool_calling && self.has_tools() && self.config.max_tool_iterations > 0
    }

    /// Answer `input`, returning only the final text
    pub async fn run(&mut self, input: &str) -> Result<String> {
        Ok(self.run_with_report(input).await?.answer)
    }

    /// Answer `input`
    ///
    /// A model transport failure aborts the run and leaves history untouched.
    pub async fn run_with_report(&mut self, input: &str) -> Result<RunReport> {
        let started = Instant::now();
        let mut conv = ConversationState::new(
            &self.system_prompt(),
            &self.history,
            input,
            self.config.max_tool_iterations,
        );
        let mut report = RunReport {
            answer: String::new(),
            iterations: 0,
            model_calls: 0,
            tool_calls: 0,
            forced_final: false,
            state: LoopState::AwaitModel,
        };

        info!(agent = %self.config.name, tools = self.tool_calling_active(), "run started");
        if self.tool_calling_active() {
            self.run_loop(input, &mut conv, &mut report).await?;
        } else {
            report.answer = self.call_model(&conv, &mut report).await?;
            self.remember(input, &report.answer);
            report.state = LoopState::Done;
        }

        report.iterations = conv.iteration();
        info!(
            agent = %self.config.name,
            model_calls = report.model_calls,
            iterations = report.iterations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        Ok(report)
    }

    /// Answer `input` in one streamed model call, handing each piece to `on_chunk`
    ///
    /// Tools are not offered and directives in the reply are not executed.
    /// History is updated once the stream ends; a failure part way through
    /// leaves it untouched.
    pub async fn stream_run<F>(&mut self, input: &str, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let prompt = build_system_prompt(
            self.config.system_prompt.as_deref(),
            self.dispatcher.registry(),
            false,
        );
        let conv = ConversationState::new(&prompt, &self.history, input, 0);

        info!(agent = %self.config.name, "streamed run started");
        let start = Instant::now();
        let mut pieces = self.model.generate_stream(conv.messages()).await?;
        let mut answer = String::new();
        while let Some(piece) = pieces.next().await {
            let piece = piece?;
            on_chunk(&piece);
            answer.push_str(&piece);
        }

        self.telemetry.record(TelemetryEvent::ModelCall {
            iteration: 0,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Instant::now(),
        });
        self.remember(input, &answer);
        Ok(answer)
    }

    async fn run_loop(
        &mut self,
        input: &str,
        conv: &mut ConversationState,
        report: &mut RunReport,
    ) -> Result<()> {
        let mut state = LoopState::AwaitModel;
        let mut response = String::new();
        let mut directives: Vec<Directive> = Vec::new();
        let mut outcomes: Vec<ToolOutcome> = Vec::new();
        let mut forced = false;

        while !state.is_terminal() {
            let event = match state {
                LoopState::AwaitModel => {
                    response = self.call_model(conv, report).await?;
                    LoopEvent::ResponseReceived
                }
                LoopState::Parse => {
                    directives = parse_directives(&response);
                    if directives.is_empty() {
                        LoopEvent::NoDirectives
                    } else {
                        debug!(count = directives.len(), "directives found");
                        LoopEvent::DirectivesFound
                    }
                }
                LoopState::ExecuteTools => {
                    let requests: Vec<ToolRequest> = directives
                        .iter()
                        .map(|d| ToolRequest {
                            tool: d.tool_name.clone(),
                            input: self.policy.interpret(&d.tool_name, &d.raw_parameters),
                        })
                        .collect();
                    report.tool_calls += requests.len();
                    outcomes = self.dispatcher.dispatch_batch(requests).await;
                    LoopEvent::BatchComplete
                }
                LoopState::FoldResults => {
                    let cleaned = strip_directives(&response, &directives);
                    conv.push(Message::assistant(cleaned.trim()));
                    conv.push(Message::observation(fold_observations(&outcomes)));
                    if conv.complete_iteration() {
                        forced = true;
                        LoopEvent::IterationCapReached
                    } else {
                        LoopEvent::Continue
                    }
                }
                LoopState::Finalize => {
                    if forced {
                        // Directives in this reply are never parsed
                        response = self.call_model(conv, report).await?;
                        report.forced_final = true;
                    }
                    self.remember(input, &response);
                    LoopEvent::AnswerRecorded
                }
                LoopState::Done => break,
            };
            state = self.advance(state, event)?;
        }

        report.answer = response;
        report.state = state;
        Ok(())
    }

    fn advance(&self, from: LoopState, event: LoopEvent) -> Result<LoopState> {
        let to = from.transition(event)?;
        self.telemetry.record(TelemetryEvent::StateTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
            timestamp: Instant::now(),
        });
        debug!(from = from.display_name(), to = to.display_name(), "state transition");
        Ok(to)
    }

    async fn call_model(&self, conv: &ConversationState, report: &mut RunReport) -> Result<String> {
        let start = Instant::now();
        let reply = self.model.generate(conv.messages()).await?;
        report.model_calls += 1;
        self.telemetry.record(TelemetryEvent::ModelCall {
            iteration: conv.iteration(),
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Instant::now(),
        });
        Ok(reply)
    }

    /// Append one exchange, dropping the oldest messages over the limit
    fn remember(&mut self, input: &str, answer: &str) {
        self.history.push(Message::user(input));
        self.history.push(Message::assistant(answer));
        let excess = self.history.len().saturating_sub(self.config.max_history_length);
        self.history.drain(..excess);
    }
}

/// Observation message text for one batch, in submission order
pub fn fold_observations(outcomes: &[ToolOutcome]) -> String {
    let results = outcomes
        .iter()
        .map(ToolOutcome::observation)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Tool results:\n{}\n\nPlease give a complete answer based on these results.",
        results
    )
}
