//! Orchestration loop state machine
//!
//! Deterministic finite state machine driving one agent run:
//! - Safety: no transition outside the table below is accepted
//! - Liveness: every tool round increments a bounded counter, so Done is
//!   reached after at most `max_tool_iterations + 1` model calls
//! - Determinism: unique next state per (state, event)

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};

/// Loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopState {
    /// Waiting for one model response
    AwaitModel,

    /// Scanning the response for directives
    Parse,

    /// Running the directive batch through the dispatcher
    ExecuteTools,

    /// Appending cleaned reasoning and observations to the conversation
    FoldResults,

    /// Producing the final answer, with one forced model call when capped
    Finalize,

    /// Run finished (terminal)
    Done,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// Model returned a response
    ResponseReceived,

    /// Response contained at least one directive
    DirectivesFound,

    /// Response contained no directive
    NoDirectives,

    /// Every request of the batch has an outcome
    BatchComplete,

    /// Results folded, iterations remain
    Continue,

    /// Results folded, iteration cap reached
    IterationCapReached,

    /// Final answer stored in history
    AnswerRecorded,
}

impl LoopState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Done)
    }

    /// Attempt state transition with validation
    ///
    /// Valid transitions:
    /// 1. AwaitModel   → Parse        (on: ResponseReceived)
    /// 2. Parse        → ExecuteTools (on: DirectivesFound)
    /// 3. Parse        → Finalize     (on: NoDirectives)
    /// 4. ExecuteTools → FoldResults  (on: BatchComplete)
    /// 5. FoldResults  → AwaitModel   (on: Continue)
    /// 6. FoldResults  → Finalize     (on: IterationCapReached)
    /// 7. Finalize     → Done         (on: AnswerRecorded)
    /// 8. Done         → Done         (terminal)
    pub fn transition(&self, event: LoopEvent) -> Result<LoopState> {
        use LoopEvent::*;
        use LoopState::*;

        let next_state = match (self, event) {
            (AwaitModel, ResponseReceived) => Parse,

            (Parse, DirectivesFound) => ExecuteTools,
            (Parse, NoDirectives) => Finalize,

            (ExecuteTools, BatchComplete) => FoldResults,

            (FoldResults, Continue) => AwaitModel,
            (FoldResults, IterationCapReached) => Finalize,

            (Finalize, AnswerRecorded) => Done,

            (Done, _) => Done,

            (from, event) => {
                return Err(AgentError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next_state)
    }

    /// Get all valid events from this state
    pub fn valid_events(&self) -> Vec<LoopEvent> {
        use LoopEvent::*;
        use LoopState::*;

        match self {
            AwaitModel => vec![ResponseReceived],
            Parse => vec![DirectivesFound, NoDirectives],
            ExecuteTools => vec![BatchComplete],
            FoldResults => vec![Continue, IterationCapReached],
            Finalize => vec![AnswerRecorded],
            Done => vec![],
        }
    }

    /// Human-readable state name
    pub fn display_name(&self) -> &'static str {
        match self {
            LoopState::AwaitModel => "Waiting for model",
            LoopState::Parse => "Parsing response",
            LoopState::ExecuteTools => "Executing tools",
            LoopState::FoldResults => "Folding results",
            LoopState::Finalize => "Finalizing",
            LoopState::Done => "Done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [LoopState; 6] = [
        LoopState::AwaitModel,
        LoopState::Parse,
        LoopState::ExecuteTools,
        LoopState::FoldResults,
        LoopState::Finalize,
        LoopState::Done,
    ];

    const ALL_EVENTS: [LoopEvent; 7] = [
        LoopEvent::ResponseReceived,
        LoopEvent::DirectivesFound,
        LoopEvent::NoDirectives,
        LoopEvent::BatchComplete,
        LoopEvent::Continue,
        LoopEvent::IterationCapReached,
        LoopEvent::AnswerRecorded,
    ];

    #[test]
    fn test_tool_round_trip() {
        let mut state = LoopState::AwaitModel;
        for event in [
            LoopEvent::ResponseReceived,
            LoopEvent::DirectivesFound,
            LoopEvent::BatchComplete,
            LoopEvent::Continue,
        ] {
            state = state.transition(event).unwrap();
        }
        assert_eq!(state, LoopState::AwaitModel);
    }

    #[test]
    fn test_direct_answer_path() {
        let state = LoopState::AwaitModel
            .transition(LoopEvent::ResponseReceived)
            .unwrap()
            .transition(LoopEvent::NoDirectives)
            .unwrap();
        assert_eq!(state, LoopState::Finalize);
        assert_eq!(
            state.transition(LoopEvent::AnswerRecorded).unwrap(),
            LoopState::Done
        );
    }

    #[test]
    fn test_cap_goes_to_finalize() {
        assert_eq!(
            LoopState::FoldResults
                .transition(LoopEvent::IterationCapReached)
                .unwrap(),
            LoopState::Finalize
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(LoopState::AwaitModel.transition(LoopEvent::BatchComplete).is_err());
        assert!(LoopState::Parse.transition(LoopEvent::Continue).is_err());
        assert!(LoopState::ExecuteTools.transition(LoopEvent::NoDirectives).is_err());
        assert!(LoopState::Finalize.transition(LoopEvent::ResponseReceived).is_err());
    }

    #[test]
    fn test_terminal_state_absorbs() {
        assert!(LoopState::Done.is_terminal());
        for event in ALL_EVENTS {
            assert_eq!(LoopState::Done.transition(event).unwrap(), LoopState::Done);
        }
    }

    #[test]
    fn test_valid_events_match_transition_table() {
        for state in ALL_STATES {
            let valid = state.valid_events();
            for event in ALL_EVENTS {
                let accepted = state.transition(event).is_ok();
                if state.is_terminal() {
                    assert!(accepted);
                } else {
                    assert_eq!(accepted, valid.contains(&event), "{:?} on {:?}", state, event);
                }
            }
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(LoopState::ExecuteTools.display_name(), "Executing tools");
        assert_eq!(LoopState::Done.display_name(), "Done");
    }
}
