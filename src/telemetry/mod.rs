//! Telemetry for agent runs
//!
//! Collects loop and tool events in process and keeps aggregate counters.
//! Cheap to clone; every clone shares the same buffers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Loop events
    StateTransition {
        from: String,
        to: String,
        timestamp: Instant,
    },
    ModelCall {
        iteration: usize,
        duration_ms: u64,
        timestamp: Instant,
    },

    // Tool events
    ToolStarted {
        tool: String,
        timestamp: Instant,
    },
    ToolCompleted {
        tool: String,
        duration_ms: u64,
        success: bool,
        timestamp: Instant,
    },
    ParallelDispatch {
        tool_count: usize,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub model_calls: usize,
    pub tools_executed: usize,
    pub tools_succeeded: usize,
    pub tools_failed: usize,
    pub state_transitions: usize,
    pub parallel_dispatches: usize,
}

/// Telemetry collector
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

/// Poisoning only means another recorder panicked; counters stay usable.
fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = guard(&self.stats);
            match &event {
                TelemetryEvent::StateTransition { .. } => stats.state_transitions += 1,
                TelemetryEvent::ModelCall { .. } => stats.model_calls += 1,
                TelemetryEvent::ToolStarted { .. } => stats.tools_executed += 1,
                TelemetryEvent::ToolCompleted { success, .. } => {
                    if *success {
                        stats.tools_succeeded += 1;
                    } else {
                        stats.tools_failed += 1;
                    }
                }
                TelemetryEvent::ParallelDispatch { .. } => stats.parallel_dispatches += 1,
            }
        }

        guard(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        guard(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        guard(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = guard(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Calculate tool success rate
    pub fn tool_success_rate(&self) -> f64 {
        let stats = guard(&self.stats);
        let total = stats.tools_succeeded + stats.tools_failed;
        if total == 0 {
            1.0
        } else {
            stats.tools_succeeded as f64 / total as f64
        }
    }

    /// Multi-line summary for the CLI
    pub fn summary(&self) -> String {
        let stats = self.get_stats();
        format!(
            "Duration:          {:?}\nModel calls:       {}\nTools executed:    {}\nParallel batches:  {}\nSuccess rate:      {:.1}%",
            self.elapsed(),
            stats.model_calls,
            stats.tools_executed,
            stats.parallel_dispatches,
            self.tool_success_rate() * 100.0
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
