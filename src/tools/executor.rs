//! Parallel dispatcher for tool batches
//!
//! Fan-out/fan-in execution of independent tool requests:
//! - At most `max_parallel` invocations in flight (semaphore-bounded)
//! - Barrier semantics: a batch returns only when every request finished
//! - `result[i]` always answers `request[i]`, whatever the completion order
//! - A failing slot never cancels its siblings

use crate::errors::AgentError;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{ToolOutcome, ToolRequest};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Default worker pool size
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Default per-invocation timeout
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Bounded parallel executor over a tool registry
#[derive(Debug, Clone)]
pub struct ParallelDispatcher {
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,

    /// Tool registry
    registry: Arc<ToolRegistry>,

    /// Pool size the semaphore was built with
    max_parallel: usize,

    /// Hard limit for one invocation
    timeout: Duration,

    /// Optional event sink
    telemetry: Option<TelemetryCollector>,
}

impl ParallelDispatcher {
    /// Create dispatcher with default pool size and timeout
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_PARALLEL)),
            registry,
            max_parallel: DEFAULT_MAX_PARALLEL,
            timeout: DEFAULT_TOOL_TIMEOUT,
            telemetry: None,
        }
    }

    /// Set the worker pool size (at least one)
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        let max_parallel = max_parallel.max(1);
        self.semaphore = Arc::new(Semaphore::new(max_parallel));
        self.max_parallel = max_parallel;
        self
    }

    /// Set the per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a telemetry collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Execute one request through the pool
    pub async fn execute(&self, request: ToolRequest) -> ToolOutcome {
        run_gated(
            self.semaphore.clone(),
            self.registry.clone(),
            request,
            self.timeout,
            self.telemetry.clone(),
        )
        .await
    }

    /// Execute a batch concurrently and return outcomes in submission order
    pub async fn dispatch_batch(&self, requests: Vec<ToolRequest>) -> Vec<ToolOutcome> {
        if requests.is_empty() {
            return Vec::new();
        }

        debug!(count = requests.len(), pool = self.max_parallel, "dispatching tool batch");
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::ParallelDispatch {
                tool_count: requests.len(),
                timestamp: Instant::now(),
            });
        }

        let names: Vec<String> = requests.iter().map(|r| r.tool.clone()).collect();
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                tokio::spawn(run_gated(
                    self.semaphore.clone(),
                    self.registry.clone(),
                    request,
                    self.timeout,
                    self.telemetry.clone(),
                ))
            })
            .collect();

        // join_all keeps the handle order, which is the submission order
        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, tool)| {
                joined.unwrap_or_else(|e| {
                    warn!(tool = %tool, error = %e, "tool task aborted");
                    ToolOutcome::failure(tool, format!("tool task aborted: {}", e), Duration::ZERO)
                })
            })
            .collect()
    }

    /// Get registry reference
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Mutable registry access; copies the registry if a batch still holds it
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        Arc::make_mut(&mut self.registry)
    }

    /// Get current parallelism limit
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Get per-invocation timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Acquire a permit, then run the request
async fn run_gated(
    semaphore: Arc<Semaphore>,
    registry: Arc<ToolRegistry>,
    request: ToolRequest,
    timeout: Duration,
    telemetry: Option<TelemetryCollector>,
) -> ToolOutcome {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return ToolOutcome::failure(request.tool, e.to_string(), Duration::ZERO);
        }
    };
    run_one(&registry, request, timeout, telemetry.as_ref()).await
}

/// Look up and invoke a single tool, capturing every failure as an outcome
async fn run_one(
    registry: &ToolRegistry,
    request: ToolRequest,
    timeout: Duration,
    telemetry: Option<&TelemetryCollector>,
) -> ToolOutcome {
    let ToolRequest { tool: name, input } = request;

    let Some(tool) = registry.lookup(&name) else {
        warn!(tool = %name, "unknown tool requested");
        let err = AgentError::ToolNotFound(name.clone());
        return ToolOutcome::failure(name, err.to_string(), Duration::ZERO);
    };

    if let Some(t) = telemetry {
        t.record(TelemetryEvent::ToolStarted {
            tool: name.clone(),
            timestamp: Instant::now(),
        });
    }

    let start = Instant::now();
    let outcome = match tokio::time::timeout(timeout, tool.invoke(&input)).await {
        Ok(Ok(output)) => ToolOutcome::success(name, output, start.elapsed()),
        Ok(Err(e)) => ToolOutcome::failure(name, e.to_string(), start.elapsed()),
        Err(_) => {
            let err = AgentError::Timeout {
                duration_ms: timeout.as_millis() as u64,
            };
            ToolOutcome::failure(name, err.to_string(), start.elapsed())
        }
    };

    debug!(
        tool = %outcome.tool,
        success = outcome.success,
        duration_ms = outcome.duration_ms,
        "tool finished"
    );
    if let Some(t) = telemetry {
        t.record(TelemetryEvent::ToolCompleted {
            tool: outcome.tool.clone(),
            duration_ms: outcome.duration_ms,
            success: outcome.success,
            timestamp: Instant::now(),
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::tools::registry::Tool;
    use crate::tools::types::ToolInput;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sleeps for the number of milliseconds given as input, then echoes it
    struct Sleeper {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for Sleeper {
        fn name(&self) -> &str {
            "sleep"
        }

        fn description(&self) -> &str {
            "Sleep for N milliseconds"
        }

        async fn invoke(&self, input: &ToolInput) -> Result<String> {
            let ms: u64 = input.text().unwrap_or("0").parse().unwrap_or(0);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("slept {}", ms))
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "fail"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn invoke(&self, _input: &ToolInput) -> Result<String> {
            Err(AgentError::tool("fail", "boom"))
        }
    }

    fn setup() -> (ParallelDispatcher, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with_tool(Sleeper {
                running: Arc::new(AtomicUsize::new(0)),
                peak: peak.clone(),
            })
            .with_tool(Failing);
        (ParallelDispatcher::new(Arc::new(registry)), peak)
    }

    #[test]
    fn test_dispatcher_defaults() {
        let (dispatcher, _) = setup();
        assert_eq!(dispatcher.max_parallel(), 4);
        assert_eq!(dispatcher.timeout(), Duration::from_secs(60));
        assert_eq!(dispatcher.with_max_parallel(0).max_parallel(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (dispatcher, _) = setup();
        assert!(dispatcher.dispatch_batch(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let (dispatcher, _) = setup();

        // Request 0 finishes last
        let requests = vec![
            ToolRequest::new("sleep", "120"),
            ToolRequest::new("sleep", "10"),
            ToolRequest::new("sleep", "40"),
        ];
        let outcomes = dispatcher.dispatch_batch(requests).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].output, "slept 120");
        assert_eq!(outcomes[1].output, "slept 10");
        assert_eq!(outcomes[2].output, "slept 40");
    }

    #[tokio::test]
    async fn test_semaphore_limiting() {
        let (dispatcher, peak) = setup();
        let dispatcher = dispatcher.with_max_parallel(2);

        let requests = (0..6).map(|_| ToolRequest::new("sleep", "30")).collect();
        let outcomes = dispatcher.dispatch_batch(requests).await;

        assert!(outcomes.iter().all(|o| o.success));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let (dispatcher, _) = setup();

        let requests = vec![
            ToolRequest::new("fail", "x"),
            ToolRequest::new("sleep", "5"),
            ToolRequest::new("nonexistent", "x"),
        ];
        let outcomes = dispatcher.dispatch_batch(requests).await;

        assert!(!outcomes[0].success);
        assert!(outcomes[0].error.as_deref().unwrap().contains("boom"));
        assert!(outcomes[1].success);
        assert!(!outcomes[2].success);
        assert!(outcomes[2].error.as_deref().unwrap().contains("not found"));
        assert_eq!(outcomes[2].tool, "nonexistent");
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let (dispatcher, _) = setup();
        let dispatcher = dispatcher.with_timeout(Duration::from_millis(20));

        let outcome = dispatcher.execute(ToolRequest::new("sleep", "500")).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_telemetry_records_batch() {
        let (dispatcher, _) = setup();
        let telemetry = TelemetryCollector::new();
        let dispatcher = dispatcher.with_telemetry(telemetry.clone());

        dispatcher
            .dispatch_batch(vec![ToolRequest::new("sleep", "1"), ToolRequest::new("fail", "")])
            .await;

        let stats = telemetry.get_stats();
        assert_eq!(stats.parallel_dispatches, 1);
        assert_eq!(stats.tools_executed, 2);
        assert_eq!(stats.tools_succeeded, 1);
        assert_eq!(stats.tools_failed, 1);
    }

    #[test]
    fn test_registry_mut_registers_tool() {
        let mut dispatcher = ParallelDispatcher::new(Arc::new(ToolRegistry::new()));
        dispatcher.registry_mut().register(Arc::new(Failing));
        assert!(dispatcher.registry().contains("fail"));
    }
}
