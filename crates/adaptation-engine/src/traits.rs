//! Seams to the outside world
//!
//! The engine never touches workflow state, notification channels, or
//! storage directly. Everything crosses one of these traits, so tests
//! run against in-memory fakes and production wires in real adapters.

use adaptation_types::{
    AdaptationRecord, ApprovalRequest, EngineResult, ExecutionStep, PerformanceMetrics,
    TriggerRecord, WorkflowId,
};
use async_trait::async_trait;

/// Applies plan steps to the real workflow. The only seam that mutates
/// workflow state.
#[async_trait]
pub trait ExecutionTarget: Send + Sync {
    /// Apply one step's actions. An `Err` is a step failure and, by
    /// policy, triggers rollback of everything applied so far.
    async fn apply_step(&self, workflow_id: &WorkflowId, step: &ExecutionStep)
        -> Result<(), String>;

    /// Undo one previously applied step.
    async fn rollback_step(
        &self,
        workflow_id: &WorkflowId,
        step: &ExecutionStep,
    ) -> Result<(), String>;
}

/// Delivers approval requests and escalation notices to humans.
/// Delivery failure is logged, never fatal; the pending approval still
/// exists and can be decided through the admin surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_approval_requested(&self, request: &ApprovalRequest, approvers: &[String]);

    async fn notify_escalated(&self, request: &ApprovalRequest, level: u8, approvers: &[String]);

    /// Fired when policy hands a timed-out request to an external
    /// channel instead of auto-rejecting it.
    async fn notify_external_escalation(&self, request: &ApprovalRequest);

    /// Fired after every completed or failed run, so stakeholders hear
    /// about outcomes without polling history.
    async fn notify_outcome(&self, workflow_id: &WorkflowId, status: &str, message: &str);
}

/// Durable storage for history records. Writes are retried with
/// backoff; exhausting retries is a fatal `Persistence` error.
#[async_trait]
pub trait AdaptationStore: Send + Sync {
    async fn save_record(&self, record: &AdaptationRecord) -> EngineResult<()>;

    async fn save_trigger(&self, record: &TriggerRecord) -> EngineResult<()>;
}

/// Receives aggregate metrics after each run. Optional; the default
/// sink drops everything.
pub trait MetricsSink: Send + Sync {
    fn publish(&self, workflow_id: &WorkflowId, metrics: &PerformanceMetrics);
}

/// A sink that ignores all metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn publish(&self, _workflow_id: &WorkflowId, _metrics: &PerformanceMetrics) {}
}
