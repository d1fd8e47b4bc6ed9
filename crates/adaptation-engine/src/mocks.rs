//! In-memory fakes for the engine's seams
//!
//! Used throughout the test suite and useful as stand-ins while wiring
//! the engine into a new service.

use crate::{AdaptationStore, ExecutionTarget, Notifier};
use adaptation_types::{
    AdaptationError, AdaptationRecord, ApprovalRequest, EngineResult, ExecutionStep,
    TriggerRecord, WorkflowId,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Execution target that records every call and can be told to fail a
/// specific step, pause on a specific step, or fail rollback entirely.
pub struct MockExecutionTarget {
    applied: Mutex<Vec<String>>,
    rolled_back: Mutex<Vec<String>>,
    fail_step: Option<String>,
    fail_rollback: bool,
    pause_step: Option<String>,
    release: Semaphore,
}

impl Default for MockExecutionTarget {
    fn default() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            rolled_back: Mutex::new(Vec::new()),
            fail_step: None,
            fail_rollback: false,
            pause_step: None,
            release: Semaphore::new(0),
        }
    }
}

impl MockExecutionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when applying the step with this id.
    pub fn failing_at(mut self, step_id: impl Into<String>) -> Self {
        self.fail_step = Some(step_id.into());
        self
    }

    /// Fail every rollback call.
    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Block when applying the step with this id until `release` is
    /// called.
    pub fn pausing_at(mut self, step_id: impl Into<String>) -> Self {
        self.pause_step = Some(step_id.into());
        self
    }

    /// Let one paused `apply_step` call proceed.
    pub fn release(&self) {
        self.release.add_permits(1);
    }

    /// Step ids applied so far, in order.
    pub fn applied(&self) -> Vec<String> {
        lock(&self.applied).clone()
    }

    /// Step ids rolled back so far, in order.
    pub fn rolled_back(&self) -> Vec<String> {
        lock(&self.rolled_back).clone()
    }
}

#[async_trait]
impl ExecutionTarget for MockExecutionTarget {
    async fn apply_step(
        &self,
        _workflow_id: &WorkflowId,
        step: &ExecutionStep,
    ) -> Result<(), String> {
        if self.pause_step.as_deref() == Some(step.id.as_str()) {
            // Acquire fails only if the semaphore is closed, which the
            // mock never does.
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }
        if self.fail_step.as_deref() == Some(step.id.as_str()) {
            return Err(format!("injected failure at {}", step.id));
        }
        lock(&self.applied).push(step.id.clone());
        Ok(())
    }

    async fn rollback_step(
        &self,
        _workflow_id: &WorkflowId,
        step: &ExecutionStep,
    ) -> Result<(), String> {
        if self.fail_rollback {
            return Err(format!("injected rollback failure at {}", step.id));
        }
        lock(&self.rolled_back).push(step.id.clone());
        Ok(())
    }
}

/// Notifier that counts deliveries and keeps the requests it saw.
#[derive(Default)]
pub struct MockNotifier {
    requested: Mutex<Vec<ApprovalRequest>>,
    escalated: Mutex<Vec<(ApprovalRequest, u8)>>,
    external: Mutex<Vec<ApprovalRequest>>,
    outcomes: Mutex<Vec<(WorkflowId, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested_count(&self) -> usize {
        lock(&self.requested).len()
    }

    pub fn escalated_count(&self) -> usize {
        lock(&self.escalated).len()
    }

    pub fn external_count(&self) -> usize {
        lock(&self.external).len()
    }

    pub fn last_request(&self) -> Option<ApprovalRequest> {
        lock(&self.requested).last().cloned()
    }

    pub fn outcomes(&self) -> Vec<(WorkflowId, String)> {
        lock(&self.outcomes).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_approval_requested(&self, request: &ApprovalRequest, _approvers: &[String]) {
        lock(&self.requested).push(request.clone());
    }

    async fn notify_escalated(&self, request: &ApprovalRequest, level: u8, _approvers: &[String]) {
        lock(&self.escalated).push((request.clone(), level));
    }

    async fn notify_external_escalation(&self, request: &ApprovalRequest) {
        lock(&self.external).push(request.clone());
    }

    async fn notify_outcome(&self, workflow_id: &WorkflowId, status: &str, _message: &str) {
        lock(&self.outcomes).push((workflow_id.clone(), status.to_string()));
    }
}

/// Store backed by vectors, with injected failure modes so retry and
/// outage behavior can be exercised.
pub struct MemoryStore {
    records: Mutex<Vec<AdaptationRecord>>,
    triggers: Mutex<Vec<TriggerRecord>>,
    remaining_failures: AtomicUsize,
    fail_from: AtomicUsize,
    writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            triggers: Mutex::new(Vec::new()),
            remaining_failures: AtomicUsize::new(0),
            fail_from: AtomicUsize::new(usize::MAX),
            writes: AtomicUsize::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` writes before succeeding again.
    pub fn failing_next(self, n: usize) -> Self {
        self.remaining_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Succeed the first `n` writes, then fail every later one.
    pub fn failing_from(self, n: usize) -> Self {
        self.fail_from.store(n, Ordering::SeqCst);
        self
    }

    pub fn records(&self) -> Vec<AdaptationRecord> {
        lock(&self.records).clone()
    }

    pub fn triggers(&self) -> Vec<TriggerRecord> {
        lock(&self.triggers).clone()
    }

    fn maybe_fail(&self) -> EngineResult<()> {
        let seen = self.writes.fetch_add(1, Ordering::SeqCst);
        if seen >= self.fail_from.load(Ordering::SeqCst) {
            return Err(AdaptationError::Persistence(
                "injected store failure".to_string(),
            ));
        }
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AdaptationError::Persistence(
                "injected store failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AdaptationStore for MemoryStore {
    async fn save_record(&self, record: &AdaptationRecord) -> EngineResult<()> {
        self.maybe_fail()?;
        lock(&self.records).push(record.clone());
        Ok(())
    }

    async fn save_trigger(&self, record: &TriggerRecord) -> EngineResult<()> {
        self.maybe_fail()?;
        lock(&self.triggers).push(record.clone());
        Ok(())
    }
}
