//! The adaptation engine: one entry point, six stages
//!
//! `trigger_adaptation` runs the full pipeline for one workflow and one
//! trigger. Runs for the same workflow are serialized behind a per-
//! workflow async mutex; runs for different workflows proceed
//! concurrently. Every run is recorded in history exactly once, however
//! it ends.

use crate::{
    apply_learning, approval_reasons, AdaptationStore, ApprovalGate, ExecutionTarget, Executor,
    ImpactAssessor, MetricsSink, NoopMetricsSink, Notifier, StrategySelector, TriggerEvaluator,
    TriggerVerdict, ValidationScores, WorkflowHistory,
};
use adaptation_types::{
    AdaptationConfig, AdaptationContext, AdaptationError, AdaptationId, AdaptationRecord,
    AdaptationResult, AdaptationStatus, AdaptationStrategy, AdaptationTrigger, ApprovalOutcome,
    ApprovalRequestId, Decision, EngineResult, ImpactAssessment, PendingApproval,
    PerformanceMetrics, RollbackPlan, TriggerRecord, WorkflowId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Store write attempts before a persistence failure becomes fatal.
const STORE_ATTEMPTS: u32 = 3;
/// Base backoff between store attempts; doubles per retry.
const STORE_BACKOFF_MS: u64 = 50;

/// Per-workflow mutable state, guarded by the per-workflow mutex.
struct WorkflowState {
    config: AdaptationConfig,
    history: WorkflowHistory,
}

struct WorkflowEntry {
    state: AsyncMutex<WorkflowState>,
    /// Set by `cancel_running`; checked between execution steps and
    /// cleared when the next run starts.
    cancel: AtomicBool,
}

/// A run parked at the approval gate, holding what is needed to resume
/// once a decision lands.
struct ParkedRun {
    workflow_id: WorkflowId,
    trigger: AdaptationTrigger,
    strategy: AdaptationStrategy,
    impact: ImpactAssessment,
    parked_at_ms: u64,
}

/// The engine. Cheap to share behind an `Arc`; all methods take `&self`.
pub struct AdaptationEngine {
    evaluator: TriggerEvaluator,
    assessor: ImpactAssessor,
    selector: StrategySelector,
    executor: Executor,
    gate: ApprovalGate,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn AdaptationStore>,
    metrics_sink: Arc<dyn MetricsSink>,
    workflows: Mutex<HashMap<WorkflowId, Arc<WorkflowEntry>>>,
    parked: Mutex<HashMap<ApprovalRequestId, ParkedRun>>,
}

impl AdaptationEngine {
    pub fn new(
        target: Arc<dyn ExecutionTarget>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn AdaptationStore>,
    ) -> Self {
        Self {
            evaluator: TriggerEvaluator,
            assessor: ImpactAssessor,
            selector: StrategySelector,
            executor: Executor::new(target),
            gate: ApprovalGate::new(notifier.clone()),
            notifier,
            store,
            metrics_sink: Arc::new(NoopMetricsSink),
            workflows: Mutex::new(HashMap::new()),
            parked: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics_sink = sink;
        self
    }

    pub fn with_validation_scores(mut self, scores: ValidationScores) -> Self {
        self.executor = self.executor.with_validation_scores(scores);
        self
    }

    /// Submit one trigger for one workflow and run the pipeline to its
    /// end state. Dismissals come back as a negative result and a store
    /// outage as a `status = Error` result; only rollback faults are
    /// `Err`.
    pub async fn trigger_adaptation(
        &self,
        workflow_id: WorkflowId,
        trigger: AdaptationTrigger,
        context: AdaptationContext,
    ) -> EngineResult<AdaptationResult> {
        let started = Instant::now();
        let entry = self.entry(&workflow_id);
        let mut state = entry.state.lock().await;
        // Cleared only once this run owns the workflow; a queued run
        // must not erase a cancellation aimed at the one executing.
        entry.cancel.store(false, Ordering::SeqCst);
        let now = Utc::now();

        info!(workflow = %workflow_id, %trigger, "adaptation triggered");

        // Stage 1: trigger evaluation.
        let verdict = self.evaluator.evaluate(
            &state.config,
            trigger,
            &context,
            state.history.last_accepted(trigger),
            now,
        );
        if let TriggerVerdict::Dismiss(reason) = verdict {
            let message = reason.to_string();
            info!(workflow = %workflow_id, %trigger, %message, "trigger dismissed");
            let trigger_record = TriggerRecord {
                workflow_id: workflow_id.clone(),
                trigger,
                fired_at: now,
                accepted: false,
                dismissal_reason: Some(message.clone()),
            };
            let persisted = self.persist_trigger(&trigger_record).await;
            state.history.record_trigger(trigger_record);
            if let Err(err) = persisted {
                return Ok(self
                    .store_down_result(&mut state, &workflow_id, trigger, err, started)
                    .await);
            }

            let elapsed_ms = started.elapsed().as_millis() as u64;
            let result = AdaptationResult::dismissed(message, elapsed_ms);
            self.finish_run(&mut state, &workflow_id, trigger, &result)
                .await;
            return Ok(result);
        }

        let trigger_record = TriggerRecord {
            workflow_id: workflow_id.clone(),
            trigger,
            fired_at: now,
            accepted: true,
            dismissal_reason: None,
        };
        let persisted = self.persist_trigger(&trigger_record).await;
        state.history.record_trigger(trigger_record);
        if let Err(err) = persisted {
            // Nothing has executed yet; end the run rather than change
            // workflow state the store cannot remember.
            return Ok(self
                .store_down_result(&mut state, &workflow_id, trigger, err, started)
                .await);
        }

        // Stage 2: impact assessment.
        let impact = self.assessor.assess(&state.config, trigger, &context);

        // Stage 3: strategy selection, driven by the assessed risk as
        // well as the impact level.
        let selection = self
            .selector
            .select(&state.config, trigger, &impact, &context);
        info!(
            workflow = %workflow_id,
            strategy = %selection.strategy,
            impact = %impact.overall,
            fell_back = selection.fell_back,
            "strategy selected"
        );

        // Stage 4: approval gate.
        let reasons = approval_reasons(&state.config, trigger, &impact);
        if !reasons.is_empty() {
            let request = ApprovalGate::build_request(
                workflow_id.clone(),
                trigger,
                selection.strategy,
                impact.clone(),
                reasons,
                &state.config.approval,
                now,
            );
            let request_id = request.id.clone();
            let elapsed_ms = started.elapsed().as_millis() as u64;
            self.parked
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(
                    request_id.clone(),
                    ParkedRun {
                        workflow_id: workflow_id.clone(),
                        trigger,
                        strategy: selection.strategy,
                        impact: impact.clone(),
                        parked_at_ms: elapsed_ms,
                    },
                );
            self.gate.submit(request, state.config.approval.clone()).await;

            let result = AdaptationResult {
                success: false,
                status: AdaptationStatus::PendingApproval,
                message: "adaptation parked pending human approval".to_string(),
                adaptation_id: None,
                approval_request_id: Some(request_id),
                strategy: Some(selection.strategy),
                impact: Some(impact),
                rollback_plan: None,
                monitoring_plan: None,
                execution: None,
                validation: None,
                execution_time_ms: elapsed_ms,
            };
            self.finish_run(&mut state, &workflow_id, trigger, &result)
                .await;
            return Ok(result);
        }

        // Stage 5: execution.
        let result = self
            .execute_adaptation(
                &mut state,
                &entry.cancel,
                &workflow_id,
                trigger,
                selection.strategy,
                impact,
                started,
            )
            .await?;
        Ok(result)
    }

    /// Apply a human decision to a pending approval. An approved run
    /// resumes execution immediately, on the caller's task.
    pub async fn decide_approval(
        &self,
        request_id: &ApprovalRequestId,
        decided_by: impl Into<String>,
        decision: Decision,
    ) -> EngineResult<AdaptationResult> {
        let outcome = self.gate.decide(request_id, decided_by, decision)?;
        self.gate.remove(request_id);
        let parked = self
            .parked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(request_id)
            .ok_or_else(|| AdaptationError::ApprovalNotFound(request_id.clone()))?;

        match outcome {
            ApprovalOutcome::Approved { by } => {
                info!(request = %request_id, approved_by = %by, "resuming approved adaptation");
                let entry = self.entry(&parked.workflow_id);
                let mut state = entry.state.lock().await;
                entry.cancel.store(false, Ordering::SeqCst);
                let started = Instant::now();
                self.execute_adaptation(
                    &mut state,
                    &entry.cancel,
                    &parked.workflow_id,
                    parked.trigger,
                    parked.strategy,
                    parked.impact,
                    started,
                )
                .await
            }
            ApprovalOutcome::Rejected { by, note } => {
                let message = match note {
                    Some(note) => format!("approval rejected by {}: {}", by, note),
                    None => format!("approval rejected by {}", by),
                };
                Ok(self
                    .record_unexecuted(&parked, AdaptationStatus::Failed, message)
                    .await)
            }
            // decide() never yields the timeout outcomes.
            ApprovalOutcome::TimedOut | ApprovalOutcome::EscalatedExternally => {
                Err(AdaptationError::ApprovalTimeout(request_id.clone()))
            }
        }
    }

    /// Sweep pending approvals: escalate expired levels and resolve
    /// requests whose final level timed out. Timed-out runs are
    /// recorded as failures; externally escalated runs stay parked and
    /// decidable through `decide_approval`.
    pub async fn run_escalations(&self) -> Vec<AdaptationResult> {
        let resolved = self.gate.run_escalations(Utc::now()).await;
        let mut results = Vec::new();
        for (request_id, outcome) in resolved {
            match outcome {
                ApprovalOutcome::TimedOut => {
                    self.gate.remove(&request_id);
                    let parked = self
                        .parked
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .remove(&request_id);
                    if let Some(parked) = parked {
                        warn!(request = %request_id, "approval timed out, rejecting by policy");
                        let result = self
                            .record_unexecuted(
                                &parked,
                                AdaptationStatus::Failed,
                                "approval request timed out and was auto-rejected".to_string(),
                            )
                            .await;
                        results.push(result);
                    }
                }
                ApprovalOutcome::EscalatedExternally => {
                    // The run stays parked and the request unsettled; the
                    // external channel decides through decide_approval.
                }
                ApprovalOutcome::Approved { .. } | ApprovalOutcome::Rejected { .. } => {}
            }
        }
        results
    }

    /// Replace a workflow's configuration after validating it.
    pub async fn update_config(
        &self,
        workflow_id: &WorkflowId,
        config: AdaptationConfig,
    ) -> EngineResult<()> {
        config.validate().map_err(AdaptationError::InvalidConfig)?;
        let entry = self.entry(workflow_id);
        let mut state = entry.state.lock().await;
        state.config = config;
        info!(workflow = %workflow_id, "adaptation config updated");
        Ok(())
    }

    pub async fn config(&self, workflow_id: &WorkflowId) -> AdaptationConfig {
        let entry = self.entry(workflow_id);
        let state = entry.state.lock().await;
        state.config.clone()
    }

    pub async fn metrics(&self, workflow_id: &WorkflowId) -> PerformanceMetrics {
        let entry = self.entry(workflow_id);
        let state = entry.state.lock().await;
        state.history.metrics
    }

    /// The most recent history records, newest first.
    pub async fn recent_records(
        &self,
        workflow_id: &WorkflowId,
        n: usize,
    ) -> Vec<AdaptationRecord> {
        let entry = self.entry(workflow_id);
        let state = entry.state.lock().await;
        state.history.adaptations.recent(n).cloned().collect()
    }

    pub fn pending_approvals(&self) -> Vec<PendingApproval> {
        self.gate.pending()
    }

    /// Ask a running execution for this workflow to stop at the next
    /// step boundary. A no-op when nothing is running.
    pub fn cancel_running(&self, workflow_id: &WorkflowId) {
        let entry = self.entry(workflow_id);
        entry.cancel.store(true, Ordering::SeqCst);
    }

    fn entry(&self, workflow_id: &WorkflowId) -> Arc<WorkflowEntry> {
        self.workflows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(workflow_id.clone())
            .or_insert_with(|| {
                Arc::new(WorkflowEntry {
                    state: AsyncMutex::new(WorkflowState {
                        config: AdaptationConfig::default(),
                        history: WorkflowHistory::default(),
                    }),
                    cancel: AtomicBool::new(false),
                })
            })
            .clone()
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_adaptation(
        &self,
        state: &mut WorkflowState,
        cancel: &AtomicBool,
        workflow_id: &WorkflowId,
        trigger: AdaptationTrigger,
        strategy: AdaptationStrategy,
        impact: ImpactAssessment,
        started: Instant,
    ) -> EngineResult<AdaptationResult> {
        let adaptation_id = AdaptationId::generate();
        let plan = Executor::build_plan(adaptation_id.clone());
        let rollback_plan = RollbackPlan::standard(adaptation_id.clone());
        let monitoring_plan =
            Executor::build_monitoring_plan(adaptation_id.clone(), &state.config.monitoring);

        let execution = self
            .executor
            .execute(
                workflow_id,
                &plan,
                &rollback_plan,
                &state.config.rollback,
                cancel,
            )
            .await;

        let (report, validation) = match execution {
            Ok(outcome) => outcome,
            Err(fatal) => {
                // Record the run before surfacing the fault.
                let record = AdaptationRecord {
                    adaptation_id: Some(adaptation_id),
                    workflow_id: workflow_id.clone(),
                    trigger,
                    strategy: Some(strategy),
                    impact: Some(impact.overall),
                    status: AdaptationStatus::Error,
                    message: fatal.to_string(),
                    recorded_at: Utc::now(),
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    effectiveness: 0.0,
                    realized_risk: 0.8,
                };
                state.history.record(record.clone());
                // Keep the original fault even if the store is down too.
                if let Err(persist_err) = self.persist_record(&record).await {
                    warn!(%persist_err, "failed to persist fatal run record");
                }
                return Err(fatal);
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let (status, success, message) = if report.succeeded {
            (
                AdaptationStatus::Completed,
                true,
                format!("adaptation completed with strategy {}", strategy),
            )
        } else {
            (
                AdaptationStatus::Failed,
                false,
                report
                    .rolled_back
                    .clone()
                    .unwrap_or_else(|| "execution failed".to_string()),
            )
        };

        let result = AdaptationResult {
            success,
            status,
            message,
            adaptation_id: Some(adaptation_id),
            approval_request_id: None,
            strategy: Some(strategy),
            impact: Some(impact),
            rollback_plan: Some(rollback_plan),
            monitoring_plan: Some(monitoring_plan),
            execution: Some(report),
            validation,
            execution_time_ms: elapsed_ms,
        };
        self.finish_run(state, workflow_id, trigger, &result).await;

        // Stage 6: learning, once per executed run.
        apply_learning(&mut state.config, &state.history);

        Ok(result)
    }

    /// End the run with a structured error result when the store stays
    /// down. The record is kept in memory; nothing executes.
    async fn store_down_result(
        &self,
        state: &mut WorkflowState,
        workflow_id: &WorkflowId,
        trigger: AdaptationTrigger,
        err: AdaptationError,
        started: Instant,
    ) -> AdaptationResult {
        warn!(workflow = %workflow_id, %err, "store unavailable, ending run");
        let result = AdaptationResult {
            success: false,
            status: AdaptationStatus::Error,
            message: err.to_string(),
            adaptation_id: None,
            approval_request_id: None,
            strategy: None,
            impact: None,
            rollback_plan: None,
            monitoring_plan: None,
            execution: None,
            validation: None,
            execution_time_ms: started.elapsed().as_millis() as u64,
        };
        self.finish_run(state, workflow_id, trigger, &result).await;
        result
    }

    /// Record and persist a run that never executed (rejected or timed
    /// out at the gate).
    async fn record_unexecuted(
        &self,
        parked: &ParkedRun,
        status: AdaptationStatus,
        message: String,
    ) -> AdaptationResult {
        let entry = self.entry(&parked.workflow_id);
        let mut state = entry.state.lock().await;
        let result = AdaptationResult {
            success: false,
            status,
            message,
            adaptation_id: None,
            approval_request_id: None,
            strategy: Some(parked.strategy),
            impact: Some(parked.impact.clone()),
            rollback_plan: None,
            monitoring_plan: None,
            execution: None,
            validation: None,
            execution_time_ms: parked.parked_at_ms,
        };
        self.finish_run(&mut state, &parked.workflow_id, parked.trigger, &result)
            .await;
        result
    }

    /// Fold the run into history, persist it, and publish metrics.
    /// Called exactly once per run. A store outage here is logged, not
    /// surfaced: the outcome already happened and must reach the
    /// caller, with the record retained in memory.
    async fn finish_run(
        &self,
        state: &mut WorkflowState,
        workflow_id: &WorkflowId,
        trigger: AdaptationTrigger,
        result: &AdaptationResult,
    ) {
        let (effectiveness, realized_risk) = match result.status {
            AdaptationStatus::Completed => (1.0, 0.1),
            AdaptationStatus::Failed if result.execution.is_some() => (0.0, 0.8),
            _ => (0.0, 0.0),
        };
        let record = AdaptationRecord {
            adaptation_id: result.adaptation_id.clone(),
            workflow_id: workflow_id.clone(),
            trigger,
            strategy: result.strategy,
            impact: result.impact.as_ref().map(|i| i.overall),
            status: result.status,
            message: result.message.clone(),
            recorded_at: Utc::now(),
            execution_time_ms: result.execution_time_ms,
            effectiveness,
            realized_risk,
        };
        state.history.record(record.clone());
        if let Err(err) = self.persist_record(&record).await {
            warn!(workflow = %workflow_id, %err, "failed to persist run record");
        }
        self.metrics_sink.publish(workflow_id, &state.history.metrics);
        if matches!(
            result.status,
            AdaptationStatus::Completed | AdaptationStatus::Failed
        ) {
            self.notifier
                .notify_outcome(workflow_id, &result.status.to_string(), &result.message)
                .await;
        }
    }

    async fn persist_record(&self, record: &AdaptationRecord) -> EngineResult<()> {
        self.with_retry(|| self.store.save_record(record)).await
    }

    async fn persist_trigger(&self, record: &TriggerRecord) -> EngineResult<()> {
        self.with_retry(|| self.store.save_trigger(record)).await
    }

    /// Retry a store write with doubling backoff. Exhausting the
    /// attempts surfaces the last persistence error, which is fatal.
    async fn with_retry<F, Fut>(&self, mut op: F) -> EngineResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = EngineResult<()>>,
    {
        let mut backoff_ms = STORE_BACKOFF_MS;
        let mut last_err = None;
        for attempt in 1..=STORE_ATTEMPTS {
            match op().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(attempt, %err, "store write failed");
                    last_err = Some(err);
                    if attempt < STORE_ATTEMPTS {
                        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                        backoff_ms *= 2;
                    }
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| AdaptationError::Persistence("store write failed".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, MockExecutionTarget, MockNotifier};
    use adaptation_types::{MetricDelta, TimeoutAction};
    use chrono::{TimeZone, Timelike};

    fn off_hours_context() -> AdaptationContext {
        AdaptationContext::new(Utc.with_ymd_and_hms(2026, 3, 10, 3, 0, 0).unwrap())
    }

    fn engine() -> (
        AdaptationEngine,
        Arc<MockExecutionTarget>,
        Arc<MockNotifier>,
        Arc<MemoryStore>,
    ) {
        let target = Arc::new(MockExecutionTarget::new());
        let notifier = Arc::new(MockNotifier::new());
        let store = Arc::new(MemoryStore::new());
        (
            AdaptationEngine::new(target.clone(), notifier.clone(), store.clone()),
            target,
            notifier,
            store,
        )
    }

    #[tokio::test]
    async fn autonomous_run_completes_and_learns() {
        let (engine, target, _, store) = engine();
        let wf = WorkflowId::new("wf-1");
        let context = off_hours_context().with_performance(MetricDelta::of(0.2));

        let result = engine
            .trigger_adaptation(wf.clone(), AdaptationTrigger::PerformanceDegradation, context)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, AdaptationStatus::Completed);
        assert!(result.adaptation_id.is_some());
        assert!(result.validation.unwrap().passed());
        assert_eq!(target.applied(), vec!["step_1", "step_2", "step_3"]);

        // Recorded once, persisted, metrics updated.
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.triggers().len(), 1);
        let metrics = engine.metrics(&wf).await;
        assert_eq!(metrics.total_adaptations, 1);
        assert_eq!(metrics.successful_adaptations, 1);

        // Learning tightened thresholds after a clean success.
        let config = engine.config(&wf).await;
        assert!((config.thresholds.performance_degradation - 0.15 * 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn dismissed_trigger_is_recorded_without_side_effects() {
        let (engine, target, _, store) = engine();
        let wf = WorkflowId::new("wf-1");
        // Below the 0.15 threshold.
        let context = off_hours_context().with_performance(MetricDelta::of(0.05));

        let result = engine
            .trigger_adaptation(wf.clone(), AdaptationTrigger::PerformanceDegradation, context)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, AdaptationStatus::Failed);
        assert!(result.adaptation_id.is_none());
        assert!(target.applied().is_empty());

        // Still recorded exactly once, and the trigger dismissal kept.
        assert_eq!(store.records().len(), 1);
        let triggers = store.triggers();
        assert_eq!(triggers.len(), 1);
        assert!(!triggers[0].accepted);
        assert!(triggers[0].dismissal_reason.is_some());

        // Dismissals do not move thresholds.
        let config = engine.config(&wf).await;
        assert_eq!(config.thresholds.performance_degradation, 0.15);
    }

    #[tokio::test]
    async fn cooldown_dismisses_rapid_repeat() {
        let (engine, _, _, _) = engine();
        let wf = WorkflowId::new("wf-1");
        let context = off_hours_context().with_performance(MetricDelta::of(0.3));

        let first = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::PerformanceDegradation,
                context.clone(),
            )
            .await
            .unwrap();
        assert_eq!(first.status, AdaptationStatus::Completed);

        let second = engine
            .trigger_adaptation(wf, AdaptationTrigger::PerformanceDegradation, context)
            .await
            .unwrap();
        assert_eq!(second.status, AdaptationStatus::Failed);
        assert!(second.message.contains("cooldown"));
    }

    #[tokio::test]
    async fn always_approve_trigger_parks_then_executes_on_approval() {
        let (engine, target, notifier, store) = engine();
        let wf = WorkflowId::new("wf-1");
        // CostOverrun is not active by default; enable it.
        let config = AdaptationConfig::default().with_trigger(AdaptationTrigger::CostOverrun);
        engine.update_config(&wf, config).await.unwrap();

        let context = off_hours_context().with_cost(MetricDelta::of(0.3));
        let result = engine
            .trigger_adaptation(wf.clone(), AdaptationTrigger::CostOverrun, context)
            .await
            .unwrap();

        assert_eq!(result.status, AdaptationStatus::PendingApproval);
        let request_id = result.approval_request_id.unwrap();
        assert!(target.applied().is_empty());
        assert_eq!(notifier.requested_count(), 1);
        assert_eq!(engine.pending_approvals().len(), 1);
        // The parked run was recorded.
        assert_eq!(store.records().len(), 1);

        let resumed = engine
            .decide_approval(&request_id, "technical_lead", Decision::Approved)
            .await
            .unwrap();
        assert_eq!(resumed.status, AdaptationStatus::Completed);
        assert_eq!(target.applied(), vec!["step_1", "step_2", "step_3"]);
        assert!(engine.pending_approvals().is_empty());
        // Pending + completed: two records.
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn rejected_approval_never_executes() {
        let (engine, target, _, _) = engine();
        let wf = WorkflowId::new("wf-1");
        let config = AdaptationConfig::default()
            .with_trigger(AdaptationTrigger::CostOverrun)
            .with_autonomous(false);
        engine.update_config(&wf, config).await.unwrap();

        let result = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::CostOverrun,
                off_hours_context().with_cost(MetricDelta::of(0.3)),
            )
            .await
            .unwrap();
        let request_id = result.approval_request_id.unwrap();

        let rejected = engine
            .decide_approval(
                &request_id,
                "business_owner",
                Decision::Rejected {
                    note: Some("hold until quarter close".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, AdaptationStatus::Failed);
        assert!(rejected.message.contains("rejected by business_owner"));
        assert!(target.applied().is_empty());
    }

    #[tokio::test]
    async fn execution_failure_rolls_back_and_records() {
        let target = Arc::new(MockExecutionTarget::new().failing_at("step_2"));
        let store = Arc::new(MemoryStore::new());
        let engine = AdaptationEngine::new(
            target.clone(),
            Arc::new(MockNotifier::new()),
            store.clone(),
        );
        let wf = WorkflowId::new("wf-1");

        let result = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::PerformanceDegradation,
                off_hours_context().with_performance(MetricDelta::of(0.3)),
            )
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, AdaptationStatus::Failed);
        assert!(result.message.starts_with("execution_error:"));
        assert_eq!(target.rolled_back(), vec!["step_1"]);

        let metrics = engine.metrics(&wf).await;
        assert_eq!(metrics.failed_adaptations, 1);
        // One failed run at effectiveness 0 loosens thresholds.
        let config = engine.config(&wf).await;
        assert!((config.thresholds.performance_degradation - 0.15 * 1.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn store_retries_transient_failures() {
        let target = Arc::new(MockExecutionTarget::new());
        let store = Arc::new(MemoryStore::new().failing_next(2));
        let engine = AdaptationEngine::new(
            target,
            Arc::new(MockNotifier::new()),
            store.clone(),
        );

        let result = engine
            .trigger_adaptation(
                WorkflowId::new("wf-1"),
                AdaptationTrigger::PerformanceDegradation,
                off_hours_context().with_performance(MetricDelta::of(0.3)),
            )
            .await
            .unwrap();
        assert_eq!(result.status, AdaptationStatus::Completed);
        assert_eq!(store.triggers().len(), 1);
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_error_result() {
        let target = Arc::new(MockExecutionTarget::new());
        let store = Arc::new(MemoryStore::new().failing_next(10));
        let engine = AdaptationEngine::new(
            target.clone(),
            Arc::new(MockNotifier::new()),
            store.clone(),
        );
        let wf = WorkflowId::new("wf-1");

        let result = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::PerformanceDegradation,
                off_hours_context().with_performance(MetricDelta::of(0.3)),
            )
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, AdaptationStatus::Error);
        assert!(result.message.contains("persistence failure"));
        // The run stopped before execution and was kept in memory.
        assert!(target.applied().is_empty());
        assert!(store.records().is_empty());
        let records = engine.recent_records(&wf, 10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AdaptationStatus::Error);
    }

    #[tokio::test]
    async fn completed_result_survives_store_outage() {
        // The first write (the trigger record) lands, then the store
        // dies for the rest of the run.
        let target = Arc::new(MockExecutionTarget::new());
        let store = Arc::new(MemoryStore::new().failing_from(1));
        let engine = AdaptationEngine::new(
            target.clone(),
            Arc::new(MockNotifier::new()),
            store.clone(),
        );
        let wf = WorkflowId::new("wf-1");

        let result = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::PerformanceDegradation,
                off_hours_context().with_performance(MetricDelta::of(0.3)),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, AdaptationStatus::Completed);
        assert_eq!(target.applied(), vec!["step_1", "step_2", "step_3"]);
        // The store missed the run record but history kept it.
        assert_eq!(store.triggers().len(), 1);
        assert!(store.records().is_empty());
        let records = engine.recent_records(&wf, 10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AdaptationStatus::Completed);
    }

    #[tokio::test]
    async fn invalid_config_update_is_rejected() {
        let (engine, _, _, _) = engine();
        let wf = WorkflowId::new("wf-1");
        let mut config = AdaptationConfig::default();
        config.risk_tolerance = 2.0;
        let err = engine.update_config(&wf, config).await.unwrap_err();
        assert!(matches!(err, AdaptationError::InvalidConfig(_)));
        // The old config is untouched.
        assert_eq!(engine.config(&wf).await.risk_tolerance, 0.5);
    }

    #[tokio::test]
    async fn workflows_are_isolated() {
        let (engine, _, _, _) = engine();
        let context = off_hours_context().with_performance(MetricDelta::of(0.3));

        engine
            .trigger_adaptation(
                WorkflowId::new("wf-a"),
                AdaptationTrigger::PerformanceDegradation,
                context.clone(),
            )
            .await
            .unwrap();
        // Same trigger on a different workflow is not in cooldown.
        let result = engine
            .trigger_adaptation(
                WorkflowId::new("wf-b"),
                AdaptationTrigger::PerformanceDegradation,
                context,
            )
            .await
            .unwrap();
        assert_eq!(result.status, AdaptationStatus::Completed);
        assert_eq!(engine.metrics(&WorkflowId::new("wf-a")).await.total_adaptations, 1);
        assert_eq!(engine.metrics(&WorkflowId::new("wf-b")).await.total_adaptations, 1);
    }

    #[tokio::test]
    async fn recent_records_are_newest_first() {
        let (engine, _, _, _) = engine();
        let wf = WorkflowId::new("wf-1");
        let context = off_hours_context().with_performance(MetricDelta::of(0.3));

        engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::PerformanceDegradation,
                context,
            )
            .await
            .unwrap();
        engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::UserFeedback,
                off_hours_context(),
            )
            .await
            .unwrap();

        let records = engine.recent_records(&wf, 10).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].trigger, AdaptationTrigger::UserFeedback);
    }

    #[tokio::test]
    async fn timed_out_approval_is_auto_rejected() {
        let (engine, target, _, store) = engine();
        let wf = WorkflowId::new("wf-1");
        let mut config = AdaptationConfig::default().with_trigger(AdaptationTrigger::CostOverrun);
        config.approval.level_timeouts_secs = [1, 1, 1];
        engine.update_config(&wf, config).await.unwrap();

        // Severe cost overrun: Critical impact parks at level 3.
        let result = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::CostOverrun,
                off_hours_context().with_cost(MetricDelta::of(1.0)),
            )
            .await
            .unwrap();
        assert_eq!(result.status, AdaptationStatus::PendingApproval);

        tokio::time::sleep(std::time::Duration::from_millis(1_200)).await;
        let resolved = engine.run_escalations().await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, AdaptationStatus::Failed);
        assert!(resolved[0].message.contains("timed out"));
        assert!(target.applied().is_empty());
        assert!(engine.pending_approvals().is_empty());
        // Parked run and its timeout both recorded.
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn externally_escalated_approval_stays_decidable() {
        let (engine, target, notifier, store) = engine();
        let wf = WorkflowId::new("wf-1");
        let mut config = AdaptationConfig::default().with_trigger(AdaptationTrigger::CostOverrun);
        config.approval.level_timeouts_secs = [1, 1, 1];
        config.approval.timeout_action = TimeoutAction::EscalateExternally;
        engine.update_config(&wf, config).await.unwrap();

        let result = engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::CostOverrun,
                off_hours_context().with_cost(MetricDelta::of(1.0)),
            )
            .await
            .unwrap();
        assert_eq!(result.status, AdaptationStatus::PendingApproval);
        let request_id = result.approval_request_id.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1_200)).await;
        let resolved = engine.run_escalations().await;
        // Handed off, not settled: the request and the parked run live on.
        assert!(resolved.is_empty());
        assert_eq!(notifier.external_count(), 1);
        assert_eq!(engine.pending_approvals().len(), 1);
        assert!(target.applied().is_empty());

        // The external channel decides through the normal path.
        let resumed = engine
            .decide_approval(&request_id, "external_board", Decision::Approved)
            .await
            .unwrap();
        assert_eq!(resumed.status, AdaptationStatus::Completed);
        assert_eq!(target.applied(), vec!["step_1", "step_2", "step_3"]);
        assert!(engine.pending_approvals().is_empty());
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn queued_run_does_not_erase_cancellation() {
        let target = Arc::new(MockExecutionTarget::new().pausing_at("step_2"));
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(AdaptationEngine::new(
            target.clone(),
            Arc::new(MockNotifier::new()),
            store,
        ));
        let wf = WorkflowId::new("wf-1");
        let context = off_hours_context().with_performance(MetricDelta::of(0.3));

        let running = {
            let engine = engine.clone();
            let wf = wf.clone();
            let context = context.clone();
            tokio::spawn(async move {
                engine
                    .trigger_adaptation(wf, AdaptationTrigger::PerformanceDegradation, context)
                    .await
            })
        };
        // Wait until the run is paused inside step_2.
        for _ in 0..200 {
            if target.applied().len() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(target.applied(), vec!["step_1"]);

        // A second trigger queues behind the workflow lock; it must not
        // clear the cancellation aimed at the running execution.
        let queued = {
            let engine = engine.clone();
            let wf = wf.clone();
            let context = context.clone();
            tokio::spawn(async move {
                engine
                    .trigger_adaptation(wf, AdaptationTrigger::PerformanceDegradation, context)
                    .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        engine.cancel_running(&wf);
        target.release();

        let cancelled = running.await.unwrap().unwrap();
        assert_eq!(cancelled.status, AdaptationStatus::Failed);
        assert!(cancelled.message.contains("cancelled"));
        assert_eq!(target.rolled_back(), vec!["step_2", "step_1"]);

        // The queued run started with a clean flag and hit the cooldown.
        let second = queued.await.unwrap().unwrap();
        assert_eq!(second.status, AdaptationStatus::Failed);
        assert!(second.message.contains("cooldown"));
    }

    #[tokio::test]
    async fn outcomes_are_notified() {
        let (engine, _, notifier, _) = engine();
        let wf = WorkflowId::new("wf-1");
        engine
            .trigger_adaptation(
                wf.clone(),
                AdaptationTrigger::PerformanceDegradation,
                off_hours_context().with_performance(MetricDelta::of(0.3)),
            )
            .await
            .unwrap();
        let outcomes = notifier.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].0, wf);
        assert_eq!(outcomes[0].1, "completed");
    }

    #[tokio::test]
    async fn same_workflow_runs_are_serialized() {
        let (engine, _, _, store) = engine();
        let engine = Arc::new(engine);
        let wf = WorkflowId::new("wf-1");
        let context = off_hours_context().with_performance(MetricDelta::of(0.3));

        let a = {
            let engine = engine.clone();
            let wf = wf.clone();
            let context = context.clone();
            tokio::spawn(async move {
                engine
                    .trigger_adaptation(wf, AdaptationTrigger::PerformanceDegradation, context)
                    .await
            })
        };
        let b = {
            let engine = engine.clone();
            let wf = wf.clone();
            let context = context.clone();
            tokio::spawn(async move {
                engine
                    .trigger_adaptation(wf, AdaptationTrigger::PerformanceDegradation, context)
                    .await
            })
        };
        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        // Whichever ran first completed; the other hit the cooldown.
        let statuses = [first.status, second.status];
        assert!(statuses.contains(&AdaptationStatus::Completed));
        assert!(statuses.contains(&AdaptationStatus::Failed));
        // Both runs were recorded, with no interleaving lost updates.
        assert_eq!(store.records().len(), 2);
        assert_eq!(engine.metrics(&wf).await.total_adaptations, 2);
    }

    #[tokio::test]
    async fn off_hours_context_is_off_hours() {
        assert_eq!(off_hours_context().detected_at.hour(), 3);
    }
}
