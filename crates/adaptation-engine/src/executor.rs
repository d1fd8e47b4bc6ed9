//! Execution engine, the pipeline's fifth stage
//!
//! Builds the three-step plan for an approved adaptation, applies it
//! through the `ExecutionTarget` seam with a per-step timeout, validates
//! the result, and rolls back on failure. A rollback that itself fails
//! is the one fault that always propagates as an error.

use crate::ExecutionTarget;
use adaptation_types::{
    AdaptationError, AdaptationId, EngineResult, ExecutionPlan, ExecutionReport, ExecutionStep,
    MonitoringPlan, MonitoringPolicy, RollbackPlan, RollbackPolicy, StepResult, ValidationCheck,
    ValidationReport, WorkflowId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Post-execution validation scores. Production uses the defaults; the
/// scores equal their thresholds, so a clean execution validates.
#[derive(Clone, Copy, Debug)]
pub struct ValidationScores {
    pub performance: f64,
    pub quality: f64,
    pub security: f64,
    pub compliance: f64,
}

impl Default for ValidationScores {
    fn default() -> Self {
        Self {
            performance: 0.9,
            quality: 0.85,
            security: 0.95,
            compliance: 0.9,
        }
    }
}

impl ValidationScores {
    fn report(&self) -> ValidationReport {
        ValidationReport {
            checks: vec![
                ValidationCheck {
                    name: "performance".to_string(),
                    score: self.performance,
                    threshold: 0.9,
                },
                ValidationCheck {
                    name: "quality".to_string(),
                    score: self.quality,
                    threshold: 0.85,
                },
                ValidationCheck {
                    name: "security".to_string(),
                    score: self.security,
                    threshold: 0.95,
                },
                ValidationCheck {
                    name: "compliance".to_string(),
                    score: self.compliance,
                    threshold: 0.9,
                },
            ],
            completed_at: Utc::now(),
        }
    }
}

/// Runs execution plans against a target.
pub struct Executor {
    target: Arc<dyn ExecutionTarget>,
    validation: ValidationScores,
}

impl Executor {
    pub fn new(target: Arc<dyn ExecutionTarget>) -> Self {
        Self {
            target,
            validation: ValidationScores::default(),
        }
    }

    pub fn with_validation_scores(mut self, scores: ValidationScores) -> Self {
        self.validation = scores;
        self
    }

    /// The standard preparation / execution / validation plan.
    pub fn build_plan(adaptation_id: AdaptationId) -> ExecutionPlan {
        let steps = vec![
            ExecutionStep {
                id: "step_1".to_string(),
                name: "Preparation".to_string(),
                actions: vec!["backup_data".to_string(), "prepare_environment".to_string()],
                validations: vec![
                    "backup_complete".to_string(),
                    "environment_ready".to_string(),
                ],
                rollback_actions: vec![
                    "restore_backup".to_string(),
                    "cleanup_environment".to_string(),
                ],
                depends_on: Vec::new(),
                estimated_hours: 0.5,
            },
            ExecutionStep {
                id: "step_2".to_string(),
                name: "Execution".to_string(),
                actions: vec![
                    "apply_changes".to_string(),
                    "update_configuration".to_string(),
                ],
                validations: vec!["changes_applied".to_string()],
                rollback_actions: vec!["revert_changes".to_string()],
                depends_on: vec!["step_1".to_string()],
                estimated_hours: 2.0,
            },
            ExecutionStep {
                id: "step_3".to_string(),
                name: "Validation".to_string(),
                actions: vec!["run_tests".to_string(), "validate_performance".to_string()],
                validations: vec!["tests_passed".to_string()],
                rollback_actions: Vec::new(),
                depends_on: vec!["step_2".to_string()],
                estimated_hours: 1.0,
            },
        ];
        let total_estimated_hours = steps.iter().map(|s| s.estimated_hours).sum();
        ExecutionPlan {
            adaptation_id,
            steps,
            total_estimated_hours,
        }
    }

    pub fn build_monitoring_plan(
        adaptation_id: AdaptationId,
        policy: &MonitoringPolicy,
    ) -> MonitoringPlan {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert(
            "performance_degradation".to_string(),
            policy.performance_degradation_alert,
        );
        alert_thresholds.insert(
            "error_rate_increase".to_string(),
            policy.error_rate_increase_alert,
        );
        alert_thresholds.insert("quality_decrease".to_string(), policy.quality_decrease_alert);
        MonitoringPlan {
            adaptation_id,
            metrics: vec![
                "performance".to_string(),
                "quality".to_string(),
                "errors".to_string(),
                "user_satisfaction".to_string(),
            ],
            window_hours: policy.window_hours,
            alert_thresholds,
        }
    }

    /// Run the plan step by step. The cancel flag is checked between
    /// steps; a cancelled or failed run is rolled back per policy and
    /// reported, never silently dropped.
    pub async fn execute(
        &self,
        workflow_id: &WorkflowId,
        plan: &ExecutionPlan,
        rollback_plan: &RollbackPlan,
        policy: &RollbackPolicy,
        cancel: &AtomicBool,
    ) -> EngineResult<(ExecutionReport, Option<ValidationReport>)> {
        let started_at = Utc::now();
        let step_timeout = Duration::from_secs(policy.step_timeout_secs);
        let mut step_results: Vec<StepResult> = Vec::with_capacity(plan.steps.len());
        let mut applied: Vec<&ExecutionStep> = Vec::new();

        for step in &plan.steps {
            if cancel.load(Ordering::SeqCst) {
                warn!(adaptation = %plan.adaptation_id, step = %step.id, "execution cancelled");
                return self
                    .fail(
                        workflow_id,
                        plan,
                        rollback_plan,
                        policy.on_execution_failure,
                        &applied,
                        step_results,
                        started_at,
                        "execution_error: cancelled".to_string(),
                    )
                    .await;
            }

            let outcome =
                tokio::time::timeout(step_timeout, self.target.apply_step(workflow_id, step))
                    .await;
            match outcome {
                Ok(Ok(())) => {
                    info!(adaptation = %plan.adaptation_id, step = %step.id, "step applied");
                    step_results.push(StepResult {
                        step_id: step.id.clone(),
                        succeeded: true,
                        detail: None,
                        completed_at: Utc::now(),
                    });
                    applied.push(step);
                }
                Ok(Err(reason)) => {
                    warn!(adaptation = %plan.adaptation_id, step = %step.id, %reason, "step failed");
                    step_results.push(StepResult {
                        step_id: step.id.clone(),
                        succeeded: false,
                        detail: Some(reason.clone()),
                        completed_at: Utc::now(),
                    });
                    return self
                        .fail(
                            workflow_id,
                            plan,
                            rollback_plan,
                            policy.on_execution_failure,
                            &applied,
                            step_results,
                            started_at,
                            format!("execution_error: {}", reason),
                        )
                        .await;
                }
                Err(_) => {
                    warn!(adaptation = %plan.adaptation_id, step = %step.id, "step timed out");
                    step_results.push(StepResult {
                        step_id: step.id.clone(),
                        succeeded: false,
                        detail: Some("step timed out".to_string()),
                        completed_at: Utc::now(),
                    });
                    return self
                        .fail(
                            workflow_id,
                            plan,
                            rollback_plan,
                            policy.on_execution_failure,
                            &applied,
                            step_results,
                            started_at,
                            "execution_error: step timed out".to_string(),
                        )
                        .await;
                }
            }
        }

        let validation = self.validation.report();
        if !validation.passed() {
            warn!(
                adaptation = %plan.adaptation_id,
                failed = ?validation.failed_checks(),
                "post-execution validation failed"
            );
            let (report, _) = self
                .fail(
                    workflow_id,
                    plan,
                    rollback_plan,
                    policy.on_validation_failure,
                    &applied,
                    step_results,
                    started_at,
                    "execution_validation_failed".to_string(),
                )
                .await?;
            return Ok((report, Some(validation)));
        }

        info!(adaptation = %plan.adaptation_id, "execution completed and validated");
        Ok((
            ExecutionReport {
                adaptation_id: plan.adaptation_id.clone(),
                step_results,
                started_at,
                finished_at: Utc::now(),
                succeeded: true,
                rolled_back: None,
            },
            Some(validation),
        ))
    }

    /// Roll back the applied steps (newest first) when policy says so,
    /// then assemble the failure report.
    #[allow(clippy::too_many_arguments)]
    async fn fail(
        &self,
        workflow_id: &WorkflowId,
        plan: &ExecutionPlan,
        rollback_plan: &RollbackPlan,
        rollback_enabled: bool,
        applied: &[&ExecutionStep],
        step_results: Vec<StepResult>,
        started_at: chrono::DateTime<Utc>,
        reason: String,
    ) -> EngineResult<(ExecutionReport, Option<ValidationReport>)> {
        if rollback_enabled && !applied.is_empty() {
            info!(
                adaptation = %plan.adaptation_id,
                steps = applied.len(),
                procedure = ?rollback_plan.steps,
                %reason,
                "rolling back"
            );
            for step in applied.iter().rev() {
                if let Err(rollback_err) = self.target.rollback_step(workflow_id, step).await {
                    error!(
                        adaptation = %plan.adaptation_id,
                        step = %step.id,
                        %rollback_err,
                        "rollback failed"
                    );
                    return Err(AdaptationError::RollbackFailed {
                        adaptation: plan.adaptation_id.clone(),
                        reason: rollback_err,
                    });
                }
            }
        }

        Ok((
            ExecutionReport {
                adaptation_id: plan.adaptation_id.clone(),
                step_results,
                started_at,
                finished_at: Utc::now(),
                succeeded: false,
                rolled_back: Some(reason),
            },
            None,
        ))
    }
}
