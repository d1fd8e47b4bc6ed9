//! Execution, rollback, and monitoring plans
//!
//! An `ExecutionPlan` is the only thing that changes real workflow
//! state. Every plan is paired with a `RollbackPlan` before the first
//! step runs, and a `MonitoringPlan` that watches the change afterwards.

use crate::AdaptationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One ordered step of an execution plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: String,
    pub name: String,
    /// Concrete actions applied to the target, in order.
    pub actions: Vec<String>,
    /// Checks that must hold after the step completes.
    pub validations: Vec<String>,
    /// Actions that undo this step during rollback.
    pub rollback_actions: Vec<String>,
    /// Step ids that must complete before this step may start.
    pub depends_on: Vec<String>,
    pub estimated_hours: f64,
}

/// The ordered steps that realize a selected strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub adaptation_id: AdaptationId,
    pub steps: Vec<ExecutionStep>,
    pub total_estimated_hours: f64,
}

impl ExecutionPlan {
    /// Steps in dependency order. Plans are built with dependencies
    /// already linearized, so this verifies rather than sorts.
    pub fn dependencies_satisfied(&self) -> bool {
        let mut done: Vec<&str> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if step
                .depends_on
                .iter()
                .any(|dep| !done.contains(&dep.as_str()))
            {
                return false;
            }
            done.push(&step.id);
        }
        true
    }
}

/// Outcome of one executed step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub succeeded: bool,
    pub detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Condition that fires an automatic rollback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackTrigger {
    ExecutionFailure,
    ValidationFailure,
    ManualRequest,
    Timeout,
}

/// Recovery procedure paired with an execution plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackPlan {
    pub adaptation_id: AdaptationId,
    /// Recovery steps, run strictly in order.
    pub steps: Vec<String>,
    pub triggers: Vec<RollbackTrigger>,
}

impl RollbackPlan {
    pub fn standard(adaptation_id: AdaptationId) -> Self {
        Self {
            adaptation_id,
            steps: vec![
                "stop_current_execution".to_string(),
                "assess_current_state".to_string(),
                "restore_from_backup".to_string(),
                "validate_rollback".to_string(),
                "notify_stakeholders".to_string(),
            ],
            triggers: vec![
                RollbackTrigger::ExecutionFailure,
                RollbackTrigger::ValidationFailure,
                RollbackTrigger::ManualRequest,
                RollbackTrigger::Timeout,
            ],
        }
    }
}

/// What to watch after a change lands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitoringPlan {
    pub adaptation_id: AdaptationId,
    pub metrics: Vec<String>,
    pub window_hours: u64,
    /// Alert thresholds keyed by metric name.
    pub alert_thresholds: HashMap<String, f64>,
}

/// One post-execution validation check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub score: f64,
    pub threshold: f64,
}

impl ValidationCheck {
    pub fn passed(&self) -> bool {
        self.score >= self.threshold
    }
}

/// Aggregate validation result. Passes only when every check passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub completed_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(ValidationCheck::passed)
    }

    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed())
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// What happened while running an execution plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub adaptation_id: AdaptationId,
    pub step_results: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    /// Failure reason, set whenever the run did not complete. Doubles
    /// as the rollback trigger reason when steps were unwound.
    pub rolled_back: Option<String>,
}
