//! The result handed back from one pipeline run

use crate::{
    AdaptationId, AdaptationStrategy, ApprovalRequestId, ExecutionReport, ImpactAssessment,
    MonitoringPlan, RollbackPlan, ValidationReport,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of one pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStatus {
    /// The adaptation executed and validated successfully.
    Completed,
    /// Human approval is required; nothing has executed yet.
    PendingApproval,
    /// The run stopped without executing, or execution rolled back.
    Failed,
    /// An unexpected engine fault interrupted the run.
    Error,
}

impl fmt::Display for AdaptationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdaptationStatus::Completed => "completed",
            AdaptationStatus::PendingApproval => "pending_approval",
            AdaptationStatus::Failed => "failed",
            AdaptationStatus::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Everything the caller learns about one trigger submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptationResult {
    pub success: bool,
    pub status: AdaptationStatus,
    pub message: String,
    pub adaptation_id: Option<AdaptationId>,
    /// Set when the run parked awaiting human sign-off.
    pub approval_request_id: Option<ApprovalRequestId>,
    pub strategy: Option<AdaptationStrategy>,
    pub impact: Option<ImpactAssessment>,
    pub rollback_plan: Option<RollbackPlan>,
    pub monitoring_plan: Option<MonitoringPlan>,
    pub execution: Option<ExecutionReport>,
    pub validation: Option<ValidationReport>,
    pub execution_time_ms: u64,
}

impl AdaptationResult {
    /// A run that stopped before any side effects, with the reason.
    pub fn dismissed(message: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            status: AdaptationStatus::Failed,
            message: message.into(),
            adaptation_id: None,
            approval_request_id: None,
            strategy: None,
            impact: None,
            rollback_plan: None,
            monitoring_plan: None,
            execution: None,
            validation: None,
            execution_time_ms,
        }
    }
}
