//! Approval gate, the pipeline's fourth stage
//!
//! Decides whether a proposed adaptation needs human sign-off, tracks
//! pending requests through the escalation ladder, and resolves
//! timeouts by policy. Nothing executes while a request is pending.

use crate::Notifier;
use adaptation_types::{
    AdaptationConfig, AdaptationError, AdaptationStrategy, AdaptationTrigger, ApprovalOutcome,
    ApprovalPolicy, ApprovalRequest, ApprovalRequestId, Decision, EngineResult,
    ImpactAssessment, PendingApproval, TimeoutAction, Urgency, WorkflowId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Why approval is required, empty when the adaptation may run
/// autonomously. Conditions are checked in a fixed order and all
/// matching reasons are reported.
pub fn approval_reasons(
    config: &AdaptationConfig,
    trigger: AdaptationTrigger,
    impact: &ImpactAssessment,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if impact.overall.requires_approval() {
        reasons.push(format!("impact level {} requires sign-off", impact.overall));
    }
    if impact.risk.overall > config.approval.risk_ceiling {
        reasons.push(format!(
            "risk {:.2} exceeds ceiling {:.2}",
            impact.risk.overall, config.approval.risk_ceiling
        ));
    }
    if impact.cost_benefit.total_cost > config.approval.cost_ceiling {
        reasons.push(format!(
            "estimated cost {:.0} exceeds ceiling {:.0}",
            impact.cost_benefit.total_cost, config.approval.cost_ceiling
        ));
    }
    if !config.approval.autonomous_enabled {
        reasons.push("autonomous adaptation is disabled for this workflow".to_string());
    }
    if trigger.always_requires_approval() {
        reasons.push(format!("trigger {} always requires approval", trigger));
    }
    reasons
}

struct PendingEntry {
    pending: PendingApproval,
    /// Policy snapshot from submission time; later config updates do
    /// not change in-flight requests.
    policy: ApprovalPolicy,
}

/// Tracks every in-flight approval request across workflows.
pub struct ApprovalGate {
    notifier: Arc<dyn Notifier>,
    pending: Mutex<HashMap<ApprovalRequestId, PendingEntry>>,
}

impl ApprovalGate {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Assemble a request from the pipeline's decision inputs.
    pub fn build_request(
        workflow_id: WorkflowId,
        trigger: AdaptationTrigger,
        strategy: AdaptationStrategy,
        impact: ImpactAssessment,
        reasons: Vec<String>,
        policy: &ApprovalPolicy,
        now: DateTime<Utc>,
    ) -> ApprovalRequest {
        let level = ApprovalRequest::initial_level(impact.overall);
        ApprovalRequest {
            id: ApprovalRequestId::generate(),
            workflow_id,
            trigger,
            strategy,
            urgency: Urgency::derive(trigger, impact.overall, impact.risk.overall),
            estimated_decision_secs: ApprovalRequest::estimate_decision_time(impact.overall)
                .num_seconds(),
            approvers: policy.approvers_for_level(level),
            impact,
            reasons,
            requested_at: now,
        }
    }

    /// Park a request and notify its approvers.
    pub async fn submit(&self, request: ApprovalRequest, policy: ApprovalPolicy) {
        let approvers = request.approvers.clone();
        let id = request.id.clone();
        let pending = PendingApproval::new(request.clone(), Utc::now());
        info!(
            request = %id,
            workflow = %request.workflow_id,
            level = pending.level,
            urgency = %request.urgency,
            "approval requested"
        );
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, PendingEntry { pending, policy });
        self.notifier
            .notify_approval_requested(&request, &approvers)
            .await;
    }

    /// Apply a human decision. The first decision settles the request;
    /// a second decision, or a decision on an unknown id, is an error.
    pub fn decide(
        &self,
        id: &ApprovalRequestId,
        by: impl Into<String>,
        decision: Decision,
    ) -> EngineResult<ApprovalOutcome> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = pending
            .get_mut(id)
            .ok_or_else(|| AdaptationError::ApprovalNotFound(id.clone()))?;

        let by = by.into();
        let outcome = match decision {
            Decision::Approved => ApprovalOutcome::Approved { by: by.clone() },
            Decision::Rejected { note } => ApprovalOutcome::Rejected {
                by: by.clone(),
                note,
            },
        };
        if !entry.pending.settle(outcome.clone()) {
            return Err(AdaptationError::ApprovalNotFound(id.clone()));
        }
        info!(request = %id, decided_by = %by, "approval settled");
        Ok(outcome)
    }

    /// Sweep pending requests: escalate levels that have waited past
    /// their timeout, and resolve requests whose final level expired.
    /// Returns what this sweep resolved: settled timeouts, plus
    /// first-time external handoffs, which stay pending and decidable.
    pub async fn run_escalations(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<(ApprovalRequestId, ApprovalOutcome)> {
        let mut escalated: Vec<(ApprovalRequest, u8, Vec<String>)> = Vec::new();
        let mut externally: Vec<ApprovalRequest> = Vec::new();
        let mut resolved = Vec::new();

        {
            let mut pending = self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for entry in pending.values_mut() {
                let timeout = entry.policy.level_timeout(entry.pending.level);
                if !entry.pending.level_expired(timeout, now) {
                    continue;
                }
                if entry.pending.escalate(now) {
                    let level = entry.pending.level;
                    let approvers = entry.policy.approvers_for_level(level);
                    entry.pending.request.approvers = approvers.clone();
                    warn!(
                        request = %entry.pending.request.id,
                        level,
                        "approval request escalated"
                    );
                    escalated.push((entry.pending.request.clone(), level, approvers));
                } else {
                    // Final level exhausted; resolve by policy.
                    match entry.policy.timeout_action {
                        TimeoutAction::AutoReject => {
                            if entry.pending.settle(ApprovalOutcome::TimedOut) {
                                warn!(
                                    request = %entry.pending.request.id,
                                    "approval request timed out"
                                );
                                resolved.push((
                                    entry.pending.request.id.clone(),
                                    ApprovalOutcome::TimedOut,
                                ));
                            }
                        }
                        TimeoutAction::EscalateExternally => {
                            // Not settled: the external channel decides
                            // through the normal decide path.
                            if entry.pending.mark_external() {
                                warn!(
                                    request = %entry.pending.request.id,
                                    "approval request handed to external escalation"
                                );
                                externally.push(entry.pending.request.clone());
                                resolved.push((
                                    entry.pending.request.id.clone(),
                                    ApprovalOutcome::EscalatedExternally,
                                ));
                            }
                        }
                    }
                }
            }
        }

        for (request, level, approvers) in escalated {
            self.notifier
                .notify_escalated(&request, level, &approvers)
                .await;
        }
        for request in externally {
            self.notifier.notify_external_escalation(&request).await;
        }
        resolved
    }

    /// Snapshot of all unsettled requests.
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|entry| !entry.pending.is_settled())
            .map(|entry| entry.pending.clone())
            .collect()
    }

    /// Drop a settled request from tracking, returning its request.
    pub fn remove(&self, id: &ApprovalRequestId) -> Option<PendingApproval> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
            .map(|entry| entry.pending)
    }
}
