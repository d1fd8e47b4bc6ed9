//! Human approval types: requests, escalation state, and decisions
//!
//! A `PendingApproval` moves through escalation levels 1 -> 2 -> 3
//! monotonically, settling exactly one terminal outcome. Timed-out
//! requests are resolved by policy, never silently dropped.

use crate::{
    AdaptationStrategy, AdaptationTrigger, ApprovalRequestId, ImpactAssessment, ImpactLevel,
    WorkflowId,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How quickly an approval needs human eyes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Urgency derived from trigger kind, impact, and risk.
    pub fn derive(trigger: AdaptationTrigger, impact: ImpactLevel, risk: f64) -> Self {
        if impact == ImpactLevel::Critical {
            Urgency::Critical
        } else if matches!(
            trigger,
            AdaptationTrigger::AnomalyDetection | AdaptationTrigger::DeadlinePressure
        ) || risk > 0.7
        {
            Urgency::High
        } else {
            Urgency::Medium
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// A request for human sign-off on a proposed adaptation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalRequestId,
    pub workflow_id: WorkflowId,
    pub trigger: AdaptationTrigger,
    pub strategy: AdaptationStrategy,
    pub impact: ImpactAssessment,
    pub urgency: Urgency,
    /// Why approval was required at all.
    pub reasons: Vec<String>,
    /// Roles that must sign off at the current level.
    pub approvers: Vec<String>,
    pub requested_at: DateTime<Utc>,
    /// Rough forecast of how long a decision should take, in seconds.
    pub estimated_decision_secs: i64,
}

impl ApprovalRequest {
    /// Forecast decision time scaled by impact: one hour at Moderate,
    /// shorter below, longer above.
    pub fn estimate_decision_time(impact: ImpactLevel) -> Duration {
        let multiplier = match impact {
            ImpactLevel::Minimal => 0.5,
            ImpactLevel::Low => 0.7,
            ImpactLevel::Moderate => 1.0,
            ImpactLevel::High => 1.5,
            ImpactLevel::Critical => 2.0,
        };
        Duration::seconds((3_600.0 * multiplier) as i64)
    }

    /// Initial escalation level from impact: Critical starts at 3,
    /// High at 2, everything else at 1.
    pub fn initial_level(impact: ImpactLevel) -> u8 {
        match impact {
            ImpactLevel::Critical => 3,
            ImpactLevel::High => 2,
            _ => 1,
        }
    }
}

/// The human decision on a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    /// Rejection, including "request changes" responses. The optional
    /// note carries the reviewer's reasoning.
    Rejected { note: Option<String> },
}

/// Terminal outcome of a pending approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved { by: String },
    Rejected { by: String, note: Option<String> },
    /// The final level timed out and policy said auto-reject.
    TimedOut,
    /// The final level timed out and policy handed the request to an
    /// external escalation channel.
    EscalatedExternally,
}

/// A request waiting on a decision, tracking where it sits in the
/// escalation ladder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingApproval {
    pub request: ApprovalRequest,
    /// Current escalation level, 1-3. Only ever increases.
    pub level: u8,
    /// When the request entered the current level.
    pub level_entered_at: DateTime<Utc>,
    /// Times the request escalated, for audit.
    pub escalations: Vec<DateTime<Utc>>,
    /// Whether the request was handed to an external escalation channel
    /// after its final level expired. The request stays decidable.
    pub escalated_externally: bool,
    pub outcome: Option<ApprovalOutcome>,
}

impl PendingApproval {
    pub fn new(request: ApprovalRequest, now: DateTime<Utc>) -> Self {
        let level = ApprovalRequest::initial_level(request.impact.overall);
        Self {
            request,
            level,
            level_entered_at: now,
            escalations: Vec::new(),
            escalated_externally: false,
            outcome: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Move up one escalation level. Levels are monotonic and capped at
    /// 3; escalating a settled request is a no-op.
    pub fn escalate(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_settled() || self.level >= 3 {
            return false;
        }
        self.level += 1;
        self.level_entered_at = now;
        self.escalations.push(now);
        true
    }

    /// Settle the request. The first outcome wins; later settle calls
    /// are rejected so a request cannot carry two terminal states.
    pub fn settle(&mut self, outcome: ApprovalOutcome) -> bool {
        if self.is_settled() {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }

    /// Hand the request to the external escalation channel. The first
    /// handoff wins; the request is not settled, so the external party
    /// decides through the normal decision path.
    pub fn mark_external(&mut self) -> bool {
        if self.is_settled() || self.escalated_externally {
            return false;
        }
        self.escalated_externally = true;
        true
    }

    /// Whether the current level has waited longer than its timeout.
    pub fn level_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        !self.is_settled() && now - self.level_entered_at >= timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_derivation() {
        assert_eq!(
            Urgency::derive(
                AdaptationTrigger::UserFeedback,
                ImpactLevel::Critical,
                0.2
            ),
            Urgency::Critical
        );
        assert_eq!(
            Urgency::derive(
                AdaptationTrigger::AnomalyDetection,
                ImpactLevel::Low,
                0.2
            ),
            Urgency::High
        );
        assert_eq!(
            Urgency::derive(AdaptationTrigger::UserFeedback, ImpactLevel::Low, 0.8),
            Urgency::High
        );
        assert_eq!(
            Urgency::derive(AdaptationTrigger::UserFeedback, ImpactLevel::Low, 0.2),
            Urgency::Medium
        );
    }

    #[test]
    fn initial_level_from_impact() {
        assert_eq!(ApprovalRequest::initial_level(ImpactLevel::Critical), 3);
        assert_eq!(ApprovalRequest::initial_level(ImpactLevel::High), 2);
        assert_eq!(ApprovalRequest::initial_level(ImpactLevel::Moderate), 1);
        assert_eq!(ApprovalRequest::initial_level(ImpactLevel::Minimal), 1);
    }

    #[test]
    fn decision_time_scales_with_impact() {
        assert_eq!(
            ApprovalRequest::estimate_decision_time(ImpactLevel::Moderate),
            Duration::hours(1)
        );
        assert_eq!(
            ApprovalRequest::estimate_decision_time(ImpactLevel::Critical),
            Duration::hours(2)
        );
        assert_eq!(
            ApprovalRequest::estimate_decision_time(ImpactLevel::Minimal),
            Duration::minutes(30)
        );
    }

    fn pending(level_impact: ImpactLevel) -> PendingApproval {
        let request = ApprovalRequest {
            id: ApprovalRequestId::generate(),
            workflow_id: WorkflowId::new("wf-1"),
            trigger: AdaptationTrigger::QualityIssues,
            strategy: AdaptationStrategy::IncrementalImprovement,
            impact: crate::test_support::assessment_with_level(level_impact),
            urgency: Urgency::Medium,
            reasons: vec!["impact level requires sign-off".to_string()],
            approvers: vec!["technical_lead".to_string()],
            requested_at: Utc::now(),
            estimated_decision_secs: 3_600,
        };
        PendingApproval::new(request, Utc::now())
    }

    #[test]
    fn escalation_is_monotonic_and_capped() {
        let mut p = pending(ImpactLevel::Moderate);
        assert_eq!(p.level, 1);
        assert!(p.escalate(Utc::now()));
        assert_eq!(p.level, 2);
        assert!(p.escalate(Utc::now()));
        assert_eq!(p.level, 3);
        assert!(!p.escalate(Utc::now()));
        assert_eq!(p.level, 3);
        assert_eq!(p.escalations.len(), 2);
    }

    #[test]
    fn exactly_one_terminal_outcome() {
        let mut p = pending(ImpactLevel::Moderate);
        assert!(p.settle(ApprovalOutcome::Approved {
            by: "technical_lead".to_string()
        }));
        assert!(!p.settle(ApprovalOutcome::TimedOut));
        assert!(matches!(
            p.outcome,
            Some(ApprovalOutcome::Approved { .. })
        ));
        assert!(!p.escalate(Utc::now()));
    }

    #[test]
    fn external_handoff_keeps_request_decidable() {
        let mut p = pending(ImpactLevel::Critical);
        assert!(p.mark_external());
        assert!(!p.mark_external());
        assert!(!p.is_settled());
        // The external channel can still settle the request.
        assert!(p.settle(ApprovalOutcome::Approved {
            by: "external_board".to_string()
        }));
        assert!(!p.mark_external());
    }

    #[test]
    fn level_expiry() {
        let mut p = pending(ImpactLevel::Moderate);
        p.level_entered_at = Utc::now() - Duration::hours(2);
        assert!(p.level_expired(Duration::hours(1), Utc::now()));
        assert!(!p.level_expired(Duration::hours(3), Utc::now()));
        p.settle(ApprovalOutcome::TimedOut);
        assert!(!p.level_expired(Duration::hours(1), Utc::now()));
    }
}
