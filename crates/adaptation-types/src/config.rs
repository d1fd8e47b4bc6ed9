//! Per-workflow adaptation configuration
//!
//! One `AdaptationConfig` exists per workflow. It is read-only for the
//! duration of a decision; only the learning loop and explicit
//! administrative updates mutate it between runs.

use crate::{AdaptationStrategy, AdaptationTrigger};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Numeric thresholds that gate whether a trigger fires. Each value is a
/// relative degradation ratio; a trigger fires when its observed delta
/// exceeds the matching threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptationThresholds {
    pub performance_degradation: f64,
    pub quality_degradation: f64,
    pub cost_increase: f64,
    pub time_increase: f64,
    pub error_rate_increase: f64,
    pub user_satisfaction_decrease: f64,
}

impl Default for AdaptationThresholds {
    fn default() -> Self {
        Self {
            performance_degradation: 0.15,
            quality_degradation: 0.10,
            cost_increase: 0.20,
            time_increase: 0.25,
            error_rate_increase: 0.05,
            user_satisfaction_decrease: 0.15,
        }
    }
}

impl AdaptationThresholds {
    /// Adjust the thresholds the learning loop tunes. Only the
    /// performance and quality thresholds move; cost, time, error rate,
    /// and satisfaction thresholds are administrative settings.
    pub fn adjust_sensitivity(&mut self, factor: f64) {
        self.performance_degradation *= factor;
        self.quality_degradation *= factor;
    }
}

/// What happens when an approval request exhausts its final escalation
/// level without a decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAction {
    /// Treat the request as rejected and record the timeout.
    #[default]
    AutoReject,
    /// Hand the request off to an external escalation channel and keep
    /// it pending.
    EscalateExternally,
}

/// Who must approve, at what cost, and how long each escalation level
/// waits before moving up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Adaptations may run without approval when all other conditions
    /// allow it.
    pub autonomous_enabled: bool,
    /// Estimated cost above which approval is always required.
    pub cost_ceiling: f64,
    /// Risk score above which approval is always required.
    pub risk_ceiling: f64,
    /// Seconds an approval may wait at levels 1, 2, and 3 before
    /// escalating.
    pub level_timeouts_secs: [i64; 3],
    /// What to do when level 3 also times out.
    pub timeout_action: TimeoutAction,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            autonomous_enabled: true,
            cost_ceiling: 10_000.0,
            risk_ceiling: 0.7,
            level_timeouts_secs: [3_600, 7_200, 14_400],
            timeout_action: TimeoutAction::AutoReject,
        }
    }
}

impl ApprovalPolicy {
    /// How long a request may sit at the given escalation level (1-3).
    pub fn level_timeout(&self, level: u8) -> Duration {
        let idx = usize::from(level.clamp(1, 3)) - 1;
        Duration::seconds(self.level_timeouts_secs[idx])
    }

    /// Roles that must sign off at the given escalation level.
    pub fn approvers_for_level(&self, level: u8) -> Vec<String> {
        match level {
            0 | 1 => vec!["technical_lead".to_string()],
            2 => vec!["technical_lead".to_string(), "business_owner".to_string()],
            _ => vec![
                "technical_lead".to_string(),
                "business_owner".to_string(),
                "compliance_officer".to_string(),
            ],
        }
    }
}

/// When rollback fires automatically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    pub on_execution_failure: bool,
    pub on_validation_failure: bool,
    /// Per-step execution timeout, in seconds.
    pub step_timeout_secs: u64,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self {
            on_execution_failure: true,
            on_validation_failure: true,
            step_timeout_secs: 7_200,
        }
    }
}

/// Post-execution monitoring settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitoringPolicy {
    pub window_hours: u64,
    pub performance_degradation_alert: f64,
    pub error_rate_increase_alert: f64,
    pub quality_decrease_alert: f64,
}

impl Default for MonitoringPolicy {
    fn default() -> Self {
        Self {
            window_hours: 24,
            performance_degradation_alert: 0.1,
            error_rate_increase_alert: 0.05,
            quality_decrease_alert: 0.1,
        }
    }
}

/// Daily window during which disruptive strategies are kept off the
/// table. Hours are 0-23 in the platform's operating timezone; the
/// window is [start, end).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
        }
    }
}

impl BusinessHours {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// The role a stakeholder plays relative to the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderRole {
    EndUser,
    BusinessOwner,
    TechnicalTeam,
    ComplianceOfficer,
    Customer,
    Other,
}

/// A party affected by changes to the workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: String,
    pub role: StakeholderRole,
    /// How closely this party works with the workflow, 0.0-1.0.
    pub involvement: f64,
}

impl Stakeholder {
    pub fn new(id: impl Into<String>, role: StakeholderRole, involvement: f64) -> Self {
        Self {
            id: id.into(),
            role,
            involvement: involvement.clamp(0.0, 1.0),
        }
    }
}

/// Everything the engine needs to decide for one workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptationConfig {
    pub thresholds: AdaptationThresholds,
    /// Trigger kinds this workflow reacts to at all.
    pub active_triggers: HashSet<AdaptationTrigger>,
    /// Strategies this workflow permits.
    pub enabled_strategies: HashSet<AdaptationStrategy>,
    pub approval: ApprovalPolicy,
    pub rollback: RollbackPolicy,
    pub monitoring: MonitoringPolicy,
    pub business_hours: BusinessHours,
    /// Parties considered during impact assessment.
    pub stakeholders: Vec<Stakeholder>,
    /// Whether the learning loop may nudge thresholds after each run.
    pub learning_enabled: bool,
    /// Caller's risk aversion, 0.0 (risk-seeking) to 1.0 (risk-averse).
    pub risk_tolerance: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            thresholds: AdaptationThresholds::default(),
            active_triggers: [
                AdaptationTrigger::PerformanceDegradation,
                AdaptationTrigger::QualityIssues,
                AdaptationTrigger::ResourceConstraints,
                AdaptationTrigger::UserFeedback,
                AdaptationTrigger::PatternRecognition,
                AdaptationTrigger::AnomalyDetection,
            ]
            .into_iter()
            .collect(),
            enabled_strategies: [
                AdaptationStrategy::IncrementalImprovement,
                AdaptationStrategy::ParallelOptimization,
                AdaptationStrategy::SequentialOptimization,
                AdaptationStrategy::HybridApproach,
                AdaptationStrategy::AbTesting,
                AdaptationStrategy::GradualRollout,
            ]
            .into_iter()
            .collect(),
            approval: ApprovalPolicy::default(),
            rollback: RollbackPolicy::default(),
            monitoring: MonitoringPolicy::default(),
            business_hours: BusinessHours::default(),
            stakeholders: vec![
                Stakeholder::new("business_owner", StakeholderRole::BusinessOwner, 0.9),
                Stakeholder::new("technical_lead", StakeholderRole::TechnicalTeam, 0.8),
                Stakeholder::new("end_users", StakeholderRole::EndUser, 0.7),
            ],
            learning_enabled: true,
            risk_tolerance: 0.5,
        }
    }
}

impl AdaptationConfig {
    pub fn with_trigger(mut self, trigger: AdaptationTrigger) -> Self {
        self.active_triggers.insert(trigger);
        self
    }

    pub fn with_strategy(mut self, strategy: AdaptationStrategy) -> Self {
        self.enabled_strategies.insert(strategy);
        self
    }

    pub fn with_autonomous(mut self, enabled: bool) -> Self {
        self.approval.autonomous_enabled = enabled;
        self
    }

    pub fn with_learning(mut self, enabled: bool) -> Self {
        self.learning_enabled = enabled;
        self
    }

    /// Validate ranges before accepting an administrative update.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.risk_tolerance) {
            return Err(format!(
                "risk_tolerance must be within 0.0-1.0, got {}",
                self.risk_tolerance
            ));
        }
        if self.approval.cost_ceiling < 0.0 {
            return Err(format!(
                "cost_ceiling must be non-negative, got {}",
                self.approval.cost_ceiling
            ));
        }
        if self.business_hours.start_hour > 23 || self.business_hours.end_hour > 24 {
            return Err("business hours out of range".to_string());
        }
        if self.approval.level_timeouts_secs.iter().any(|&s| s <= 0) {
            return Err("approval level timeouts must be positive".to_string());
        }
        Ok(())
    }
}
