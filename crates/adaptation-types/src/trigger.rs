//! Adaptation triggers: the conditions that can start an adaptation
//!
//! Each trigger kind carries a fixed cooldown window (the minimum time
//! between successive activations of the same trigger) and a flag for
//! kinds that always require human approval regardless of impact.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named condition signaling a workflow may need adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationTrigger {
    /// Workflow throughput or latency degraded past threshold
    PerformanceDegradation,
    /// Output quality degraded past threshold
    QualityIssues,
    /// Available resources fell below what the workflow needs
    ResourceConstraints,
    /// Projected completion slipping against a deadline
    DeadlinePressure,
    /// Running cost exceeded budget by more than the threshold
    CostOverrun,
    /// Explicit user feedback requesting change
    UserFeedback,
    /// A recurring pattern was recognized in workflow behavior
    PatternRecognition,
    /// An anomaly was detected in workflow metrics
    AnomalyDetection,
    /// Seasonal shift in workload characteristics
    SeasonalChanges,
    /// External market conditions changed
    MarketConditions,
    /// Regulatory requirements changed
    RegulatoryChanges,
    /// Underlying technology stack was updated
    TechnologyUpdates,
}

impl AdaptationTrigger {
    /// Every trigger kind, in canonical order.
    pub const ALL: [AdaptationTrigger; 12] = [
        AdaptationTrigger::PerformanceDegradation,
        AdaptationTrigger::QualityIssues,
        AdaptationTrigger::ResourceConstraints,
        AdaptationTrigger::DeadlinePressure,
        AdaptationTrigger::CostOverrun,
        AdaptationTrigger::UserFeedback,
        AdaptationTrigger::PatternRecognition,
        AdaptationTrigger::AnomalyDetection,
        AdaptationTrigger::SeasonalChanges,
        AdaptationTrigger::MarketConditions,
        AdaptationTrigger::RegulatoryChanges,
        AdaptationTrigger::TechnologyUpdates,
    ];

    /// Minimum elapsed time between successive activations of this
    /// trigger kind. Fixed per-kind table, from fast-moving operational
    /// signals (5 minutes) up to slow regulatory ones (24 hours).
    pub fn cooldown(&self) -> Duration {
        match self {
            AdaptationTrigger::PerformanceDegradation => Duration::minutes(5),
            AdaptationTrigger::QualityIssues => Duration::minutes(10),
            AdaptationTrigger::ResourceConstraints => Duration::minutes(15),
            AdaptationTrigger::DeadlinePressure => Duration::minutes(30),
            AdaptationTrigger::CostOverrun => Duration::hours(1),
            AdaptationTrigger::UserFeedback => Duration::minutes(30),
            AdaptationTrigger::PatternRecognition => Duration::hours(1),
            AdaptationTrigger::AnomalyDetection => Duration::minutes(5),
            AdaptationTrigger::SeasonalChanges => Duration::hours(24),
            AdaptationTrigger::MarketConditions => Duration::hours(12),
            AdaptationTrigger::RegulatoryChanges => Duration::hours(24),
            AdaptationTrigger::TechnologyUpdates => Duration::hours(12),
        }
    }

    /// Trigger kinds that require human approval no matter what the
    /// impact assessment says.
    pub fn always_requires_approval(&self) -> bool {
        matches!(
            self,
            AdaptationTrigger::CostOverrun
                | AdaptationTrigger::AnomalyDetection
                | AdaptationTrigger::MarketConditions
                | AdaptationTrigger::RegulatoryChanges
        )
    }

    /// Weight this trigger class contributes to stakeholder impact
    /// scoring.
    pub fn stakeholder_weight(&self) -> f64 {
        match self {
            AdaptationTrigger::PerformanceDegradation => 0.7,
            AdaptationTrigger::QualityIssues => 0.8,
            AdaptationTrigger::UserFeedback => 0.9,
            AdaptationTrigger::RegulatoryChanges => 0.6,
            _ => 0.5,
        }
    }
}

impl fmt::Display for AdaptationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdaptationTrigger::PerformanceDegradation => "performance_degradation",
            AdaptationTrigger::QualityIssues => "quality_issues",
            AdaptationTrigger::ResourceConstraints => "resource_constraints",
            AdaptationTrigger::DeadlinePressure => "deadline_pressure",
            AdaptationTrigger::CostOverrun => "cost_overrun",
            AdaptationTrigger::UserFeedback => "user_feedback",
            AdaptationTrigger::PatternRecognition => "pattern_recognition",
            AdaptationTrigger::AnomalyDetection => "anomaly_detection",
            AdaptationTrigger::SeasonalChanges => "seasonal_changes",
            AdaptationTrigger::MarketConditions => "market_conditions",
            AdaptationTrigger::RegulatoryChanges => "regulatory_changes",
            AdaptationTrigger::TechnologyUpdates => "technology_updates",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_table_covers_all_kinds() {
        for trigger in AdaptationTrigger::ALL {
            assert!(trigger.cooldown() >= Duration::minutes(5));
            assert!(trigger.cooldown() <= Duration::hours(24));
        }
    }

    #[test]
    fn anomaly_detection_has_short_cooldown() {
        assert_eq!(
            AdaptationTrigger::AnomalyDetection.cooldown(),
            Duration::minutes(5)
        );
        assert_eq!(
            AdaptationTrigger::RegulatoryChanges.cooldown(),
            Duration::hours(24)
        );
    }

    #[test]
    fn always_approve_set() {
        assert!(AdaptationTrigger::CostOverrun.always_requires_approval());
        assert!(AdaptationTrigger::AnomalyDetection.always_requires_approval());
        assert!(AdaptationTrigger::MarketConditions.always_requires_approval());
        assert!(AdaptationTrigger::RegulatoryChanges.always_requires_approval());
        assert!(!AdaptationTrigger::PerformanceDegradation.always_requires_approval());
        assert!(!AdaptationTrigger::UserFeedback.always_requires_approval());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&AdaptationTrigger::CostOverrun).unwrap();
        assert_eq!(json, "\"cost_overrun\"");
    }
}
