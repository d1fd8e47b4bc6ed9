//! Impact assessment types: multi-dimensional scoring of a proposed change
//!
//! One `ImpactAssessment` is produced per trigger evaluation, fully
//! computed before strategy selection runs. All scores are plain
//! weighted arithmetic; the five-level bucketing uses fixed cut points.

use crate::{Stakeholder, StakeholderRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of a proposed change, from negligible to critical.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl ImpactLevel {
    /// Bucket an aggregate score in [0, 1] into a level.
    /// Cut points: ≥0.8 Critical, ≥0.6 High, ≥0.4 Moderate, ≥0.2 Low.
    pub fn from_aggregate_score(score: f64) -> Self {
        if score >= 0.8 {
            ImpactLevel::Critical
        } else if score >= 0.6 {
            ImpactLevel::High
        } else if score >= 0.4 {
            ImpactLevel::Moderate
        } else if score >= 0.2 {
            ImpactLevel::Low
        } else {
            ImpactLevel::Minimal
        }
    }

    /// Bucket a stakeholder score (role weight + trigger weight +
    /// involvement term, roughly in [0, 2.2]) into a level.
    /// Cut points: ≥1.5 Critical, ≥1.2 High, ≥0.8 Moderate, ≥0.4 Low.
    pub fn from_stakeholder_score(score: f64) -> Self {
        if score >= 1.5 {
            ImpactLevel::Critical
        } else if score >= 1.2 {
            ImpactLevel::High
        } else if score >= 0.8 {
            ImpactLevel::Moderate
        } else if score >= 0.4 {
            ImpactLevel::Low
        } else {
            ImpactLevel::Minimal
        }
    }

    /// Numeric score for running averages: Minimal=1 … Critical=5.
    pub fn score(&self) -> f64 {
        match self {
            ImpactLevel::Minimal => 1.0,
            ImpactLevel::Low => 2.0,
            ImpactLevel::Moderate => 3.0,
            ImpactLevel::High => 4.0,
            ImpactLevel::Critical => 5.0,
        }
    }

    /// High and Critical changes always need sign-off.
    pub fn requires_approval(&self) -> bool {
        matches!(self, ImpactLevel::High | ImpactLevel::Critical)
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImpactLevel::Minimal => "minimal",
            ImpactLevel::Low => "low",
            ImpactLevel::Moderate => "moderate",
            ImpactLevel::High => "high",
            ImpactLevel::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Per-stakeholder impact with the list of those hit hardest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StakeholderImpact {
    /// Impact level per stakeholder id
    pub impacts: HashMap<String, ImpactLevel>,
    /// Stakeholders at High or Critical impact
    pub high_impact: Vec<String>,
}

impl StakeholderImpact {
    pub fn record(&mut self, stakeholder: &Stakeholder, level: ImpactLevel) {
        if level.requires_approval() {
            self.high_impact.push(stakeholder.id.clone());
        }
        self.impacts.insert(stakeholder.id.clone(), level);
    }
}

/// Risk dimensions of the proposed change, each in [0, 1].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall: f64,
    pub technical: f64,
    pub business: f64,
    pub compliance: f64,
    pub security: f64,
    pub operational: f64,
}

/// Estimated monetary cost and benefit of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CostBenefit {
    pub total_cost: f64,
    pub total_benefit: f64,
    pub net_benefit: f64,
    pub roi: f64,
}

/// Schedule effect of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TimelineImpact {
    /// Estimated duration of the adaptation, in hours
    pub estimated_duration_hours: f64,
    /// Effect on the workflow's critical path, 0–1
    pub critical_path_impact: f64,
    /// Buffer time that should be reserved, in hours
    pub buffer_hours: f64,
}

/// Quality effect of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QualityImpact {
    pub expected_improvement: f64,
    pub quality_risk: f64,
    pub validation_required: bool,
}

/// Compliance effect of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ComplianceImpact {
    pub compliance_risk: f64,
    pub regulatory_approval_required: bool,
}

/// Resource demand of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ResourceImpact {
    pub requirement: f64,
    pub availability: f64,
}

/// Business-side effect of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BusinessImpact {
    pub customer_impact: f64,
    pub operational_impact: f64,
    pub strategic_impact: f64,
}

/// Technical-side effect of the change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TechnicalImpact {
    pub system_impact: f64,
    pub integration_impact: f64,
    pub maintainability_impact: f64,
}

/// The full multi-dimensional assessment, produced once per evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Aggregate level blended from risk, cost, and duration
    pub overall: ImpactLevel,
    pub stakeholders: StakeholderImpact,
    pub risk: RiskAssessment,
    pub cost_benefit: CostBenefit,
    pub timeline: TimelineImpact,
    pub quality: QualityImpact,
    pub compliance: ComplianceImpact,
    pub resources: ResourceImpact,
    pub business: BusinessImpact,
    pub technical: TechnicalImpact,
    /// Fixed confidence constant; richer evidence is not modeled
    pub confidence: f64,
    pub recommendations: Vec<String>,
}

impl StakeholderRole {
    /// Base impact weight per stakeholder role.
    pub fn base_weight(&self) -> f64 {
        match self {
            StakeholderRole::EndUser => 0.8,
            StakeholderRole::BusinessOwner => 0.9,
            StakeholderRole::TechnicalTeam => 0.7,
            StakeholderRole::ComplianceOfficer => 0.6,
            StakeholderRole::Customer => 0.9,
            StakeholderRole::Other => 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_cut_points() {
        assert_eq!(ImpactLevel::from_aggregate_score(0.85), ImpactLevel::Critical);
        assert_eq!(ImpactLevel::from_aggregate_score(0.8), ImpactLevel::Critical);
        assert_eq!(ImpactLevel::from_aggregate_score(0.79), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_aggregate_score(0.4), ImpactLevel::Moderate);
        assert_eq!(ImpactLevel::from_aggregate_score(0.2), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_aggregate_score(0.05), ImpactLevel::Minimal);
    }

    #[test]
    fn stakeholder_cut_points() {
        assert_eq!(ImpactLevel::from_stakeholder_score(1.6), ImpactLevel::Critical);
        assert_eq!(ImpactLevel::from_stakeholder_score(1.3), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_stakeholder_score(0.9), ImpactLevel::Moderate);
        assert_eq!(ImpactLevel::from_stakeholder_score(0.5), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_stakeholder_score(0.1), ImpactLevel::Minimal);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(ImpactLevel::Critical > ImpactLevel::High);
        assert!(ImpactLevel::High > ImpactLevel::Moderate);
        assert!(ImpactLevel::Minimal < ImpactLevel::Low);
    }

    #[test]
    fn approval_required_for_high_and_critical() {
        assert!(ImpactLevel::High.requires_approval());
        assert!(ImpactLevel::Critical.requires_approval());
        assert!(!ImpactLevel::Moderate.requires_approval());
    }

    #[test]
    fn impact_scores_monotonic() {
        let levels = [
            ImpactLevel::Minimal,
            ImpactLevel::Low,
            ImpactLevel::Moderate,
            ImpactLevel::High,
            ImpactLevel::Critical,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0].score() < pair[1].score());
        }
    }
}
