//! Shared fixtures for in-crate tests.

use crate::{
    BusinessImpact, ComplianceImpact, CostBenefit, ImpactAssessment, ImpactLevel, QualityImpact,
    ResourceImpact, RiskAssessment, StakeholderImpact, TechnicalImpact, TimelineImpact,
};

/// A structurally complete assessment pinned to the given overall level.
pub fn assessment_with_level(overall: ImpactLevel) -> ImpactAssessment {
    ImpactAssessment {
        overall,
        stakeholders: StakeholderImpact::default(),
        risk: RiskAssessment {
            overall: 0.5,
            technical: 0.5,
            business: 0.5,
            compliance: 0.3,
            security: 0.3,
            operational: 0.5,
        },
        cost_benefit: CostBenefit {
            total_cost: 5_000.0,
            total_benefit: 8_000.0,
            net_benefit: 3_000.0,
            roi: 0.6,
        },
        timeline: TimelineImpact {
            estimated_duration_hours: 24.0,
            critical_path_impact: 0.3,
            buffer_hours: 4.0,
        },
        quality: QualityImpact {
            expected_improvement: 0.1,
            quality_risk: 0.2,
            validation_required: true,
        },
        compliance: ComplianceImpact {
            compliance_risk: 0.2,
            regulatory_approval_required: false,
        },
        resources: ResourceImpact {
            requirement: 0.5,
            availability: 1.0,
        },
        business: BusinessImpact {
            customer_impact: 0.3,
            operational_impact: 0.3,
            strategic_impact: 0.2,
        },
        technical: TechnicalImpact {
            system_impact: 0.3,
            integration_impact: 0.3,
            maintainability_impact: 0.2,
        },
        confidence: 0.8,
        recommendations: Vec::new(),
    }
}
