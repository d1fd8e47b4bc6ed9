//! Impact assessment, the pipeline's second stage
//!
//! Produces the full multi-dimensional `ImpactAssessment` before any
//! strategy is considered. All scoring is deterministic arithmetic over
//! the config and context; baseline constants anchor each dimension and
//! observed degradation moves the score up from there.

use adaptation_types::{
    AdaptationConfig, AdaptationContext, AdaptationTrigger, BusinessImpact, ComplianceImpact,
    CostBenefit, ImpactAssessment, ImpactLevel, QualityImpact, ResourceImpact, RiskAssessment,
    StakeholderImpact, TechnicalImpact, TimelineImpact,
};
use tracing::debug;

/// Baseline estimated cost of an adaptation, before degradation scaling.
const BASE_COST: f64 = 5_000.0;
/// Baseline estimated benefit.
const BASE_BENEFIT: f64 = 8_000.0;
/// Baseline adaptation duration in hours.
const BASE_DURATION_HOURS: f64 = 24.0;
/// Baseline overall risk; observed degradation only raises it.
const BASE_RISK: f64 = 0.5;
/// Confidence reported with every assessment. Richer evidence sources
/// are not modeled, so this is a fixed constant.
const CONFIDENCE: f64 = 0.8;
/// Cost normalizer in the aggregate blend.
const COST_SCALE: f64 = 10_000.0;
/// Duration normalizer in the aggregate blend, in hours.
const DURATION_SCALE: f64 = 48.0;

/// Stateless assessor.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImpactAssessor;

impl ImpactAssessor {
    pub fn assess(
        &self,
        config: &AdaptationConfig,
        trigger: AdaptationTrigger,
        context: &AdaptationContext,
    ) -> ImpactAssessment {
        let worst = context.worst_delta();

        let risk = self.assess_risk(context, worst);
        let cost_benefit = self.assess_cost_benefit(worst);
        let timeline = self.assess_timeline(context, worst);
        let stakeholders = self.assess_stakeholders(config, trigger);

        let aggregate = (risk.overall
            + cost_benefit.total_cost / COST_SCALE
            + timeline.estimated_duration_hours / DURATION_SCALE)
            / 3.0;
        let overall = ImpactLevel::from_aggregate_score(aggregate);

        debug!(
            %trigger,
            aggregate = format!("{:.3}", aggregate),
            %overall,
            "impact assessed"
        );

        let recommendations = self.recommendations(trigger, overall, &risk, &cost_benefit);

        ImpactAssessment {
            overall,
            stakeholders,
            risk,
            cost_benefit,
            timeline,
            quality: QualityImpact {
                expected_improvement: 0.1,
                quality_risk: (worst * 0.5).min(1.0),
                validation_required: true,
            },
            compliance: ComplianceImpact {
                compliance_risk: if trigger == AdaptationTrigger::RegulatoryChanges {
                    0.7
                } else {
                    0.2
                },
                regulatory_approval_required: trigger == AdaptationTrigger::RegulatoryChanges,
            },
            resources: ResourceImpact {
                requirement: 0.5,
                availability: context.available_resources,
            },
            business: BusinessImpact {
                customer_impact: (0.3 + worst * 0.3).min(1.0),
                operational_impact: (0.3 + worst * 0.4).min(1.0),
                strategic_impact: 0.2,
            },
            technical: TechnicalImpact {
                system_impact: (0.3 + worst * 0.4).min(1.0),
                integration_impact: 0.3,
                maintainability_impact: 0.2,
            },
            confidence: CONFIDENCE,
            recommendations,
        }
    }

    /// Risk anchored at the baseline; worse degradation raises every
    /// dimension, capped at 1.0.
    fn assess_risk(&self, context: &AdaptationContext, worst: f64) -> RiskAssessment {
        let overall = (BASE_RISK + worst * 0.5).min(1.0);
        let resource_pressure = 1.0 - context.available_resources;
        RiskAssessment {
            overall,
            technical: (BASE_RISK + worst * 0.4).min(1.0),
            business: (BASE_RISK + worst * 0.3).min(1.0),
            compliance: 0.3,
            security: 0.3,
            operational: (BASE_RISK + resource_pressure * 0.4).min(1.0),
        }
    }

    fn assess_cost_benefit(&self, worst: f64) -> CostBenefit {
        let total_cost = BASE_COST * (1.0 + worst);
        let total_benefit = BASE_BENEFIT * (1.0 + worst * 0.5);
        let net_benefit = total_benefit - total_cost;
        let roi = if total_cost > 0.0 {
            net_benefit / total_cost
        } else {
            0.0
        };
        CostBenefit {
            total_cost,
            total_benefit,
            net_benefit,
            roi,
        }
    }

    fn assess_timeline(&self, context: &AdaptationContext, worst: f64) -> TimelineImpact {
        let estimated_duration_hours = BASE_DURATION_HOURS * (1.0 + worst * 0.5);
        TimelineImpact {
            estimated_duration_hours,
            critical_path_impact: (worst + (1.0 - context.time_constraints) * 0.5).min(1.0),
            buffer_hours: estimated_duration_hours * 0.2,
        }
    }

    /// Score each configured stakeholder: role base weight, plus the
    /// trigger's class weight, plus an involvement term.
    fn assess_stakeholders(
        &self,
        config: &AdaptationConfig,
        trigger: AdaptationTrigger,
    ) -> StakeholderImpact {
        let mut impact = StakeholderImpact::default();
        for stakeholder in &config.stakeholders {
            let score = stakeholder.role.base_weight()
                + trigger.stakeholder_weight()
                + stakeholder.involvement * 0.3;
            let level = ImpactLevel::from_stakeholder_score(score);
            impact.record(stakeholder, level);
        }
        impact
    }

    fn recommendations(
        &self,
        trigger: AdaptationTrigger,
        overall: ImpactLevel,
        risk: &RiskAssessment,
        cost_benefit: &CostBenefit,
    ) -> Vec<String> {
        let mut recs = Vec::new();
        if overall >= ImpactLevel::High {
            recs.push("stage the change and validate after each step".to_string());
        }
        if risk.overall > 0.7 {
            recs.push("prefer a reversible strategy with a tested rollback path".to_string());
        }
        if cost_benefit.net_benefit < 0.0 {
            recs.push("expected cost exceeds benefit, review before approving".to_string());
        }
        match trigger {
            AdaptationTrigger::PerformanceDegradation => {
                recs.push("focus optimization on the degraded workflow segments".to_string());
            }
            AdaptationTrigger::QualityIssues => {
                recs.push(
                    "add quality checks and consider an A/B comparison before full rollout"
                        .to_string(),
                );
            }
            _ => {}
        }
        recs
    }
}
