//! Strategy selection, the pipeline's third stage
//!
//! Every strategy is scored on five additive components, ranked, and
//! the best-ranked strategy the workflow permits wins. Selection never
//! comes back empty: when nothing qualifies, the conservative fallback
//! is chosen. Ties break toward the earlier entry in canonical order,
//! which the stable sort preserves.

use adaptation_types::{
    AdaptationConfig, AdaptationContext, AdaptationStrategy, AdaptationTrigger, ImpactAssessment,
    ImpactLevel,
};
use chrono::Timelike;
use tracing::debug;

/// Score breakdown for one candidate strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategyScore {
    pub strategy: AdaptationStrategy,
    pub compatibility: f64,
    pub impact_fit: f64,
    pub risk_fit: f64,
    pub resource_fit: f64,
    pub time_fit: f64,
}

impl StrategyScore {
    pub fn total(&self) -> f64 {
        self.compatibility + self.impact_fit + self.risk_fit + self.resource_fit + self.time_fit
    }
}

/// The winning strategy with its full ranking, kept for audit logs.
#[derive(Clone, Debug)]
pub struct Selection {
    pub strategy: AdaptationStrategy,
    /// Whether the winner came from ranking or from the fallback rule.
    pub fell_back: bool,
    /// All candidates, best first.
    pub ranking: Vec<StrategyScore>,
}

/// Stateless selector.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrategySelector;

impl StrategySelector {
    pub fn select(
        &self,
        config: &AdaptationConfig,
        trigger: AdaptationTrigger,
        assessment: &ImpactAssessment,
        context: &AdaptationContext,
    ) -> Selection {
        let mut ranking: Vec<StrategyScore> = AdaptationStrategy::ALL
            .iter()
            .map(|&strategy| self.score(config, trigger, assessment, context, strategy))
            .collect();
        ranking.sort_by(|a, b| {
            b.total()
                .partial_cmp(&a.total())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let in_business_hours = config.business_hours.contains(context.detected_at.hour());

        let winner = ranking.iter().find(|score| {
            config.enabled_strategies.contains(&score.strategy)
                && !(score.strategy.is_disruptive() && in_business_hours)
        });

        match winner {
            Some(score) => {
                debug!(strategy = %score.strategy, total = format!("{:.2}", score.total()), "strategy selected");
                Selection {
                    strategy: score.strategy,
                    fell_back: false,
                    ranking,
                }
            }
            None => {
                debug!(strategy = %AdaptationStrategy::FALLBACK, "no enabled strategy qualified, using fallback");
                Selection {
                    strategy: AdaptationStrategy::FALLBACK,
                    fell_back: true,
                    ranking,
                }
            }
        }
    }

    fn score(
        &self,
        config: &AdaptationConfig,
        trigger: AdaptationTrigger,
        assessment: &ImpactAssessment,
        context: &AdaptationContext,
        strategy: AdaptationStrategy,
    ) -> StrategyScore {
        StrategyScore {
            strategy,
            compatibility: compatibility(trigger, strategy),
            impact_fit: impact_fit(assessment.overall, strategy),
            risk_fit: risk_fit(assessment.risk.overall, config.risk_tolerance, strategy),
            resource_fit: ratio_fit(context.available_resources, strategy.resource_requirement()),
            time_fit: ratio_fit(context.time_constraints, strategy.time_requirement()),
        }
    }
}

/// Fit of an available/required ratio: full marks when supply covers
/// demand, linear penalty below.
fn ratio_fit(available: f64, required: f64) -> f64 {
    if required <= 0.0 || available >= required {
        1.0
    } else {
        available / required
    }
}

/// How well a strategy's safety profile fits the assessed risk of the
/// proposed change. High assessed risk scores by raw safety whatever
/// the caller's appetite; low assessed risk lets a risk-seeking caller
/// favor the aggressive strategies; everything else compresses toward
/// the middle.
fn risk_fit(assessed_risk: f64, risk_tolerance: f64, strategy: AdaptationStrategy) -> f64 {
    let base = strategy.safety_score();
    if assessed_risk > 0.7 {
        base
    } else if assessed_risk < 0.3 && risk_tolerance < 0.3 {
        1.0 - base + 0.5
    } else {
        base * 0.8 + 0.2
    }
}

/// Fixed trigger-to-strategy compatibility table. Strategy order is
/// canonical: incremental, parallel, radical, emergency, predictive,
/// sequential, hybrid, rollback, ab-testing, gradual.
fn compatibility(trigger: AdaptationTrigger, strategy: AdaptationStrategy) -> f64 {
    let row: [f64; 10] = match trigger {
        AdaptationTrigger::PerformanceDegradation => {
            [0.8, 0.9, 0.3, 0.7, 0.6, 0.7, 0.8, 0.4, 0.6, 0.7]
        }
        AdaptationTrigger::QualityIssues => [0.9, 0.7, 0.5, 0.8, 0.6, 0.8, 0.8, 0.6, 0.7, 0.8],
        AdaptationTrigger::ResourceConstraints => {
            [0.7, 0.4, 0.2, 0.6, 0.8, 0.9, 0.6, 0.5, 0.3, 0.8]
        }
        AdaptationTrigger::DeadlinePressure => [0.6, 0.8, 0.1, 0.9, 0.4, 0.3, 0.7, 0.2, 0.2, 0.3],
        AdaptationTrigger::UserFeedback => [0.8, 0.6, 0.7, 0.4, 0.5, 0.7, 0.8, 0.3, 0.9, 0.8],
        AdaptationTrigger::PatternRecognition => {
            [0.7, 0.8, 0.6, 0.3, 0.9, 0.7, 0.8, 0.2, 0.7, 0.6]
        }
        AdaptationTrigger::AnomalyDetection => [0.5, 0.6, 0.4, 0.9, 0.7, 0.4, 0.6, 0.8, 0.3, 0.4],
        AdaptationTrigger::CostOverrun => [0.8, 0.5, 0.3, 0.7, 0.6, 0.9, 0.7, 0.6, 0.4, 0.7],
        AdaptationTrigger::SeasonalChanges => [0.7, 0.6, 0.4, 0.2, 0.9, 0.8, 0.7, 0.3, 0.6, 0.8],
        AdaptationTrigger::MarketConditions => [0.6, 0.7, 0.8, 0.5, 0.8, 0.6, 0.9, 0.3, 0.7, 0.7],
        AdaptationTrigger::RegulatoryChanges => [0.7, 0.5, 0.6, 0.8, 0.6, 0.8, 0.7, 0.4, 0.5, 0.9],
        AdaptationTrigger::TechnologyUpdates => [0.8, 0.7, 0.6, 0.3, 0.7, 0.8, 0.8, 0.5, 0.8, 0.9],
    };
    row[strategy_index(strategy)]
}

/// Fixed impact-to-strategy fit table, same canonical strategy order.
fn impact_fit(impact: ImpactLevel, strategy: AdaptationStrategy) -> f64 {
    let row: [f64; 10] = match impact {
        ImpactLevel::Minimal => [0.9, 0.7, 0.1, 0.2, 0.8, 0.8, 0.7, 0.3, 0.8, 0.9],
        ImpactLevel::Low => [0.8, 0.8, 0.3, 0.4, 0.7, 0.8, 0.8, 0.4, 0.8, 0.8],
        ImpactLevel::Moderate => [0.7, 0.8, 0.5, 0.6, 0.7, 0.7, 0.9, 0.5, 0.7, 0.8],
        ImpactLevel::High => [0.5, 0.7, 0.7, 0.8, 0.6, 0.6, 0.8, 0.7, 0.6, 0.7],
        ImpactLevel::Critical => [0.3, 0.5, 0.8, 0.9, 0.4, 0.4, 0.6, 0.8, 0.3, 0.4],
    };
    row[strategy_index(strategy)]
}

fn strategy_index(strategy: AdaptationStrategy) -> usize {
    AdaptationStrategy::ALL
        .iter()
        .position(|&s| s == strategy)
        .unwrap_or(0)
}
