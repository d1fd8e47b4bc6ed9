//! Adaptation strategies: the approaches available for changing a workflow
//!
//! Each strategy carries fixed resource/time requirement ratios and a
//! base risk-fit score. These feed the selector's scoring; the tables are
//! explicit per-kind lookups so every cell is unit-testable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named approach to adapting a workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStrategy {
    /// Small, low-risk improvements applied in place. The conservative
    /// fallback when nothing else qualifies.
    IncrementalImprovement,
    /// Optimize several workflow segments concurrently
    ParallelOptimization,
    /// Rebuild the workflow from scratch
    RadicalRedesign,
    /// Fast, minimal intervention under pressure
    EmergencyAdaptation,
    /// Adapt ahead of a predicted condition
    PredictiveAdaptation,
    /// Optimize workflow segments one after another
    SequentialOptimization,
    /// Mix of incremental and structural changes
    HybridApproach,
    /// Revert to a known-good prior configuration
    RollbackStrategy,
    /// Run old and new variants side by side and compare
    AbTesting,
    /// Roll the change out to a growing share of traffic
    GradualRollout,
}

impl AdaptationStrategy {
    /// Every strategy, in canonical order. Selector ties break toward
    /// the earlier entry.
    pub const ALL: [AdaptationStrategy; 10] = [
        AdaptationStrategy::IncrementalImprovement,
        AdaptationStrategy::ParallelOptimization,
        AdaptationStrategy::RadicalRedesign,
        AdaptationStrategy::EmergencyAdaptation,
        AdaptationStrategy::PredictiveAdaptation,
        AdaptationStrategy::SequentialOptimization,
        AdaptationStrategy::HybridApproach,
        AdaptationStrategy::RollbackStrategy,
        AdaptationStrategy::AbTesting,
        AdaptationStrategy::GradualRollout,
    ];

    /// The most conservative strategy, used as the selector's
    /// deterministic fallback so the pipeline never returns "no decision".
    pub const FALLBACK: AdaptationStrategy = AdaptationStrategy::IncrementalImprovement;

    /// Fraction of total resources this strategy needs to execute well.
    pub fn resource_requirement(&self) -> f64 {
        match self {
            AdaptationStrategy::IncrementalImprovement => 0.3,
            AdaptationStrategy::ParallelOptimization => 0.8,
            AdaptationStrategy::RadicalRedesign => 0.9,
            AdaptationStrategy::EmergencyAdaptation => 0.6,
            AdaptationStrategy::PredictiveAdaptation => 0.5,
            AdaptationStrategy::SequentialOptimization => 0.4,
            AdaptationStrategy::HybridApproach => 0.7,
            AdaptationStrategy::RollbackStrategy => 0.2,
            AdaptationStrategy::AbTesting => 0.6,
            AdaptationStrategy::GradualRollout => 0.5,
        }
    }

    /// Fraction of the time budget this strategy needs.
    pub fn time_requirement(&self) -> f64 {
        match self {
            AdaptationStrategy::IncrementalImprovement => 0.3,
            AdaptationStrategy::ParallelOptimization => 0.5,
            AdaptationStrategy::RadicalRedesign => 0.9,
            AdaptationStrategy::EmergencyAdaptation => 0.1,
            AdaptationStrategy::PredictiveAdaptation => 0.4,
            AdaptationStrategy::SequentialOptimization => 0.7,
            AdaptationStrategy::HybridApproach => 0.6,
            AdaptationStrategy::RollbackStrategy => 0.2,
            AdaptationStrategy::AbTesting => 0.8,
            AdaptationStrategy::GradualRollout => 0.8,
        }
    }

    /// Base safety score: 1.0 means very safe to run, low values mean
    /// high-risk structural change. The selector blends this with the
    /// caller's risk aversion.
    pub fn safety_score(&self) -> f64 {
        match self {
            AdaptationStrategy::IncrementalImprovement => 0.9,
            AdaptationStrategy::ParallelOptimization => 0.7,
            AdaptationStrategy::RadicalRedesign => 0.2,
            AdaptationStrategy::EmergencyAdaptation => 0.4,
            AdaptationStrategy::PredictiveAdaptation => 0.8,
            AdaptationStrategy::SequentialOptimization => 0.8,
            AdaptationStrategy::HybridApproach => 0.6,
            AdaptationStrategy::RollbackStrategy => 0.9,
            AdaptationStrategy::AbTesting => 0.8,
            AdaptationStrategy::GradualRollout => 0.9,
        }
    }

    /// Strategies considered disruptive enough to restrict during
    /// declared business hours.
    pub fn is_disruptive(&self) -> bool {
        matches!(self, AdaptationStrategy::RadicalRedesign)
    }
}

impl fmt::Display for AdaptationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdaptationStrategy::IncrementalImprovement => "incremental_improvement",
            AdaptationStrategy::ParallelOptimization => "parallel_optimization",
            AdaptationStrategy::RadicalRedesign => "radical_redesign",
            AdaptationStrategy::EmergencyAdaptation => "emergency_adaptation",
            AdaptationStrategy::PredictiveAdaptation => "predictive_adaptation",
            AdaptationStrategy::SequentialOptimization => "sequential_optimization",
            AdaptationStrategy::HybridApproach => "hybrid_approach",
            AdaptationStrategy::RollbackStrategy => "rollback_strategy",
            AdaptationStrategy::AbTesting => "ab_testing",
            AdaptationStrategy::GradualRollout => "gradual_rollout",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_tables_in_unit_range() {
        for strategy in AdaptationStrategy::ALL {
            assert!((0.0..=1.0).contains(&strategy.resource_requirement()));
            assert!((0.0..=1.0).contains(&strategy.time_requirement()));
            assert!((0.0..=1.0).contains(&strategy.safety_score()));
        }
    }

    #[test]
    fn fallback_is_cheapest_safe_option() {
        let fb = AdaptationStrategy::FALLBACK;
        assert_eq!(fb, AdaptationStrategy::IncrementalImprovement);
        assert!(fb.safety_score() >= 0.9);
        assert!(fb.resource_requirement() <= 0.3);
    }

    #[test]
    fn radical_redesign_is_disruptive() {
        assert!(AdaptationStrategy::RadicalRedesign.is_disruptive());
        assert!(!AdaptationStrategy::GradualRollout.is_disruptive());
    }
}
