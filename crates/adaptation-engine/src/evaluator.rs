//! Trigger evaluation, the pipeline's first stage
//!
//! Four checks run in order and short-circuit on the first dismissal:
//! active-set membership, metric threshold, cooldown, business rules.
//! A dismissal is a normal negative outcome, not an error.

use adaptation_types::{
    AdaptationConfig, AdaptationContext, AdaptationTrigger, SystemStatus,
};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

/// Why a trigger was dismissed without further processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DismissalReason {
    TriggerInactive,
    BelowThreshold { observed: String, threshold: String },
    InCooldown { remaining_secs: i64 },
    MaintenanceWindow,
}

impl fmt::Display for DismissalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DismissalReason::TriggerInactive => {
                write!(f, "trigger is not in the workflow's active set")
            }
            DismissalReason::BelowThreshold {
                observed,
                threshold,
            } => write!(
                f,
                "observed delta {} does not exceed threshold {}",
                observed, threshold
            ),
            DismissalReason::InCooldown { remaining_secs } => {
                write!(f, "trigger in cooldown for another {}s", remaining_secs)
            }
            DismissalReason::MaintenanceWindow => {
                write!(f, "adaptation blocked while system is in maintenance")
            }
        }
    }
}

/// Outcome of trigger evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerVerdict {
    Accept,
    Dismiss(DismissalReason),
}

/// Stateless evaluator; cooldown bookkeeping lives with the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct TriggerEvaluator;

impl TriggerEvaluator {
    /// Run the four checks in order. `last_fired` is the previous
    /// accepted activation of this trigger kind for this workflow.
    pub fn evaluate(
        &self,
        config: &AdaptationConfig,
        trigger: AdaptationTrigger,
        context: &AdaptationContext,
        last_fired: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> TriggerVerdict {
        if !config.active_triggers.contains(&trigger) {
            debug!(%trigger, "trigger not active for workflow");
            return TriggerVerdict::Dismiss(DismissalReason::TriggerInactive);
        }

        if let Some(reason) = self.threshold_check(config, trigger, context) {
            debug!(%trigger, %reason, "trigger below threshold");
            return TriggerVerdict::Dismiss(reason);
        }

        if let Some(fired_at) = last_fired {
            let cooldown = trigger.cooldown();
            let elapsed = now - fired_at;
            if elapsed < cooldown {
                let remaining_secs = (cooldown - elapsed).num_seconds();
                debug!(%trigger, remaining_secs, "trigger in cooldown");
                return TriggerVerdict::Dismiss(DismissalReason::InCooldown { remaining_secs });
            }
        }

        if context.system_status == SystemStatus::Maintenance {
            debug!(%trigger, "system in maintenance, dismissing");
            return TriggerVerdict::Dismiss(DismissalReason::MaintenanceWindow);
        }

        TriggerVerdict::Accept
    }

    /// Threshold check for the trigger kinds with a metric family.
    /// Kinds without one (user feedback, market shifts, anomalies) pass
    /// through; their signal is the trigger itself.
    fn threshold_check(
        &self,
        config: &AdaptationConfig,
        trigger: AdaptationTrigger,
        context: &AdaptationContext,
    ) -> Option<DismissalReason> {
        let (observed, threshold) = match trigger {
            AdaptationTrigger::PerformanceDegradation => (
                context.performance.map(|m| m.delta),
                config.thresholds.performance_degradation,
            ),
            AdaptationTrigger::QualityIssues => (
                context.quality.map(|m| m.delta),
                config.thresholds.quality_degradation,
            ),
            AdaptationTrigger::CostOverrun => {
                (context.cost.map(|m| m.delta), config.thresholds.cost_increase)
            }
            AdaptationTrigger::DeadlinePressure => {
                (context.time.map(|m| m.delta), config.thresholds.time_increase)
            }
            _ => return None,
        };

        // A missing observation counts as zero delta.
        let observed = observed.unwrap_or(0.0);
        if observed > threshold {
            None
        } else {
            Some(DismissalReason::BelowThreshold {
                observed: format!("{:.3}", observed),
                threshold: format!("{:.3}", threshold),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptation_types::MetricDelta;
    use chrono::Duration;

    fn ctx() -> AdaptationContext {
        AdaptationContext::new(Utc::now())
    }

    #[test]
    fn inactive_trigger_is_dismissed_first() {
        let config = AdaptationConfig::default();
        // CostOverrun is not in the default active set.
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::CostOverrun,
            &ctx().with_cost(MetricDelta::of(0.9)),
            None,
            Utc::now(),
        );
        assert_eq!(
            verdict,
            TriggerVerdict::Dismiss(DismissalReason::TriggerInactive)
        );
    }

    #[test]
    fn below_threshold_is_dismissed() {
        let config = AdaptationConfig::default();
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::PerformanceDegradation,
            &ctx().with_performance(MetricDelta::of(0.10)),
            None,
            Utc::now(),
        );
        assert!(matches!(
            verdict,
            TriggerVerdict::Dismiss(DismissalReason::BelowThreshold { .. })
        ));
    }

    #[test]
    fn over_threshold_is_accepted() {
        let config = AdaptationConfig::default();
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::PerformanceDegradation,
            &ctx().with_performance(MetricDelta::of(0.30)),
            None,
            Utc::now(),
        );
        assert_eq!(verdict, TriggerVerdict::Accept);
    }

    #[test]
    fn missing_observation_counts_as_zero() {
        let config = AdaptationConfig::default();
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::QualityIssues,
            &ctx(),
            None,
            Utc::now(),
        );
        assert!(matches!(
            verdict,
            TriggerVerdict::Dismiss(DismissalReason::BelowThreshold { .. })
        ));
    }

    #[test]
    fn cooldown_blocks_repeat_activation() {
        let config = AdaptationConfig::default();
        let now = Utc::now();
        let context = ctx().with_performance(MetricDelta::of(0.30));

        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::PerformanceDegradation,
            &context,
            Some(now - Duration::minutes(2)),
            now,
        );
        assert!(matches!(
            verdict,
            TriggerVerdict::Dismiss(DismissalReason::InCooldown { .. })
        ));

        // Past the 5 minute cooldown the same trigger is accepted.
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::PerformanceDegradation,
            &context,
            Some(now - Duration::minutes(6)),
            now,
        );
        assert_eq!(verdict, TriggerVerdict::Accept);
    }

    #[test]
    fn maintenance_blocks_everything() {
        let config = AdaptationConfig::default();
        let context = ctx()
            .with_status(SystemStatus::Maintenance)
            .with_performance(MetricDelta::of(0.30));
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::PerformanceDegradation,
            &context,
            None,
            Utc::now(),
        );
        assert_eq!(
            verdict,
            TriggerVerdict::Dismiss(DismissalReason::MaintenanceWindow)
        );
    }

    #[test]
    fn threshold_free_kinds_pass_through() {
        let config = AdaptationConfig::default();
        let verdict = TriggerEvaluator.evaluate(
            &config,
            AdaptationTrigger::UserFeedback,
            &ctx(),
            None,
            Utc::now(),
        );
        assert_eq!(verdict, TriggerVerdict::Accept);
    }
}
