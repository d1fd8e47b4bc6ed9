//! History and the learning loop, the pipeline's final stage
//!
//! Every run is recorded exactly once, whatever its outcome, including
//! dismissals and runs parked pending approval. The learning loop reads
//! the recorded effectiveness and nudges the workflow's thresholds,
//! once per run, after everything else.

use adaptation_types::{
    AdaptationConfig, AdaptationRecord, AdaptationTrigger, BoundedLog, PerformanceMetrics,
    TriggerRecord,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Scale factor applied when adaptations underperform: thresholds
/// loosen so the engine fires less often.
const LOOSEN_FACTOR: f64 = 1.1;
/// Scale factor applied when adaptations do well: thresholds tighten
/// so the engine reacts earlier.
const TIGHTEN_FACTOR: f64 = 0.9;

/// Everything one workflow remembers about past adaptation activity.
#[derive(Debug, Default)]
pub struct WorkflowHistory {
    pub adaptations: BoundedLog<AdaptationRecord>,
    pub triggers: BoundedLog<TriggerRecord>,
    pub metrics: PerformanceMetrics,
}

impl WorkflowHistory {
    /// Fold one run into the record ring and the streaming metrics.
    pub fn record(&mut self, record: AdaptationRecord) {
        self.metrics.record(
            record.status == adaptation_types::AdaptationStatus::Completed,
            record.execution_time_ms,
            record.impact,
            record.effectiveness,
        );
        self.adaptations.push(record);
    }

    pub fn record_trigger(&mut self, record: TriggerRecord) {
        self.triggers.push(record);
    }

    /// When this trigger kind last fired and was accepted, for cooldown
    /// checks.
    pub fn last_accepted(&self, trigger: AdaptationTrigger) -> Option<DateTime<Utc>> {
        self.triggers
            .iter()
            .filter(|r| r.accepted && r.trigger == trigger)
            .map(|r| r.fired_at)
            .last()
    }
}

/// Nudge the workflow's thresholds from observed effectiveness. Runs
/// once after each pipeline run when learning is enabled; the running
/// average keeps single outliers from whipsawing the thresholds. Only
/// the performance and quality thresholds are tuned.
pub fn apply_learning(config: &mut AdaptationConfig, history: &WorkflowHistory) {
    if !config.learning_enabled || history.metrics.total_adaptations == 0 {
        return;
    }
    let effectiveness = history.metrics.average_effectiveness;
    if effectiveness < 0.5 {
        config.thresholds.adjust_sensitivity(LOOSEN_FACTOR);
        debug!(
            effectiveness = format!("{:.2}", effectiveness),
            "loosening adaptation thresholds"
        );
    } else if effectiveness > 0.8 {
        config.thresholds.adjust_sensitivity(TIGHTEN_FACTOR);
        debug!(
            effectiveness = format!("{:.2}", effectiveness),
            "tightening adaptation thresholds"
        );
    }
}
