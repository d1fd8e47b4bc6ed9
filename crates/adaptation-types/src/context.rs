//! Adaptation context: the caller-supplied snapshot a trigger is judged
//! against
//!
//! One context is created per trigger evaluation and is immutable once
//! passed in. Metric deltas are optional; a trigger only needs the
//! metric family it thresholds on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status of the surrounding system at detection time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    #[default]
    Normal,
    Degraded,
    /// All adaptation is blocked while the platform is in maintenance.
    Maintenance,
}

/// Relative change in a metric family since the last healthy baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Relative degradation/increase, 0.0 = unchanged, 1.0 = doubled
    pub delta: f64,
    /// Current observed value
    pub current: f64,
    /// Target or budgeted value
    pub target: f64,
}

impl MetricDelta {
    pub fn new(delta: f64, current: f64, target: f64) -> Self {
        Self {
            delta,
            current,
            target,
        }
    }

    /// A delta-only observation where current/target are not known.
    pub fn of(delta: f64) -> Self {
        Self {
            delta,
            current: 0.0,
            target: 0.0,
        }
    }
}

/// Ephemeral, per-evaluation snapshot of the workflow's situation.
/// Created by the caller; never mutated by the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptationContext {
    /// When the triggering condition was detected
    pub detected_at: DateTime<Utc>,
    /// System status at detection time
    pub system_status: SystemStatus,
    /// Performance degradation since baseline (if observed)
    pub performance: Option<MetricDelta>,
    /// Quality degradation since baseline (if observed)
    pub quality: Option<MetricDelta>,
    /// Cost increase against budget (if observed)
    pub cost: Option<MetricDelta>,
    /// Schedule slip against deadline (if observed)
    pub time: Option<MetricDelta>,
    /// Fraction of resources currently available, 0.0–1.0
    pub available_resources: f64,
    /// Fraction of the time budget remaining, 0.0–1.0
    pub time_constraints: f64,
    /// Arbitrary business metadata carried through to history
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AdaptationContext {
    /// A context detected now with healthy defaults: full resources,
    /// full time budget, no metric deltas.
    pub fn new(detected_at: DateTime<Utc>) -> Self {
        Self {
            detected_at,
            system_status: SystemStatus::Normal,
            performance: None,
            quality: None,
            cost: None,
            time: None,
            available_resources: 1.0,
            time_constraints: 1.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_status(mut self, status: SystemStatus) -> Self {
        self.system_status = status;
        self
    }

    pub fn with_performance(mut self, delta: MetricDelta) -> Self {
        self.performance = Some(delta);
        self
    }

    pub fn with_quality(mut self, delta: MetricDelta) -> Self {
        self.quality = Some(delta);
        self
    }

    pub fn with_cost(mut self, delta: MetricDelta) -> Self {
        self.cost = Some(delta);
        self
    }

    pub fn with_time(mut self, delta: MetricDelta) -> Self {
        self.time = Some(delta);
        self
    }

    pub fn with_resources(mut self, available: f64) -> Self {
        self.available_resources = available.clamp(0.0, 1.0);
        self
    }

    pub fn with_time_budget(mut self, remaining: f64) -> Self {
        self.time_constraints = remaining.clamp(0.0, 1.0);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The worst observed degradation across all metric families, used
    /// as a risk signal.
    pub fn worst_delta(&self) -> f64 {
        [&self.performance, &self.quality, &self.cost, &self.time]
            .into_iter()
            .flatten()
            .map(|m| m.delta)
            .fold(0.0, f64::max)
    }
}
