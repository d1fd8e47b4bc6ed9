//! History records and streaming metrics
//!
//! Both history rings are capped; when full, the oldest entry is
//! evicted. Long-term archival is someone else's job.

use crate::{
    AdaptationId, AdaptationStrategy, AdaptationStatus, AdaptationTrigger, ImpactLevel,
    WorkflowId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default capacity of each history ring.
pub const HISTORY_CAPACITY: usize = 1_000;

/// Fixed-capacity append-only ring. Pushing past capacity evicts the
/// oldest entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Most recent entries first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().rev().take(n)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T> Default for BoundedLog<T> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

/// One completed (or attempted) pipeline run, as remembered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptationRecord {
    pub adaptation_id: Option<AdaptationId>,
    pub workflow_id: WorkflowId,
    pub trigger: AdaptationTrigger,
    pub strategy: Option<AdaptationStrategy>,
    pub impact: Option<ImpactLevel>,
    pub status: AdaptationStatus,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
    pub execution_time_ms: u64,
    /// 0.0 or 1.0 from outcome; refined signals are future work.
    pub effectiveness: f64,
    /// Risk that actually materialized, low on success.
    pub realized_risk: f64,
}

/// One trigger activation, kept for cooldown checks and audit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub workflow_id: WorkflowId,
    pub trigger: AdaptationTrigger,
    pub fired_at: DateTime<Utc>,
    pub accepted: bool,
    /// Why the trigger was dismissed, when it was.
    pub dismissal_reason: Option<String>,
}

/// Streaming aggregate metrics over all recorded runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_adaptations: u64,
    pub successful_adaptations: u64,
    pub failed_adaptations: u64,
    pub average_execution_time_ms: f64,
    /// Running average of impact scores (1=Minimal .. 5=Critical).
    pub average_impact_score: f64,
    pub average_effectiveness: f64,
}

impl PerformanceMetrics {
    /// Fold one run into the running averages.
    pub fn record(
        &mut self,
        succeeded: bool,
        execution_time_ms: u64,
        impact: Option<ImpactLevel>,
        effectiveness: f64,
    ) {
        self.total_adaptations += 1;
        if succeeded {
            self.successful_adaptations += 1;
        } else {
            self.failed_adaptations += 1;
        }
        let n = self.total_adaptations as f64;
        self.average_execution_time_ms =
            (self.average_execution_time_ms * (n - 1.0) + execution_time_ms as f64) / n;
        let impact_score = impact.map(|i| i.score()).unwrap_or(0.0);
        self.average_impact_score =
            (self.average_impact_score * (n - 1.0) + impact_score) / n;
        self.average_effectiveness =
            (self.average_effectiveness * (n - 1.0) + effectiveness) / n;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_adaptations == 0 {
            return 0.0;
        }
        self.successful_adaptations as f64 / self.total_adaptations as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest() {
        let mut log = BoundedLog::new(3);
        for i in 0..5 {
            log.push(i);
        }
        assert_eq!(log.len(), 3);
        let entries: Vec<_> = log.iter().copied().collect();
        assert_eq!(entries, vec![2, 3, 4]);
        assert_eq!(log.last(), Some(&4));
    }

    #[test]
    fn default_capacity_keeps_the_most_recent_thousand() {
        let mut log = BoundedLog::default();
        for i in 0..1_250u32 {
            log.push(i);
        }
        assert_eq!(log.len(), 1_000);
        // The 250 oldest entries were evicted, newest kept.
        assert_eq!(log.iter().next(), Some(&250));
        assert_eq!(log.last(), Some(&1_249));
    }

    #[test]
    fn recent_is_newest_first() {
        let mut log = BoundedLog::new(10);
        for i in 0..4 {
            log.push(i);
        }
        let recent: Vec<_> = log.recent(2).copied().collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[test]
    fn metrics_streaming_average() {
        let mut m = PerformanceMetrics::default();
        m.record(true, 100, Some(ImpactLevel::Low), 1.0);
        m.record(false, 300, Some(ImpactLevel::Critical), 0.0);
        assert_eq!(m.total_adaptations, 2);
        assert_eq!(m.successful_adaptations, 1);
        assert_eq!(m.failed_adaptations, 1);
        assert_eq!(m.average_execution_time_ms, 200.0);
        assert_eq!(m.average_impact_score, 3.5);
        assert_eq!(m.average_effectiveness, 0.5);
        assert_eq!(m.success_rate(), 0.5);
    }

    #[test]
    fn success_and_failure_counts_partition_total() {
        let mut m = PerformanceMetrics::default();
        for i in 0..37 {
            m.record(i % 3 == 0, 10, None, 0.5);
        }
        assert_eq!(
            m.successful_adaptations + m.failed_adaptations,
            m.total_adaptations
        );
    }
}
