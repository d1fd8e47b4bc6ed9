//! Engine error taxonomy
//!
//! Dismissed triggers are not errors; they come back as a negative
//! `AdaptationResult`. Only faults the caller cannot reason about from
//! the result surface here.

use crate::{AdaptationId, ApprovalRequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdaptationError {
    /// The impact assessor could not score the proposal.
    #[error("impact assessment failed: {0}")]
    Assessment(String),

    /// No pending approval exists under the given id.
    #[error("approval request not found: {0}")]
    ApprovalNotFound(ApprovalRequestId),

    /// The approval request timed out at its final escalation level.
    #[error("approval request timed out: {0}")]
    ApprovalTimeout(ApprovalRequestId),

    /// A plan step failed against the execution target.
    #[error("execution failed at step {step}: {reason}")]
    Execution { step: String, reason: String },

    /// Rollback itself failed. The workflow may be in an inconsistent
    /// state; this always propagates to the caller.
    #[error("rollback failed for {adaptation}: {reason}")]
    RollbackFailed {
        adaptation: AdaptationId,
        reason: String,
    },

    /// The backing store rejected a write after retries. Folded into a
    /// `status = Error` result at the pipeline boundary; the run record
    /// is kept in memory.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// An administrative config update failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type EngineResult<T> = Result<T, AdaptationError>;

impl AdaptationError {
    /// Faults that cross `trigger_adaptation` as `Err` instead of being
    /// folded into the result. Only a failed rollback qualifies; the
    /// workflow may be in an inconsistent state the caller must see.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AdaptationError::RollbackFailed { .. })
    }
}
