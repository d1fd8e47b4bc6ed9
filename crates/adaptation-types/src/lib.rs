//! Workflow Adaptation Domain Types
//!
//! The adaptation engine observes signals about a running receivables
//! workflow (performance drop, quality issue, cost overrun, deadline
//! pressure, user feedback, anomaly, seasonal/market shift), decides
//! whether and how to change that workflow's behavior, obtains human
//! sign-off when the change is risky, executes the change safely, and
//! learns from the outcome.
//!
//! # Key Concepts
//!
//! - **AdaptationTrigger**: A named condition signaling a workflow may
//!   need adaptation. Each trigger kind carries a cooldown window.
//! - **AdaptationStrategy**: A named approach to adapting a workflow,
//!   from incremental improvement to radical redesign.
//! - **ImpactAssessment**: A multi-dimensional, deterministic scoring of
//!   a proposed change, bucketed into five impact levels.
//! - **ApprovalRequest / PendingApproval**: The human sign-off state
//!   machine, with multi-level escalation and exactly one terminal
//!   outcome.
//! - **ExecutionPlan / RollbackPlan**: The ordered steps that change real
//!   workflow state, and the paired recovery procedure.
//! - **BoundedLog**: Capped history rings; oldest entries are evicted,
//!   never archived, by this subsystem.
//!
//! # Design Principles
//!
//! 1. Decisions are deterministic, explainable weighted arithmetic over
//!    inputs, never an opaque model.
//! 2. Config is read-only during a decision; only the learning loop and
//!    explicit administrative updates mutate it.
//! 3. Every pipeline run is recorded exactly once, whatever its outcome.
//! 4. Escalation is explicit, never silent failure.

#![deny(unsafe_code)]

mod approval;
mod config;
mod context;
mod errors;
mod impact;
mod plan;
mod record;
mod result;
mod strategy;
#[cfg(test)]
mod test_support;
mod trigger;

pub use approval::*;
pub use config::*;
pub use context::*;
pub use errors::*;
pub use impact::*;
pub use plan::*;
pub use record::*;
pub use result::*;
pub use strategy::*;
pub use trigger::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the workflow a trigger applies to. All engine state is
/// keyed and serialized by this id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one executed (or attempted) adaptation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdaptationId(pub String);

impl AdaptationId {
    pub fn generate() -> Self {
        Self(format!("adapt-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for AdaptationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an approval request while it moves through escalation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRequestId(pub String);

impl ApprovalRequestId {
    pub fn generate() -> Self {
        Self(format!("appr-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for ApprovalRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
