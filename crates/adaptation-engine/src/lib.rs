//! Workflow Adaptation Engine
//!
//! Decides whether and how to change a running workflow's behavior in
//! response to observed triggers, and carries the change out safely.
//! One submission runs the whole pipeline:
//!
//! ```text
//! trigger -> evaluate -> assess impact -> select strategy
//!         -> approval gate -> execute (or park pending approval)
//!         -> record history -> learn
//! ```
//!
//! Runs for the same workflow are serialized; runs for different
//! workflows proceed concurrently. Every run is recorded exactly once,
//! whatever its outcome.
//!
//! # Example
//!
//! ```no_run
//! use adaptation_engine::{AdaptationEngine, MemoryStore, MockExecutionTarget, MockNotifier};
//! use adaptation_types::{AdaptationContext, AdaptationTrigger, MetricDelta, WorkflowId};
//! use std::sync::Arc;
//!
//! # async fn run() -> adaptation_types::EngineResult<()> {
//! let engine = AdaptationEngine::new(
//!     Arc::new(MockExecutionTarget::new()),
//!     Arc::new(MockNotifier::new()),
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! let context = AdaptationContext::new(chrono::Utc::now())
//!     .with_performance(MetricDelta::of(0.3));
//! let result = engine
//!     .trigger_adaptation(
//!         WorkflowId::new("wf-1042"),
//!         AdaptationTrigger::PerformanceDegradation,
//!         context,
//!     )
//!     .await?;
//! println!("{}: {}", result.status, result.message);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod approvals;
mod assessor;
mod engine;
mod evaluator;
mod executor;
mod history;
mod mocks;
mod selector;
mod traits;

pub use approvals::*;
pub use assessor::*;
pub use engine::*;
pub use evaluator::*;
pub use executor::*;
pub use history::*;
pub use mocks::*;
pub use selector::*;
pub use traits::*;
