//! The collect → analyze → value pipeline.
//!
//! - `collect` fans out to the listing source and merges per-site results
//! - `analyze` computes aggregates and asks for a grounded narrative
//! - `valuation` values each listing against its comparables
//! - `orchestrator` sequences the stages as a state machine

pub mod analyze;
pub mod collect;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod stats;
pub mod valuation;

pub use analyze::analyze;
pub use collect::{collect, CollectOutcome};
pub use orchestrator::{Pipeline, PipelineState, ProgressObserver};
pub use valuation::{estimate, estimate_all, find_comparables};
