//! Capability traits for the two external collaborators.
//!
//! Both are injected into the pipeline so tests can swap in deterministic
//! doubles from [`crate::testing`].

pub mod inference;
pub mod source;
