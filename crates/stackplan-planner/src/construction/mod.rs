//! Construction Phase
//!
//! All validation happens here, producing a [`ValidatedPlan`] that later
//! phases can trust without re-checking.
//!
//! # Two-Phase Architecture
//!
//! 1. **Construction Phase** (this module):
//!    - Resolve networks and carve subnets
//!    - Assemble containers, deduplicating log channels
//!    - Enforce task capacity and primary container rules
//!    - Plan services and load balancers
//!    - Build the dependency graph and its creation order
//!    - Produce `ValidatedPlan`
//!
//! 2. **Synthesis Phase** ([`crate::synth`]):
//!    - Walk the plan in creation order
//!    - Emit a deterministic descriptor
//!    - Zero validation

pub mod builder;
pub mod validated;

pub use builder::PlanBuilder;
pub use validated::{ValidatedPlan, ValidationReport};
