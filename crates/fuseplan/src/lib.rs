//! Incremental legality planning for GPU operator fusion.
//!
//! A scheduler proposes operators one at a time; [`OperatorGroup`] answers
//! whether the chain built so far could absorb each candidate and stays
//! legal by construction. Probes ([`OperatorGroup::try_add_operator`],
//! [`OperatorGroup::check_operator`]) never mutate; commits
//! ([`OperatorGroup::add_operator`]) panic if the probe step was skipped.
//! Tensors live with the caller and are only ever seen through
//! [`TensorDescriptor`] references.

pub mod descriptor;
pub mod graph;
pub mod group;
pub mod operator;

pub use descriptor::{DataLayout, TensorDescriptor, TensorId, TensorShape};
pub use graph::{DependencyGraph, OpPack};
pub use group::{OperatorGroup, RejectReason, MAX_FUSED_OPERATORS};
pub use operator::{ArgumentPack, FusibilityClass, Operator, OperatorId, TensorRole};
