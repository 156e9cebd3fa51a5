//! Whole-chain admission control for fused workloads.
//!
//! [`OperatorGroup`] wraps a [`DependencyGraph`] and layers the
//! target-side fusion constraints (capacity, operator classes, shape and
//! layout agreement) on top of the structural linearity rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::descriptor::{DataLayout, TensorShape};
use crate::graph::DependencyGraph;
use crate::operator::{ArgumentPack, FusibilityClass, Operator, OperatorId};

/// Upper bound on the number of operators one workload may fuse.
pub const MAX_FUSED_OPERATORS: usize = 32;

/// Why a candidate operator may not join a chain.
///
/// Every variant is an expected, recoverable answer to a legality probe;
/// callers typically fall back to dispatching the operator unfused.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("operator does not extend the linear chain")]
    NotLinear,
    #[error("chain already holds the maximum of {} fused operators", MAX_FUSED_OPERATORS)]
    CapacityExceeded,
    #[error("chain is rooted at an unfusable operator and closed")]
    RootClosed,
    #[error("only simple operators may extend a chain; candidate is {candidate:?}")]
    FollowerNotSimple { candidate: FusibilityClass },
    #[error("fusable operators must write exactly one destination tensor, found {found}")]
    OutputArity { found: usize },
    #[error("destination shape {found} does not agree with the chain shape {expected}")]
    ShapeMismatch {
        expected: TensorShape,
        found: TensorShape,
    },
    #[error("destination layout {found:?} does not agree with the chain layout {expected:?}")]
    LayoutMismatch {
        expected: DataLayout,
        found: DataLayout,
    },
}

/// An incrementally built, always-legal fusion chain.
///
/// Candidates are probed with [`Self::try_add_operator`] or
/// [`Self::check_operator`] and admitted with [`Self::add_operator`]; a
/// group therefore never holds a chain the target could not fuse.
#[derive(Clone, Debug, Default)]
pub struct OperatorGroup<'t> {
    graph: DependencyGraph,
    operators: HashMap<OperatorId, Operator<'t>>,
}

impl<'t> OperatorGroup<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of admitted operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Read-only view of the underlying dependency graph, for callers
    /// that need tensor classification or traversal.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Mints a candidate operator whose id is the current operator count.
    ///
    /// The id is only unique as long as at most one minted operator is
    /// alive at a time: mint, then admit or drop, then mint again. Two
    /// live candidates share an id and committing the second panics.
    pub fn new_operator(
        &self,
        fusibility: FusibilityClass,
        tensors: ArgumentPack<'t>,
    ) -> Operator<'t> {
        Operator::new(OperatorId(self.operators.len() as u32), fusibility, tensors)
    }

    /// Probes whether `op` could be admitted. Never mutates the group.
    pub fn try_add_operator(&self, op: &Operator<'t>) -> bool {
        self.check_operator(op).is_ok()
    }

    /// Probes whether `op` could be admitted, reporting why not.
    /// Never mutates the group.
    pub fn check_operator(&self, op: &Operator<'t>) -> Result<(), RejectReason> {
        let verdict = self.evaluate(op);
        if let Err(reason) = &verdict {
            trace!("rejected operator {:?}: {reason}", op.id());
        }
        verdict
    }

    fn evaluate(&self, op: &Operator<'t>) -> Result<(), RejectReason> {
        let src_ids = op.tensors().source_ids();
        let dst_ids = op.tensors().destination_ids();
        if !self
            .graph
            .try_add_operator_as_linear(op.id(), &src_ids, &dst_ids)
        {
            return Err(RejectReason::NotLinear);
        }

        if self.operators.len() >= MAX_FUSED_OPERATORS {
            return Err(RejectReason::CapacityExceeded);
        }

        let root = self.root_operator();
        if let Some(root) = root {
            if root.fusibility() == FusibilityClass::Unfusable {
                return Err(RejectReason::RootClosed);
            }
            if op.fusibility() != FusibilityClass::Simple {
                return Err(RejectReason::FollowerNotSimple {
                    candidate: op.fusibility(),
                });
            }
        }

        if op.fusibility() != FusibilityClass::Unfusable {
            let found = op.tensors().destinations().len();
            if found != 1 {
                return Err(RejectReason::OutputArity { found });
            }
        }

        if let Some(root) = root {
            // The root cannot be unfusable here, so it was admitted with
            // exactly one destination; that tensor fixes shape and layout
            // for the whole chain.
            let reference = root
                .tensors()
                .destinations()
                .first()
                .expect("chain root has no destination tensor");
            let chain_dsts = || {
                root.tensors()
                    .destinations()
                    .iter()
                    .chain(op.tensors().destinations())
            };
            for t in chain_dsts() {
                if !t.shape().matches_prefix(reference.shape()) {
                    return Err(RejectReason::ShapeMismatch {
                        expected: reference.shape().clone(),
                        found: t.shape().clone(),
                    });
                }
            }
            for t in chain_dsts() {
                if t.data_layout() != reference.data_layout() {
                    return Err(RejectReason::LayoutMismatch {
                        expected: reference.data_layout(),
                        found: t.data_layout(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Admits `op` into the chain.
    ///
    /// The caller must have already probed `op`; admitting a candidate the
    /// probe rejects, or one whose id collides with an admitted operator,
    /// panics.
    pub fn add_operator(&mut self, op: Operator<'t>) {
        if let Err(reason) = self.check_operator(&op) {
            panic!(
                "operator {:?} may not join the fusion chain: {reason}",
                op.id()
            );
        }
        let src_ids = op.tensors().source_ids();
        let dst_ids = op.tensors().destination_ids();
        self.graph.add_operator_as_linear(op.id(), &src_ids, &dst_ids);
        debug!(
            "admitted operator {:?} as {:?} ({} in chain)",
            op.id(),
            op.fusibility(),
            self.operators.len() + 1
        );
        self.operators.insert(op.id(), op);
    }

    /// The chain's first operator, or `None` while the group is empty.
    pub fn root_operator(&self) -> Option<&Operator<'t>> {
        let roots = self.graph.root_ops();
        assert!(
            roots.len() <= 1,
            "fusion chain has {} root operators",
            roots.len()
        );
        roots.first().map(|id| {
            self.operators
                .get(id)
                .expect("root operator missing from operator table")
        })
    }

    /// Admitted operators from root to tail.
    pub fn operators_in_order(&self) -> Vec<&Operator<'t>> {
        self.graph
            .topological_order()
            .into_iter()
            .map(|pack| {
                self.operators
                    .get(&pack.op)
                    .expect("ordered operator missing from operator table")
            })
            .collect()
    }
}
