//! Operator/tensor dependency tracking for a single fusion chain.
//!
//! The graph is bipartite (operator nodes and tensor nodes) and only grows
//! through a probe/commit pair that keeps the operators on one directed
//! path: [`DependencyGraph::try_add_operator_as_linear`] is a pure
//! predicate, [`DependencyGraph::add_operator_as_linear`] mutates and
//! panics if the probe was skipped or failed.

use std::collections::{HashMap, VecDeque};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::descriptor::TensorId;
use crate::operator::OperatorId;

/// One operator with its tensor ids, as yielded by
/// [`DependencyGraph::topological_order`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpPack {
    pub op: OperatorId,
    pub srcs: Vec<TensorId>,
    pub dsts: Vec<TensorId>,
}

/// Dependency graph of one fusion chain.
///
/// Tensor nodes exist only while attached to at least one operator edge,
/// and every tensor has at most one producer and at most one consumer, so
/// the operator nodes always form a single path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Tensors read by each operator, in argument order.
    sources: HashMap<OperatorId, Vec<TensorId>>,
    /// Tensors written by each operator, in argument order.
    destinations: HashMap<OperatorId, Vec<TensorId>>,
    /// Operators writing each tensor. Holds an entry for every tensor.
    producers: HashMap<TensorId, SmallVec<[OperatorId; 1]>>,
    /// Operators reading each tensor. Holds an entry for every tensor.
    consumers: HashMap<TensorId, SmallVec<[OperatorId; 1]>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_operators(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains_operator(&self, op: OperatorId) -> bool {
        self.sources.contains_key(&op)
    }

    pub fn contains_tensor(&self, tensor: TensorId) -> bool {
        self.producers.contains_key(&tensor)
    }

    /// Tensors read by `op`, or an empty slice for an unknown operator.
    pub fn src_tensors(&self, op: OperatorId) -> &[TensorId] {
        self.sources.get(&op).map_or(&[], Vec::as_slice)
    }

    /// Tensors written by `op`, or an empty slice for an unknown operator.
    pub fn dst_tensors(&self, op: OperatorId) -> &[TensorId] {
        self.destinations.get(&op).map_or(&[], Vec::as_slice)
    }

    /// Operators writing `tensor`; at most one while the chain is linear.
    pub fn producers_of(&self, tensor: TensorId) -> &[OperatorId] {
        self.producers.get(&tensor).map_or(&[], SmallVec::as_slice)
    }

    /// Operators reading `tensor`; at most one while the chain is linear.
    pub fn consumers_of(&self, tensor: TensorId) -> &[OperatorId] {
        self.consumers.get(&tensor).map_or(&[], SmallVec::as_slice)
    }

    /// Operators none of whose source tensors has a producer, in id order.
    pub fn root_ops(&self) -> Vec<OperatorId> {
        let mut roots: Vec<OperatorId> = self
            .sources
            .iter()
            .filter(|(_, srcs)| srcs.iter().all(|&t| self.producers_of(t).is_empty()))
            .map(|(&op, _)| op)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Operators none of whose destination tensors has a consumer, in id order.
    pub fn tail_ops(&self) -> Vec<OperatorId> {
        let mut tails: Vec<OperatorId> = self
            .destinations
            .iter()
            .filter(|(_, dsts)| dsts.iter().all(|&t| self.consumers_of(t).is_empty()))
            .map(|(&op, _)| op)
            .collect();
        tails.sort_unstable();
        tails
    }

    /// Every tensor attached to the chain, in id order.
    pub fn all_tensors(&self) -> Vec<TensorId> {
        let mut tensors: Vec<TensorId> = self.producers.keys().copied().collect();
        tensors.sort_unstable();
        tensors
    }

    /// Tensors the chain reads but never writes, in id order.
    pub fn global_src_tensors(&self) -> Vec<TensorId> {
        self.tensors_where(|t| self.producers_of(t).is_empty())
    }

    /// Tensors the chain writes but never reads, in id order.
    pub fn global_dst_tensors(&self) -> Vec<TensorId> {
        self.tensors_where(|t| self.consumers_of(t).is_empty())
    }

    /// Tensors both written and read inside the chain, in id order.
    pub fn intermediate_tensors(&self) -> Vec<TensorId> {
        self.tensors_where(|t| {
            !self.producers_of(t).is_empty() && !self.consumers_of(t).is_empty()
        })
    }

    fn tensors_where(&self, keep: impl Fn(TensorId) -> bool) -> Vec<TensorId> {
        let mut tensors: Vec<TensorId> = self
            .producers
            .keys()
            .copied()
            .filter(|&t| keep(t))
            .collect();
        tensors.sort_unstable();
        tensors
    }

    /// Reports whether `op`, reading `srcs` and writing `dsts`, could join
    /// the graph without breaking the single-path shape.
    ///
    /// Pure: the graph is never mutated, and the same arguments always get
    /// the same answer. The verdict is structural, so `op` only names the
    /// candidate in trace output. An accepted operator must either be the
    /// first one or consume exactly one tensor the graph already knows,
    /// and that tensor has to dangle off the current chain tail.
    pub fn try_add_operator_as_linear(
        &self,
        op: OperatorId,
        srcs: &[TensorId],
        dsts: &[TensorId],
    ) -> bool {
        let admissible = self.probe_linear(srcs, dsts);
        if !admissible {
            trace!("operator {:?} cannot extend the chain", op);
        }
        admissible
    }

    fn probe_linear(&self, srcs: &[TensorId], dsts: &[TensorId]) -> bool {
        // An operator may not list a tensor twice or both read and write it.
        if !all_distinct(srcs, dsts) {
            return false;
        }
        if self.is_empty() {
            return true;
        }

        // Exactly one source may already be known; it is the link tensor.
        let mut link = None;
        for &t in srcs {
            if self.contains_tensor(t) && link.replace(t).is_some() {
                return false;
            }
        }
        let Some(link) = link else {
            return false;
        };

        // The link has to be a dangling output of the current tail.
        let tails = self.tail_ops();
        assert!(tails.len() == 1, "dependency graph is no longer a single chain");
        if !self.dst_tensors(tails[0]).contains(&link) {
            return false;
        }

        // Writing a tensor the graph knows would merge paths or close a cycle.
        dsts.iter().all(|&t| !self.contains_tensor(t))
    }

    /// Links `op` into the chain. The caller must have already probed the
    /// identical `srcs`/`dsts` with [`Self::try_add_operator_as_linear`];
    /// committing an operator the probe refuses, or reusing an id, panics.
    pub fn add_operator_as_linear(&mut self, op: OperatorId, srcs: &[TensorId], dsts: &[TensorId]) {
        assert!(
            self.probe_linear(srcs, dsts),
            "operator {op:?} does not extend the linear chain"
        );
        assert!(
            !self.contains_operator(op),
            "operator id {op:?} is already present in the dependency graph"
        );

        self.sources.insert(op, srcs.to_vec());
        self.destinations.insert(op, dsts.to_vec());
        for &t in srcs {
            self.consumers.entry(t).or_default().push(op);
            self.producers.entry(t).or_default();
        }
        for &t in dsts {
            self.producers.entry(t).or_default().push(op);
            self.consumers.entry(t).or_default();
        }
        debug!(
            "linked operator {:?} into chain ({} srcs, {} dsts, {} ops total)",
            op,
            srcs.len(),
            dsts.len(),
            self.num_operators()
        );
    }

    /// Operators in dependency order, each with its tensor ids.
    ///
    /// Ties between independent operators break by id, so the order is
    /// deterministic for any graph this type can represent.
    pub fn topological_order(&self) -> Vec<OpPack> {
        let mut in_degree: HashMap<OperatorId, usize> = self
            .sources
            .iter()
            .map(|(&op, srcs)| {
                let degree = srcs.iter().map(|&t| self.producers_of(t).len()).sum();
                (op, degree)
            })
            .collect();

        let mut seeds: Vec<OperatorId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&op, _)| op)
            .collect();
        seeds.sort_unstable();
        let mut ready: VecDeque<OperatorId> = seeds.into();

        let mut order = Vec::with_capacity(self.num_operators());
        while let Some(op) = ready.pop_front() {
            order.push(OpPack {
                op,
                srcs: self.src_tensors(op).to_vec(),
                dsts: self.dst_tensors(op).to_vec(),
            });
            for &t in self.dst_tensors(op) {
                for &succ in self.consumers_of(t) {
                    let degree = in_degree
                        .get_mut(&succ)
                        .expect("consumer operator missing from in-degree map");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(succ);
                    }
                }
            }
        }
        assert!(
            order.len() == self.num_operators(),
            "dependency graph contains a cycle"
        );
        order
    }
}

/// True when no tensor id repeats across the two argument lists.
fn all_distinct(srcs: &[TensorId], dsts: &[TensorId]) -> bool {
    let mut seen: SmallVec<[TensorId; 8]> = SmallVec::new();
    for &t in srcs.iter().chain(dsts) {
        if seen.contains(&t) {
            return false;
        }
        seen.push(t);
    }
    true
}
