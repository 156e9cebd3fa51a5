//! Operators and their role-tagged tensor arguments.

use serde::{Deserialize, Serialize};

use crate::descriptor::{TensorDescriptor, TensorId};

/// Identifies one operator within a single [`OperatorGroup`](crate::group::OperatorGroup).
///
/// Ids are dense and minted at operator creation time; see
/// [`OperatorGroup::new_operator`](crate::group::OperatorGroup::new_operator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId(pub u32);

/// How an operator may participate in a fused workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FusibilityClass {
    /// Elementwise-like; may extend an open chain.
    Simple,
    /// May anchor a chain but only as its first operator.
    Complex,
    /// Must run alone; a chain holding one is closed.
    Unfusable,
}

/// Whether an operator reads or writes a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TensorRole {
    Source,
    Destination,
}

/// Role-tagged, insertion-ordered tensor references for one operator.
#[derive(Clone, Debug, Default)]
pub struct ArgumentPack<'t> {
    sources: Vec<&'t TensorDescriptor>,
    destinations: Vec<&'t TensorDescriptor>,
}

impl<'t> ArgumentPack<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `descriptor` under `role`, preserving insertion order.
    pub fn with(mut self, role: TensorRole, descriptor: &'t TensorDescriptor) -> Self {
        match role {
            TensorRole::Source => self.sources.push(descriptor),
            TensorRole::Destination => self.destinations.push(descriptor),
        }
        self
    }

    pub fn with_source(self, descriptor: &'t TensorDescriptor) -> Self {
        self.with(TensorRole::Source, descriptor)
    }

    pub fn with_destination(self, descriptor: &'t TensorDescriptor) -> Self {
        self.with(TensorRole::Destination, descriptor)
    }

    pub fn tensors(&self, role: TensorRole) -> &[&'t TensorDescriptor] {
        match role {
            TensorRole::Source => &self.sources,
            TensorRole::Destination => &self.destinations,
        }
    }

    pub fn sources(&self) -> &[&'t TensorDescriptor] {
        self.tensors(TensorRole::Source)
    }

    pub fn destinations(&self) -> &[&'t TensorDescriptor] {
        self.tensors(TensorRole::Destination)
    }

    pub fn source_ids(&self) -> Vec<TensorId> {
        self.sources.iter().map(|t| t.id()).collect()
    }

    pub fn destination_ids(&self) -> Vec<TensorId> {
        self.destinations.iter().map(|t| t.id()).collect()
    }
}

/// An immutable operator awaiting admission into a fusion chain.
///
/// Operators only come out of [`OperatorGroup::new_operator`]; they carry
/// nothing beyond the identity, class and arguments legality checks read.
///
/// [`OperatorGroup::new_operator`]: crate::group::OperatorGroup::new_operator
#[derive(Clone, Debug)]
pub struct Operator<'t> {
    id: OperatorId,
    fusibility: FusibilityClass,
    tensors: ArgumentPack<'t>,
}

impl<'t> Operator<'t> {
    pub(crate) fn new(
        id: OperatorId,
        fusibility: FusibilityClass,
        tensors: ArgumentPack<'t>,
    ) -> Self {
        Self {
            id,
            fusibility,
            tensors,
        }
    }

    pub fn id(&self) -> OperatorId {
        self.id
    }

    pub fn fusibility(&self) -> FusibilityClass {
        self.fusibility
    }

    pub fn tensors(&self) -> &ArgumentPack<'t> {
        &self.tensors
    }
}
