//! Tensor descriptor vocabulary shared by every planner query.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifies one tensor across a planning session.
///
/// Ids are minted by the caller; the planner only compares them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TensorId(pub u32);

/// Memory ordering of the dimensions of an activation tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataLayout {
    Nchw,
    Nhwc,
    Ncdhw,
    Ndhwc,
}

/// Logical tensor shape as an ordered list of dimension extents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape {
    dims: SmallVec<[usize; 6]>,
}

impl TensorShape {
    pub fn new(dims: impl IntoIterator<Item = usize>) -> Self {
        Self {
            dims: dims.into_iter().collect(),
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Compares this shape against `other` over their shared leading
    /// dimensions. Ranks may differ; only the overlapping prefix has to
    /// agree, so a rank-2 `[4, 8]` matches a rank-4 `[4, 8, 2, 2]`.
    pub fn matches_prefix(&self, other: &TensorShape) -> bool {
        self.dims.iter().zip(other.dims.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dims.is_empty() {
            return f.write_str("scalar");
        }
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str("x")?;
            }
            write!(f, "{dim}")?;
        }
        Ok(())
    }
}

/// Caller-owned description of one tensor: identity, shape and layout.
///
/// The planner never materializes tensor storage; descriptors are the
/// whole of what legality decisions see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    id: TensorId,
    shape: TensorShape,
    data_layout: DataLayout,
}

impl TensorDescriptor {
    pub fn new(id: TensorId, shape: TensorShape, data_layout: DataLayout) -> Self {
        Self {
            id,
            shape,
            data_layout,
        }
    }

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    pub fn data_layout(&self) -> DataLayout {
        self.data_layout
    }
}
