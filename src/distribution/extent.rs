//! Per-process local extents.

use ndarray::{ArrayViewD, ArrayViewMutD, Slice};
use serde::{Deserialize, Serialize};

use crate::core::error::{DistError, Result};
use crate::core::types::Extent;

/// The rectangular window of a global array owned by one process on one side.
///
/// `sizes[d]` elements starting at global index `starts[d]` along each
/// dimension `d`. A process that owns no block has all sizes and starts zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocalExtent {
    sizes: Vec<Extent>,
    starts: Vec<Extent>,
}

impl LocalExtent {
    /// Extent from explicit sizes and starts.
    pub fn new(sizes: Vec<Extent>, starts: Vec<Extent>) -> Self {
        debug_assert_eq!(sizes.len(), starts.len());
        LocalExtent { sizes, starts }
    }

    /// Empty window of the given rank, for a process without a block.
    pub fn idle(rank: usize) -> Self {
        LocalExtent {
            sizes: vec![0; rank],
            starts: vec![0; rank],
        }
    }

    /// Local sizes, one per dimension.
    pub fn sizes(&self) -> &[Extent] {
        &self.sizes
    }

    /// Global start indices, one per dimension.
    pub fn starts(&self) -> &[Extent] {
        &self.starts
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    /// Number of local elements (product of the sizes; 1 for rank 0).
    pub fn element_count(&self) -> Extent {
        self.sizes.iter().product()
    }

    /// True when the window holds no element.
    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    /// True when the global multi-index lies inside the window.
    pub fn contains(&self, index: &[Extent]) -> bool {
        index.len() == self.rank()
            && index
                .iter()
                .zip(self.starts.iter().zip(&self.sizes))
                .all(|(&i, (&start, &size))| i >= start && i < start + size)
    }

    /// Restrict a view of the global array to this window.
    pub fn window<'a, A>(&self, global: ArrayViewD<'a, A>) -> Result<ArrayViewD<'a, A>> {
        self.check_shape(global.shape())?;
        let mut view = global;
        view.slice_each_axis_inplace(|ax| self.axis_slice(ax.axis.index()));
        Ok(view)
    }

    /// Restrict a mutable view of the global array to this window.
    pub fn window_mut<'a, A>(&self, global: ArrayViewMutD<'a, A>) -> Result<ArrayViewMutD<'a, A>> {
        self.check_shape(global.shape())?;
        let mut view = global;
        view.slice_each_axis_inplace(|ax| self.axis_slice(ax.axis.index()));
        Ok(view)
    }

    fn axis_slice(&self, axis: usize) -> Slice {
        let start = self.starts[axis] as usize;
        let end = start + self.sizes[axis] as usize;
        Slice::from(start..end)
    }

    fn check_shape(&self, shape: &[usize]) -> Result<()> {
        if shape.len() != self.rank() {
            return Err(DistError::invalid_request(format!(
                "array has {} dimensions, local extent has {}",
                shape.len(),
                self.rank()
            )));
        }
        for (d, &len) in shape.iter().enumerate() {
            if self.starts[d] + self.sizes[d] > len as Extent {
                return Err(DistError::invalid_request(format!(
                    "local window {}..{} exceeds array length {} along dimension {}",
                    self.starts[d],
                    self.starts[d] + self.sizes[d],
                    len,
                    d
                )));
            }
        }
        Ok(())
    }
}
