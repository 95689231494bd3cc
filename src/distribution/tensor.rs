//! Distributed tensors: shapes whose dimensions carry per-side block sizes.

use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_BLOCK;
use crate::core::types::{BlockIndex, BlockKind, Dimension, Extent};
use crate::distribution::block::{block_size, default_block, num_blocks};
use crate::distribution::extent::LocalExtent;

/// One dimension of a distributed tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistDim {
    /// Global extent.
    pub n: Extent,
    /// Block size per side, indexed by [`BlockKind::index`].
    pub block: [Extent; 2],
}

impl DistDim {
    /// Dimension with the given input and output block sizes.
    pub fn new(n: Extent, input_block: Extent, output_block: Extent) -> Self {
        DistDim {
            n,
            block: [input_block, output_block],
        }
    }

    /// Dimension held entirely by one process on both sides.
    pub fn local(n: Extent) -> Self {
        DistDim::new(n, n, n)
    }

    /// Block size on the given side.
    pub fn block(&self, kind: BlockKind) -> Extent {
        self.block[kind.index()]
    }

    /// Set the block size on the given side.
    pub fn set_block(&mut self, kind: BlockKind, block: Extent) {
        self.block[kind.index()] = block;
    }

    /// Number of blocks on the given side.
    pub fn num_blocks(&self, kind: BlockKind) -> Extent {
        num_blocks(self.n, self.block(kind))
    }

    /// True when the dimension is a single block on the given side.
    pub fn is_local(&self, kind: BlockKind) -> bool {
        self.num_blocks(kind) == 1
    }
}

/// A shape together with the block sizes of its input and output layouts.
///
/// Every process builds its own copy from identical inputs; two copies
/// built from the same request and process count are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DistributedTensor {
    dims: Vec<DistDim>,
}

impl DistributedTensor {
    /// Tensor from explicit dimensions.
    pub fn new(dims: Vec<DistDim>) -> Self {
        DistributedTensor { dims }
    }

    /// Tensor whose block sizes are the raw hints of `dims`, sentinels included.
    pub fn from_dimensions(dims: &[Dimension]) -> Self {
        DistributedTensor {
            dims: dims.iter().map(|d| DistDim::new(d.n, d.ib, d.ob)).collect(),
        }
    }

    /// Canonical layout of `dims0` over `n_pes` processes.
    ///
    /// Unspecified hints start out local. Then, independently for each
    /// side, unspecified dimensions are split left to right with
    /// [`default_block`] over the processes still unused, until the
    /// process budget is exhausted. This uses as many processes as
    /// possible while distributing as few dimensions as possible.
    /// Specified hints are never changed except for being clamped into
    /// `[1, n]`.
    pub fn canonicalize(dims0: &[Dimension], n_pes: usize) -> Self {
        let n_pes = n_pes.max(1) as Extent;
        let mut dims: Vec<DistDim> = dims0
            .iter()
            .map(|d| {
                let pick = |hint: Extent| if hint != DEFAULT_BLOCK { hint } else { d.n };
                DistDim::new(d.n, pick(d.ib), pick(d.ob))
            })
            .collect();

        for kind in BlockKind::ALL {
            let mut used: Extent = dims
                .iter()
                .map(|d| num_blocks(d.n, d.block(kind).max(1)))
                .product();
            let mut remaining = n_pes / used;
            for (dim, requested) in dims.iter_mut().zip(dims0) {
                if remaining <= 1 {
                    break;
                }
                if requested.hint(kind) == DEFAULT_BLOCK {
                    let block = default_block(dim.n, remaining as usize);
                    dim.set_block(kind, block);
                    used *= num_blocks(dim.n, block);
                    remaining = n_pes / used;
                }
            }
        }

        DistributedTensor { dims }.canonical()
    }

    /// Copy with every block size clamped into `[1, n]`.
    ///
    /// Non-positive or oversized block sizes become `n` (a local dimension).
    pub fn canonical(&self) -> Self {
        let dims = self
            .dims
            .iter()
            .map(|d| {
                let mut dim = *d;
                for kind in BlockKind::ALL {
                    let b = dim.block(kind);
                    if b <= 0 || b > dim.n {
                        dim.set_block(kind, dim.n);
                    }
                }
                dim
            })
            .collect();
        DistributedTensor { dims }
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// All dimensions.
    pub fn dims(&self) -> &[DistDim] {
        &self.dims
    }

    /// Dimension `i`.
    pub fn dim(&self, i: usize) -> &DistDim {
        &self.dims[i]
    }

    /// Mutable dimension `i`.
    pub fn dim_mut(&mut self, i: usize) -> &mut DistDim {
        &mut self.dims[i]
    }

    /// Global element count.
    pub fn total_elements(&self) -> Extent {
        self.dims.iter().map(|d| d.n).product()
    }

    /// Global extents.
    pub fn shape(&self) -> Vec<Extent> {
        self.dims.iter().map(|d| d.n).collect()
    }

    /// Total number of blocks on one side (product over dimensions).
    pub fn num_blocks_total(&self, kind: BlockKind) -> Extent {
        self.dims.iter().map(|d| d.num_blocks(kind)).product()
    }

    /// True when every dimension from `dim` on is a single block on `kind`.
    pub fn is_local_after(&self, dim: usize, kind: BlockKind) -> bool {
        self.dims.iter().skip(dim).all(|d| d.is_local(kind))
    }

    /// True when exactly one of the first two dimensions is split on `kind`
    /// and every later dimension is local.
    pub fn is_block1d(&self, kind: BlockKind) -> bool {
        match self.dims.iter().position(|d| !d.is_local(kind)) {
            Some(first) => first < 2 && self.is_local_after(first + 1, kind),
            None => false,
        }
    }

    /// Index of the single split dimension on `kind`, if the layout is block-1d.
    pub fn distributed_dim(&self, kind: BlockKind) -> Option<usize> {
        if self.is_block1d(kind) {
            self.dims.iter().position(|d| !d.is_local(kind))
        } else {
            None
        }
    }

    /// Block coordinates of process `which_pe` on side `kind`.
    ///
    /// Mixed-radix decomposition of the linear rank over the per-dimension
    /// block counts, with the last dimension varying fastest.
    pub fn block_coords(&self, kind: BlockKind, which_pe: usize) -> Vec<BlockIndex> {
        let mut coords = vec![0; self.rank()];
        let mut rest = which_pe as Extent;
        for (coord, dim) in coords.iter_mut().zip(&self.dims).rev() {
            let nb = dim.num_blocks(kind);
            *coord = rest % nb;
            rest /= nb;
        }
        coords
    }

    /// Window of the global array owned by process `which_pe` on side `kind`.
    pub fn local_extent(&self, kind: BlockKind, which_pe: usize) -> LocalExtent {
        if which_pe as Extent >= self.num_blocks_total(kind) {
            return LocalExtent::idle(self.rank());
        }

        let coords = self.block_coords(kind, which_pe);
        let (sizes, starts) = self
            .dims
            .iter()
            .zip(coords)
            .map(|(dim, coord)| {
                let b = dim.block(kind);
                (block_size(dim.n, b, coord), coord * b)
            })
            .unzip();
        LocalExtent::new(sizes, starts)
    }
}
