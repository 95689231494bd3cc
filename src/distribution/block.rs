//! One-dimensional block arithmetic.
//!
//! A dimension of extent `n` split with block size `b` has
//! `ceil(n / b)` blocks; all blocks have size `b` except possibly the last.
//! Block indices past the end have size zero, which is how idle processes
//! are detected.

use crate::core::types::{BlockIndex, Extent};

/// A non-positive block leaves the dimension whole, as canonical layouts do.
fn effective_block(n: Extent, block: Extent) -> Extent {
    if block > 0 {
        block
    } else {
        n.max(1)
    }
}

/// Number of blocks of size `block` needed to cover `n` elements.
///
/// A `block` of zero or less counts as the whole extent, i.e. one block.
pub fn num_blocks(n: Extent, block: Extent) -> Extent {
    let block = effective_block(n, block);
    (n + block - 1) / block
}

/// Size of block `which` when `n` elements are split into blocks of `block`.
///
/// Returns 0 for block indices at or beyond [`num_blocks`].
pub fn block_size(n: Extent, block: Extent, which: BlockIndex) -> Extent {
    let block = effective_block(n, block);
    let remaining = n - which * block;
    remaining.clamp(0, block)
}

/// Smallest block size that splits `n` elements into at most `n_pes` blocks.
pub fn default_block(n: Extent, n_pes: usize) -> Extent {
    let p = n_pes.max(1) as Extent;
    (n + p - 1) / p
}
