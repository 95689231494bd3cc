//! Block distributions of multi-dimensional arrays over a process group.
//!
//! - [`block`]: one-dimensional block arithmetic
//! - [`tensor`]: distributed shapes, canonicalization and rank-to-block mapping
//! - [`extent`]: the local window owned by one process

pub mod block;
pub mod extent;
pub mod tensor;

pub use block::{block_size, default_block, num_blocks};
pub use extent::LocalExtent;
pub use tensor::{DistDim, DistributedTensor};
