//! Local buffer sizing for distributed transforms.
//!
//! Before planning, every process needs to know how many elements to
//! reserve. The answer depends on which algorithm the planner will end up
//! choosing, which is not known yet, so the size query returns the maximum
//! over every algorithm family that may apply to the request, bounded
//! below by the process's actual input and output elements.
//!
//! All functions here are pure: they read only the rank and size of the
//! process group and never communicate.

pub mod radix;
pub mod survey;

use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_BLOCK;
use crate::core::error::{DistError, Result};
use crate::core::network::ProcessGroup;
use crate::core::types::{BlockKind, Dimension, DistFlags, Extent, Sign};
use crate::distribution::block::{block_size, default_block};
use crate::distribution::extent::LocalExtent;
use crate::distribution::tensor::{DistDim, DistributedTensor};

pub use radix::{choose_radix, is_valid_radix, RadixChoice};
pub use survey::DistributionSurvey;

/// Result of a size query for one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSize {
    /// Elements to reserve locally, already multiplied by the batch count.
    pub required: Extent,
    /// Window of the input array owned by this process.
    pub input: LocalExtent,
    /// Window of the output array owned by this process.
    pub output: LocalExtent,
}

/// Size query result in the slab form used by the convenience wrappers.
///
/// `local_nx`/`local_x_start` describe the first dimension of the input;
/// `local_ny`/`local_y_start` describe the second dimension of the output
/// (or repeat the first for one-dimensional requests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SlabSize {
    /// Elements to reserve locally.
    pub required: Extent,
    /// Local rows of the input.
    pub local_nx: Extent,
    /// First global row of the input.
    pub local_x_start: Extent,
    /// Local columns of the (transposed) output.
    pub local_ny: Extent,
    /// First global column of the (transposed) output.
    pub local_y_start: Extent,
}

impl SlabSize {
    fn from_local(size: &LocalSize) -> Self {
        let (local_nx, local_x_start) = match (size.input.sizes(), size.input.starts()) {
            ([n, ..], [s, ..]) => (*n, *s),
            _ => (1, 0),
        };
        let (local_ny, local_y_start) = match (size.output.sizes(), size.output.starts()) {
            ([_, n, ..], [_, s, ..]) => (*n, *s),
            ([n], [s]) => (*n, *s),
            _ => (local_nx, local_x_start),
        };
        SlabSize {
            required: size.required,
            local_nx,
            local_x_start,
            local_ny,
            local_y_start,
        }
    }
}

/// Algorithm families the size query accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingBranch {
    /// Rank 0: a batch of scalars, nothing is partitioned.
    Scalar,
    /// Rank >= 2 and both sides split along a single leading dimension.
    Slab,
    /// Rank >= 2 with any other layout; only the local extents count.
    General,
    /// Rank 1 with a batch at least as large as the group and no flags.
    Rank1Bigvec,
    /// Rank 1 computed as a two-dimensional `r x m` problem.
    Rank1Radix(RadixChoice),
}

/// A canonical distribution together with the family that sizes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDistribution {
    /// The layout every process agrees on.
    pub tensor: DistributedTensor,
    /// How intermediate storage is bounded.
    pub branch: SizingBranch,
    /// Flags the layout was resolved under; scrambled sides change the
    /// radix family's intermediate bound.
    pub flags: DistFlags,
}

/// Reject malformed extents, hints and batch counts.
pub fn validate_request(dims: &[Dimension], howmany: Extent) -> Result<()> {
    if howmany < 0 {
        return Err(DistError::invalid_parameter(
            "howmany",
            howmany.to_string(),
            "batch count must be non-negative",
        ));
    }
    for (i, dim) in dims.iter().enumerate() {
        if dim.n < 1 {
            return Err(crate::request_error!(
                "dimension {} has extent {}, expected at least 1",
                i,
                dim.n
            ));
        }
        if dim.ib < 0 || dim.ob < 0 {
            return Err(crate::request_error!(
                "dimension {} has negative block hint (ib={}, ob={})",
                i,
                dim.ib,
                dim.ob
            ));
        }
    }
    Ok(())
}

/// Fail when either side of `tensor` needs more blocks than there are processes.
pub fn check_feasible(tensor: &DistributedTensor, n_pes: usize) -> Result<()> {
    for kind in BlockKind::ALL {
        let required = tensor.num_blocks_total(kind);
        if required > n_pes as Extent {
            return Err(DistError::infeasible(kind, required, n_pes));
        }
    }
    Ok(())
}

fn is_bigvec(howmany: Extent, n_pes: usize, flags: DistFlags) -> bool {
    howmany >= n_pes as Extent && flags.is_empty()
}

/// Validate a request and build the layout the size query and planner share.
///
/// For rank-1 requests outside the big-vector case the dimension's block
/// sizes are replaced by the ones the chosen radix dictates.
pub fn resolve_distribution(
    dims: &[Dimension],
    howmany: Extent,
    n_pes: usize,
    sign: Option<Sign>,
    flags: DistFlags,
) -> Result<ResolvedDistribution> {
    validate_request(dims, howmany)?;

    let mut tensor = DistributedTensor::canonicalize(dims, n_pes);
    check_feasible(&tensor, n_pes)?;

    let branch = match tensor.rank() {
        0 => SizingBranch::Scalar,
        1 if is_bigvec(howmany, n_pes, flags) => SizingBranch::Rank1Bigvec,
        1 => {
            if sign.is_none() {
                return Err(DistError::invalid_request(
                    "one-dimensional distributed transforms need a direction; \
                     use local_size_1d or pass a sign",
                ));
            }
            let nx = tensor.dim(0).n;
            let choice =
                choose_radix(nx, n_pes, flags).ok_or_else(|| DistError::no_valid_radix(nx, n_pes))?;
            for kind in BlockKind::ALL {
                tensor
                    .dim_mut(0)
                    .set_block(kind, choice.dimension_block(kind, flags));
            }
            SizingBranch::Rank1Radix(choice)
        }
        _ if tensor.is_block1d(BlockKind::Input) && tensor.is_block1d(BlockKind::Output) => {
            SizingBranch::Slab
        }
        _ => SizingBranch::General,
    };

    log::debug!(
        "canonical distribution over {} processes: {:?} ({:?})",
        n_pes,
        tensor.dims(),
        branch
    );

    Ok(ResolvedDistribution {
        tensor,
        branch,
        flags,
    })
}

impl ResolvedDistribution {
    /// Size query result for process `my_pe` of `n_pes`.
    pub fn local_size(&self, howmany: Extent, my_pe: usize, n_pes: usize) -> LocalSize {
        let tensor = &self.tensor;
        let input = tensor.local_extent(BlockKind::Input, my_pe);
        let output = tensor.local_extent(BlockKind::Output, my_pe);

        if let SizingBranch::Scalar = self.branch {
            return LocalSize {
                required: howmany,
                input,
                output,
            };
        }

        // never report a zero allocation
        let mut n: Extent = 1;
        match self.branch {
            SizingBranch::Slab => {
                if let Some(t) = transposed_intermediate_size(tensor, my_pe, n_pes) {
                    n = n.max(t);
                }
                n = n.max(rank_geq2_size(tensor, howmany, my_pe, n_pes, false));
                n = n.max(rank_geq2_size(tensor, howmany, my_pe, n_pes, true));
            }
            SizingBranch::Rank1Bigvec => {
                n = n.max(bigvec_size(tensor, howmany, my_pe, n_pes));
            }
            SizingBranch::Rank1Radix(choice) => {
                n = n.max(rank1_intermediate(&choice, self.flags));
            }
            SizingBranch::Scalar | SizingBranch::General => {}
        }
        n = n.max(input.element_count()).max(output.element_count());

        LocalSize {
            required: n * howmany,
            input,
            output,
        }
    }
}

fn ceil_div(value: Extent, howmany: Extent) -> Extent {
    if howmany <= 0 {
        0
    } else {
        (value + howmany - 1) / howmany
    }
}

/// Local input elements when one of the first two dimensions is transposed
/// into the distributed position. `None` when neither is local on both sides.
pub(crate) fn transposed_intermediate_size(
    tensor: &DistributedTensor,
    my_pe: usize,
    n_pes: usize,
) -> Option<Extent> {
    if tensor.rank() < 2 {
        return None;
    }
    let i = (0..2).find(|&i| {
        let d = tensor.dim(i);
        d.is_local(BlockKind::Input) && d.is_local(BlockKind::Output)
    })?;

    let mut transposed = tensor.clone();
    let n_i = transposed.dim(i).n;
    transposed
        .dim_mut(i)
        .set_block(BlockKind::Input, default_block(n_i, n_pes));
    let n_other = transposed.dim(1 - i).n;
    transposed
        .dim_mut(1 - i)
        .set_block(BlockKind::Input, n_other);
    Some(
        transposed
            .local_extent(BlockKind::Input, my_pe)
            .element_count(),
    )
}

/// Per-batch-element storage of the rank >= 2 family, which flattens the
/// dimensions after the leading one (times the batch) and splits them evenly.
///
/// With `swapped` the roles of dimensions 0 and 1 are exchanged.
pub(crate) fn rank_geq2_size(
    tensor: &DistributedTensor,
    howmany: Extent,
    my_pe: usize,
    n_pes: usize,
    swapped: bool,
) -> Extent {
    let dims = tensor.dims();
    if dims.len() < 2 || howmany <= 0 {
        return 0;
    }
    let (lead, first_after) = if swapped { (1, 0) } else { (0, 1) };
    let after: Extent = dims
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != lead && (i == first_after || i >= 2))
        .map(|(_, d)| d.n)
        .product();
    let n_after = howmany * after;
    let local_after = block_size(n_after, default_block(n_after, n_pes), my_pe as Extent);
    ceil_div(dims[lead].n * local_after, howmany)
}

/// Per-batch-element storage of the big-vector family, which distributes
/// the batch instead of the transform dimension.
pub(crate) fn bigvec_size(
    tensor: &DistributedTensor,
    howmany: Extent,
    my_pe: usize,
    n_pes: usize,
) -> Extent {
    if tensor.rank() != 1 || howmany <= 0 {
        return 0;
    }
    let x = tensor.dim(0);
    let aux = DistributedTensor::new(vec![
        DistDim::new(x.n, x.n, x.block(BlockKind::Output)),
        DistDim::new(howmany, default_block(howmany, n_pes), howmany),
    ]);
    ceil_div(aux.local_extent(BlockKind::Input, my_pe).element_count(), howmany)
}

/// Per-batch-element intermediate storage of the radix family.
pub(crate) fn rank1_intermediate(choice: &RadixChoice, flags: DistFlags) -> Extent {
    choice
        .intermediate(BlockKind::Input, flags)
        .max(choice.intermediate(BlockKind::Output, flags))
}

/// Size query for process `my_pe` of `n_pes`, without a process group.
pub fn estimate(
    dims: &[Dimension],
    howmany: Extent,
    my_pe: usize,
    n_pes: usize,
    sign: Option<Sign>,
    flags: DistFlags,
) -> Result<LocalSize> {
    let resolved = resolve_distribution(dims, howmany, n_pes, sign, flags)?;
    Ok(resolved.local_size(howmany, my_pe, n_pes))
}

/// Local buffer size and extents of the calling process for a general request.
///
/// `sign` is required for rank-1 requests unless the batch is at least as
/// large as the group and no flags are set.
pub fn local_size_guru(
    dims: &[Dimension],
    howmany: Extent,
    group: &dyn ProcessGroup,
    sign: Option<Sign>,
    flags: DistFlags,
) -> Result<LocalSize> {
    estimate(dims, howmany, group.rank(), group.size(), sign, flags)
}

/// Slab decomposition with explicit row and column blocks.
///
/// The output is transposed (split along the second dimension) when
/// `yblock < n[1]`; [`DEFAULT_BLOCK`] counts as smaller.
pub fn local_size_many_transposed(
    n: &[Extent],
    howmany: Extent,
    xblock: Extent,
    yblock: Extent,
    group: &dyn ProcessGroup,
) -> Result<SlabSize> {
    if n.is_empty() {
        return Ok(SlabSize {
            required: howmany,
            local_nx: 1,
            local_x_start: 0,
            local_ny: 1,
            local_y_start: 0,
        });
    }

    let mut dims: Vec<Dimension> = n.iter().map(|&n| Dimension::local(n)).collect();
    dims[0].ib = xblock;
    if n.len() > 1 && yblock < n[1] {
        dims[1].ob = yblock;
    } else {
        dims[0].ob = xblock;
    }

    let size = local_size_guru(&dims, howmany, group, None, DistFlags::NONE)?;
    Ok(SlabSize::from_local(&size))
}

/// Slab decomposition with the output in the same layout as the input.
pub fn local_size_many(
    n: &[Extent],
    howmany: Extent,
    xblock: Extent,
    group: &dyn ProcessGroup,
) -> Result<SlabSize> {
    let yblock = if n.len() > 1 { n[1] } else { DEFAULT_BLOCK };
    local_size_many_transposed(n, howmany, xblock, yblock, group)
}

/// Slab decomposition of `n` with a transposed output and automatic blocks.
pub fn local_size_transposed(n: &[Extent], group: &dyn ProcessGroup) -> Result<SlabSize> {
    local_size_many_transposed(n, 1, DEFAULT_BLOCK, DEFAULT_BLOCK, group)
}

/// Slab decomposition of `n` with automatic blocks.
pub fn local_size(n: &[Extent], group: &dyn ProcessGroup) -> Result<SlabSize> {
    local_size_many(n, 1, DEFAULT_BLOCK, group)
}

/// Batched one-dimensional request; the `x` fields describe the input and
/// the `y` fields the output.
pub fn local_size_many_1d(
    nx: Extent,
    howmany: Extent,
    group: &dyn ProcessGroup,
    sign: Sign,
    flags: DistFlags,
) -> Result<SlabSize> {
    let size = local_size_guru(&[Dimension::new(nx)], howmany, group, Some(sign), flags)?;
    Ok(SlabSize::from_local(&size))
}

/// Single one-dimensional transform of length `nx`.
pub fn local_size_1d(
    nx: Extent,
    group: &dyn ProcessGroup,
    sign: Sign,
    flags: DistFlags,
) -> Result<SlabSize> {
    local_size_many_1d(nx, 1, group, sign, flags)
}

/// Two-dimensional slab decomposition.
pub fn local_size_2d(nx: Extent, ny: Extent, group: &dyn ProcessGroup) -> Result<SlabSize> {
    local_size(&[nx, ny], group)
}

/// Two-dimensional slab decomposition with a transposed output.
pub fn local_size_2d_transposed(
    nx: Extent,
    ny: Extent,
    group: &dyn ProcessGroup,
) -> Result<SlabSize> {
    local_size_transposed(&[nx, ny], group)
}

/// Three-dimensional slab decomposition.
pub fn local_size_3d(
    nx: Extent,
    ny: Extent,
    nz: Extent,
    group: &dyn ProcessGroup,
) -> Result<SlabSize> {
    local_size(&[nx, ny, nz], group)
}

/// Three-dimensional slab decomposition with a transposed output.
pub fn local_size_3d_transposed(
    nx: Extent,
    ny: Extent,
    nz: Extent,
    group: &dyn ProcessGroup,
) -> Result<SlabSize> {
    local_size_transposed(&[nx, ny, nz], group)
}
