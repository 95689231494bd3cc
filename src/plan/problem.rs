//! Problems handed to the planner.

use num_complex::Complex64;
use std::fmt;

use crate::core::constants::{DFT_FLOP_COEFFICIENT, ELEMENT_REARRANGE_COST};
use crate::core::network::ProcessGroup;
use crate::core::types::{BlockKind, DistFlags, Extent, Sign};
use crate::distribution::tensor::{DistDim, DistributedTensor};

/// User buffers of a distributed problem.
pub enum Buffers<'a, T> {
    /// Input and output share one buffer.
    InPlace(&'a mut [T]),
    /// Separate input and output buffers.
    OutOfPlace {
        /// Data read by the transform.
        input: &'a [T],
        /// Data written by the transform.
        output: &'a mut [T],
    },
}

impl<'a, T> Buffers<'a, T> {
    /// True when input and output alias.
    pub fn is_in_place(&self) -> bool {
        matches!(self, Buffers::InPlace(_))
    }

    /// Length of the input buffer.
    pub fn input_len(&self) -> usize {
        match self {
            Buffers::InPlace(data) => data.len(),
            Buffers::OutOfPlace { input, .. } => input.len(),
        }
    }

    /// Length of the output buffer.
    pub fn output_len(&self) -> usize {
        match self {
            Buffers::InPlace(data) => data.len(),
            Buffers::OutOfPlace { output, .. } => output.len(),
        }
    }
}

impl<T> fmt::Debug for Buffers<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Buffers::InPlace(data) => f.debug_tuple("InPlace").field(&data.len()).finish(),
            Buffers::OutOfPlace { input, output } => f
                .debug_struct("OutOfPlace")
                .field("input", &input.len())
                .field("output", &output.len())
                .finish(),
        }
    }
}

/// Distributed transpose of a `nx x ny` matrix of `howmany`-tuples of reals.
///
/// The input is split into rows of `xblock`; the output, the transposed
/// `ny x nx` matrix, is split into rows of `yblock`.
#[derive(Debug)]
pub struct TransposeProblem<'a> {
    pub nx: Extent,
    pub ny: Extent,
    pub howmany: Extent,
    pub xblock: Extent,
    pub yblock: Extent,
    pub flags: DistFlags,
    pub group: &'a dyn ProcessGroup,
    pub buffers: Buffers<'a, f64>,
    dist: DistributedTensor,
}

impl<'a> TransposeProblem<'a> {
    /// Build a transpose problem from already validated block sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nx: Extent,
        ny: Extent,
        howmany: Extent,
        xblock: Extent,
        yblock: Extent,
        flags: DistFlags,
        group: &'a dyn ProcessGroup,
        buffers: Buffers<'a, f64>,
    ) -> Self {
        let dist = DistributedTensor::new(vec![
            DistDim::new(nx, xblock, nx),
            DistDim::new(ny, ny, yblock),
        ])
        .canonical();
        TransposeProblem {
            nx,
            ny,
            howmany,
            xblock,
            yblock,
            flags,
            group,
            buffers,
            dist,
        }
    }

    /// Input rows split by `xblock`, output columns split by `yblock`.
    pub fn distribution(&self) -> &DistributedTensor {
        &self.dist
    }

    /// Local input elements (times the tuple size) of the calling process.
    pub fn local_input(&self) -> Extent {
        self.dist
            .local_extent(BlockKind::Input, self.group.rank())
            .element_count()
            * self.howmany
    }

    /// Local output elements (times the tuple size) of the calling process.
    pub fn local_output(&self) -> Extent {
        self.dist
            .local_extent(BlockKind::Output, self.group.rank())
            .element_count()
            * self.howmany
    }
}

/// Distributed complex DFT over a canonical distribution.
#[derive(Debug)]
pub struct DftProblem<'a> {
    pub dist: DistributedTensor,
    pub howmany: Extent,
    pub sign: Sign,
    pub flags: DistFlags,
    pub group: &'a dyn ProcessGroup,
    pub buffers: Buffers<'a, Complex64>,
}

impl DftProblem<'_> {
    /// Local elements (times the batch) of the calling process on `kind`.
    pub fn local_elements(&self, kind: BlockKind) -> Extent {
        self.dist
            .local_extent(kind, self.group.rank())
            .element_count()
            * self.howmany
    }
}

/// Node-local computation evaluated by the planner as a sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerialKind {
    /// Complex DFTs over local data.
    Dft,
    /// Local rearrangement (packing, in-node transpose).
    Rearrange,
}

/// A node-local sub-step; no process group is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialProblem {
    pub kind: SerialKind,
    pub n: Vec<Extent>,
    pub howmany: Extent,
}

impl SerialProblem {
    pub fn dft(n: Vec<Extent>, howmany: Extent) -> Self {
        SerialProblem {
            kind: SerialKind::Dft,
            n,
            howmany,
        }
    }

    pub fn rearrange(n: Vec<Extent>, howmany: Extent) -> Self {
        SerialProblem {
            kind: SerialKind::Rearrange,
            n,
            howmany,
        }
    }

    /// Number of elements touched per batch entry.
    pub fn elements(&self) -> Extent {
        self.n.iter().product()
    }

    /// Modelled cost: `5 N log2 N` per transform, or `N` per rearrangement.
    pub fn cost(&self) -> f64 {
        let n = self.elements().max(0) as f64;
        let howmany = self.howmany.max(0) as f64;
        match self.kind {
            SerialKind::Dft if n > 1.0 => DFT_FLOP_COEFFICIENT * n * n.log2() * howmany,
            SerialKind::Dft => 0.0,
            SerialKind::Rearrange => ELEMENT_REARRANGE_COST * n * howmany,
        }
    }
}

/// A problem the planner can be asked to solve.
#[derive(Debug)]
pub enum Problem<'a> {
    Transpose(TransposeProblem<'a>),
    Dft(DftProblem<'a>),
    Serial(SerialProblem),
}

impl<'a> Problem<'a> {
    /// Group of a distributed problem; `None` for serial ones.
    pub fn process_group(&self) -> Option<&'a dyn ProcessGroup> {
        match self {
            Problem::Transpose(p) => Some(p.group),
            Problem::Dft(p) => Some(p.group),
            Problem::Serial(_) => None,
        }
    }

    /// Short family name for logging and errors.
    pub fn family(&self) -> &'static str {
        match self {
            Problem::Transpose(_) => "transpose",
            Problem::Dft(_) => "dft",
            Problem::Serial(_) => "serial",
        }
    }

    /// Number of processes the problem is distributed over.
    pub fn n_pes(&self) -> usize {
        self.process_group().map_or(1, |g| g.size())
    }
}
