//! Standard algorithm variants for distributed transposes and DFTs.
//!
//! A solver decides whether it applies from the problem's shape and the
//! process count alone, so that every process considers the same list of
//! candidates. The cost it models is local: serial sub-steps plus a
//! latency/bandwidth term for the exchanges it performs.

use std::fmt;

use crate::core::constants::{ELEMENT_TRANSFER_COST, MESSAGE_LATENCY_COST};
use crate::core::types::{BlockKind, Extent};
use crate::plan::problem::{DftProblem, Problem, SerialProblem, TransposeProblem};
use crate::sizing::{
    bigvec_size, choose_radix, rank1_intermediate, rank_geq2_size, transposed_intermediate_size,
};

/// Local cost model of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    /// Node-local computations, each passed through the cost hook.
    pub local_steps: Vec<SerialProblem>,
    /// Modelled cost of the exchanges.
    pub communication: f64,
    /// Elements the user buffers must hold for this variant.
    pub buffer_need: Extent,
}

/// An algorithm variant the planner can choose.
pub trait Solver: fmt::Debug + Send + Sync {
    /// Registered name, reported by the plan.
    fn name(&self) -> &'static str;

    /// Only considered when planning with patient rigor.
    fn patient_only(&self) -> bool {
        false
    }

    /// Cost model for `problem`, or `None` when the variant does not apply.
    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate>;
}

fn exchange_cost(messages: Extent, elements: Extent) -> f64 {
    messages.max(0) as f64 * MESSAGE_LATENCY_COST + elements.max(0) as f64 * ELEMENT_TRANSFER_COST
}

fn ceil_log2(p: usize) -> Extent {
    let mut rounds = 0;
    while (1usize << rounds) < p {
        rounds += 1;
    }
    rounds
}

fn transpose_buffer(problem: &TransposeProblem<'_>) -> Extent {
    problem.local_input().max(problem.local_output())
}

fn dft_buffer(problem: &DftProblem<'_>) -> Extent {
    problem
        .local_elements(BlockKind::Input)
        .max(problem.local_elements(BlockKind::Output))
}

/// Direct exchange with every other process.
#[derive(Debug, Default)]
pub struct TransposePairwise;

impl Solver for TransposePairwise {
    fn name(&self) -> &'static str {
        "transpose-pairwise"
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let Problem::Transpose(t) = problem else {
            return None;
        };
        let p = t.group.size() as Extent;
        let local = t.local_input();
        Some(CostEstimate {
            local_steps: vec![
                SerialProblem::rearrange(vec![local], 1),
                SerialProblem::rearrange(vec![t.local_output()], 1),
            ],
            communication: exchange_cost(p - 1, local),
            buffer_need: transpose_buffer(t),
        })
    }
}

/// Logarithmic-round exchange; fewer messages, more volume.
#[derive(Debug, Default)]
pub struct TransposeBruck;

impl Solver for TransposeBruck {
    fn name(&self) -> &'static str {
        "transpose-bruck"
    }

    fn patient_only(&self) -> bool {
        true
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let Problem::Transpose(t) = problem else {
            return None;
        };
        let p = t.group.size();
        if p < 2 {
            return None;
        }
        let rounds = ceil_log2(p);
        let local = t.local_input();
        Some(CostEstimate {
            local_steps: vec![SerialProblem::rearrange(vec![local], rounds + 1)],
            communication: exchange_cost(rounds, (local * rounds + 1) / 2),
            buffer_need: transpose_buffer(t),
        })
    }
}

/// All data on a single process: one local multi-dimensional DFT.
#[derive(Debug, Default)]
pub struct DftSerial;

impl Solver for DftSerial {
    fn name(&self) -> &'static str {
        "dft-serial"
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let Problem::Dft(d) = problem else {
            return None;
        };
        if d.dist.num_blocks_total(BlockKind::Input) != 1
            || d.dist.num_blocks_total(BlockKind::Output) != 1
        {
            return None;
        }
        let extent = d.dist.local_extent(BlockKind::Input, d.group.rank());
        Some(CostEstimate {
            local_steps: vec![SerialProblem::dft(extent.sizes().to_vec(), d.howmany)],
            communication: 0.0,
            buffer_need: dft_buffer(d),
        })
    }
}

fn slab_problem<'p, 'a>(problem: &'p Problem<'a>) -> Option<&'p DftProblem<'a>> {
    match problem {
        Problem::Dft(d)
            if d.dist.rank() >= 2
                && d.dist.is_block1d(BlockKind::Input)
                && d.dist.is_block1d(BlockKind::Output) =>
        {
            Some(d)
        }
        _ => None,
    }
}

/// Local DFTs over the trailing dimensions, one global transpose, then
/// DFTs along the leading dimension.
#[derive(Debug, Default)]
pub struct DftRankGeq2;

impl Solver for DftRankGeq2 {
    fn name(&self) -> &'static str {
        "dft-rank-geq2"
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let d = slab_problem(problem)?;
        let p = d.group.size();
        let pe = d.group.rank();
        let swapped = d.dist.distributed_dim(BlockKind::Input) == Some(1);
        let family = rank_geq2_size(&d.dist, d.howmany, pe, p, swapped) * d.howmany;

        let input = d.dist.local_extent(BlockKind::Input, pe);
        let lead = if swapped { 1 } else { 0 };
        let rows = input.sizes()[lead];
        let trailing: Vec<Extent> = input
            .sizes()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != lead)
            .map(|(_, &n)| n)
            .collect();
        let lead_n = d.dist.dim(lead).n;
        let columns = family / lead_n.max(1);

        Some(CostEstimate {
            local_steps: vec![
                SerialProblem::dft(trailing, d.howmany * rows),
                SerialProblem::dft(vec![lead_n], columns),
            ],
            communication: exchange_cost(p as Extent - 1, input.element_count() * d.howmany),
            buffer_need: dft_buffer(d).max(family),
        })
    }
}

/// Like [`DftRankGeq2`] but first transposes a local dimension into the
/// distributed position, trading a second exchange for better balance.
#[derive(Debug, Default)]
pub struct DftRankGeq2Transposed;

impl Solver for DftRankGeq2Transposed {
    fn name(&self) -> &'static str {
        "dft-rank-geq2-transposed"
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let d = slab_problem(problem)?;
        let p = d.group.size();
        let pe = d.group.rank();
        let intermediate = transposed_intermediate_size(&d.dist, pe, p)? * d.howmany;
        let local = d.local_elements(BlockKind::Input);

        Some(CostEstimate {
            local_steps: vec![
                SerialProblem::rearrange(vec![local], 1),
                SerialProblem::dft(vec![local.max(intermediate)], 1),
                SerialProblem::rearrange(vec![intermediate], 1),
            ],
            communication: exchange_cost(2 * (p as Extent - 1), local + intermediate),
            buffer_need: dft_buffer(d).max(intermediate),
        })
    }
}

/// Batch at least as large as the group: transpose the batch into the
/// distributed position and run whole transforms locally.
#[derive(Debug, Default)]
pub struct DftRank1Bigvec;

impl Solver for DftRank1Bigvec {
    fn name(&self) -> &'static str {
        "dft-rank1-bigvec"
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let Problem::Dft(d) = problem else {
            return None;
        };
        let p = d.group.size();
        if d.dist.rank() != 1 || p < 2 || d.howmany < p as Extent || !d.flags.is_empty() {
            return None;
        }
        let pe = d.group.rank();
        let local = bigvec_size(&d.dist, d.howmany, pe, p) * d.howmany;
        let nx = d.dist.dim(0).n;

        Some(CostEstimate {
            local_steps: vec![SerialProblem::dft(vec![nx], local / nx.max(1))],
            communication: exchange_cost(2 * (p as Extent - 1), 2 * local),
            buffer_need: dft_buffer(d).max(local),
        })
    }
}

/// One-dimensional transform as an `r x m` two-dimensional problem.
#[derive(Debug, Default)]
pub struct DftRank1;

impl Solver for DftRank1 {
    fn name(&self) -> &'static str {
        "dft-rank1"
    }

    fn estimate(&self, problem: &Problem<'_>) -> Option<CostEstimate> {
        let Problem::Dft(d) = problem else {
            return None;
        };
        let p = d.group.size();
        if d.dist.rank() != 1 || p < 2 {
            return None;
        }
        if d.howmany >= p as Extent && d.flags.is_empty() {
            return None;
        }
        let nx = d.dist.dim(0).n;
        let choice = choose_radix(nx, p, d.flags)?;
        let intermediate = rank1_intermediate(&choice, d.flags) * d.howmany;
        let local = d.local_elements(BlockKind::Input);
        let rows = local / choice.cofactor.max(1);

        Some(CostEstimate {
            local_steps: vec![
                SerialProblem::dft(vec![choice.cofactor], rows.max(0)),
                SerialProblem::rearrange(vec![local.max(intermediate)], 1),
                SerialProblem::dft(vec![choice.radix], local / choice.radix.max(1)),
            ],
            communication: exchange_cost(2 * (p as Extent - 1), local + intermediate),
            buffer_need: dft_buffer(d).max(intermediate),
        })
    }
}

/// The standard variants in registration order.
pub fn standard_solvers() -> Vec<Box<dyn Solver>> {
    vec![
        Box::new(TransposePairwise),
        Box::new(TransposeBruck),
        Box::new(DftSerial),
        Box::new(DftRankGeq2),
        Box::new(DftRankGeq2Transposed),
        Box::new(DftRank1Bigvec),
        Box::new(DftRank1),
    ]
}
