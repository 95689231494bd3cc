//! Plan construction for distributed transforms and transposes.
//!
//! [`PlanningContext`] validates a request, builds the canonical
//! distribution every process agrees on, packages a typed [`Problem`] and
//! hands it to its [`Planner`]. Invalid or infeasible requests are
//! reported as errors before any communication takes place, so either all
//! processes reach the planner or none does.

pub mod cost;
pub mod problem;

use num_complex::Complex64;

use crate::config::PlannerConfig;
use crate::core::constants::DEFAULT_BLOCK;
use crate::core::error::{DistError, Result};
use crate::core::network::ProcessGroup;
use crate::core::types::{BlockKind, Dimension, DistFlags, Extent, Sign};
use crate::core::initialize_logging;
use crate::distribution::block::{default_block, num_blocks};
use crate::planner::{Plan, Planner, StandardPlanner};
use crate::sizing::survey::DistributionSurvey;
use crate::sizing::{resolve_distribution, validate_request};

pub use cost::{arbitrate, CostHook, CostKind};
pub use problem::{
    Buffers, DftProblem, Problem, SerialKind, SerialProblem, TransposeProblem,
};

/// Owner of the planner and its one-time registration.
///
/// `init` is idempotent and called by every plan method; `shutdown`
/// releases the planner's registrations and allows a later re-init.
#[derive(Debug)]
pub struct PlanningContext<P: Planner = StandardPlanner> {
    planner: P,
    config: PlannerConfig,
    initialized: bool,
}

impl PlanningContext<StandardPlanner> {
    /// Context over a [`StandardPlanner`] with default configuration.
    pub fn new() -> Self {
        Self::with_config(PlannerConfig::default())
    }

    /// Context over a [`StandardPlanner`] using `config`.
    pub fn with_config(config: PlannerConfig) -> Self {
        let planner = StandardPlanner::with_cost_kind(config.cost_kind);
        PlanningContext {
            planner,
            config,
            initialized: false,
        }
    }
}

impl Default for PlanningContext<StandardPlanner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Planner> PlanningContext<P> {
    /// Context over a caller-supplied planner.
    pub fn with_planner(planner: P, config: PlannerConfig) -> Self {
        PlanningContext {
            planner,
            config,
            initialized: false,
        }
    }

    /// Register the cost hook and standard algorithms, once.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        initialize_logging(self.config.verbosity);
        self.planner.register_cost_hook(arbitrate);
        self.planner.register_default_algorithms();
        self.initialized = true;
        log::info!(
            "planning context initialized (rigor {:?}, cost {:?})",
            self.config.rigor,
            self.config.cost_kind
        );
    }

    /// Release planner registrations; a later `init` starts over.
    pub fn shutdown(&mut self) {
        self.planner.cleanup();
        if self.initialized {
            log::info!("planning context shut down");
        }
        self.initialized = false;
    }

    /// Whether `init` has run since construction or the last `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Planner settings this context was built with.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// The underlying planner.
    pub fn planner(&self) -> &P {
        &self.planner
    }

    fn build<'a>(&mut self, problem: Problem<'a>) -> Result<Plan<'a>> {
        let family = problem.family();
        match self.planner.build_plan(problem, self.config.rigor) {
            Some(plan) => Ok(plan),
            None => {
                log::warn!("no algorithm applies to the {} problem", family);
                Err(DistError::PlannerDeclined { family })
            }
        }
    }

    fn survey_layout(
        &self,
        dims: &[Dimension],
        howmany: Extent,
        n_pes: usize,
        sign: Option<Sign>,
        flags: DistFlags,
    ) -> Result<()> {
        if !self.config.survey_layouts {
            return Ok(());
        }
        let elements = dims
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.n as usize));
        match elements {
            Some(total) if total <= self.config.max_survey_elements => {}
            _ => {
                log::debug!("layout survey skipped: request exceeds the element limit");
                return Ok(());
            }
        }
        let survey = DistributionSurvey::survey(dims, howmany, n_pes, sign, flags)?;
        for kind in BlockKind::ALL {
            survey.verify_tiling(kind)?;
        }
        Ok(())
    }

    /// Plan a distributed complex DFT over an explicit distribution.
    ///
    /// `dims` carries the extents and the input/output block hints
    /// ([`DEFAULT_BLOCK`] to choose automatically). Rank-1 requests are
    /// laid out by the radix the size query would choose.
    pub fn plan_guru_dft<'a>(
        &mut self,
        dims: &[Dimension],
        howmany: Extent,
        buffers: Buffers<'a, Complex64>,
        group: &'a dyn ProcessGroup,
        sign: Sign,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.init();

        crate::ensure!(
            !dims.is_empty(),
            DistError::invalid_request("a distributed transform needs at least one dimension")
        );
        let n_pes = group.size();
        let resolved = resolve_distribution(dims, howmany, n_pes, Some(sign), flags)?;
        self.survey_layout(dims, howmany, n_pes, Some(sign), flags)?;

        let problem = Problem::Dft(DftProblem {
            dist: resolved.tensor,
            howmany,
            sign,
            flags,
            group,
            buffers,
        });
        self.build(problem)
    }

    /// Plan a batched DFT with explicit block sizes for the distributed dimensions.
    ///
    /// `iblock` applies to the first dimension of the input, or the second
    /// with [`DistFlags::TRANSPOSED_IN`]; likewise `oblock` for the output
    /// with [`DistFlags::TRANSPOSED_OUT`].
    #[allow(clippy::too_many_arguments)]
    pub fn plan_many_dft<'a>(
        &mut self,
        n: &[Extent],
        howmany: Extent,
        iblock: Extent,
        oblock: Extent,
        buffers: Buffers<'a, Complex64>,
        group: &'a dyn ProcessGroup,
        sign: Sign,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        let mut dims: Vec<Dimension> = n.iter().map(|&n| Dimension::local(n)).collect();
        match dims.len() {
            0 => {}
            1 => {
                dims[0].ib = iblock;
                dims[0].ob = oblock;
            }
            _ => {
                let i = usize::from(flags.contains(DistFlags::TRANSPOSED_IN));
                let o = usize::from(flags.contains(DistFlags::TRANSPOSED_OUT));
                dims[i].ib = iblock;
                dims[o].ob = oblock;
            }
        }
        self.plan_guru_dft(&dims, howmany, buffers, group, sign, flags)
    }

    /// Plan a single DFT over `n` with automatic block sizes.
    pub fn plan_dft<'a>(
        &mut self,
        n: &[Extent],
        buffers: Buffers<'a, Complex64>,
        group: &'a dyn ProcessGroup,
        sign: Sign,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.plan_many_dft(n, 1, DEFAULT_BLOCK, DEFAULT_BLOCK, buffers, group, sign, flags)
    }

    /// Plan a distributed one-dimensional DFT of length `nx`.
    pub fn plan_dft_1d<'a>(
        &mut self,
        nx: Extent,
        buffers: Buffers<'a, Complex64>,
        group: &'a dyn ProcessGroup,
        sign: Sign,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.plan_dft(&[nx], buffers, group, sign, flags)
    }

    /// Plan a two-dimensional `nx x ny` DFT.
    pub fn plan_dft_2d<'a>(
        &mut self,
        nx: Extent,
        ny: Extent,
        buffers: Buffers<'a, Complex64>,
        group: &'a dyn ProcessGroup,
        sign: Sign,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.plan_dft(&[nx, ny], buffers, group, sign, flags)
    }

    /// Plan a three-dimensional `nx x ny x nz` DFT.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_dft_3d<'a>(
        &mut self,
        nx: Extent,
        ny: Extent,
        nz: Extent,
        buffers: Buffers<'a, Complex64>,
        group: &'a dyn ProcessGroup,
        sign: Sign,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.plan_dft(&[nx, ny, nz], buffers, group, sign, flags)
    }

    /// Plan the distributed transpose of an `nx x ny` matrix of
    /// `howmany`-tuples, input split in rows of `xblock`, output (the
    /// `ny x nx` transpose) split in rows of `yblock`.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_many_transpose<'a>(
        &mut self,
        nx: Extent,
        ny: Extent,
        howmany: Extent,
        xblock: Extent,
        yblock: Extent,
        buffers: Buffers<'a, f64>,
        group: &'a dyn ProcessGroup,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.init();

        validate_request(
            &[
                Dimension::with_blocks(nx, xblock, DEFAULT_BLOCK),
                Dimension::with_blocks(ny, DEFAULT_BLOCK, yblock),
            ],
            howmany,
        )?;

        let n_pes = group.size();
        let xblock = if xblock == DEFAULT_BLOCK {
            default_block(nx, n_pes)
        } else {
            xblock
        };
        let yblock = if yblock == DEFAULT_BLOCK {
            default_block(ny, n_pes)
        } else {
            yblock
        };
        let x_blocks = num_blocks(nx, xblock);
        if x_blocks > n_pes as Extent {
            return Err(DistError::infeasible(BlockKind::Input, x_blocks, n_pes));
        }
        let y_blocks = num_blocks(ny, yblock);
        if y_blocks > n_pes as Extent {
            return Err(DistError::infeasible(BlockKind::Output, y_blocks, n_pes));
        }

        let problem = Problem::Transpose(TransposeProblem::new(
            nx, ny, howmany, xblock, yblock, flags, group, buffers,
        ));
        self.build(problem)
    }

    /// Plan the transpose of an `nx x ny` matrix of scalars with automatic block sizes.
    pub fn plan_transpose<'a>(
        &mut self,
        nx: Extent,
        ny: Extent,
        buffers: Buffers<'a, f64>,
        group: &'a dyn ProcessGroup,
        flags: DistFlags,
    ) -> Result<Plan<'a>> {
        self.plan_many_transpose(
            nx,
            ny,
            1,
            DEFAULT_BLOCK,
            DEFAULT_BLOCK,
            buffers,
            group,
            flags,
        )
    }
}
