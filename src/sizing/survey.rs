//! Whole-group view of a size query.
//!
//! Computes what every rank of a group of `n_pes` processes would get from
//! the size query, without needing the group itself. Useful to check a
//! layout before launching a job and to verify that the per-rank windows
//! tile the global array.

use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::{DistError, Result};
use crate::core::types::{BlockKind, Dimension, DistFlags, Extent, Sign};
use crate::distribution::LocalExtent;
use crate::sizing::{estimate, LocalSize};

/// Size query results for every rank of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSurvey {
    shape: Vec<Extent>,
    n_pes: usize,
    per_rank: Vec<LocalSize>,
}

impl DistributionSurvey {
    /// Run the size query for each rank `0..n_pes` in parallel.
    pub fn survey(
        dims: &[Dimension],
        howmany: Extent,
        n_pes: usize,
        sign: Option<Sign>,
        flags: DistFlags,
    ) -> Result<Self> {
        let n_pes = n_pes.max(1);
        let per_rank = (0..n_pes)
            .into_par_iter()
            .map(|pe| estimate(dims, howmany, pe, n_pes, sign, flags))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "surveyed {} ranks: total required {}",
            n_pes,
            per_rank.iter().map(|s| s.required).sum::<Extent>()
        );

        Ok(DistributionSurvey {
            shape: dims.iter().map(|d| d.n).collect(),
            n_pes,
            per_rank,
        })
    }

    /// Number of ranks surveyed.
    pub fn n_pes(&self) -> usize {
        self.n_pes
    }

    /// Global shape of the request.
    pub fn shape(&self) -> &[Extent] {
        &self.shape
    }

    /// Result for one rank.
    pub fn rank(&self, pe: usize) -> Option<&LocalSize> {
        self.per_rank.get(pe)
    }

    /// Results for every rank, in rank order.
    pub fn per_rank(&self) -> &[LocalSize] {
        &self.per_rank
    }

    /// Sum of the reported sizes over all ranks.
    pub fn total_required(&self) -> Extent {
        self.per_rank.iter().map(|s| s.required).sum()
    }

    /// Largest reported size of any rank.
    pub fn max_required(&self) -> Extent {
        self.per_rank.iter().map(|s| s.required).max().unwrap_or(0)
    }

    /// Ranks that own no block on the given side.
    pub fn idle_ranks(&self, kind: BlockKind) -> Vec<usize> {
        self.per_rank
            .iter()
            .enumerate()
            .filter(|(_, s)| extent_of(s, kind).is_empty())
            .map(|(pe, _)| pe)
            .collect()
    }

    /// Check that the windows of all ranks on `kind` cover every element of
    /// the global array exactly once.
    pub fn verify_tiling(&self, kind: BlockKind) -> Result<()> {
        if self.shape.is_empty() {
            return Ok(());
        }

        let shape: Vec<usize> = self.shape.iter().map(|&n| n as usize).collect();
        let mut coverage = ArrayD::<u32>::zeros(IxDyn(&shape));
        for size in &self.per_rank {
            let extent = extent_of(size, kind);
            if extent.is_empty() {
                continue;
            }
            extent
                .window_mut(coverage.view_mut())?
                .mapv_inplace(|count| count + 1);
        }

        let gaps = coverage.iter().filter(|&&c| c == 0).count();
        let overlaps = coverage.iter().filter(|&&c| c > 1).count();
        if gaps > 0 || overlaps > 0 {
            return Err(DistError::internal(format!(
                "{} windows do not tile {:?}: {} elements uncovered, {} covered more than once",
                kind, self.shape, gaps, overlaps
            )));
        }
        Ok(())
    }
}

fn extent_of(size: &LocalSize, kind: BlockKind) -> &LocalExtent {
    match kind {
        BlockKind::Input => &size.input,
        BlockKind::Output => &size.output,
    }
}
