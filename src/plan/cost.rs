//! Cross-process agreement on candidate costs.
//!
//! Each process measures or models a cost locally. If processes compared
//! local numbers they could pick different algorithms and deadlock in the
//! collective that follows, so the planner passes every cost through a
//! hook that reduces it over the problem's group.

use serde::{Deserialize, Serialize};

use crate::core::error::{DistError, Result};
use crate::core::network::ReduceOp;
use crate::plan::problem::Problem;

/// How local costs combine into one agreed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    /// Aggregate work over the group.
    Sum,
    /// Wall-clock time, bounded by the slowest process.
    #[default]
    Max,
}

impl From<CostKind> for ReduceOp {
    fn from(kind: CostKind) -> Self {
        match kind {
            CostKind::Sum => ReduceOp::Sum,
            CostKind::Max => ReduceOp::Max,
        }
    }
}

impl std::str::FromStr for CostKind {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(CostKind::Sum),
            "max" => Ok(CostKind::Max),
            _ => Err(DistError::invalid_parameter(
                "cost_kind",
                s,
                "expected sum or max",
            )),
        }
    }
}

/// Signature of the hook a planner calls for every cost it compares.
pub type CostHook = fn(&Problem<'_>, f64, CostKind) -> f64;

/// Combine `local_cost` over the group of a distributed problem.
///
/// Transposes and DFTs perform one all-reduce; serial problems return the
/// cost unchanged. Every member of the group must make the same sequence
/// of calls.
pub fn arbitrate(problem: &Problem<'_>, local_cost: f64, kind: CostKind) -> f64 {
    match problem.process_group() {
        Some(group) => group.all_reduce(local_cost, kind.into()),
        None => local_cost,
    }
}
