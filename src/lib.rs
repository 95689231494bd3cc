//! # distfft
//!
//! Partitioning, buffer sizing and plan construction for distributed
//! multi-dimensional Fourier transforms and transposes.
//!
//! Every process of a group calls the same functions with the same
//! arguments and independently arrives at the same partition of the global
//! array: which block of which dimension it owns on the input side, which
//! on the output side, and how many elements it must reserve so that any
//! algorithm the planner might pick has room for its intermediate data.
//!
//! ## Features
//!
//! - **Deterministic layouts**: block distributions depend only on the
//!   request and the process count, never on the calling rank.
//! - **Conservative sizing**: the size query bounds every algorithm
//!   family (slab, transposed slab, big-vector and radix-split 1-d).
//! - **Agreed planning**: candidate costs are reduced across the group so
//!   all processes pick the same algorithm.
//! - **Simulation**: [`ThreadGroup`] runs a group of "processes" as threads,
//!   and [`DistributionSurvey`] computes every rank's layout in parallel.
//!
//! ## Quick Start
//!
//! ```rust
//! use distfft::{local_size_2d, SingleProcessGroup};
//!
//! # fn main() -> distfft::Result<()> {
//! let slab = local_size_2d(12, 8, &SingleProcessGroup)?;
//! assert_eq!(slab.required, 96);
//! assert_eq!((slab.local_nx, slab.local_x_start), (12, 0));
//! # Ok(())
//! # }
//! ```
//!
//! ### Surveying a layout before launch
//!
//! ```rust
//! use distfft::{BlockKind, Dimension, DistFlags, DistributionSurvey};
//!
//! # fn main() -> distfft::Result<()> {
//! let dims = [Dimension::new(12), Dimension::new(8)];
//! let survey = DistributionSurvey::survey(&dims, 1, 4, None, DistFlags::NONE)?;
//! assert_eq!(survey.total_required(), 96);
//! survey.verify_tiling(BlockKind::Input)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Planning
//!
//! ```rust
//! use distfft::{Buffers, DistFlags, PlanningContext, Sign, SingleProcessGroup};
//! use num_complex::Complex64;
//!
//! # fn main() -> distfft::Result<()> {
//! let group = SingleProcessGroup;
//! let mut data = vec![Complex64::new(0.0, 0.0); 64];
//! let mut ctx = PlanningContext::new();
//! let plan = ctx.plan_dft_2d(8, 8, Buffers::InPlace(&mut data), &group, Sign::Forward, DistFlags::NONE)?;
//! assert!(plan.buffer_need() <= 64);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/distfft/")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Block distributions and local extents
pub mod distribution;

// Local buffer sizing
pub mod sizing;

// Plan construction and cost agreement
pub mod plan;

// Planner interface and standard algorithms
pub mod planner;

// Re-export core functionality for convenience
pub use crate::core::{
    constants::*,
    error::{DistError, Result},
    initialize_logging,
    network::{ProcessGroup, ReduceOp, SingleProcessGroup, ThreadGroup},
    types::*,
};

// Re-export configuration functionality
pub use crate::config::{ConfigBuilder, ConfigFormat, PlannerConfig};

// Re-export distribution functionality
pub use crate::distribution::{
    block_size, default_block, num_blocks, DistDim, DistributedTensor, LocalExtent,
};

// Re-export sizing functionality
pub use crate::sizing::{
    choose_radix, estimate, local_size, local_size_1d, local_size_2d, local_size_2d_transposed,
    local_size_3d, local_size_3d_transposed, local_size_guru, local_size_many, local_size_many_1d,
    local_size_many_transposed, local_size_transposed, resolve_distribution, DistributionSurvey,
    LocalSize, RadixChoice, SlabSize,
};

// Re-export planning functionality
pub use crate::plan::{
    arbitrate, Buffers, CostHook, CostKind, DftProblem, PlanningContext, Problem, SerialProblem,
    TransposeProblem,
};
pub use crate::planner::{Plan, Planner, Solver, StandardPlanner};

// Version information
pub use crate::core::constants::DISTFFT_VERSION as VERSION;
