//! Core infrastructure module for distfft.
//!
//! This module provides the foundational components shared by the layout,
//! sizing and planning layers.
//!
//! # Organization
//!
//! - [`types`]: Fundamental data types and enumerations
//! - [`constants`]: Interface sentinels and cost-model coefficients
//! - [`error`]: Error handling and error types
//! - [`network`]: Process-group abstraction and collective reductions
//!
//! # Usage
//!
//! ```rust
//! use distfft::core::{
//!     types::{BlockKind, Dimension, DistFlags},
//!     constants::DEFAULT_BLOCK,
//!     network::{ProcessGroup, SingleProcessGroup},
//! };
//!
//! let dim = Dimension::new(64);
//! assert_eq!(dim.hint(BlockKind::Input), DEFAULT_BLOCK);
//! assert!(DistFlags::NONE.is_empty());
//! assert_eq!(SingleProcessGroup.size(), 1);
//! ```

// Public module declarations
pub mod constants;
pub mod error;
pub mod network;
pub mod types;

// Re-export commonly used items for convenience
pub use constants::*;
pub use error::{DistError, Result};
pub use network::{ProcessGroup, ReduceOp, SingleProcessGroup, ThreadGroup};
pub use types::*;

/// Initialize the `env_logger` backend at the given verbosity.
///
/// `RUST_LOG` still takes precedence when set. Does nothing if a logger
/// has already been installed.
pub fn initialize_logging(verbosity: VerbosityLevel) {
    let env = env_logger::Env::default().default_filter_or(verbosity.as_filter());
    if env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init()
        .is_ok()
    {
        log::debug!("Logging initialized at {:?}", verbosity);
    }
}
