//! System constants and cost-model coefficients.
//!
//! This module defines the sentinel values of the public interface and the
//! coefficients the standard planner uses to model candidate costs.

use crate::core::types::Extent;

/// Block-size hint meaning "choose automatically".
pub const DEFAULT_BLOCK: Extent = 0;

/// Exponent sign of a forward transform.
pub const FORWARD: i32 = -1;

/// Exponent sign of a backward transform.
pub const BACKWARD: i32 = 1;

/// Modeled cost of one message, in flop-equivalents.
/// Dominates for small transposes on many processes.
pub const MESSAGE_LATENCY_COST: f64 = 2.0e3;

/// Modeled cost of moving one element between processes, in flop-equivalents.
pub const ELEMENT_TRANSFER_COST: f64 = 4.0;

/// Modeled cost of touching one element during a local rearrangement.
pub const ELEMENT_REARRANGE_COST: f64 = 1.0;

/// Flop count coefficient of a radix-2 style transform (`5 n log2 n`).
pub const DFT_FLOP_COEFFICIENT: f64 = 5.0;

/// Prefix of the environment variables read by the configuration loader.
pub const ENV_PREFIX: &str = "DISTFFT_";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "distfft.toml";

/// Library version.
pub const DISTFFT_VERSION: &str = env!("CARGO_PKG_VERSION");
