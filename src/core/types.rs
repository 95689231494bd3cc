//! Fundamental data types for distributed transform layouts.
//!
//! This module defines the scalar aliases, enumerations and small value
//! types shared by the distribution, sizing and planning layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::core::constants::{BACKWARD, DEFAULT_BLOCK, FORWARD};
use crate::core::error::{DistError, Result};

/// Signed extent type used for global sizes, block sizes and local counts.
///
/// Signed so that malformed requests (negative sizes or hints) can be
/// represented and rejected instead of wrapping.
pub type Extent = i64;

/// Index of a block along one dimension.
pub type BlockIndex = Extent;

/// Which side of a distributed operation a block size describes.
///
/// A distributed transform may read its input in one partition and
/// produce its output in another (for example after an internal transpose).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlockKind {
    /// Layout of the data the operation reads.
    Input = 0,
    /// Layout of the data the operation produces.
    Output = 1,
}

impl BlockKind {
    /// Both kinds in canonical processing order.
    pub const ALL: [BlockKind; 2] = [BlockKind::Input, BlockKind::Output];

    /// Position of this kind in a per-kind array.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Input => write!(f, "input"),
            BlockKind::Output => write!(f, "output"),
        }
    }
}

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// Forward transform, exponent sign -1.
    Forward,
    /// Backward (inverse) transform, exponent sign +1.
    Backward,
}

impl Sign {
    /// Raw exponent sign.
    pub fn as_i32(self) -> i32 {
        match self {
            Sign::Forward => FORWARD,
            Sign::Backward => BACKWARD,
        }
    }
}

impl TryFrom<i32> for Sign {
    type Error = DistError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            FORWARD => Ok(Sign::Forward),
            BACKWARD => Ok(Sign::Backward),
            other => Err(DistError::invalid_parameter(
                "sign",
                other.to_string(),
                "must be FORWARD (-1) or BACKWARD (+1)",
            )),
        }
    }
}

/// Distribution flags accepted by the size queries and plan constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DistFlags(u32);

impl DistFlags {
    /// No flags set.
    pub const NONE: DistFlags = DistFlags(0);
    /// Input is distributed along the second dimension instead of the first.
    pub const TRANSPOSED_IN: DistFlags = DistFlags(1);
    /// Output is distributed along the second dimension instead of the first.
    pub const TRANSPOSED_OUT: DistFlags = DistFlags(1 << 1);
    /// One-dimensional transforms only: leave the input in scrambled order.
    pub const SCRAMBLED_IN: DistFlags = DistFlags(1 << 2);
    /// One-dimensional transforms only: leave the output in scrambled order.
    pub const SCRAMBLED_OUT: DistFlags = DistFlags(1 << 3);

    const ALL_BITS: u32 = 0b1111;

    /// Shift of the distribution bits inside a packed 32-bit planner-flag word.
    pub const API_SHIFT: u32 = 28;

    /// Construct from raw bits, dropping unknown bits.
    pub fn from_bits_truncate(bits: u32) -> Self {
        DistFlags(bits & Self::ALL_BITS)
    }

    /// Decode the distribution bits packed in the top nibble of a planner-flag word.
    pub fn from_api_bits(flags: u32) -> Self {
        Self::from_bits_truncate(flags >> Self::API_SHIFT)
    }

    /// Encode into the top nibble of a planner-flag word.
    pub fn to_api_bits(self) -> u32 {
        self.0 << Self::API_SHIFT
    }

    /// Raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True when no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    pub fn contains(self, other: DistFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DistFlags {
    type Output = DistFlags;

    fn bitor(self, rhs: DistFlags) -> DistFlags {
        DistFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for DistFlags {
    fn bitor_assign(&mut self, rhs: DistFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for DistFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names = [
            (DistFlags::TRANSPOSED_IN, "TRANSPOSED_IN"),
            (DistFlags::TRANSPOSED_OUT, "TRANSPOSED_OUT"),
            (DistFlags::SCRAMBLED_IN, "SCRAMBLED_IN"),
            (DistFlags::SCRAMBLED_OUT, "SCRAMBLED_OUT"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", set.join("|"))
    }
}

/// One dimension of a requested layout: global extent plus block hints.
///
/// A hint of [`DEFAULT_BLOCK`] lets the library choose the block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Global extent.
    pub n: Extent,
    /// Input block-size hint.
    pub ib: Extent,
    /// Output block-size hint.
    pub ob: Extent,
}

impl Dimension {
    /// Dimension of extent `n` with automatic block sizes on both sides.
    pub fn new(n: Extent) -> Self {
        Dimension {
            n,
            ib: DEFAULT_BLOCK,
            ob: DEFAULT_BLOCK,
        }
    }

    /// Dimension with explicit input and output block hints.
    pub fn with_blocks(n: Extent, ib: Extent, ob: Extent) -> Self {
        Dimension { n, ib, ob }
    }

    /// Dimension that is not distributed on either side.
    pub fn local(n: Extent) -> Self {
        Dimension { n, ib: n, ob: n }
    }

    /// Hint for the given side.
    pub fn hint(&self, kind: BlockKind) -> Extent {
        match kind {
            BlockKind::Input => self.ib,
            BlockKind::Output => self.ob,
        }
    }

    /// Set the hint for the given side.
    pub fn set_hint(&mut self, kind: BlockKind, block: Extent) {
        match kind {
            BlockKind::Input => self.ib = block,
            BlockKind::Output => self.ob = block,
        }
    }
}

/// How much effort the planner spends choosing among candidate algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanRigor {
    /// Take the first applicable algorithm; no cost vote.
    Estimate,
    /// Vote over the default algorithm variants.
    Measure,
    /// Vote over every registered variant.
    Patient,
}

impl Default for PlanRigor {
    fn default() -> Self {
        PlanRigor::Measure
    }
}

impl std::str::FromStr for PlanRigor {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "estimate" => Ok(PlanRigor::Estimate),
            "measure" => Ok(PlanRigor::Measure),
            "patient" => Ok(PlanRigor::Patient),
            _ => Err(DistError::invalid_parameter(
                "rigor",
                s,
                "expected one of estimate, measure, patient",
            )),
        }
    }
}

/// Verbosity levels for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Fatal errors only
    Fatal = -1,
    /// Warnings and errors
    Warning = 0,
    /// Information, warnings, and errors
    Info = 1,
    /// Debug information
    Debug = 2,
}

impl Default for VerbosityLevel {
    fn default() -> Self {
        VerbosityLevel::Warning
    }
}

impl VerbosityLevel {
    /// Filter directive understood by `env_logger`.
    pub fn as_filter(self) -> &'static str {
        match self {
            VerbosityLevel::Fatal => "error",
            VerbosityLevel::Warning => "warn",
            VerbosityLevel::Info => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

impl From<i32> for VerbosityLevel {
    fn from(value: i32) -> Self {
        match value {
            i if i < 0 => VerbosityLevel::Fatal,
            0 => VerbosityLevel::Warning,
            1 => VerbosityLevel::Info,
            _ => VerbosityLevel::Debug,
        }
    }
}
