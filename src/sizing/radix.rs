//! Radix selection for one-dimensional distributed transforms.
//!
//! A distributed 1-d transform of length `nx` is computed as a
//! two-dimensional `r x m` problem with `nx = r * m`. The radix fixes how
//! the input and output are blocked; a poor radix leaves processes idle.

use serde::{Deserialize, Serialize};

use crate::core::types::{BlockKind, DistFlags, Extent};
use crate::distribution::block::{default_block, num_blocks};

/// A chosen factorization `nx = radix * cofactor` and its block sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RadixChoice {
    /// The radix `r`.
    pub radix: Extent,
    /// The cofactor `m = nx / r`.
    pub cofactor: Extent,
    /// Block size over the radix, per side.
    pub rblock: [Extent; 2],
    /// Block size over the cofactor, per side.
    pub mblock: [Extent; 2],
}

impl RadixChoice {
    fn new(radix: Extent, cofactor: Extent, n_pes: usize) -> Self {
        let rblock = default_block(radix, n_pes);
        let mblock = default_block(cofactor, n_pes);
        RadixChoice {
            radix,
            cofactor,
            rblock: [rblock; 2],
            mblock: [mblock; 2],
        }
    }

    /// Block size of the length-`nx` dimension on the given side.
    pub fn dimension_block(&self, kind: BlockKind, flags: DistFlags) -> Extent {
        let k = kind.index();
        let scrambled = match kind {
            BlockKind::Input => flags.contains(DistFlags::SCRAMBLED_IN),
            BlockKind::Output => flags.contains(DistFlags::SCRAMBLED_OUT),
        };
        match (kind, scrambled) {
            (BlockKind::Input, true) | (BlockKind::Output, false) => self.rblock[k] * self.cofactor,
            (BlockKind::Input, false) | (BlockKind::Output, true) => self.radix * self.mblock[k],
        }
    }

    /// Number of blocks the length-`nx` dimension is split into on the given side.
    pub fn blocks(&self, kind: BlockKind, flags: DistFlags) -> Extent {
        let nx = self.radix * self.cofactor;
        num_blocks(nx, self.dimension_block(kind, flags))
    }

    /// Local intermediate elements held between the two passes on `kind`.
    ///
    /// Zero when the side is scrambled, since the data stays in the
    /// intermediate order and no extra buffer is needed.
    pub fn intermediate(&self, kind: BlockKind, flags: DistFlags) -> Extent {
        let k = kind.index();
        match kind {
            BlockKind::Input if !flags.contains(DistFlags::SCRAMBLED_IN) => {
                self.rblock[k] * self.cofactor
            }
            BlockKind::Output if !flags.contains(DistFlags::SCRAMBLED_OUT) => {
                self.radix * self.mblock[k]
            }
            _ => 0,
        }
    }

    /// Processes busy on both sides.
    fn utilization(&self, flags: DistFlags) -> Extent {
        self.blocks(BlockKind::Input, flags)
            .min(self.blocks(BlockKind::Output, flags))
    }
}

/// True when `radix` can split a length-`nx` transform over `n_pes` processes.
pub fn is_valid_radix(radix: Extent, nx: Extent, n_pes: usize, flags: DistFlags) -> bool {
    let p = n_pes.max(1) as Extent;
    if radix < 1 || radix > p || nx < 1 || nx % radix != 0 {
        return false;
    }
    let cofactor = nx / radix;
    if p > 1 && (radix < 2 || cofactor < 2) {
        return false;
    }
    let choice = RadixChoice::new(radix, cofactor, n_pes);
    BlockKind::ALL
        .iter()
        .all(|&kind| choice.blocks(kind, flags) <= p)
}

/// Pick the radix for a length-`nx` transform over `n_pes` processes.
///
/// Among valid radices, the one keeping the most processes busy on both
/// sides wins; ties go to the larger radix. Returns `None` when no radix
/// is valid, e.g. for a prime `nx` on more than one process.
pub fn choose_radix(nx: Extent, n_pes: usize, flags: DistFlags) -> Option<RadixChoice> {
    let p = n_pes.max(1) as Extent;
    let mut best: Option<(Extent, RadixChoice)> = None;

    for radix in (1..=p.min(nx)).rev() {
        if !is_valid_radix(radix, nx, n_pes, flags) {
            continue;
        }
        let choice = RadixChoice::new(radix, nx / radix, n_pes);
        let score = choice.utilization(flags);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, choice));
        }
    }

    match best {
        Some((score, choice)) => {
            log::debug!(
                "radix for nx={} over {} processes: {} x {} (utilization {})",
                nx,
                n_pes,
                choice.radix,
                choice.cofactor,
                score
            );
            Some(choice)
        }
        None => {
            log::debug!("no valid radix for nx={} over {} processes", nx, n_pes);
            None
        }
    }
}
