//! Peephole simplification of flat instruction sequences
//!
//! Removes no-ops and unconditional jumps to the textually next
//! instruction. Both removals may cascade, so the pass repeats until a
//! fixpoint; every removal records a redirect so incoming jump targets
//! are re-resolved and never left pointing at a removed instruction.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};

use super::{CodeSeq, Instr, PointId};

const MAX_PASSES: usize = 16;

/// Configuration for the peephole pass
#[derive(Debug, Clone)]
pub struct PeepholeConfig {
    /// Remove `Nop` instructions
    pub remove_nops: bool,
    /// Remove unconditional jumps whose target is the next instruction
    pub remove_redundant_jumps: bool,
}

impl Default for PeepholeConfig {
    fn default() -> Self {
        Self {
            remove_nops: true,
            remove_redundant_jumps: true,
        }
    }
}

/// The peephole optimizer. Idempotent and semantics-preserving.
pub struct Peephole {
    config: PeepholeConfig,
}

impl Peephole {
    /// Create an optimizer with the default configuration
    pub fn new() -> Self {
        Self {
            config: PeepholeConfig::default(),
        }
    }

    /// Create an optimizer with a custom configuration
    pub fn with_config(config: PeepholeConfig) -> Self {
        Self { config }
    }

    /// Simplify `seq` in place until nothing more can be removed.
    ///
    /// Fails with [`Error::DanglingJump`] if a removal would strand a
    /// jump, which cannot happen on sequences produced by the
    /// linearizer.
    pub fn optimize(&self, seq: &mut CodeSeq) -> Result<()> {
        let before = seq.len();
        let mut changed = true;
        let mut passes = 0;

        while changed && passes < MAX_PASSES {
            changed = self.run_pass(seq)?;
            passes += 1;
        }

        debug!(
            removed = before - seq.len(),
            passes, "peephole simplification done"
        );
        Ok(())
    }

    /// One left-to-right sweep. Returns whether anything was removed.
    fn run_pass(&self, seq: &mut CodeSeq) -> Result<bool> {
        // removed point -> the point of the entry that followed it
        let mut redirects: FxHashMap<PointId, PointId> = FxHashMap::default();
        let mut changed = false;
        let mut i = 0;

        while i < seq.len() {
            let point = seq.point_at(i).ok_or_else(|| {
                Error::internal("instruction sequence shrank during iteration")
            })?;
            let removable = match seq.instr_at(i) {
                Some(Instr::Nop) => self.config.remove_nops,
                Some(Instr::Jump(target)) if self.config.remove_redundant_jumps => {
                    let resolved = resolve(&redirects, *target);
                    seq.index_of(resolved) == Some(i + 1)
                }
                _ => false,
            };

            if removable {
                if let Some(next) = seq.point_at(i + 1) {
                    redirects.insert(point, next);
                }
                // a removed trailing entry gets no redirect; any jump
                // still resolving to it is caught below
                seq.remove_at(i);
                changed = true;
            } else {
                i += 1;
            }
        }

        if changed {
            let live: rustc_hash::FxHashSet<PointId> =
                seq.iter().map(|(point, _)| point).collect();
            seq.map_targets(|target| {
                let resolved = resolve(&redirects, target);
                if live.contains(&resolved) {
                    Ok(resolved)
                } else {
                    Err(Error::DanglingJump { target: resolved })
                }
            })?;
        }
        Ok(changed)
    }
}

impl Default for Peephole {
    fn default() -> Self {
        Self::new()
    }
}

/// Follow a redirect chain to the last live point. Redirects always move
/// forward in the sequence, so the chain cannot cycle.
fn resolve(redirects: &FxHashMap<PointId, PointId>, mut point: PointId) -> PointId {
    while let Some(&next) = redirects.get(&point) {
        point = next;
    }
    point
}
