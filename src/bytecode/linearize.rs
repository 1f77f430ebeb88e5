//! Block-graph to flat-sequence lowering
//!
//! Depth-first emission with memoization: a block already assigned a
//! program point is never emitted again, which is what makes shared
//! continuations and loop back-edges come out as plain backward jumps
//! instead of duplicated code.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::ir::{BlockArena, BlockId, Payload};

use super::{CodeSeq, Instr, PointId};

/// Lower the graph reachable from `entry` into a flat, jump-resolved
/// instruction sequence.
///
/// The memo map is local to this call; nothing outside the arena and the
/// produced sequence is touched.
pub fn linearize(arena: &BlockArena, entry: BlockId) -> Result<CodeSeq> {
    let mut seq = CodeSeq::new();
    let mut done: FxHashMap<BlockId, PointId> = FxHashMap::default();
    emit_block(arena, entry, &mut done, &mut seq)?;
    debug!(
        blocks = done.len(),
        instructions = seq.len(),
        "linearized block graph"
    );
    Ok(seq)
}

/// Emit one block and everything reachable from it, returning the
/// program point of the block's instruction.
fn emit_block(
    arena: &BlockArena,
    block: BlockId,
    done: &mut FxHashMap<BlockId, PointId>,
    seq: &mut CodeSeq,
) -> Result<PointId> {
    // already emitted via another predecessor, or a loop back-edge
    if let Some(&point) = done.get(&block) {
        return Ok(point);
    }

    match arena.payload(block) {
        Payload::Instr(instr) => {
            let point = seq.append(instr.clone());
            done.insert(block, point);
            trace!(?block, ?point, "emitted block");

            match arena.successors(block) {
                [] => {}
                [next] => {
                    // The jump is needed even when the successor's code
                    // ends up physically adjacent: the successor may have
                    // been emitted earlier via another path, in which case
                    // its point is an earlier position. The peephole pass
                    // removes the jump again when it is redundant.
                    let tail = point;
                    let target = emit_block(arena, *next, done, seq)?;
                    seq.insert_after(tail, Instr::Jump(target))?;
                }
                more => {
                    return Err(Error::internal(format!(
                        "non-branch block with {} successors",
                        more.len()
                    )));
                }
            }
            Ok(point)
        }
        Payload::Branch(cond) => {
            let (taken, not_taken) = match arena.successors(block) {
                [taken, not_taken] => (*taken, *not_taken),
                other => {
                    return Err(Error::internal(format!(
                        "branch block with {} successors",
                        other.len()
                    )));
                }
            };

            // Placeholder targets until both arms have points; recording
            // the memo entry first keeps back-edges onto the branch sound.
            let point = seq.append(Instr::Branch(*cond, PLACEHOLDER, PLACEHOLDER));
            done.insert(block, point);
            trace!(?block, ?point, "emitted branch block");

            // Not-taken first: its code falls through physically right
            // after the branch, so the common case needs no extra jump.
            let not_taken_point = emit_block(arena, not_taken, done, seq)?;
            let taken_point = emit_block(arena, taken, done, seq)?;
            seq.patch_branch(point, taken_point, not_taken_point)?;
            Ok(point)
        }
    }
}

/// Temporary branch target used before both arms are emitted. Every
/// placeholder is patched before `linearize` returns.
const PLACEHOLDER: PointId = PointId::PLACEHOLDER;
