//! Lowering of source-level assertions into block-graph arms
//!
//! A test body communicates its outcome only through its returned string:
//! empty means pass, non-empty is a position-tagged failure description.
//! An assertion therefore compiles into a two-way branch whose arms are
//! built here; the front end supplies the condition evaluation and wires
//! the branch itself.

use crate::bytecode::Instr;
use crate::classfile::{ConstPool, Constant};
use crate::error::SourcePos;

use super::{BlockArena, BlockId};

/// The two outcome arms of a lowered assertion.
///
/// Wire them as `arena.branch(cond, arms.on_pass, arms.on_fail)` so the
/// taken edge is the passing one.
#[derive(Debug, Clone, Copy)]
pub struct AssertArms {
    /// Entry block when the asserted expression held
    pub on_pass: BlockId,
    /// Entry block when it did not
    pub on_fail: BlockId,
}

/// Lower one assertion at `pos`.
///
/// The fail arm pushes `"at <line>:<col>"` and returns it immediately.
/// The pass arm is the shared `continuation` when the assertion is not
/// the final statement; control simply falls through into it, and the
/// memoizing linearizer guarantees it is emitted once no matter how many
/// assertion arms reference it. For a trailing assertion
/// (`continuation` is `None`) the pass arm pushes the empty string and
/// returns, which is the passing result.
pub fn lower_assert(
    arena: &mut BlockArena,
    pool: &mut ConstPool,
    pos: SourcePos,
    continuation: Option<BlockId>,
) -> AssertArms {
    let on_pass = match continuation {
        Some(next) => next,
        None => {
            let empty = pool.add(Constant::str(""));
            let push = arena.block(Instr::Const(empty));
            let ret = arena.block(Instr::Return);
            arena.link(push, ret);
            push
        }
    };

    let message = pool.add(Constant::Str(format!("at {}", pos)));
    let push = arena.block(Instr::Const(message));
    let ret = arena.block(Instr::Return);
    arena.link(push, ret);

    AssertArms {
        on_pass,
        on_fail: push,
    }
}
