//! Block-graph intermediate representation
//!
//! The front end translates each callable body into a graph of blocks;
//! the backend reads it once during linearization and then discards it.
//! Blocks live in an arena and are addressed by stable [`BlockId`]
//! indices, so a block referenced by several predecessors (the way
//! then/else branches rejoin a common continuation) is plain index
//! sharing, with no ownership machinery.

mod assertion;

pub use assertion::{lower_assert, AssertArms};

use rustc_hash::FxHashSet;

use crate::bytecode::{BranchCond, Instr};

/// Index of a block in a [`BlockArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

/// What a block holds: one ordinary instruction, or a branch condition.
///
/// A closed tagged union with an explicit branch query instead of
/// subtype inspection.
#[derive(Debug, Clone)]
pub enum Payload {
    /// An ordinary instruction; the block has zero or one successors
    Instr(Instr),
    /// A two-way branch; the block has exactly two successors,
    /// taken first, not-taken second
    Branch(BranchCond),
}

impl Payload {
    /// True for branch blocks
    pub fn is_branch(&self) -> bool {
        matches!(self, Payload::Branch(_))
    }

    /// True when control cannot continue past this block's instruction
    pub fn is_terminal(&self) -> bool {
        matches!(self, Payload::Instr(instr) if instr.is_terminal())
    }
}

#[derive(Debug, Clone)]
struct BlockData {
    payload: Payload,
    successors: Vec<BlockId>,
}

/// Arena owning the blocks of one class's callable bodies.
///
/// Graphs are built by the front end (with the class's constant pool at
/// hand, so literals are interned as instructions are created) and are
/// read-only to the lowering passes.
#[derive(Debug, Clone, Default)]
pub struct BlockArena {
    blocks: Vec<BlockData>,
}

impl BlockArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block holding one ordinary instruction, with no successor
    pub fn block(&mut self, instr: Instr) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData {
            payload: Payload::Instr(instr),
            successors: Vec::new(),
        });
        id
    }

    /// Create a branch block with its taken and not-taken successors
    pub fn branch(&mut self, cond: BranchCond, taken: BlockId, not_taken: BlockId) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData {
            payload: Payload::Branch(cond),
            successors: vec![taken, not_taken],
        });
        id
    }

    /// Link `from` to its single straight-line successor.
    ///
    /// Replaces any previous link; branch blocks keep their two targets
    /// and must not be relinked this way.
    pub fn link(&mut self, from: BlockId, to: BlockId) {
        let data = &mut self.blocks[from.0 as usize];
        debug_assert!(!data.payload.is_branch(), "cannot relink a branch block");
        data.successors.clear();
        data.successors.push(to);
    }

    /// The block's payload
    pub fn payload(&self, id: BlockId) -> &Payload {
        &self.blocks[id.0 as usize].payload
    }

    /// The block's successors in order (taken before not-taken for
    /// branches)
    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        &self.blocks[id.0 as usize].successors
    }

    /// Number of blocks allocated
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if no blocks have been allocated
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Build a straight-line chain out of `instrs`, returning the entry
    /// block (or `None` for an empty slice).
    pub fn chain(&mut self, instrs: impl IntoIterator<Item = Instr>) -> Option<BlockId> {
        let mut entry = None;
        let mut prev: Option<BlockId> = None;
        for instr in instrs {
            let id = self.block(instr);
            match prev {
                Some(p) => self.link(p, id),
                None => entry = Some(id),
            }
            prev = Some(id);
        }
        entry
    }

    /// Link every open exit reachable from `entry` to `epilogue`.
    ///
    /// An open exit is a block with no successors whose instruction does
    /// not already terminate control flow. Used to give void bodies an
    /// implicit return and test bodies an implicit passing result.
    pub fn link_exits(&mut self, entry: BlockId, epilogue: BlockId) {
        let mut seen = FxHashSet::default();
        let mut stack = vec![entry];
        let mut open = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let data = &self.blocks[id.0 as usize];
            if data.successors.is_empty() && !data.payload.is_terminal() {
                open.push(id);
            }
            stack.extend_from_slice(&data.successors);
        }
        for id in open {
            self.link(id, epilogue);
        }
    }
}
