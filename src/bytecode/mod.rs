//! Tabby-VM instruction set and block-graph lowering
//!
//! This module defines the instruction set targeted by the backend, the
//! flat instruction sequence with stable program points, the linearizer
//! that turns a block graph into such a sequence, the peephole pass that
//! cleans it, and the frame sizing that computes stack/local high-water
//! marks for a finished body.
//!
//! Jump instructions address [`PointId`] program points, never numeric
//! offsets; the external class-file writer resolves them during encoding.

mod frame;
mod linearize;
mod peephole;
mod seq;

pub use frame::{compute as compute_frame, FrameInfo};
pub use linearize::linearize;
pub use peephole::{Peephole, PeepholeConfig};
pub use seq::{CodeSeq, PointId};

use serde::{Deserialize, Serialize};

use crate::classfile::ConstIdx;

/// Condition of a two-way branch.
///
/// `EqZero`/`NeZero` pop one integer; the comparison conditions pop two.
/// Booleans are represented as integers 0/1, so "branch if true" is
/// `NeZero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchCond {
    /// Taken if the popped integer is zero
    EqZero,
    /// Taken if the popped integer is nonzero
    NeZero,
    /// Taken if a < b for popped integers (a pushed first)
    Lt,
    /// Taken if a <= b
    Le,
    /// Taken if a > b
    Gt,
    /// Taken if a >= b
    Ge,
    /// Taken if a == b
    Eq,
    /// Taken if a != b
    Ne,
}

impl BranchCond {
    /// Number of operands the condition pops
    pub fn pops(self) -> u16 {
        match self {
            BranchCond::EqZero | BranchCond::NeZero => 1,
            _ => 2,
        }
    }

    /// The condition with taken/not-taken meaning swapped
    pub fn negated(self) -> Self {
        match self {
            BranchCond::EqZero => BranchCond::NeZero,
            BranchCond::NeZero => BranchCond::EqZero,
            BranchCond::Lt => BranchCond::Ge,
            BranchCond::Le => BranchCond::Gt,
            BranchCond::Gt => BranchCond::Le,
            BranchCond::Ge => BranchCond::Lt,
            BranchCond::Eq => BranchCond::Ne,
            BranchCond::Ne => BranchCond::Eq,
        }
    }
}

/// A Tabby-VM instruction.
///
/// The set is a closed tagged union; branch-ness is a query
/// ([`Instr::is_branch`]), not a subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    // ========== Stack ==========
    /// No operation
    Nop,
    /// Pop the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Swap the top two values
    Swap,

    // ========== Constants ==========
    /// Push a constant-pool entry
    Const(ConstIdx),
    /// Push integer zero
    Zero,

    // ========== Locals ==========
    /// Push local slot
    Load(u8),
    /// Pop into local slot
    Store(u8),
    /// Increment the integer in a local slot by one
    Inc(u8),

    // ========== Objects ==========
    /// Allocate an instance of the referenced class
    New(ConstIdx),
    /// Pop receiver, push field value
    GetField(ConstIdx),
    /// Pop value and receiver, store into field
    PutField(ConstIdx),
    /// Invoke a callable unit; pops its parameters (receiver first),
    /// pushes its result unless void
    CallStatic(ConstIdx),
    /// Invoke a constructor on a freshly allocated receiver
    CallCtor(ConstIdx),

    // ========== Strings ==========
    /// Pop a string, push its length as an integer
    StrLen,
    /// Pop b then a, push a + b
    Concat,
    /// Pop an integer then a string, append the integer's text
    ConcatInt,
    /// Pop a float then a string, append the float's text
    ConcatFloat,
    /// Pop a string and write it to standard output
    Output,

    // ========== Arithmetic and conversions ==========
    /// Integer addition
    Add,
    /// Integer subtraction
    Sub,
    /// Integer multiplication
    Mul,
    /// Integer negation
    Neg,
    /// Boolean-as-integer negation (0 <-> 1)
    Not,
    /// Integer to float
    IntToFloat,
    /// Float to integer, truncating
    FloatToInt,
    /// Float division
    DivFloat,
    /// Push the current monotonic clock reading in nanoseconds
    Now,

    // ========== Control flow ==========
    /// Unconditional jump to a program point
    Jump(PointId),
    /// Conditional branch: taken target, then not-taken target
    Branch(BranchCond, PointId, PointId),
    /// Pop the top value and return it
    Return,
    /// Return with no value
    ReturnVoid,
}

impl Instr {
    /// True for conditional branches
    pub fn is_branch(&self) -> bool {
        matches!(self, Instr::Branch(..))
    }

    /// True for instructions after which control never falls through
    pub fn is_terminal(&self) -> bool {
        matches!(self, Instr::Return | Instr::ReturnVoid | Instr::Jump(_))
    }

    /// The local slot this instruction reads or writes, if any
    pub fn local_slot(&self) -> Option<u8> {
        match self {
            Instr::Load(slot) | Instr::Store(slot) | Instr::Inc(slot) => Some(*slot),
            _ => None,
        }
    }
}
