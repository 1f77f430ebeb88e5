//! Flat instruction sequences with stable program points

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::Instr;
use crate::error::{Error, Result};

/// A stable reference to a position in a [`CodeSeq`].
///
/// Program points stay valid as instructions are inserted or removed
/// around them; they are the only form of jump target until the external
/// writer encodes the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointId(u32);

impl PointId {
    /// Sentinel for branch targets not yet patched; never allocated by a
    /// sequence.
    pub(crate) const PLACEHOLDER: PointId = PointId(u32::MAX);
}

/// An ordered instruction list, each entry addressed by a [`PointId`].
#[derive(Debug, Clone, Default)]
pub struct CodeSeq {
    entries: Vec<(PointId, Instr)>,
    positions: FxHashMap<PointId, usize>,
    next_point: u32,
}

impl CodeSeq {
    /// Create an empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_point(&mut self) -> PointId {
        let point = PointId(self.next_point);
        self.next_point += 1;
        point
    }

    /// Append an instruction at the end, returning its program point
    pub fn append(&mut self, instr: Instr) -> PointId {
        let point = self.fresh_point();
        self.positions.insert(point, self.entries.len());
        self.entries.push((point, instr));
        point
    }

    /// Insert an instruction immediately after the entry at `after`,
    /// returning the new instruction's program point.
    pub fn insert_after(&mut self, after: PointId, instr: Instr) -> Result<PointId> {
        let pos = self
            .positions
            .get(&after)
            .copied()
            .ok_or(Error::DanglingJump { target: after })?;
        let point = self.fresh_point();
        self.entries.insert(pos + 1, (point, instr));
        self.reindex_from(pos + 1);
        Ok(point)
    }

    /// Remove the entry at `pos`, invalidating its program point
    pub fn remove_at(&mut self, pos: usize) -> (PointId, Instr) {
        let (point, instr) = self.entries.remove(pos);
        self.positions.remove(&point);
        self.reindex_from(pos);
        (point, instr)
    }

    fn reindex_from(&mut self, pos: usize) {
        for (i, (point, _)) in self.entries.iter().enumerate().skip(pos) {
            self.positions.insert(*point, i);
        }
    }

    /// Position of a program point, if it still exists
    pub fn index_of(&self, point: PointId) -> Option<usize> {
        self.positions.get(&point).copied()
    }

    /// Program point of the entry at `pos`
    pub fn point_at(&self, pos: usize) -> Option<PointId> {
        self.entries.get(pos).map(|(point, _)| *point)
    }

    /// Instruction at `pos`
    pub fn instr_at(&self, pos: usize) -> Option<&Instr> {
        self.entries.get(pos).map(|(_, instr)| instr)
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the sequence holds no instructions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(point, instruction)` entries in order
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &Instr)> {
        self.entries.iter().map(|(point, instr)| (*point, instr))
    }

    /// Rewrite the targets of the jump at `at`
    pub fn patch_jump(&mut self, at: PointId, target: PointId) -> Result<()> {
        let pos = self
            .index_of(at)
            .ok_or(Error::DanglingJump { target: at })?;
        match &mut self.entries[pos].1 {
            Instr::Jump(t) => {
                *t = target;
                Ok(())
            }
            other => Err(Error::internal(format!(
                "patch_jump on non-jump instruction {:?}",
                other
            ))),
        }
    }

    /// Rewrite both targets of the branch at `at`
    pub fn patch_branch(&mut self, at: PointId, taken: PointId, not_taken: PointId) -> Result<()> {
        let pos = self
            .index_of(at)
            .ok_or(Error::DanglingJump { target: at })?;
        match &mut self.entries[pos].1 {
            Instr::Branch(_, t, nt) => {
                *t = taken;
                *nt = not_taken;
                Ok(())
            }
            other => Err(Error::internal(format!(
                "patch_branch on non-branch instruction {:?}",
                other
            ))),
        }
    }

    /// Apply `f` to every jump/branch target in the sequence
    pub fn map_targets(&mut self, mut f: impl FnMut(PointId) -> Result<PointId>) -> Result<()> {
        for (_, instr) in self.entries.iter_mut() {
            match instr {
                Instr::Jump(t) => *t = f(*t)?,
                Instr::Branch(_, t, nt) => {
                    *t = f(*t)?;
                    *nt = f(*nt)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check that every jump/branch target resolves to a live entry
    pub fn validate_targets(&self) -> Result<()> {
        for (_, instr) in &self.entries {
            let (first, second) = match instr {
                Instr::Jump(t) => (Some(*t), None),
                Instr::Branch(_, t, nt) => (Some(*t), Some(*nt)),
                _ => (None, None),
            };
            for target in [first, second].into_iter().flatten() {
                if self.index_of(target).is_none() {
                    return Err(Error::DanglingJump { target });
                }
            }
        }
        Ok(())
    }

    /// Split into the instruction vector and the parallel point vector,
    /// consuming the sequence. Used when freezing a callable unit.
    pub fn into_parts(self) -> (Vec<Instr>, Vec<PointId>) {
        let mut code = Vec::with_capacity(self.entries.len());
        let mut points = Vec::with_capacity(self.entries.len());
        for (point, instr) in self.entries {
            code.push(instr);
            points.push(point);
        }
        (code, points)
    }
}
