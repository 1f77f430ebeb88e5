//! Operand stack and local frame sizing
//!
//! A worklist walk over the final instruction sequence computes the
//! maximum operand stack depth and the highest local slot touched. Every
//! join point must be reached with one consistent depth; a mismatch or an
//! underflow is a fatal lowering bug, not a user error.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::classfile::{ConstPool, Constant};
use crate::error::{Error, Result};
use crate::types::Type;

use super::{CodeSeq, Instr};

/// Frame requirements of one callable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Maximum operand stack depth over all reachable paths
    pub max_stack: u16,
    /// Number of local slots, parameters included
    pub max_locals: u16,
}

/// Compute the frame requirements of `seq`.
///
/// `param_count` reserves local slots 0..param_count for parameters (the
/// receiver, when present, is slot 0). Call instructions consult `pool`
/// for their pop/push counts.
pub fn compute(seq: &CodeSeq, param_count: usize, pool: &ConstPool) -> Result<FrameInfo> {
    let mut depth_at: FxHashMap<usize, u32> = FxHashMap::default();
    let mut worklist: Vec<(usize, u32)> = vec![(0, 0)];
    let mut max_stack: u32 = 0;
    let mut max_local: usize = 0;

    while let Some((mut index, mut depth)) = worklist.pop() {
        loop {
            if index >= seq.len() {
                return Err(Error::internal(format!(
                    "control falls off the end of a {}-instruction sequence",
                    seq.len()
                )));
            }
            match depth_at.get(&index) {
                Some(&seen) if seen == depth => break,
                Some(&seen) => {
                    return Err(Error::StackMismatch {
                        offset: index,
                        expected: seen,
                        found: depth,
                    });
                }
                None => {
                    depth_at.insert(index, depth);
                }
            }

            let instr = seq
                .instr_at(index)
                .ok_or_else(|| Error::internal("sequence index out of bounds"))?;
            let (pops, pushes) = effect(instr, pool)?;
            if depth < pops {
                return Err(Error::StackUnderflow { offset: index });
            }
            depth = depth - pops + pushes;
            max_stack = max_stack.max(depth);
            if let Some(slot) = instr.local_slot() {
                max_local = max_local.max(slot as usize + 1);
            }
            trace!(index, ?instr, depth, "frame step");

            match instr {
                Instr::Return | Instr::ReturnVoid => break,
                Instr::Jump(target) => {
                    index = seq
                        .index_of(*target)
                        .ok_or(Error::DanglingJump { target: *target })?;
                }
                Instr::Branch(_, taken, not_taken) => {
                    let taken_idx = seq
                        .index_of(*taken)
                        .ok_or(Error::DanglingJump { target: *taken })?;
                    worklist.push((taken_idx, depth));
                    index = seq
                        .index_of(*not_taken)
                        .ok_or(Error::DanglingJump { target: *not_taken })?;
                }
                _ => index += 1,
            }
        }
    }

    Ok(FrameInfo {
        max_stack: max_stack as u16,
        max_locals: max_local.max(param_count) as u16,
    })
}

/// `(pops, pushes)` of one instruction
fn effect(instr: &Instr, pool: &ConstPool) -> Result<(u32, u32)> {
    Ok(match instr {
        Instr::Nop | Instr::Inc(_) => (0, 0),
        Instr::Pop | Instr::Output => (1, 0),
        Instr::Dup => (1, 2),
        Instr::Swap => (2, 2),
        Instr::Const(_) | Instr::Zero | Instr::Load(_) | Instr::New(_) | Instr::Now => (0, 1),
        Instr::Store(_) => (1, 0),
        Instr::GetField(_)
        | Instr::StrLen
        | Instr::IntToFloat
        | Instr::FloatToInt
        | Instr::Neg
        | Instr::Not => (1, 1),
        Instr::PutField(_) => (2, 0),
        Instr::Add
        | Instr::Sub
        | Instr::Mul
        | Instr::DivFloat
        | Instr::Concat
        | Instr::ConcatInt
        | Instr::ConcatFloat => (2, 1),
        Instr::CallStatic(idx) | Instr::CallCtor(idx) => match pool.get(*idx) {
            Some(Constant::MethodRef(m)) => {
                let pushes = if m.ret == Type::Void { 0 } else { 1 };
                (m.params.len() as u32, pushes)
            }
            other => {
                return Err(Error::internal(format!(
                    "call through non-method constant {:?}",
                    other
                )));
            }
        },
        Instr::Jump(_) => (0, 0),
        Instr::Branch(cond, _, _) => (cond.pops() as u32, 0),
        Instr::Return => (1, 0),
        Instr::ReturnVoid => (0, 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{BranchCond, PointId};
    use crate::classfile::MethodRef;

    fn empty_pool() -> ConstPool {
        ConstPool::new()
    }

    #[test]
    fn test_straight_line_depths() {
        let mut seq = CodeSeq::new();
        seq.append(Instr::Zero);
        seq.append(Instr::Zero);
        seq.append(Instr::Add);
        seq.append(Instr::Return);
        let info = compute(&seq, 1, &empty_pool()).unwrap();
        assert_eq!(info.max_stack, 2);
        assert_eq!(info.max_locals, 1);
    }

    #[test]
    fn test_branch_arms_join_consistently() {
        let mut seq = CodeSeq::new();
        seq.append(Instr::Zero);
        let branch = seq.append(Instr::Branch(
            BranchCond::EqZero,
            PointId::PLACEHOLDER,
            PointId::PLACEHOLDER,
        ));
        let no = seq.append(Instr::Zero);
        let jump = seq.append(Instr::Jump(PointId::PLACEHOLDER));
        let yes = seq.append(Instr::Zero);
        let end = seq.append(Instr::Return);
        seq.patch_branch(branch, yes, no).unwrap();
        seq.patch_jump(jump, end).unwrap();

        let info = compute(&seq, 0, &empty_pool()).unwrap();
        assert_eq!(info.max_stack, 1);
    }

    #[test]
    fn test_underflow_detected() {
        let mut seq = CodeSeq::new();
        seq.append(Instr::Pop);
        seq.append(Instr::ReturnVoid);
        assert!(matches!(
            compute(&seq, 0, &empty_pool()),
            Err(Error::StackUnderflow { offset: 0 })
        ));
    }

    #[test]
    fn test_inconsistent_join_detected() {
        let mut seq = CodeSeq::new();
        seq.append(Instr::Zero);
        let branch = seq.append(Instr::Branch(
            BranchCond::EqZero,
            PointId::PLACEHOLDER,
            PointId::PLACEHOLDER,
        ));
        // not-taken arm pushes an extra value before the join
        let no = seq.append(Instr::Zero);
        let yes = seq.append(Instr::Return);
        seq.patch_branch(branch, yes, no).unwrap();

        assert!(matches!(
            compute(&seq, 0, &empty_pool()),
            Err(Error::StackMismatch { .. })
        ));
    }

    #[test]
    fn test_falling_off_the_end_is_fatal() {
        let mut seq = CodeSeq::new();
        seq.append(Instr::Zero);
        seq.append(Instr::Pop);
        assert!(matches!(
            compute(&seq, 0, &empty_pool()),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_call_effect_uses_signature_arity() {
        let mut pool = ConstPool::new();
        let idx = pool.add(Constant::MethodRef(MethodRef {
            class: "Calc".into(),
            name: "run".into(),
            params: vec![Type::Class("Calc".into()), Type::Int],
            ret: Type::Str,
        }));
        let mut seq = CodeSeq::new();
        seq.append(Instr::New(0));
        seq.append(Instr::Zero);
        seq.append(Instr::CallStatic(idx));
        seq.append(Instr::Return);
        let info = compute(&seq, 0, &pool).unwrap();
        assert_eq!(info.max_stack, 2);
    }

    #[test]
    fn test_locals_cover_highest_slot() {
        let mut seq = CodeSeq::new();
        seq.append(Instr::Zero);
        seq.append(Instr::Store(5));
        seq.append(Instr::Inc(3));
        seq.append(Instr::ReturnVoid);
        let info = compute(&seq, 2, &empty_pool()).unwrap();
        assert_eq!(info.max_locals, 6);
    }
}
