//! Synthesized test entry point
//!
//! Builds the `main` unit of a test class by direct instruction
//! construction: no source exists for it, so no block graph is built
//! either. The emitted program prints a banner, runs every test in
//! declaration order (fresh receiver, fixtures, timed call, one report
//! line) and closes with a summary. The report format is a contract:
//!
//! ```text
//! Test execution for class Calc:
//!   - works: passed [0.52ms]
//!   - broken: failed [0.11ms] at 7:9
//!
//! 1 test passed, 1 failed [0.78ms]
//! ```
//!
//! (Lines carry trailing spaces not visible above; the exact bytes are
//! pinned by tests.)

use tracing::debug;

use crate::bytecode::{compute_frame, BranchCond, CodeSeq, Instr, PointId};
use crate::classfile::{
    AccessFlags, CallableUnit, ClassBuilder, ConstIdx, ConstPool, Constant, MethodRef,
};
use crate::error::Result;
use crate::signature::ClassDescriptor;
use crate::types::Type;

// Local slot assignments of the synthesized main
const RECEIVER: u8 = 0;
const RUN_START: u8 = 1;
const TEST_START: u8 = 2;
const FAILED: u8 = 3;
const PASSED: u8 = 4;

/// Append the synthesized `main` unit to `builder`.
///
/// `builder` must be the test class of `desc` (its pool already holds
/// the constants of the fixture and test bodies).
pub fn synthesize_main(desc: &ClassDescriptor, builder: &mut ClassBuilder) -> Result<()> {
    let test_class = builder.name().to_owned();
    let pool = builder.pool_mut();
    let mut seq = CodeSeq::new();

    // ---- prologue: clock, banner, counters
    seq.append(Instr::Now);
    seq.append(Instr::Store(RUN_START));
    let banner = pool.add(Constant::Str(format!(
        "Test execution for class {}:\n",
        desc.name
    )));
    seq.append(Instr::Const(banner));
    seq.append(Instr::Output);
    seq.append(Instr::Zero);
    seq.append(Instr::Store(PASSED));
    seq.append(Instr::Zero);
    seq.append(Instr::Store(FAILED));

    let class_ref = pool.add(Constant::ClassRef(desc.name.clone()));
    let ctor_ref = pool.add(Constant::MethodRef(MethodRef {
        class: desc.name.clone(),
        name: "<init>".to_owned(),
        params: vec![Type::class(desc.name.clone())],
        ret: Type::Void,
    }));
    let fixture_refs: Vec<ConstIdx> = desc
        .fixtures
        .iter()
        .map(|f| {
            pool.add(Constant::MethodRef(MethodRef {
                class: test_class.clone(),
                name: f.name.clone(),
                params: f.params.clone(),
                ret: Type::Void,
            }))
        })
        .collect();

    // ---- one run-and-report sequence per test, in declaration order
    for test in &desc.tests {
        let test_ref = pool.add(Constant::MethodRef(MethodRef {
            class: test_class.clone(),
            name: test.name.clone(),
            params: test.params.clone(),
            ret: Type::Str,
        }));

        // fresh receiver, constructed and prepared by every fixture
        seq.append(Instr::New(class_ref));
        seq.append(Instr::Store(RECEIVER));
        seq.append(Instr::Load(RECEIVER));
        seq.append(Instr::CallCtor(ctor_ref));
        for fixture_ref in &fixture_refs {
            seq.append(Instr::Load(RECEIVER));
            seq.append(Instr::CallStatic(*fixture_ref));
        }

        // timed call; the result string stays on the stack
        seq.append(Instr::Now);
        seq.append(Instr::Store(TEST_START));
        seq.append(Instr::Load(RECEIVER));
        seq.append(Instr::CallStatic(test_ref));

        // empty result means the test passed
        seq.append(Instr::Dup);
        seq.append(Instr::StrLen);
        let branch = seq.append(Instr::Branch(
            BranchCond::EqZero,
            PointId::PLACEHOLDER,
            PointId::PLACEHOLDER,
        ));

        // fail arm falls through right after the branch
        let fail_first = emit_report_line(&mut seq, pool, FAILED, &test.name, "failed");
        let skip = seq.append(Instr::Jump(PointId::PLACEHOLDER));
        let pass_first = emit_report_line(&mut seq, pool, PASSED, &test.name, "passed");
        let join = seq.append(Instr::Output);
        seq.patch_branch(branch, pass_first, fail_first)?;
        seq.patch_jump(skip, join)?;
    }

    // ---- summary line
    let lead = pool.add(Constant::str(" \n"));
    seq.append(Instr::Const(lead));
    seq.append(Instr::Load(PASSED));
    seq.append(Instr::ConcatInt);
    let passed_label = pool.add(Constant::str(" test passed, "));
    seq.append(Instr::Const(passed_label));
    seq.append(Instr::Concat);
    seq.append(Instr::Load(FAILED));
    seq.append(Instr::ConcatInt);
    let failed_label = pool.add(Constant::str(" failed "));
    seq.append(Instr::Const(failed_label));
    seq.append(Instr::Concat);
    emit_elapsed(&mut seq, pool, RUN_START);
    seq.append(Instr::Concat);
    let newline = pool.add(Constant::str("\n"));
    seq.append(Instr::Const(newline));
    seq.append(Instr::Concat);
    seq.append(Instr::Output);
    seq.append(Instr::ReturnVoid);

    debug!(
        class = %test_class,
        tests = desc.tests.len(),
        instructions = seq.len(),
        "synthesized test entry point"
    );

    seq.validate_targets()?;
    let frame = compute_frame(&seq, 0, pool)?;
    let (code, points) = seq.into_parts();
    builder.add_unit(CallableUnit {
        name: "main".to_owned(),
        access: AccessFlags::PUBLIC | AccessFlags::STATIC,
        params: Vec::new(),
        ret: Type::Void,
        max_stack: frame.max_stack,
        max_locals: frame.max_locals,
        code,
        points,
    });
    Ok(())
}

/// Emit one report-line arm. On entry the stack holds the test's result
/// string; on exit it holds the full line, newline included.
///
/// Returns the program point of the arm's first instruction.
fn emit_report_line(
    seq: &mut CodeSeq,
    pool: &mut ConstPool,
    counter: u8,
    test_name: &str,
    verdict: &str,
) -> PointId {
    let first = seq.append(Instr::Inc(counter));
    let label = pool.add(Constant::Str(format!("  - {}: {} ", test_name, verdict)));
    seq.append(Instr::Const(label));
    emit_elapsed(seq, pool, TEST_START);
    // label + time, then append the result string under them
    seq.append(Instr::Concat);
    seq.append(Instr::Swap);
    seq.append(Instr::Concat);
    let newline = pool.add(Constant::str("\n"));
    seq.append(Instr::Const(newline));
    seq.append(Instr::Concat);
    first
}

/// Emit instructions pushing the string `"[<ms>ms] "` where `<ms>` is
/// the time since the clock reading stored in local `from`, in
/// milliseconds with exactly two decimals.
///
/// The rounding is truncation: nanoseconds are divided down to
/// hundredths of a millisecond, truncated to an integer, and scaled
/// back. [`elapsed_millis`] is the scalar version of this sequence.
fn emit_elapsed(seq: &mut CodeSeq, pool: &mut ConstPool, from: u8) {
    let open = pool.add(Constant::str("["));
    seq.append(Instr::Const(open));
    seq.append(Instr::Now);
    seq.append(Instr::Load(from));
    seq.append(Instr::Sub);
    seq.append(Instr::IntToFloat);
    let ten_thousand = pool.add(Constant::Int(10_000));
    seq.append(Instr::Const(ten_thousand));
    seq.append(Instr::IntToFloat);
    seq.append(Instr::DivFloat);
    seq.append(Instr::FloatToInt);
    seq.append(Instr::IntToFloat);
    let hundred = pool.add(Constant::Int(100));
    seq.append(Instr::Const(hundred));
    seq.append(Instr::IntToFloat);
    seq.append(Instr::DivFloat);
    seq.append(Instr::ConcatFloat);
    let close = pool.add(Constant::str("ms] "));
    seq.append(Instr::Const(close));
    seq.append(Instr::Concat);
}

/// Milliseconds with two-decimal truncation, as computed by the emitted
/// timing sequence.
pub fn elapsed_millis(delta_ns: i64) -> f32 {
    let hundredths = (delta_ns as f32 / 10_000.0) as i64;
    hundredths as f32 / 100.0
}

/// Render a millisecond value the way `ConcatFloat` does
pub fn format_millis(ms: f32) -> String {
    format!("{:.2}", ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_millis_truncates() {
        assert_eq!(elapsed_millis(1_000_000), 1.0);
        assert_eq!(elapsed_millis(1_239_999), 1.23);
        assert_eq!(elapsed_millis(0), 0.0);
    }

    #[test]
    fn test_format_millis_two_decimals() {
        assert_eq!(format_millis(0.0), "0.00");
        assert_eq!(format_millis(1.0), "1.00");
        assert_eq!(format_millis(5.25), "5.25");
    }

    #[test]
    fn test_main_structure_per_test() {
        use crate::ir::BlockArena;

        let mut arena = BlockArena::new();
        let mut desc = ClassDescriptor::new("Calc");
        let f = arena.block(Instr::ReturnVoid);
        desc.add_fixture(f);
        let t1 = arena.block(Instr::Nop);
        desc.add_test("first", t1);
        let t2 = arena.block(Instr::Nop);
        desc.add_test("second", t2);

        let mut builder = ClassBuilder::new("CalcTest").with_pool(desc.pool().clone());
        synthesize_main(&desc, &mut builder).unwrap();
        let artifact = builder.finish();
        let main = artifact.unit("main").unwrap();

        // one allocation and one constructor call per test
        let news = main.code.iter().filter(|i| matches!(i, Instr::New(_))).count();
        assert_eq!(news, 2);
        let ctor_calls = main
            .code
            .iter()
            .filter(|i| matches!(i, Instr::CallCtor(_)))
            .count();
        assert_eq!(ctor_calls, 2);
        // fixtures run before each test: 1 fixture x 2 tests, plus the
        // two test calls themselves
        let static_calls = main
            .code
            .iter()
            .filter(|i| matches!(i, Instr::CallStatic(_)))
            .count();
        assert_eq!(static_calls, 4);
        assert_eq!(main.code.last(), Some(&Instr::ReturnVoid));
    }

    #[test]
    fn test_main_for_testless_class_still_reports() {
        let desc = ClassDescriptor::new("Empty");
        let mut builder = ClassBuilder::new("EmptyTest");
        synthesize_main(&desc, &mut builder).unwrap();
        let artifact = builder.finish();
        let main = artifact.unit("main").unwrap();
        // banner, summary, no per-test machinery
        assert!(main.code.iter().all(|i| !matches!(i, Instr::New(_))));
        assert!(artifact
            .pool
            .iter()
            .any(|c| *c == Constant::str("Test execution for class Empty:\n")));
    }

    #[test]
    fn test_shared_constants_interned_once() {
        use crate::ir::BlockArena;

        let mut arena = BlockArena::new();
        let mut desc = ClassDescriptor::new("Calc");
        for name in ["a", "b", "c"] {
            let t = arena.block(Instr::Nop);
            desc.add_test(name, t);
        }
        let mut builder = ClassBuilder::new("CalcTest");
        synthesize_main(&desc, &mut builder).unwrap();
        let artifact = builder.finish();
        let brackets = artifact
            .pool
            .iter()
            .filter(|c| **c == Constant::str("["))
            .count();
        assert_eq!(brackets, 1);
        let tens = artifact
            .pool
            .iter()
            .filter(|c| **c == Constant::Int(10_000))
            .count();
        assert_eq!(tens, 1);
    }
}
