//! Shared test support: a small reference interpreter for emitted
//! artifacts.
//!
//! `MiniVm` executes callable units directly from `ClassArtifact`s so
//! integration tests can check observable behavior (report bytes, test
//! outcomes) rather than instruction listings. The clock is
//! deterministic: every `Now` advances it by exactly one millisecond,
//! which pins the timing fields of the report.

use rustc_hash::FxHashMap;

use tabbyc::bytecode::{BranchCond, Instr};
use tabbyc::classfile::{CallableUnit, ClassArtifact, Constant};
use tabbyc::types::Type;

const NS_PER_TICK: i64 = 1_000_000;

/// Install a subscriber honoring `RUST_LOG` so failing tests can be
/// re-run with emission tracing on
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Int(i64),
    Float(f32),
    Str(String),
    Obj(usize),
}

impl Val {
    fn as_int(&self) -> i64 {
        match self {
            Val::Int(n) => *n,
            other => panic!("expected int, got {:?}", other),
        }
    }

    fn as_float(&self) -> f32 {
        match self {
            Val::Float(x) => *x,
            other => panic!("expected float, got {:?}", other),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Val::Str(s) => s,
            other => panic!("expected string, got {:?}", other),
        }
    }

    fn as_obj(&self) -> usize {
        match self {
            Val::Obj(id) => *id,
            other => panic!("expected object, got {:?}", other),
        }
    }
}

/// Reference interpreter over one or more class artifacts.
pub struct MiniVm {
    artifacts: Vec<ClassArtifact>,
    objects: Vec<FxHashMap<String, Val>>,
    clock: i64,
    /// Everything written by `Output`, in order
    pub output: String,
}

impl MiniVm {
    pub fn new(artifacts: Vec<ClassArtifact>) -> Self {
        Self {
            artifacts,
            objects: Vec::new(),
            clock: 0,
            output: String::new(),
        }
    }

    /// Run a unit by class and name. `args` must match the unit's
    /// parameter list, receiver included where there is one.
    pub fn run(&mut self, class: &str, unit: &str, args: Vec<Val>) -> Option<Val> {
        let (unit, pool) = self.lookup(class, unit);
        self.exec(&unit, &pool, args)
    }

    fn lookup(&self, class: &str, name: &str) -> (CallableUnit, tabbyc::classfile::ConstPool) {
        let artifact = self
            .artifacts
            .iter()
            .find(|a| a.name == class)
            .unwrap_or_else(|| panic!("no artifact for class {}", class));
        let unit = artifact
            .unit(name)
            .unwrap_or_else(|| panic!("no unit {}.{}", class, name));
        (unit.clone(), artifact.pool.clone())
    }

    fn exec(
        &mut self,
        unit: &CallableUnit,
        pool: &tabbyc::classfile::ConstPool,
        args: Vec<Val>,
    ) -> Option<Val> {
        assert_eq!(args.len(), unit.params.len(), "arity mismatch in {}", unit.name);
        let mut locals: Vec<Option<Val>> = vec![None; unit.max_locals.max(8) as usize];
        for (slot, arg) in args.into_iter().enumerate() {
            locals[slot] = Some(arg);
        }
        let mut stack: Vec<Val> = Vec::new();
        let mut pc = 0usize;

        loop {
            let instr = &unit.code[pc];
            pc += 1;
            match instr {
                Instr::Nop => {}
                Instr::Pop => {
                    stack.pop().expect("pop on empty stack");
                }
                Instr::Dup => {
                    let top = stack.last().expect("dup on empty stack").clone();
                    stack.push(top);
                }
                Instr::Swap => {
                    let n = stack.len();
                    stack.swap(n - 1, n - 2);
                }
                Instr::Const(idx) => {
                    let val = match pool.get(*idx).expect("constant index in range") {
                        Constant::Int(n) => Val::Int(*n),
                        Constant::Float(x) => Val::Float(*x),
                        Constant::Str(s) => Val::Str(s.clone()),
                        other => panic!("cannot push constant {:?}", other),
                    };
                    stack.push(val);
                }
                Instr::Zero => stack.push(Val::Int(0)),
                Instr::Load(slot) => {
                    let val = locals[*slot as usize]
                        .clone()
                        .unwrap_or_else(|| panic!("load of unset slot {}", slot));
                    stack.push(val);
                }
                Instr::Store(slot) => {
                    let val = stack.pop().expect("store on empty stack");
                    locals[*slot as usize] = Some(val);
                }
                Instr::Inc(slot) => {
                    let n = locals[*slot as usize]
                        .as_ref()
                        .map(Val::as_int)
                        .unwrap_or_else(|| panic!("inc of unset slot {}", slot));
                    locals[*slot as usize] = Some(Val::Int(n + 1));
                }
                Instr::New(_) => {
                    let id = self.objects.len();
                    self.objects.push(FxHashMap::default());
                    stack.push(Val::Obj(id));
                }
                Instr::GetField(idx) => {
                    let field = match pool.get(*idx) {
                        Some(Constant::FieldRef(f)) => f,
                        other => panic!("GetField through {:?}", other),
                    };
                    let obj = stack.pop().expect("receiver").as_obj();
                    let val = self.objects[obj]
                        .get(&field.name)
                        .cloned()
                        .unwrap_or_else(|| default_value(&field.ty));
                    stack.push(val);
                }
                Instr::PutField(idx) => {
                    let field = match pool.get(*idx) {
                        Some(Constant::FieldRef(f)) => f.clone(),
                        other => panic!("PutField through {:?}", other),
                    };
                    let val = stack.pop().expect("value");
                    let obj = stack.pop().expect("receiver").as_obj();
                    self.objects[obj].insert(field.name, val);
                }
                Instr::CallStatic(idx) | Instr::CallCtor(idx) => {
                    let mref = match pool.get(*idx) {
                        Some(Constant::MethodRef(m)) => m.clone(),
                        other => panic!("call through {:?}", other),
                    };
                    let mut call_args = Vec::with_capacity(mref.params.len());
                    for _ in 0..mref.params.len() {
                        call_args.push(stack.pop().expect("call argument"));
                    }
                    call_args.reverse();
                    let result = self.run(&mref.class, &mref.name, call_args);
                    if mref.ret != Type::Void {
                        stack.push(result.expect("non-void call returned nothing"));
                    }
                }
                Instr::StrLen => {
                    let len = stack.pop().expect("string").as_str().len() as i64;
                    stack.push(Val::Int(len));
                }
                Instr::Concat => {
                    let b = stack.pop().expect("rhs");
                    let a = stack.pop().expect("lhs");
                    stack.push(Val::Str(format!("{}{}", a.as_str(), b.as_str())));
                }
                Instr::ConcatInt => {
                    let n = stack.pop().expect("int").as_int();
                    let s = stack.pop().expect("string");
                    stack.push(Val::Str(format!("{}{}", s.as_str(), n)));
                }
                Instr::ConcatFloat => {
                    let x = stack.pop().expect("float").as_float();
                    let s = stack.pop().expect("string");
                    stack.push(Val::Str(format!("{}{:.2}", s.as_str(), x)));
                }
                Instr::Output => {
                    let s = stack.pop().expect("string");
                    self.output.push_str(s.as_str());
                }
                Instr::Add => {
                    let b = stack.pop().expect("rhs").as_int();
                    let a = stack.pop().expect("lhs").as_int();
                    stack.push(Val::Int(a + b));
                }
                Instr::Sub => {
                    let b = stack.pop().expect("rhs").as_int();
                    let a = stack.pop().expect("lhs").as_int();
                    stack.push(Val::Int(a - b));
                }
                Instr::Mul => {
                    let b = stack.pop().expect("rhs").as_int();
                    let a = stack.pop().expect("lhs").as_int();
                    stack.push(Val::Int(a * b));
                }
                Instr::Neg => {
                    let a = stack.pop().expect("operand").as_int();
                    stack.push(Val::Int(-a));
                }
                Instr::Not => {
                    let a = stack.pop().expect("operand").as_int();
                    stack.push(Val::Int(if a == 0 { 1 } else { 0 }));
                }
                Instr::IntToFloat => {
                    let a = stack.pop().expect("operand").as_int();
                    stack.push(Val::Float(a as f32));
                }
                Instr::FloatToInt => {
                    let a = stack.pop().expect("operand").as_float();
                    stack.push(Val::Int(a as i64));
                }
                Instr::DivFloat => {
                    let b = stack.pop().expect("rhs").as_float();
                    let a = stack.pop().expect("lhs").as_float();
                    stack.push(Val::Float(a / b));
                }
                Instr::Now => {
                    self.clock += NS_PER_TICK;
                    stack.push(Val::Int(self.clock));
                }
                Instr::Jump(target) => {
                    pc = unit
                        .target_index(*target)
                        .unwrap_or_else(|| panic!("jump target {:?} not in unit", target));
                }
                Instr::Branch(cond, taken, not_taken) => {
                    let hit = match cond {
                        BranchCond::EqZero => stack.pop().expect("operand").as_int() == 0,
                        BranchCond::NeZero => stack.pop().expect("operand").as_int() != 0,
                        _ => {
                            let b = stack.pop().expect("rhs").as_int();
                            let a = stack.pop().expect("lhs").as_int();
                            match cond {
                                BranchCond::Lt => a < b,
                                BranchCond::Le => a <= b,
                                BranchCond::Gt => a > b,
                                BranchCond::Ge => a >= b,
                                BranchCond::Eq => a == b,
                                BranchCond::Ne => a != b,
                                _ => unreachable!(),
                            }
                        }
                    };
                    let target = if hit { taken } else { not_taken };
                    pc = unit
                        .target_index(*target)
                        .unwrap_or_else(|| panic!("branch target {:?} not in unit", target));
                }
                Instr::Return => return Some(stack.pop().expect("return value")),
                Instr::ReturnVoid => return None,
            }
        }
    }
}

fn default_value(ty: &Type) -> Val {
    match ty {
        Type::Int => Val::Int(0),
        Type::Float => Val::Float(0.0),
        Type::Str => Val::Str(String::new()),
        other => panic!("field of type {:?} read before initialization", other),
    }
}
