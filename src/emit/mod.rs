//! Class emission
//!
//! Drives a [`ClassDescriptor`]'s callables through the lowering
//! pipeline (linearize, peephole, frame sizing) and collects the results
//! into a [`ClassArtifact`]. Any pipeline error aborts the whole class so
//! no partial artifact escapes.

mod harness;

pub use harness::{elapsed_millis, format_millis, synthesize_main};

use tracing::{debug, info};

use crate::bytecode::{compute_frame, linearize, Instr, Peephole};
use crate::classfile::{
    AccessFlags, CallableUnit, ClassArtifact, ClassBuilder, ConstPool, Constant,
};
use crate::error::Result;
use crate::ir::BlockArena;
use crate::signature::{CallableKind, ClassDescriptor, Signature};
use crate::types::Type;

/// Emits class artifacts from descriptors.
pub struct ClassEmitter {
    peephole: Peephole,
}

impl ClassEmitter {
    /// Create an emitter with default optimization settings
    pub fn new() -> Self {
        Self {
            peephole: Peephole::new(),
        }
    }

    /// Emit the ordinary class: fields, constructors and methods.
    pub fn emit_class(
        &self,
        arena: &mut BlockArena,
        desc: &ClassDescriptor,
    ) -> Result<ClassArtifact> {
        info!(class = %desc.name, "emitting class");
        let mut builder = ClassBuilder::new(desc.name.clone()).with_pool(desc.pool().clone());
        if let Some(superclass) = &desc.superclass {
            builder = builder.superclass(superclass.clone());
        }

        for field in &desc.fields {
            builder.add_field(field.name.clone(), field.ty.clone(), AccessFlags::PRIVATE);
        }
        for sig in desc.constructors.iter().chain(&desc.methods) {
            let unit = self.emit_unit(arena, sig, builder.pool_mut())?;
            builder.add_unit(unit);
        }
        Ok(builder.finish())
    }

    /// Emit the companion test class `<Class>Test`.
    ///
    /// It holds the class's fixtures and tests as callable units plus a
    /// synthesized `main` that runs every test and prints the report.
    /// The test class extends the same superclass as the class under
    /// test.
    pub fn emit_test_class(
        &self,
        arena: &mut BlockArena,
        desc: &ClassDescriptor,
    ) -> Result<ClassArtifact> {
        let test_class = format!("{}Test", desc.name);
        info!(class = %test_class, tests = desc.tests.len(), "emitting test class");
        let mut builder = ClassBuilder::new(test_class).with_pool(desc.pool().clone());
        if let Some(superclass) = &desc.superclass {
            builder = builder.superclass(superclass.clone());
        }

        for sig in desc.fixtures.iter().chain(&desc.tests) {
            let unit = self.emit_unit(arena, sig, builder.pool_mut())?;
            builder.add_unit(unit);
        }
        harness::synthesize_main(desc, &mut builder)?;
        Ok(builder.finish())
    }

    /// Lower one callable body into a finished unit.
    fn emit_unit(
        &self,
        arena: &mut BlockArena,
        sig: &Signature,
        pool: &mut ConstPool,
    ) -> Result<CallableUnit> {
        debug!(class = %sig.class, unit = %sig.name, "lowering callable body");
        self.close_body(arena, sig, pool);

        let mut seq = linearize(arena, sig.entry)?;
        self.peephole.optimize(&mut seq)?;
        seq.validate_targets()?;

        let frame = compute_frame(&seq, sig.params.len(), pool)?;
        let (code, points) = seq.into_parts();
        Ok(CallableUnit {
            name: sig.name.clone(),
            access: AccessFlags::PUBLIC | AccessFlags::STATIC,
            params: sig.params.clone(),
            ret: sig.ret.clone(),
            max_stack: frame.max_stack,
            max_locals: frame.max_locals,
            code,
            points,
        })
    }

    /// Close every open exit of the body so control never falls off the
    /// end: void bodies get an implicit return, tests an implicit
    /// passing (empty-string) result.
    fn close_body(&self, arena: &mut BlockArena, sig: &Signature, pool: &mut ConstPool) {
        match sig.kind {
            CallableKind::Test => {
                let empty = pool.add(Constant::str(""));
                let push = arena.block(Instr::Const(empty));
                let ret = arena.block(Instr::Return);
                arena.link(push, ret);
                arena.link_exits(sig.entry, push);
            }
            _ if sig.ret == Type::Void => {
                let epilogue = arena.block(Instr::ReturnVoid);
                arena.link_exits(sig.entry, epilogue);
            }
            // a non-void body must end in explicit returns already;
            // frame sizing rejects it otherwise
            _ => {}
        }
    }
}

impl Default for ClassEmitter {
    fn default() -> Self {
        Self::new()
    }
}
