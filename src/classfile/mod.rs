//! In-memory class artifacts
//!
//! A [`ClassBuilder`] accumulates the constant pool, fields and callable
//! units of one class and freezes them into a [`ClassArtifact`], the
//! hand-off structure an external class-file writer encodes. Artifacts
//! are plain data; all lowering decisions happen before they are built.

mod pool;

pub use pool::{ConstIdx, ConstPool, Constant, FieldRef, MethodRef};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::bytecode::{Instr, PointId};
use crate::types::Type;

bitflags! {
    /// Access flags of a class, field or callable unit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AccessFlags: u16 {
        /// Publicly accessible
        const PUBLIC = 0x0001;
        /// Accessible only inside the defining class
        const PRIVATE = 0x0002;
        /// Static; every emitted callable unit carries this
        const STATIC = 0x0008;
        /// Not overridable / not reassignable
        const FINAL = 0x0010;
    }
}

/// A field of an emitted class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
    /// Access flags
    pub access: AccessFlags,
}

/// One finished callable unit: a method, constructor, fixture or test
/// lowered to a flat instruction sequence.
///
/// Every unit is emitted as a static callable; instance methods take
/// their receiver as the explicit first parameter. `points` runs
/// parallel to `code`, giving each instruction its stable program point
/// so jump targets can be resolved to offsets during encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableUnit {
    /// Unit name (`<init>` for constructors)
    pub name: String,
    /// Access flags; always includes [`AccessFlags::STATIC`]
    pub access: AccessFlags,
    /// Parameter types, receiver first where there is one
    pub params: Vec<Type>,
    /// Return type
    pub ret: Type,
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local slots, parameters included
    pub max_locals: u16,
    /// The instruction sequence
    pub code: Vec<Instr>,
    /// Program point of each instruction, parallel to `code`
    pub points: Vec<PointId>,
}

impl CallableUnit {
    /// Index of the instruction at program point `target`, if present
    pub fn target_index(&self, target: PointId) -> Option<usize> {
        self.points.iter().position(|p| *p == target)
    }
}

/// A finished class, ready for encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassArtifact {
    /// Class name
    pub name: String,
    /// Superclass name
    pub superclass: String,
    /// Name of the source file the class came from
    pub source_file: String,
    /// Access flags
    pub access: AccessFlags,
    /// The constant pool
    pub pool: ConstPool,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Callable units in emission order
    pub units: Vec<CallableUnit>,
}

impl ClassArtifact {
    /// Find a unit by name
    pub fn unit(&self, name: &str) -> Option<&CallableUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}

/// Accumulates one class during emission.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    superclass: String,
    access: AccessFlags,
    pool: ConstPool,
    fields: Vec<FieldInfo>,
    units: Vec<CallableUnit>,
}

impl ClassBuilder {
    /// Start a class extending `Object`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name,
            superclass: "Object".to_owned(),
            access: AccessFlags::PUBLIC,
            pool: ConstPool::new(),
            fields: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Set the superclass
    pub fn superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = name.into();
        self
    }

    /// Seed the constant pool, replacing the current one
    pub fn with_pool(mut self, pool: ConstPool) -> Self {
        self.pool = pool;
        self
    }

    /// Mutable access to the constant pool
    pub fn pool_mut(&mut self) -> &mut ConstPool {
        &mut self.pool
    }

    /// The class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a field
    pub fn add_field(&mut self, name: impl Into<String>, ty: Type, access: AccessFlags) {
        self.fields.push(FieldInfo {
            name: name.into(),
            ty,
            access,
        });
    }

    /// Add a finished callable unit
    pub fn add_unit(&mut self, unit: CallableUnit) {
        self.units.push(unit);
    }

    /// Freeze into an artifact. The source file name is derived from the
    /// class name.
    pub fn finish(self) -> ClassArtifact {
        let source_file = format!("{}.tb", self.name);
        ClassArtifact {
            name: self.name,
            superclass: self.superclass,
            source_file,
            access: self.access,
            pool: self.pool,
            fields: self.fields,
            units: self.units,
        }
    }
}
