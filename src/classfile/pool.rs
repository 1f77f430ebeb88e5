//! Constant pool for one class artifact

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Type;

/// Index into a class's constant pool
pub type ConstIdx = u16;

/// Reference to a callable in some class.
///
/// Parameter types list the receiver explicitly as the first entry; the
/// emitted world has no instance-bound dispatch, so a method reference is
/// just a static call target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    /// Defining class
    pub class: String,
    /// Callable name (`<init>` for constructors)
    pub name: String,
    /// Parameter types, receiver first
    pub params: Vec<Type>,
    /// Return type
    pub ret: Type,
}

/// Reference to a field in some class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    /// Defining class
    pub class: String,
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
}

/// An entry in the constant pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constant {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f32),
    /// String literal
    Str(String),
    /// Class reference by name
    ClassRef(String),
    /// Callable reference
    MethodRef(MethodRef),
    /// Field reference
    FieldRef(FieldRef),
}

impl Constant {
    /// String literal constant
    pub fn str(s: impl Into<String>) -> Self {
        Constant::Str(s.into())
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Int(a), Constant::Int(b)) => a == b,
            // bit comparison so NaN payloads and -0.0 dedup consistently
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Str(a), Constant::Str(b)) => a == b,
            (Constant::ClassRef(a), Constant::ClassRef(b)) => a == b,
            (Constant::MethodRef(a), Constant::MethodRef(b)) => a == b,
            (Constant::FieldRef(a), Constant::FieldRef(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Float(x) => write!(f, "{}", x),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::ClassRef(name) => write!(f, "class {}", name),
            Constant::MethodRef(m) => write!(f, "{}.{}", m.class, m.name),
            Constant::FieldRef(fr) => write!(f, "{}.{}", fr.class, fr.name),
        }
    }
}

/// A class's constant pool.
///
/// Grows monotonically during emission and is frozen when the artifact is
/// finished. `add` deduplicates, so interning the same literal from many
/// call sites yields one entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstPool {
    entries: Vec<Constant>,
}

impl ConstPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, returning the index of an existing equal entry if
    /// one is already present.
    pub fn add(&mut self, constant: Constant) -> ConstIdx {
        for (i, existing) in self.entries.iter().enumerate() {
            if *existing == constant {
                return i as ConstIdx;
            }
        }
        let index = self.entries.len();
        self.entries.push(constant);
        index as ConstIdx
    }

    /// Get a constant by index
    pub fn get(&self, index: ConstIdx) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the pool has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.entries.iter()
    }
}
