//! Callable and field signatures of a class awaiting emission
//!
//! A [`ClassDescriptor`] is the hand-off from the front end: one entry
//! per field, constructor, method, fixture and test, each callable
//! pointing at the entry block of its body graph, plus the constant
//! pool that the graph's instructions index into. The descriptor owns
//! the pool so literal interning happens at graph-build time; the
//! emitter only reads it.

use serde::{Deserialize, Serialize};

use crate::classfile::ConstPool;
use crate::ir::BlockId;
use crate::types::Type;

/// What role a callable plays in its class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallableKind {
    /// Ordinary method; receiver is the first parameter
    Method,
    /// Constructor, named `<init>`, returning nothing
    Constructor,
    /// Test fixture: runs before every test, receiver-only, void
    Fixture,
    /// Test: receiver-only, returns the outcome string
    Test,
}

/// Signature of one callable unit, with the entry block of its body
#[derive(Debug, Clone)]
pub struct Signature {
    /// The callable's role
    pub kind: CallableKind,
    /// Defining class
    pub class: String,
    /// Unit name
    pub name: String,
    /// Parameter types, receiver first
    pub params: Vec<Type>,
    /// Return type
    pub ret: Type,
    /// Entry block of the body graph
    pub entry: BlockId,
}

/// A declared field
#[derive(Debug, Clone)]
pub struct FieldSignature {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
}

/// Everything the emitter needs to know about one class.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    /// Class name
    pub name: String,
    /// Superclass name, `Object` when absent
    pub superclass: Option<String>,
    /// Declared fields
    pub fields: Vec<FieldSignature>,
    /// Constructors
    pub constructors: Vec<Signature>,
    /// Methods
    pub methods: Vec<Signature>,
    /// Fixtures, in allocation order
    pub fixtures: Vec<Signature>,
    /// Tests, in declaration order; the harness runs and reports them
    /// in exactly this order
    pub tests: Vec<Signature>,
    pool: ConstPool,
    next_fixture: u32,
}

impl ClassDescriptor {
    /// Start a descriptor for the named class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fixtures: Vec::new(),
            tests: Vec::new(),
            pool: ConstPool::new(),
            next_fixture: 0,
        }
    }

    /// The constant pool shared by all body graphs of this class
    pub fn pool(&self) -> &ConstPool {
        &self.pool
    }

    /// Mutable pool access for the front end while it builds graphs
    pub fn pool_mut(&mut self) -> &mut ConstPool {
        &mut self.pool
    }

    /// The receiver type of this class's callables
    pub fn receiver(&self) -> Type {
        Type::class(self.name.clone())
    }

    /// Declare a field
    pub fn add_field(&mut self, name: impl Into<String>, ty: Type) {
        self.fields.push(FieldSignature {
            name: name.into(),
            ty,
        });
    }

    /// Declare a constructor with the given extra parameters (the
    /// receiver is added implicitly)
    pub fn add_constructor(&mut self, params: Vec<Type>, entry: BlockId) {
        let mut full = vec![self.receiver()];
        full.extend(params);
        self.constructors.push(Signature {
            kind: CallableKind::Constructor,
            class: self.name.clone(),
            name: "<init>".to_owned(),
            params: full,
            ret: Type::Void,
            entry,
        });
    }

    /// Declare a method
    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        params: Vec<Type>,
        ret: Type,
        entry: BlockId,
    ) {
        let mut full = vec![self.receiver()];
        full.extend(params);
        self.methods.push(Signature {
            kind: CallableKind::Method,
            class: self.name.clone(),
            name: name.into(),
            params: full,
            ret,
            entry,
        });
    }

    /// Declare a fixture. Fixture names are allocated per class,
    /// `fixture1` upward, in declaration order.
    pub fn add_fixture(&mut self, entry: BlockId) -> &Signature {
        self.next_fixture += 1;
        self.fixtures.push(Signature {
            kind: CallableKind::Fixture,
            class: self.name.clone(),
            name: format!("fixture{}", self.next_fixture),
            params: vec![self.receiver()],
            ret: Type::Void,
            entry,
        });
        let last = self.fixtures.len() - 1;
        &self.fixtures[last]
    }

    /// Declare a test
    pub fn add_test(&mut self, name: impl Into<String>, entry: BlockId) {
        self.tests.push(Signature {
            kind: CallableKind::Test,
            class: self.name.clone(),
            name: name.into(),
            params: vec![self.receiver()],
            ret: Type::Str,
            entry,
        });
    }

    /// True when the class declares at least one test
    pub fn has_tests(&self) -> bool {
        !self.tests.is_empty()
    }

    /// Look up a test by name
    pub fn test(&self, name: &str) -> Option<&Signature> {
        self.tests.iter().find(|t| t.name == name)
    }
}
