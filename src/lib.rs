//! # tabbyc
//!
//! Bytecode backend for the Tabby teaching language.
//!
//! The front end hands this crate a [`signature::ClassDescriptor`]: the
//! fields, constructors, methods, fixtures and tests of one class, each
//! callable body already translated into a graph of single-instruction
//! blocks ([`ir::BlockArena`]). The backend lowers every body to a flat
//! instruction sequence ([`bytecode::CodeSeq`]), cleans it with a
//! peephole pass, sizes its frame, and packages the results as
//! [`classfile::ClassArtifact`]s ready for encoding.
//!
//! Classes with tests additionally get a companion `<Class>Test`
//! artifact whose synthesized `main` runs every test and prints a
//! pass/fail report ([`emit::synthesize_main`]).
//!
//! ## Example
//!
//! ```
//! use tabbyc::bytecode::Instr;
//! use tabbyc::emit::ClassEmitter;
//! use tabbyc::ir::BlockArena;
//! use tabbyc::signature::ClassDescriptor;
//! use tabbyc::types::Type;
//!
//! let mut arena = BlockArena::new();
//! let mut desc = ClassDescriptor::new("Calc");
//! let body = arena.chain([Instr::Zero, Instr::Return]).unwrap();
//! desc.add_method("zero", Vec::new(), Type::Int, body);
//!
//! let artifact = ClassEmitter::new().emit_class(&mut arena, &desc).unwrap();
//! assert!(artifact.unit("zero").is_some());
//! ```

pub mod bytecode;
pub mod classfile;
pub mod emit;
pub mod ir;
pub mod signature;
pub mod types;

mod error;

pub use error::{Error, Result, SourcePos};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
