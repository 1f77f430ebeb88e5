//! Tabby types as seen by the backend
//!
//! The full static type system lives in the front end; the backend only
//! needs enough type information to describe callable-unit parameters and
//! returns and to size constant-pool references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Tabby type in its lowered form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// No value (procedure return)
    Void,
    /// 64-bit signed integer (also carries booleans as 0/1)
    Int,
    /// 32-bit float
    Float,
    /// Runtime string
    Str,
    /// Reference to a class by name
    Class(String),
}

impl Type {
    /// Reference type for the named class
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    /// True for `Void`
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Str => write!(f, "String"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Type::Void.to_string(), "void");
        assert_eq!(Type::class("Calc").to_string(), "Calc");
    }

    #[test]
    fn test_is_void() {
        assert!(Type::Void.is_void());
        assert!(!Type::Str.is_void());
    }
}
