use std::fmt;

use crate::{constants::GlobalId, util::intern::Interned};

pub const SIZE_INT: u32 = 8;
pub const SIZE_BOOL: u32 = 1;
pub const SIZE_STRING: u32 = 8;

/// A literal value as it appears in the syntax tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    String(GlobalId),
    Identifier(Interned<str>),
    None,
    /// Produced only by the type checker for ill-typed subtrees. Never reaches
    /// code generation.
    Error,
}

/// The static type classification of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Int,
    Bool,
    String,
    None,
    Error,
}

impl ValueTag {
    /// Size in bytes of a value of this type, both in memory and as the
    /// operand width of the instructions operating on it.
    ///
    /// Returns `None` for the sentinel tags, which have no runtime
    /// representation.
    pub const fn size(self) -> Option<u32> {
        match self {
            ValueTag::Int => Some(SIZE_INT),
            ValueTag::Bool => Some(SIZE_BOOL),
            ValueTag::String => Some(SIZE_STRING),
            ValueTag::None | ValueTag::Error => None,
        }
    }

    /// Whether this type describes a runtime value.
    pub const fn is_value(self) -> bool {
        self.size().is_some()
    }

    pub const fn name(self) -> &'static str {
        match self {
            ValueTag::Int => "int",
            ValueTag::Bool => "bool",
            ValueTag::String => "string",
            ValueTag::None => "none",
            ValueTag::Error => "error",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
