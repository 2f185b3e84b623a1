use std::num::NonZeroU32;

use crate::{
    constants::ConstantPool,
    symbol::SymbolTable,
    util::intern::{Interned, Interner},
};

pub mod well_known {
    use super::*;

    /// The name of the entry function. Always the first interned identifier.
    pub const MAIN: Interned<str> = Interned::unchecked_new(NonZeroU32::MIN);

    pub const ALL: &[(Interned<str>, &str)] = &[(MAIN, "main")];
}

/// Per-compilation state shared by the parser, the type checker and the code
/// generator.
///
/// The parser fills the tables; later stages only read them.
pub struct Context {
    pub idents: Interner<str>,
    pub symbols: SymbolTable,
    pub constants: ConstantPool,
}

impl Context {
    pub fn with_capacity(capacity: usize) -> Context {
        let mut idents = Interner::with_capacity(capacity);
        for &(expected_handle, name) in well_known::ALL {
            let handle = idents.intern(name);
            assert_eq!(handle, expected_handle);
        }
        Context {
            idents,
            symbols: SymbolTable::with_capacity(capacity),
            constants: ConstantPool::with_capacity(capacity),
        }
    }

    /// Resolves an identifier handle to its text.
    pub fn ident(&self, handle: impl Into<Interned<str>>) -> &str {
        self.idents.get(handle)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::with_capacity(64)
    }
}
