//! The global constant pool.
//!
//! Every string literal of the program is interned here while parsing. Each
//! distinct text receives a [`GlobalId`] which is stable for the whole
//! compilation and becomes the `str_<id>` label of the data section.

use std::fmt;

use crate::util::intern::{Interned, Interner};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct GlobalId(Interned<str>);

impl GlobalId {
    pub fn get(self) -> u32 {
        self.0.index()
    }
}

impl fmt::Debug for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalId({})", self.get())
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Append-only table of string literals.
pub struct ConstantPool {
    strings: Interner<str>,
}

impl ConstantPool {
    pub fn with_capacity(capacity: usize) -> ConstantPool {
        ConstantPool {
            strings: Interner::with_capacity(capacity),
        }
    }

    /// Adds the string to the pool, returning its id. Adding the same text
    /// twice yields the same id.
    pub fn add(&mut self, text: &str) -> GlobalId {
        GlobalId(self.strings.intern(text))
    }

    pub fn get(&self, id: GlobalId) -> &str {
        self.strings.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterates over the pool in id order.
    pub fn iter(&self) -> impl Iterator<Item = (GlobalId, &str)> {
        self.strings.iter().map(|(handle, s)| (GlobalId(handle), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_stable() {
        let mut pool = ConstantPool::with_capacity(4);
        let hello = pool.add("hello");
        let world = pool.add("world");
        let again = pool.add("hello");

        assert_eq!(hello.get(), 0);
        assert_eq!(world.get(), 1);
        assert_eq!(again, hello);
        assert_eq!(pool.get(world), "world");

        let all: Vec<_> = pool.iter().map(|(id, s)| (id.get(), s)).collect();
        assert_eq!(all, [(0, "hello"), (1, "world")]);
    }
}
