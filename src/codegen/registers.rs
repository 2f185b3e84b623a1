use std::fmt;

use log::trace;

use crate::{codegen::Error, value::ValueTag};

/// Scratch registers available to expression evaluation.
///
/// `rax` and `rdx` are left out: division uses them as the dividend and
/// remainder, and `rax` holds return values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Register {
    pub const ALL: [Register; 7] = [
        Register::R9,
        Register::R10,
        Register::R11,
        Register::R12,
        Register::R13,
        Register::R14,
        Register::R15,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// The name of the `width`-sized view of this register.
    pub const fn name(self, width: Width) -> &'static str {
        use Register::*;
        use Width::*;
        match (self, width) {
            (R9, Byte) => "r9b",
            (R9, Word) => "r9w",
            (R9, Dword) => "r9d",
            (R9, Qword) => "r9",
            (R10, Byte) => "r10b",
            (R10, Word) => "r10w",
            (R10, Dword) => "r10d",
            (R10, Qword) => "r10",
            (R11, Byte) => "r11b",
            (R11, Word) => "r11w",
            (R11, Dword) => "r11d",
            (R11, Qword) => "r11",
            (R12, Byte) => "r12b",
            (R12, Word) => "r12w",
            (R12, Dword) => "r12d",
            (R12, Qword) => "r12",
            (R13, Byte) => "r13b",
            (R13, Word) => "r13w",
            (R13, Dword) => "r13d",
            (R13, Qword) => "r13",
            (R14, Byte) => "r14b",
            (R14, Word) => "r14w",
            (R14, Dword) => "r14d",
            (R14, Qword) => "r14",
            (R15, Byte) => "r15b",
            (R15, Word) => "r15w",
            (R15, Dword) => "r15d",
            (R15, Qword) => "r15",
        }
    }
}

/// Displays the full 64-bit register.
impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name(Width::Qword))
    }
}

/// Operand width of an instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
    Dword,
    Qword,
}

impl Width {
    pub const fn from_size(size: u32) -> Option<Width> {
        match size {
            1 => Some(Width::Byte),
            2 => Some(Width::Word),
            4 => Some(Width::Dword),
            8 => Some(Width::Qword),
            _ => None,
        }
    }

    /// The width of values of the given type, if it has a runtime
    /// representation.
    pub const fn of(ty: ValueTag) -> Option<Width> {
        match ty.size() {
            Some(size) => Width::from_size(size),
            None => None,
        }
    }

    /// Size keyword of memory operands (as in `qword [rel var_x]`).
    pub const fn ptr(self) -> &'static str {
        match self {
            Width::Byte => "byte",
            Width::Word => "word",
            Width::Dword => "dword",
            Width::Qword => "qword",
        }
    }

    /// Directive reserving one uninitialized element of this width.
    pub const fn reserve(self) -> &'static str {
        match self {
            Width::Byte => "resb",
            Width::Word => "resw",
            Width::Dword => "resd",
            Width::Qword => "resq",
        }
    }
}

/// Free list over [`Register::ALL`].
///
/// There is no spilling: running out of registers is a fatal error.
pub struct RegisterPool {
    in_use: [bool; Register::ALL.len()],
    live: usize,
    peak: usize,
}

impl RegisterPool {
    pub const CAPACITY: usize = Register::ALL.len();

    pub fn new() -> RegisterPool {
        RegisterPool {
            in_use: [false; Self::CAPACITY],
            live: 0,
            peak: 0,
        }
    }

    /// Takes the lowest-numbered free register.
    pub fn allocate(&mut self) -> Result<Register, Error> {
        let Some(reg) = Register::ALL.into_iter().find(|r| !self.in_use[r.index()]) else {
            return Err(Error::RegistersExhausted {
                available: Self::CAPACITY,
            });
        };
        self.in_use[reg.index()] = true;
        self.live += 1;
        self.peak = self.peak.max(self.live);
        trace!("allocated {reg} ({} live)", self.live);
        Ok(reg)
    }

    /// Returns the register to the pool. `None` is accepted and ignored, so
    /// that callers holding an optional result need not check it first.
    pub fn free(&mut self, reg: Option<Register>) {
        let Some(reg) = reg else {
            return;
        };
        debug_assert!(self.in_use[reg.index()], "double free of {reg}");
        if self.in_use[reg.index()] {
            self.in_use[reg.index()] = false;
            self.live -= 1;
            trace!("freed {reg} ({} live)", self.live);
        }
    }

    /// Number of registers currently free.
    pub fn available(&self) -> usize {
        Self::CAPACITY - self.live
    }

    pub fn is_full(&self) -> bool {
        self.live == 0
    }

    /// The highest number of simultaneously live registers since the last
    /// [`reset`](Self::reset).
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn reset(&mut self) {
        *self = RegisterPool::new();
    }
}

impl Default for RegisterPool {
    fn default() -> Self {
        RegisterPool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_register() {
        let mut pool = RegisterPool::new();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert_eq!((a, b), (Register::R9, Register::R10));

        pool.free(Some(a));
        assert_eq!(pool.allocate().unwrap(), Register::R9);
        assert_eq!(pool.available(), RegisterPool::CAPACITY - 2);
        assert_eq!(pool.peak(), 2);
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut pool = RegisterPool::new();
        for _ in 0..RegisterPool::CAPACITY {
            pool.allocate().unwrap();
        }
        assert_eq!(
            pool.allocate(),
            Err(Error::RegistersExhausted { available: 7 })
        );
    }

    #[test]
    fn free_ignores_none() {
        let mut pool = RegisterPool::new();
        pool.free(None);
        assert!(pool.is_full());
    }

    #[test]
    #[should_panic = "double free of r9"]
    #[cfg(debug_assertions)]
    fn double_free_is_detected() {
        let mut pool = RegisterPool::new();
        let r = pool.allocate().unwrap();
        pool.free(Some(r));
        pool.free(Some(r));
    }

    #[test]
    fn reset_clears_usage_and_peak() {
        let mut pool = RegisterPool::new();
        pool.allocate().unwrap();
        pool.allocate().unwrap();
        pool.reset();
        assert!(pool.is_full());
        assert_eq!(pool.peak(), 0);
    }

    #[test]
    fn register_views() {
        assert_eq!(Register::R9.name(Width::Byte), "r9b");
        assert_eq!(Register::R12.name(Width::Word), "r12w");
        assert_eq!(Register::R15.name(Width::Dword), "r15d");
        assert_eq!(Register::R10.to_string(), "r10");
    }

    #[test]
    fn widths_follow_type_sizes() {
        assert_eq!(Width::of(ValueTag::Int), Some(Width::Qword));
        assert_eq!(Width::of(ValueTag::Bool), Some(Width::Byte));
        assert_eq!(Width::of(ValueTag::String), Some(Width::Qword));
        assert_eq!(Width::of(ValueTag::None), None);
        assert_eq!(Width::from_size(4).map(Width::ptr), Some("dword"));
        assert_eq!(Width::Word.reserve(), "resw");
    }
}
