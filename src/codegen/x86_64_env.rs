/// Target-specific constants of the emitted assembly.
pub trait Env {
    /// Label of the process entry point, which the linker looks for.
    const ENTRY_POINT: &str;

    const GLOBAL_PROLOGUE: &str;

    const SECTION_DATA: &str;
    const SECTION_BSS: &str;
    const SECTION_TEXT: &str;

    /// Number of the system call which terminates the process with the status
    /// found in `rdi`.
    const SYS_EXIT: u32;
}

/// Freestanding Linux ELF64, assembled by NASM or YASM and linked without a C
/// runtime.
impl Env for Elf64 {
    const ENTRY_POINT: &str = "_start";

    const GLOBAL_PROLOGUE: &str = "bits 64\n";

    const SECTION_DATA: &str = ".data";
    const SECTION_BSS: &str = ".bss";
    const SECTION_TEXT: &str = ".text";

    const SYS_EXIT: u32 = 60;
}

pub struct Elf64;
