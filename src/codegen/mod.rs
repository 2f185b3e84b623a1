//! Lowering of the typed tree into x86-64 assembly (NASM syntax).

use crate::{
    ast::{Program, Typed},
    context::Context,
    token::Span,
    value::ValueTag,
};

pub mod registers;
pub mod x86_64;
pub mod x86_64_env;

/// Generates the assembly of a type checked program.
pub fn generate(ctx: &Context, program: &Program<Typed>) -> Result<String, Error> {
    type Elf64Generator<'a> = x86_64::Generator<'a, x86_64_env::Elf64>;

    let mut generator = Elf64Generator::new(ctx);
    generator.generate(program)?;
    Ok(generator.into_code())
}

/// Defects which make code generation impossible.
///
/// Other than register exhaustion, these are not reachable from programs
/// accepted by the type checker.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expression needs more than the {available} available registers")]
    RegistersExhausted { available: usize },
    #[error("{live} register(s) still live after the statement at {span}")]
    RegisterLeak { live: usize, span: Span },
    #[error("ill-typed node at {span} reached code generation")]
    IllTyped { span: Span },
    #[error("statement at {span} used as a value")]
    StatementAsValue { span: Span },
    #[error("operator `{op}` is not supported on type {ty}")]
    UnsupportedOperand { op: &'static str, ty: ValueTag },
    #[error("unresolved name `{name}`")]
    UnresolvedName { name: String },
    #[error("return outside of a function at {span}")]
    ReturnOutsideFunction { span: Span },
    #[error("function defined outside of the top level at {span}")]
    MisplacedFunction { span: Span },
}
