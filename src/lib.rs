/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST. It also
/// fills the symbol table and the constant pool.
pub mod parser;

/// The type checker takes an untyped AST, checks the soundness of its types,
/// and maps it into a typed AST.
pub mod type_checker;

/// The code generator lowers a typed AST into x86-64 assembly.
pub mod codegen;

/// Chains every phase, turning a source file into assembly or diagnostics.
pub mod pipeline;

pub mod ast;
pub mod constants;
pub mod context;
pub mod source;
pub mod symbol;
pub mod token;
pub mod value;

pub mod util {
    pub mod fmt;
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
