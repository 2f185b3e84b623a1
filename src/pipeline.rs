//! Runs every compilation phase over a single source file.

use std::fmt;

use log::debug;

use crate::{
    codegen,
    context::Context,
    lexer, parser,
    source::{Location, Source},
    token::Spanned,
    type_checker::{self, Checker},
    util::fmt::Show,
};

/// Compiles the source text into assembly.
///
/// Front-end errors are collected across the whole file. The entry point
/// check and code generation failures are fatal. No assembly is produced if
/// anything was reported.
pub fn compile(path: &str, src: &str) -> Result<String, Diagnostics> {
    let source = Source::new(path, src);
    let mut diagnostics = Diagnostics::new(path);
    let ctx = &mut Context::default();
    let tokens = &mut Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);

    debug!("parsing {path}");
    let program = match parser::parse_program(src, tokens, ctx) {
        Ok(program) => program,
        Err((_, errors)) => {
            for error in &errors {
                diagnostics.push_spanned(&source, ctx, error);
                if let Some(span) = error.inner.previous_definition() {
                    diagnostics.note(source.locate_span(span), "previous definition is here");
                }
            }
            return Err(diagnostics);
        }
    };
    debug!(
        "parsed {} top-level statement(s), {} symbol(s)",
        program.body.len(),
        ctx.symbols.len()
    );

    if let Err(error) = type_checker::check_main(ctx) {
        diagnostics.push_spanned(&source, ctx, &error);
        return Err(diagnostics);
    }

    debug!("type checking {path}");
    let program = match Checker::new(ctx).check(program) {
        Ok(program) => program,
        Err((_, errors)) => {
            for error in &errors {
                diagnostics.push_spanned(&source, ctx, error);
            }
            return Err(diagnostics);
        }
    };

    debug!("generating code for {path}");
    match codegen::generate(ctx, &program) {
        Ok(asm) => {
            debug!("generated {} byte(s) of assembly", asm.len());
            Ok(asm)
        }
        Err(error) => {
            diagnostics.push(Severity::Error, None, error.to_string());
            Err(diagnostics)
        }
    }
}

/// Messages reported against one source file.
#[derive(Debug)]
pub struct Diagnostics {
    path: String,
    items: Vec<Diagnostic>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Diagnostic {
    severity: Severity,
    location: Option<Location>,
    message: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Severity {
    Error,
    Note,
}

impl Diagnostics {
    fn new(path: &str) -> Diagnostics {
        Diagnostics {
            path: path.to_owned(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, severity: Severity, location: Option<Location>, message: String) {
        self.items.push(Diagnostic {
            severity,
            location,
            message,
        });
    }

    fn push_spanned<E>(&mut self, source: &Source<'_>, ctx: &Context, error: &Spanned<E>)
    where
        Spanned<E>: Show,
    {
        let location = source.locate_span(error.span);
        let message = error.display(ctx).to_string();
        self.push(Severity::Error, Some(location), message);
    }

    fn note(&mut self, location: Location, message: &str) {
        self.push(Severity::Note, Some(location), message.to_owned());
    }

    /// Number of errors, not counting notes.
    pub fn error_count(&self) -> usize {
        let errors = self.items.iter().filter(|d| d.severity == Severity::Error);
        errors.count()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Note => "note",
        })
    }
}

impl std::error::Error for Diagnostics {}

/// One `path:line:col: severity: message` line per diagnostic.
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}:", self.path)?;
            if let Some(Location { line, col }) = d.location {
                write!(f, "{line}:{col}:")?;
            }
            write!(f, " {}: {}", d.severity, d.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn errors(src: &str) -> String {
        match compile("t.bk", src) {
            Ok(asm) => panic!("expected errors, got assembly:\n{asm}"),
            Err(diagnostics) => diagnostics.to_string(),
        }
    }

    #[test]
    fn compiles_samples() {
        for src in [
            include_str!("../samples/arith.bk"),
            include_str!("../samples/loops.bk"),
            include_str!("../samples/params.bk"),
        ] {
            let asm = compile("sample.bk", src).unwrap();
            assert!(asm.contains("fn_main:"));
            assert!(asm.contains("_start:"));
        }
    }

    #[test]
    fn bool_assigned_to_int_is_located() {
        let src = indoc! {"
            var x: int = 5
            fn main() int
              x = true
              return x
            end
        "};
        assert_eq!(
            errors(src),
            "t.bk:3:7: error: expected type int, but got bool"
        );
    }

    #[test]
    fn non_int_arithmetic_produces_no_code() {
        assert_eq!(
            errors("fn main() int return 1 + true end"),
            "t.bk:1:24: error: cannot perform + operation on types int and bool"
        );
    }

    #[test]
    fn independent_errors_are_all_reported() {
        let src = indoc! {"
            var a: int = false
            var b: bool = 1
            fn main() int return 0 end
        "};
        let diagnostics = compile("t.bk", src).unwrap_err();
        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(
            diagnostics.to_string(),
            indoc! {"
                t.bk:1:14: error: expected type int, but got bool
                t.bk:2:15: error: expected type bool, but got int"
            }
        );
    }

    #[test]
    fn missing_main_is_fatal() {
        assert_eq!(
            errors("var x: int = 1"),
            "t.bk:1:1: error: function `main` not defined"
        );
    }

    #[test]
    fn redefinition_points_at_the_previous_definition() {
        let src = indoc! {"
            var x: int
            var x: bool
            fn main() int return 0 end
        "};
        let diagnostics = compile("t.bk", src).unwrap_err();
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(
            diagnostics.to_string(),
            indoc! {"
                t.bk:2:5: error: redefinition of `x`
                t.bk:1:5: note: previous definition is here"
            }
        );
    }

    #[test]
    fn syntax_errors_stop_before_checking() {
        assert_eq!(
            errors("fn main() int return ) end"),
            "t.bk:1:22: error: unexpected `)` in expression"
        );
    }

    #[test]
    fn nul_byte_is_not_end_of_input() {
        assert_eq!(
            errors("fn main() int return 0 end\0"),
            "t.bk:1:27: error: unexpected character"
        );
    }

    #[test]
    fn codegen_errors_have_no_location() {
        let mut expr = String::from("1");
        for _ in 0..7 {
            expr = format!("({expr}) + ({expr})");
        }
        assert_eq!(
            errors(&format!("fn main() int return {expr} end")),
            "t.bk: error: expression needs more than the 7 available registers"
        );
    }
}
