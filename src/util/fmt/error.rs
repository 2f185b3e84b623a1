#![allow(clippy::items_after_statements)]

use crate::{
    context::Context,
    parser,
    token::{Spanned, TokenKind},
    type_checker,
    util::fmt::Show,
};

impl Show for Spanned<type_checker::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context) -> std::fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use type_checker::Error::*;
        match error {
            UndefinedName(name) => {
                let name = ctx.ident(name);
                write!(f, "{name} is not defined")
            }
            Mismatch { expected, actual } => {
                write!(f, "expected type {expected}, but got {actual}")
            }
            InvalidUnaryOperand { op, operand } => {
                let op = op.symbol();
                write!(f, "cannot perform {op} operation on type {operand}")
            }
            InvalidBinaryOperands { op, lhs, rhs } => {
                let op = op.symbol();
                write!(f, "cannot perform {op} operation on types {lhs} and {rhs}")
            }
            InvalidCompoundAssignment { op, target } => {
                let op = op.symbol();
                write!(f, "cannot perform {op} operation on type {target}")
            }
            FunctionAsValue(name) => {
                let name = ctx.ident(name);
                write!(f, "function `{name}` cannot be used as a value")
            }
            AssignToFunction(name) => {
                let name = ctx.ident(name);
                write!(f, "cannot assign to function `{name}`")
            }
            ReturnOutsideFunction => write!(f, "return outside of a function"),
            NestedFunction => write!(f, "functions can only be defined at the top level"),
            MissingReturn(name) => {
                let name = ctx.ident(name);
                write!(f, "function `{name}` must return value")
            }
            MainNotDefined => write!(f, "function `main` not defined"),
            InvalidMain => write!(
                f,
                "symbol `main` must be a function with no parameters \
                and a return type of int"
            ),
        }
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context) -> std::fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use parser::Error::*;
        match error {
            InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            UnexpectedTokenInExpr { token } => {
                write!(f, "unexpected {} in expression", token.describe())
            }
            Unexpected { actual, expected } => {
                let (expected, actual) = (expected.describe(), actual.describe());
                write!(f, "expected {expected}, but got {actual}")
            }
            UnexpectedAny { actual, expected } => {
                write!(f, "expected one of ")?;
                for (i, kind) in expected.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", kind.describe())?;
                }
                write!(f, ", but got {}", actual.describe())
            }
            ParseInt => write!(f, "integer literal out of bounds"),
            Redefinition { name, .. } => {
                let name = ctx.ident(name);
                write!(f, "redefinition of `{name}`")
            }
            DuplicateParameter { name } => {
                let name = ctx.ident(name);
                write!(f, "duplicate parameter `{name}`")
            }
            Lexer(TokenKind::ErrorUnexpectedChar) => write!(f, "unexpected character"),
            Lexer(TokenKind::ErrorUnclosedString) => write!(f, "unclosed string"),
            Lexer(TokenKind::ErrorUnescapedLineBreak) => write!(f, "unescaped line break"),
            Lexer(_) => unreachable!("not error token"),
        }
    }
}
