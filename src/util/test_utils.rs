use crate::{
    ast::{Expr, Program, Untyped},
    context::Context,
    lexer, parser,
    token::Spanned,
    type_checker::{self, Checker},
    util::fmt::{tree, Show},
};

pub fn format_errors<E>(ctx: &Context, e: &[Spanned<E>]) -> Vec<String>
where
    Spanned<E>: Show,
{
    e.iter().map(|e| format!("{:#}", e.display(ctx))).collect()
}

/// Parses a program which is expected to be syntactically valid.
#[track_caller]
pub fn parse_program(src: &str) -> (Context, Program<Untyped>) {
    let mut ctx = Context::default();
    let tokens = &mut Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    match parser::parse_program(src, tokens, &mut ctx) {
        Ok(program) => (ctx, program),
        Err((_, errors)) => panic!("unexpected errors: {:?}", format_errors(&ctx, &errors)),
    }
}

/// Parses the program and returns the formatted entry point error, if any.
#[track_caller]
pub fn check_main_errors(src: &str) -> Vec<String> {
    let (ctx, _) = parse_program(src);
    match type_checker::check_main(&ctx) {
        Ok(()) => vec![],
        Err(error) => format_errors(&ctx, &[error]),
    }
}

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    CheckerProgram(&'static str),
    CheckerExpr(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let tokens_buf = &mut Vec::with_capacity(1024);
    let ctx = &mut Context::with_capacity(128);

    match test {
        Test::ParserProgram(input) => {
            let (prog, errors) = match parser::parse_program(input, tokens_buf, ctx) {
                Ok(prog) => (prog, vec![]),
                Err((prog, errors)) => (prog, errors),
            };
            let tree = tree::print_program_string(ctx, &prog);
            let errors = format_errors(ctx, &errors);
            (tree, errors)
        }
        Test::ParserExpr(input) => {
            let (expr, errors) = match parser::parse_expr(input, tokens_buf, ctx) {
                Ok(expr) => (expr, vec![]),
                Err((expr, errors)) => (expr, errors),
            };
            let tree = tree::print_expr_string(ctx, &expr);
            let errors = format_errors(ctx, &errors);
            (tree, errors)
        }
        Test::CheckerProgram(input) => {
            let (prog, errors) = match parser::parse_program(input, tokens_buf, ctx) {
                Ok(prog) => (prog, vec![]),
                Err((prog, errors)) => (prog, errors),
            };
            let mut fmt_errors = format_errors(ctx, &errors);

            let (prog, errors) = match Checker::new(ctx).check(prog) {
                Ok(prog) => (prog, vec![]),
                Err((prog, errors)) => (prog, errors),
            };
            let tree = tree::print_program_string(ctx, &prog);
            fmt_errors.extend(format_errors(ctx, &errors));

            (tree, fmt_errors)
        }
        Test::CheckerExpr(input) => {
            let (expr, errors) = match parser::parse_expr(input, tokens_buf, ctx) {
                Ok(expr) => (expr, vec![]),
                Err((expr, errors)) => (expr, errors),
            };
            let prog = from_expr_to_program(expr);
            let mut fmt_errors = format_errors(ctx, &errors);

            let (prog, errors) = match Checker::new(ctx).check(prog) {
                Ok(prog) => (prog, vec![]),
                Err((prog, errors)) => (prog, errors),
            };
            let expr = from_program_to_expr(prog);
            let tree = tree::print_expr_string(ctx, &expr);
            fmt_errors.extend(format_errors(ctx, &errors));

            (tree, fmt_errors)
        }
    }
}

fn from_expr_to_program(expr: Expr<Untyped>) -> Program<Untyped> {
    Program { body: vec![expr] }
}

fn from_program_to_expr<I: crate::ast::Info>(mut program: Program<I>) -> Expr<I> {
    assert_eq!(program.body.len(), 1);
    program.body.pop().unwrap()
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(checker, program), $source:expr) => {
        crate::util::test_utils::Test::CheckerProgram($source)
    };
    (@@get_test(checker, expr), $source:expr) => {
        crate::util::test_utils::Test::CheckerExpr($source)
    };
}
pub(crate) use tree_tests;
