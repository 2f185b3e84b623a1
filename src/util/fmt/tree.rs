use std::io::Write;

use crate::{ast::*, context::Context, value::Value};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string<I: InfoWriter>(ctx: &Context, program: &Program<I>) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, ctx, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string<I: InfoWriter>(ctx: &Context, expr: &Expr<I>) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, ctx, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program<I: InfoWriter>(
    w: &mut impl Write,
    ctx: &Context,
    program: &Program<I>,
) -> std::io::Result<()> {
    print_body(w, ctx, 0, &program.body)
}

fn print_body<I: InfoWriter>(
    w: &mut impl Write,
    ctx: &Context,
    i: usize,
    body: &[Expr<I>],
) -> std::io::Result<()> {
    for stmt in body {
        print_expr(w, ctx, i, stmt)?;
    }
    Ok(())
}

pub fn print_expr<I: InfoWriter>(
    w: &mut impl Write,
    ctx: &Context,
    i: usize,
    expr: &Expr<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    let info = expr.info.write_resolved(); // inferred type, for typed trees
    let span = expr.span;
    match &expr.kind {
        ExprKind::Literal(value) => match value {
            Value::Int(val) => writeln!(w, "int {val} ({span}{info})")?,
            Value::Bool(val) => writeln!(w, "bool {val} ({span}{info})")?,
            Value::String(id) => {
                let text = ctx.constants.get(*id);
                writeln!(w, "string #{id} {text:?} ({span}{info})")?;
            }
            Value::Identifier(name) => {
                writeln!(w, "ident {} ({span}{info})", ctx.ident(name))?;
            }
            Value::None => writeln!(w, "none ({span}{info})")?,
            Value::Error => writeln!(w, "error ({span}{info})")?,
        },
        ExprKind::Unary { op, rhs } => {
            writeln!(w, "unary {} ({span}{info})", op.inner.symbol())?;
            print_expr(w, ctx, i + 1, rhs)?;
        }
        ExprKind::Binary { lhs, op, rhs } => {
            writeln!(w, "binary {} ({span}{info})", op.inner.symbol())?;
            print_expr(w, ctx, i + 1, lhs)?;
            print_expr(w, ctx, i + 1, rhs)?;
        }
        ExprKind::Grouping(inner) => {
            writeln!(w, "grouping ({span}{info})")?;
            print_expr(w, ctx, i + 1, inner)?;
        }
        ExprKind::If {
            cond,
            then_body,
            else_body,
        } => {
            writeln!(w, "if ({span}{info})")?;
            print_expr(w, ctx, i + 1, cond)?;
            sp(w, i + 1)?;
            writeln!(w, "then")?;
            print_body(w, ctx, i + 2, then_body)?;
            if let Some(else_body) = else_body {
                sp(w, i + 1)?;
                writeln!(w, "else")?;
                print_body(w, ctx, i + 2, else_body)?;
            }
        }
        ExprKind::While { cond, body } => {
            writeln!(w, "while ({span}{info})")?;
            print_expr(w, ctx, i + 1, cond)?;
            sp(w, i + 1)?;
            writeln!(w, "do")?;
            print_body(w, ctx, i + 2, body)?;
        }
        ExprKind::VarDef {
            name,
            ty,
            initializer,
        } => {
            writeln!(w, "var {}: {ty} ({span}{info})", ctx.ident(name))?;
            if let Some(initializer) = initializer {
                print_expr(w, ctx, i + 1, initializer)?;
            }
        }
        ExprKind::Assign { target, op, value } => {
            let target = ctx.ident(target);
            writeln!(w, "assign {target} {} ({span}{info})", op.inner.symbol())?;
            print_expr(w, ctx, i + 1, value)?;
        }
        ExprKind::FnDef(FnDef {
            name,
            params,
            return_ty,
            body,
        }) => {
            write!(w, "fn {}(", ctx.ident(name))?;
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{}: {}", ctx.ident(param.name), param.ty)?;
            }
            writeln!(w, ") {return_ty} ({span}{info})")?;
            print_body(w, ctx, i + 1, body)?;
        }
        ExprKind::Return { value } => {
            writeln!(w, "return ({span}{info})")?;
            print_expr(w, ctx, i + 1, value)?;
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub trait InfoWriter: Info<Expr: InfoDisplay> {}

impl<I> InfoWriter for I
where
    I: Info,
    I::Expr: InfoDisplay,
{
}

pub trait InfoDisplay {
    fn write_resolved(&self) -> impl std::fmt::Display;
}

impl InfoDisplay for () {
    fn write_resolved(&self) -> impl std::fmt::Display {
        ""
    }
}

impl InfoDisplay for crate::value::ValueTag {
    fn write_resolved(&self) -> impl std::fmt::Display {
        pub struct TypeWriter(crate::value::ValueTag);

        impl std::fmt::Display for TypeWriter {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, " %: {}", self.0)
            }
        }

        TypeWriter(*self)
    }
}
