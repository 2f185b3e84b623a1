use std::{
    fmt::{self, Write},
    format_args as f,
    marker::PhantomData,
};

use log::debug;

use crate::{
    ast::{self, AssignOperator, BinaryOperator, Expr, ExprKind, Param, Typed, UnaryOperator},
    codegen::{
        registers::{Register, RegisterPool, Width},
        x86_64_env, Error,
    },
    context::{well_known, Context},
    symbol::Symbol,
    token::Span,
    util::intern::Interned,
    value::{Value, ValueTag},
};

type Result<T, E = Error> = std::result::Result<T, E>;

const DEFAULT_CODE_CAPACITY: usize = 4 * 1024; // 4 KiB

pub struct Generator<'ctx, E> {
    ctx: &'ctx Context,
    code: String,
    registers: RegisterPool,
    if_count: u32,
    while_count: u32,
    /// Frame of the function being generated, if any.
    frame: Option<Frame>,
    indent: bool,
    _env: PhantomData<E>,
}

struct Frame {
    params: Vec<Param>,
    /// Bytes reserved below the return address on entry.
    size: u32,
}

impl<'ctx, E> Generator<'ctx, E>
where
    E: x86_64_env::Env,
{
    pub fn new(ctx: &'ctx Context) -> Generator<'ctx, E> {
        Generator {
            ctx,
            code: String::with_capacity(DEFAULT_CODE_CAPACITY),
            registers: RegisterPool::new(),
            if_count: 0,
            while_count: 0,
            frame: None,
            indent: false,
            _env: PhantomData,
        }
    }

    pub fn generate(&mut self, program: &ast::Program<Typed>) -> Result<()> {
        self.registers.reset();
        self.out(E::GLOBAL_PROLOGUE);
        self.g_data();
        self.g_bss()?;
        self.g_text(program)
    }

    /// The highest number of registers simultaneously live so far.
    pub fn peak_registers(&self) -> usize {
        self.registers.peak()
    }

    pub fn into_code(self) -> String {
        self.code
    }
}

/// Sections and top-level layout.
impl<E> Generator<'_, E>
where
    E: x86_64_env::Env,
{
    fn g_data(&mut self) {
        let ctx = self.ctx;
        self.directive(f!("section {}", E::SECTION_DATA));
        for (id, text) in ctx.constants.iter() {
            self.directive(f!("str_{id}: db {}", DataBytes(text)));
        }
        self.out_line();
    }

    fn g_bss(&mut self) -> Result<()> {
        let ctx = self.ctx;
        self.directive(f!("section {}", E::SECTION_BSS));
        for var in ctx.symbols.variables() {
            let width = self.width(var.ty, var.span)?;
            let name = ctx.ident(var.name);
            self.directive(f!("var_{name}: {} 1", width.reserve()));
        }
        self.out_line();
        Ok(())
    }

    fn g_text(&mut self, program: &ast::Program<Typed>) -> Result<()> {
        self.directive(f!("section {}", E::SECTION_TEXT));
        self.directive(f!("global {}", E::ENTRY_POINT));
        self.out_line();

        let (functions, statements): (Vec<_>, Vec<_>) = program
            .body
            .iter()
            .partition(|stmt| matches!(stmt.kind, ExprKind::FnDef(_)));
        debug!(
            "generating {} top-level statements and {} functions",
            statements.len(),
            functions.len()
        );

        self.label(E::ENTRY_POINT);
        self.indented(|this| -> Result<()> {
            for stmt in statements {
                this.g_top_level(stmt, Self::g_stmt)?;
            }
            let main = FnLabel(this.ctx.ident(well_known::MAIN));
            this.out(f!("call {main}"));
            this.out("mov rdi, rax");
            this.out(f!("mov rax, {}", E::SYS_EXIT));
            this.out("syscall");
            Ok(())
        })?;

        for def in functions {
            self.g_top_level(def, Self::g_fn_def)?;
        }
        Ok(())
    }

    /// Generates a top-level item, verifying that it leaves every register
    /// free.
    fn g_top_level(
        &mut self,
        stmt: &Expr<Typed>,
        f: impl FnOnce(&mut Self, &Expr<Typed>) -> Result<()>,
    ) -> Result<()> {
        f(self, stmt)?;
        if !self.registers.is_full() {
            return Err(Error::RegisterLeak {
                live: RegisterPool::CAPACITY - self.registers.available(),
                span: stmt.span,
            });
        }
        Ok(())
    }

    fn g_fn_def(&mut self, stmt: &Expr<Typed>) -> Result<()> {
        let ExprKind::FnDef(def) = &stmt.kind else {
            unreachable!("partitioned above");
        };
        let name = self.ctx.ident(def.name);
        debug!("generating function `{name}`");

        let size = def.params_size();
        self.label(FnLabel(name));
        self.frame = Some(Frame {
            params: def.params.clone(),
            size,
        });
        let result = self.indented(|this| {
            if size > 0 {
                this.out(f!("sub rsp, {size}"));
            }
            this.g_body(&def.body)
        });
        self.frame = None;
        result
    }
}

/// Statements.
impl<E> Generator<'_, E>
where
    E: x86_64_env::Env,
{
    fn g_body(&mut self, body: &[Expr<Typed>]) -> Result<()> {
        body.iter().try_for_each(|stmt| self.g_stmt(stmt))
    }

    fn g_stmt(&mut self, stmt: &Expr<Typed>) -> Result<()> {
        match &stmt.kind {
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => self.g_if(cond, then_body, else_body.as_deref()),
            ExprKind::While { cond, body } => self.g_while(cond, body),
            ExprKind::VarDef {
                name,
                ty,
                initializer,
            } => {
                let Some(initializer) = initializer else {
                    // The storage is reserved (zeroed) in the bss section.
                    return Ok(());
                };
                let width = self.width(*ty, stmt.span)?;
                let reg = self.g_value(initializer)?;
                let place = Place::Global(self.ctx.ident(name));
                self.g_store(place, width, reg);
                self.registers.free(Some(reg));
                Ok(())
            }
            ExprKind::Assign { target, op, value } => self.g_assign(target.name, op.inner, value),
            ExprKind::Return { value } => {
                let Some(size) = self.frame.as_ref().map(|frame| frame.size) else {
                    return Err(Error::ReturnOutsideFunction { span: stmt.span });
                };
                let reg = self.g_value(value)?;
                self.out(f!("mov rax, {reg}"));
                self.registers.free(Some(reg));
                if size > 0 {
                    self.out(f!("add rsp, {size}"));
                }
                self.out("ret");
                Ok(())
            }
            ExprKind::FnDef(_) => Err(Error::MisplacedFunction { span: stmt.span }),
            ExprKind::Literal(_)
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Grouping(_) => {
                let reg = self.g_value(stmt)?;
                self.registers.free(Some(reg));
                Ok(())
            }
        }
    }

    fn g_if(
        &mut self,
        cond: &Expr<Typed>,
        then_body: &[Expr<Typed>],
        else_body: Option<&[Expr<Typed>]>,
    ) -> Result<()> {
        let n = self.if_count;
        self.if_count += 1;
        let else_label = Label::new("if", n, "else");
        let end_label = Label::new("if", n, "end");

        if let Some(else_body) = else_body {
            self.g_jump_unless(cond, else_label)?;
            self.g_body(then_body)?;
            self.out(f!("jmp {end_label}"));
            self.label(else_label);
            self.g_body(else_body)?;
        } else {
            self.g_jump_unless(cond, end_label)?;
            self.g_body(then_body)?;
        }
        self.label(end_label);
        Ok(())
    }

    fn g_while(&mut self, cond: &Expr<Typed>, body: &[Expr<Typed>]) -> Result<()> {
        let n = self.while_count;
        self.while_count += 1;
        let top_label = Label::new("while", n, "top");
        let end_label = Label::new("while", n, "end");

        self.label(top_label);
        self.g_jump_unless(cond, end_label)?;
        self.g_body(body)?;
        self.out(f!("jmp {top_label}"));
        self.label(end_label);
        Ok(())
    }

    /// Jumps to `target` if the (boolean) condition is false.
    ///
    /// Comparisons branch on the flags directly instead of materializing a
    /// boolean first.
    fn g_jump_unless(&mut self, cond: &Expr<Typed>, target: Label) -> Result<()> {
        if let ExprKind::Binary { lhs, op, rhs } = &ungroup(cond).kind {
            if op.inner.is_comparison() {
                let (l, r) = self.g_compare(lhs, op.inner, rhs)?;
                self.registers.free(Some(l));
                self.registers.free(Some(r));
                self.out(f!("j{} {target}", inverse_condition_code(op.inner)));
                return Ok(());
            }
        }

        let reg = self.g_value(cond)?;
        self.out(f!("cmp {}, 0", reg.name(Width::Byte)));
        self.registers.free(Some(reg));
        self.out(f!("je {target}"));
        Ok(())
    }

    fn g_assign(
        &mut self,
        target: Interned<str>,
        op: AssignOperator,
        value: &Expr<Typed>,
    ) -> Result<()> {
        let (place, target_ty) = self.place(target)?;
        let width = self.width(target_ty, value.span)?;
        let reg = self.g_value(value)?;

        match op.arithmetic() {
            None => self.g_store(place, width, reg),
            Some(arith) => {
                if target_ty != ValueTag::Int {
                    self.registers.free(Some(reg));
                    return Err(Error::UnsupportedOperand {
                        op: op.symbol(),
                        ty: target_ty,
                    });
                }
                let current = self.registers.allocate()?;
                self.g_load(current, place, width);
                self.g_arith(arith, current, reg);
                self.g_store(place, width, current);
                self.registers.free(Some(current));
            }
        }
        self.registers.free(Some(reg));
        Ok(())
    }
}

/// Expressions.
impl<E> Generator<'_, E>
where
    E: x86_64_env::Env,
{
    /// Evaluates the expression into a freshly allocated register, which the
    /// caller owns.
    fn g_value(&mut self, expr: &Expr<Typed>) -> Result<Register> {
        if expr.info == ValueTag::Error {
            return Err(Error::IllTyped { span: expr.span });
        }
        match &expr.kind {
            ExprKind::Literal(value) => self.g_literal(*value, expr.span),
            ExprKind::Unary { op, rhs } => {
                let (expected, op_symbol) = match op.inner {
                    UnaryOperator::Neg => (ValueTag::Int, "neg"),
                    UnaryOperator::Not => (ValueTag::Bool, "not"),
                };
                if rhs.info != expected {
                    return Err(Error::UnsupportedOperand {
                        op: op.inner.symbol(),
                        ty: rhs.info,
                    });
                }
                let reg = self.g_value(rhs)?;
                self.out(f!("{op_symbol} {reg}"));
                if op.inner == UnaryOperator::Not {
                    self.out(f!("and {reg}, 1"));
                }
                Ok(reg)
            }
            ExprKind::Binary { lhs, op, rhs } if op.inner.is_comparison() => {
                let (l, r) = self.g_compare(lhs, op.inner, rhs)?;
                self.out(f!("mov {l}, 0"));
                self.out(f!("mov {r}, 1"));
                self.out(f!("cmov{} {l}, {r}", condition_code(op.inner)));
                self.registers.free(Some(r));
                Ok(l)
            }
            ExprKind::Binary { lhs, op, rhs } => {
                for operand in [lhs, rhs] {
                    if operand.info != ValueTag::Int {
                        return Err(Error::UnsupportedOperand {
                            op: op.inner.symbol(),
                            ty: operand.info,
                        });
                    }
                }
                let (l, r) = self.g_operands(lhs, rhs)?;
                self.g_arith(op.inner, l, r);
                self.registers.free(Some(r));
                Ok(l)
            }
            ExprKind::Grouping(inner) => self.g_value(inner),
            ExprKind::If { .. }
            | ExprKind::VarDef { .. }
            | ExprKind::Assign { .. }
            | ExprKind::While { .. }
            | ExprKind::FnDef(_)
            | ExprKind::Return { .. } => Err(Error::StatementAsValue { span: expr.span }),
        }
    }

    fn g_literal(&mut self, value: Value, span: Span) -> Result<Register> {
        match value {
            Value::Int(int) => {
                let reg = self.registers.allocate()?;
                self.out(f!("mov {reg}, {int}"));
                Ok(reg)
            }
            Value::Bool(b) => {
                let reg = self.registers.allocate()?;
                self.out(f!("mov {reg}, {}", u8::from(b)));
                Ok(reg)
            }
            Value::String(id) => {
                let reg = self.registers.allocate()?;
                self.out(f!("lea {reg}, [rel str_{id}]"));
                Ok(reg)
            }
            Value::Identifier(name) => {
                let (place, ty) = self.place(name)?;
                let width = self.width(ty, span)?;
                let reg = self.registers.allocate()?;
                self.g_load(reg, place, width);
                Ok(reg)
            }
            Value::None | Value::Error => Err(Error::IllTyped { span }),
        }
    }

    /// Evaluates both operands of a binary operation, returning their
    /// registers in source order.
    ///
    /// The operand which needs more registers is evaluated first, so that the
    /// other one is computed while only a single result is held.
    fn g_operands(
        &mut self,
        lhs: &Expr<Typed>,
        rhs: &Expr<Typed>,
    ) -> Result<(Register, Register)> {
        if register_need(rhs) > register_need(lhs) {
            let r = self.g_value(rhs)?;
            let l = self.g_value(lhs)?;
            Ok((l, r))
        } else {
            let l = self.g_value(lhs)?;
            let r = self.g_value(rhs)?;
            Ok((l, r))
        }
    }

    /// Evaluates both operands and compares them at their width. The caller
    /// owns both registers.
    fn g_compare(
        &mut self,
        lhs: &Expr<Typed>,
        op: BinaryOperator,
        rhs: &Expr<Typed>,
    ) -> Result<(Register, Register)> {
        let valid = if op.is_relational() {
            lhs.info == ValueTag::Int && rhs.info == ValueTag::Int
        } else {
            lhs.info == rhs.info
        };
        if !valid {
            return Err(Error::UnsupportedOperand {
                op: op.symbol(),
                ty: if lhs.info.is_value() { rhs.info } else { lhs.info },
            });
        }
        let Some(width) = Width::of(lhs.info) else {
            return Err(Error::UnsupportedOperand {
                op: op.symbol(),
                ty: lhs.info,
            });
        };

        let (l, r) = self.g_operands(lhs, rhs)?;
        self.out(f!("cmp {}, {}", l.name(width), r.name(width)));
        Ok((l, r))
    }

    /// Combines `r` into `l`.
    fn g_arith(&mut self, op: BinaryOperator, l: Register, r: Register) {
        match op {
            BinaryOperator::Add => self.out(f!("add {l}, {r}")),
            BinaryOperator::Sub => self.out(f!("sub {l}, {r}")),
            BinaryOperator::Mul => self.out(f!("imul {l}, {r}")),
            BinaryOperator::Div => {
                self.out(f!("mov rax, {l}"));
                self.out("cqo");
                self.out(f!("idiv {r}"));
                self.out(f!("mov {l}, rax"));
            }
            _ => unreachable!("not an arithmetic operator"),
        }
    }

    fn g_load(&mut self, reg: Register, place: Place<'_>, width: Width) {
        let ptr = width.ptr();
        match width {
            Width::Qword => self.out(f!("mov {reg}, {ptr} {place}")),
            // Writing the 32-bit view zero-extends into the full register.
            Width::Dword => self.out(f!("mov {}, {ptr} {place}", reg.name(width))),
            Width::Byte | Width::Word => self.out(f!("movzx {reg}, {ptr} {place}")),
        }
    }

    fn g_store(&mut self, place: Place<'_>, width: Width, reg: Register) {
        self.out(f!("mov {} {place}, {}", width.ptr(), reg.name(width)));
    }
}

/// Utility functions.
impl<'ctx, E> Generator<'ctx, E>
where
    E: x86_64_env::Env,
{
    /// Resolves the storage of a name, along with its declared type.
    /// Parameters of the current function shadow globals.
    fn place(&self, name: Interned<str>) -> Result<(Place<'ctx>, ValueTag)> {
        let ctx = self.ctx;
        if let Some(frame) = &self.frame {
            let mut offset = 0;
            for param in &frame.params {
                if param.name.name == name {
                    return Ok((Place::Param(offset), param.ty));
                }
                offset += param.ty.size().unwrap_or(0);
            }
        }
        match ctx.symbols.lookup(name) {
            Some(Symbol::Variable(v)) => Ok((Place::Global(ctx.ident(name)), v.ty)),
            _ => Err(Error::UnresolvedName {
                name: ctx.ident(name).to_owned(),
            }),
        }
    }

    fn width(&self, ty: ValueTag, span: Span) -> Result<Width> {
        match ty {
            ValueTag::Error => Err(Error::IllTyped { span }),
            _ => Width::of(ty).ok_or(Error::StatementAsValue { span }),
        }
    }

    /// Prints a line.
    fn out(&mut self, f: impl fmt::Display) {
        let indent = if self.indent { "    " } else { "" };
        writeln!(self.code, "{indent}{f}").expect("code emit should be infallible");
    }

    /// Prints a line without indentation.
    fn directive(&mut self, f: impl fmt::Display) {
        writeln!(self.code, "{f}").expect("code emit should be infallible");
    }

    fn label(&mut self, name: impl fmt::Display) {
        self.directive(f!("{name}:"));
    }

    /// Prints an empty line.
    fn out_line(&mut self) {
        self.code.push('\n');
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        self.out_line();
        res
    }
}

/// Number of registers needed to evaluate the expression without spilling.
fn register_need(expr: &Expr<Typed>) -> u32 {
    match &expr.kind {
        ExprKind::Unary { rhs, .. } => register_need(rhs),
        ExprKind::Grouping(inner) => register_need(inner),
        ExprKind::Binary { lhs, rhs, .. } => {
            let (l, r) = (register_need(lhs), register_need(rhs));
            if l == r {
                l + 1
            } else {
                l.max(r)
            }
        }
        _ => 1,
    }
}

fn ungroup(mut expr: &Expr<Typed>) -> &Expr<Typed> {
    while let ExprKind::Grouping(inner) = &expr.kind {
        expr = inner;
    }
    expr
}

/// Suffix of the `set`/`cmov`/`j` instruction family that holds when the
/// comparison is true.
fn condition_code(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Eq => "e",
        BinaryOperator::Ne => "ne",
        BinaryOperator::Lt => "l",
        BinaryOperator::Le => "le",
        BinaryOperator::Gt => "g",
        BinaryOperator::Ge => "ge",
        _ => unreachable!("not a comparison"),
    }
}

fn inverse_condition_code(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Eq => "ne",
        BinaryOperator::Ne => "e",
        BinaryOperator::Lt => "ge",
        BinaryOperator::Le => "g",
        BinaryOperator::Gt => "le",
        BinaryOperator::Ge => "l",
        _ => unreachable!("not a comparison"),
    }
}

/// Where a name lives at runtime.
#[derive(Copy, Clone)]
enum Place<'a> {
    Global(&'a str),
    /// Offset from `rsp` into the parameter area of the current frame.
    Param(u32),
}

impl fmt::Display for Place<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Global(name) => write!(f, "[rel var_{name}]"),
            Place::Param(offset) => write!(f, "[rsp + {offset}]"),
        }
    }
}

#[derive(Copy, Clone)]
struct Label {
    prefix: &'static str,
    n: u32,
    suffix: &'static str,
}

impl Label {
    fn new(prefix: &'static str, n: u32, suffix: &'static str) -> Label {
        Label { prefix, n, suffix }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.prefix, self.n, self.suffix)
    }
}

#[derive(Copy, Clone)]
struct FnLabel<'a>(&'a str);

impl fmt::Display for FnLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn_{}", self.0)
    }
}

/// Operands of a `db` directive spelling out the string, NUL-terminated.
///
/// Printable characters are grouped into quoted runs; anything else
/// (including the quote itself) is written as a byte value.
struct DataBytes<'a>(&'a str);

impl fmt::Display for DataBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut quoted = false;
        for (i, byte) in self.0.bytes().enumerate() {
            let printable = (b' '..=b'~').contains(&byte) && byte != b'"';
            match (printable, quoted) {
                (true, true) => f.write_char(char::from(byte))?,
                (true, false) => {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{}", char::from(byte))?;
                    quoted = true;
                }
                (false, _) => {
                    if quoted {
                        f.write_char('"')?;
                        quoted = false;
                    }
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{byte}")?;
                }
            }
        }
        if quoted {
            f.write_char('"')?;
        }
        if !self.0.is_empty() {
            f.write_str(", ")?;
        }
        f.write_char('0')
    }
}
