use crate::{
    ast::{
        AssignOperator, BinaryOperator, Expr, ExprKind, FnDef, Info, Param, Program, Typed,
        UnaryOperator, Untyped,
    },
    context::{well_known, Context},
    symbol::Symbol,
    token::{Span, Spanned},
    util::intern::Interned,
    value::{Value, ValueTag},
};

pub type CheckResult<T> = Result<T, (T, Vec<Spanned<Error>>)>;

/// Verifies that the program defines a valid entry point, that is, a
/// `fn main() int` without parameters.
pub fn check_main(ctx: &Context) -> Result<(), Spanned<Error>> {
    match ctx.symbols.lookup(well_known::MAIN) {
        Some(Symbol::Function(f)) if f.param_types.is_empty() && f.return_ty == ValueTag::Int => {
            Ok(())
        }
        Some(other) => Err(other.span().wrap(Error::InvalidMain)),
        None => Err(Span::new_of_length(0, 0).wrap(Error::MainNotDefined)),
    }
}

/// Assigns a type to every node of the program.
///
/// Ill-typed nodes are tagged with [`ValueTag::Error`], which is silently
/// propagated to their parents so that a single mistake is reported once.
/// Sibling statements are still checked, collecting every independent error.
pub struct Checker<'ctx> {
    ctx: &'ctx Context,
    errors: Vec<Spanned<Error>>,
    /// The function whose body is being checked, if any.
    current_fn: Option<FnScope>,
    /// Number of enclosing statement bodies. Zero at the top level.
    depth: u32,
}

struct FnScope {
    params: Vec<Param>,
    return_ty: ValueTag,
}

/// What an identifier refers to.
enum Resolved {
    Value(ValueTag),
    Function,
}

impl<'ctx> Checker<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Checker<'ctx> {
        Checker {
            ctx,
            errors: Vec::with_capacity(8),
            current_fn: None,
            depth: 0,
        }
    }

    pub fn check(mut self, program: Program<Untyped>) -> CheckResult<Program<Typed>> {
        let body = self.check_body(program.body);
        let program = Program { body };
        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err((program, self.errors))
        }
    }

    fn check_body(&mut self, body: Vec<Expr<Untyped>>) -> Vec<Expr<Typed>> {
        body.into_iter().map(|stmt| self.check_expr(stmt)).collect()
    }

    fn check_nested_body(&mut self, body: Vec<Expr<Untyped>>) -> Vec<Expr<Typed>> {
        self.depth += 1;
        let body = self.check_body(body);
        self.depth -= 1;
        body
    }

    fn check_expr(&mut self, expr: Expr<Untyped>) -> Expr<Typed> {
        let span = expr.span;
        let (kind, info) = match expr.kind {
            ExprKind::Literal(value) => {
                let ty = self.check_literal(value, span);
                (ExprKind::Literal(value), ty)
            }
            ExprKind::Unary { op, rhs } => {
                let rhs = self.check_expr(*rhs);
                let ty = self.check_unary(op, rhs.info);
                let kind = ExprKind::Unary {
                    op,
                    rhs: Box::new(rhs),
                };
                (kind, ty)
            }
            ExprKind::Binary { lhs, op, rhs } => {
                let lhs = self.check_expr(*lhs);
                let rhs = self.check_expr(*rhs);
                let ty = self.check_binary(op, lhs.info, rhs.info);
                let kind = ExprKind::Binary {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                };
                (kind, ty)
            }
            ExprKind::Grouping(inner) => {
                let inner = self.check_expr(*inner);
                let ty = inner.info;
                (ExprKind::Grouping(Box::new(inner)), ty)
            }
            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond = self.check_condition(*cond);
                let then_body = self.check_nested_body(then_body);
                let else_body = else_body.map(|body| self.check_nested_body(body));

                let ok = cond.info != ValueTag::Error
                    && all_ok(&then_body)
                    && else_body.as_deref().is_none_or(all_ok);
                let kind = ExprKind::If {
                    cond: Box::new(cond),
                    then_body,
                    else_body,
                };
                (kind, statement(ok))
            }
            ExprKind::While { cond, body } => {
                let cond = self.check_condition(*cond);
                let body = self.check_nested_body(body);

                let ok = cond.info != ValueTag::Error && all_ok(&body);
                let kind = ExprKind::While {
                    cond: Box::new(cond),
                    body,
                };
                (kind, statement(ok))
            }
            ExprKind::VarDef {
                name,
                ty,
                initializer,
            } => {
                let initializer = initializer.map(|init| Box::new(self.check_expr(*init)));
                let ok = match &initializer {
                    Some(init) => self.expect(ty, init.info, init.span),
                    None => true,
                };
                let kind = ExprKind::VarDef {
                    name,
                    ty,
                    initializer,
                };
                (kind, statement(ok))
            }
            ExprKind::Assign { target, op, value } => {
                let value = self.check_expr(*value);
                let ok = self.check_assignment(target.name, target.span, op, &value);
                let kind = ExprKind::Assign {
                    target,
                    op,
                    value: Box::new(value),
                };
                (kind, statement(ok))
            }
            ExprKind::FnDef(def) => {
                let (def, ok) = self.check_fn_def(def);
                (ExprKind::FnDef(def), statement(ok))
            }
            ExprKind::Return { value } => {
                let value = self.check_expr(*value);
                let ok = match self.current_fn.as_ref().map(|f| f.return_ty) {
                    Some(return_ty) => self.expect(return_ty, value.info, value.span),
                    None => {
                        self.error(span.wrap(Error::ReturnOutsideFunction));
                        false
                    }
                };
                let kind = ExprKind::Return {
                    value: Box::new(value),
                };
                (kind, statement(ok))
            }
        };
        Expr { kind, span, info }
    }

    fn check_literal(&mut self, value: Value, span: Span) -> ValueTag {
        match value {
            Value::Int(_) => ValueTag::Int,
            Value::Bool(_) => ValueTag::Bool,
            Value::String(_) => ValueTag::String,
            Value::None => ValueTag::None,
            Value::Error => ValueTag::Error,
            Value::Identifier(name) => match self.resolve(name) {
                Some(Resolved::Value(ty)) => ty,
                Some(Resolved::Function) => {
                    self.error(span.wrap(Error::FunctionAsValue(name)));
                    ValueTag::Error
                }
                None => {
                    self.error(span.wrap(Error::UndefinedName(name)));
                    ValueTag::Error
                }
            },
        }
    }

    fn check_unary(&mut self, op: Spanned<UnaryOperator>, operand: ValueTag) -> ValueTag {
        if operand == ValueTag::Error {
            return ValueTag::Error;
        }
        let expected = match op.inner {
            UnaryOperator::Neg => ValueTag::Int,
            UnaryOperator::Not => ValueTag::Bool,
        };
        if operand == expected {
            return expected;
        }
        let error = Error::InvalidUnaryOperand {
            op: op.inner,
            operand,
        };
        self.error(op.span.wrap(error));
        ValueTag::Error
    }

    fn check_binary(
        &mut self,
        op: Spanned<BinaryOperator>,
        lhs: ValueTag,
        rhs: ValueTag,
    ) -> ValueTag {
        if lhs == ValueTag::Error || rhs == ValueTag::Error {
            return ValueTag::Error;
        }
        let both_int = lhs == ValueTag::Int && rhs == ValueTag::Int;
        let (valid, ty) = match op.inner {
            o if o.is_arithmetic() => (both_int, ValueTag::Int),
            o if o.is_relational() => (both_int, ValueTag::Bool),
            _ => (lhs == rhs && lhs.is_value(), ValueTag::Bool),
        };
        if valid {
            return ty;
        }
        let error = Error::InvalidBinaryOperands {
            op: op.inner,
            lhs,
            rhs,
        };
        self.error(op.span.wrap(error));
        ValueTag::Error
    }

    fn check_condition(&mut self, cond: Expr<Untyped>) -> Expr<Typed> {
        let mut cond = self.check_expr(cond);
        if !self.expect(ValueTag::Bool, cond.info, cond.span) {
            cond.info = ValueTag::Error;
        }
        cond
    }

    fn check_assignment(
        &mut self,
        target: Interned<str>,
        target_span: Span,
        op: Spanned<AssignOperator>,
        value: &Expr<Typed>,
    ) -> bool {
        let target_ty = match self.resolve(target) {
            Some(Resolved::Value(ty)) => ty,
            Some(Resolved::Function) => {
                self.error(target_span.wrap(Error::AssignToFunction(target)));
                return false;
            }
            None => {
                self.error(target_span.wrap(Error::UndefinedName(target)));
                return false;
            }
        };
        if op.inner.arithmetic().is_some() && target_ty != ValueTag::Int {
            let error = Error::InvalidCompoundAssignment {
                op: op.inner,
                target: target_ty,
            };
            self.error(op.span.wrap(error));
            return false;
        }
        self.expect(target_ty, value.info, value.span)
    }

    fn check_fn_def(&mut self, def: FnDef<Untyped>) -> (FnDef<Typed>, bool) {
        let FnDef {
            name,
            params,
            return_ty,
            body,
        } = def;

        let mut ok = true;
        if self.depth > 0 {
            self.error(name.span.wrap(Error::NestedFunction));
            ok = false;
        }

        let scope = FnScope {
            params: params.clone(),
            return_ty,
        };
        let outer = self.current_fn.replace(scope);
        let body = self.check_nested_body(body);
        self.current_fn = outer;

        if !body.iter().any(terminates) {
            self.error(name.span.wrap(Error::MissingReturn(name.name)));
            ok = false;
        }

        let ok = ok && all_ok(&body);
        let def = FnDef {
            name,
            params,
            return_ty,
            body,
        };
        (def, ok)
    }

    /// Parameters of the enclosing function shadow global symbols.
    fn resolve(&self, name: Interned<str>) -> Option<Resolved> {
        let param = self
            .current_fn
            .iter()
            .flat_map(|f| &f.params)
            .find(|p| p.name.name == name);
        if let Some(param) = param {
            return Some(Resolved::Value(param.ty));
        }
        match self.ctx.symbols.lookup(name)? {
            Symbol::Variable(v) => Some(Resolved::Value(v.ty)),
            Symbol::Function(_) => Some(Resolved::Function),
        }
    }

    /// Reports a mismatch unless `actual` is `expected`. An `Error` type fails
    /// silently, as it was reported where it originated.
    fn expect(&mut self, expected: ValueTag, actual: ValueTag, span: Span) -> bool {
        if actual == ValueTag::Error {
            return false;
        }
        if actual != expected {
            self.error(span.wrap(Error::Mismatch { expected, actual }));
            return false;
        }
        true
    }

    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }
}

/// Whether every control-flow path through the statement ends in a `return`.
fn terminates<I: Info>(stmt: &Expr<I>) -> bool {
    match &stmt.kind {
        ExprKind::Return { .. } => true,
        ExprKind::If {
            then_body,
            else_body: Some(else_body),
            ..
        } => then_body.iter().any(terminates) && else_body.iter().any(terminates),
        _ => false,
    }
}

fn all_ok(body: &[Expr<Typed>]) -> bool {
    body.iter().all(|stmt| stmt.info != ValueTag::Error)
}

fn statement(ok: bool) -> ValueTag {
    if ok {
        ValueTag::None
    } else {
        ValueTag::Error
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UndefinedName(Interned<str>),
    Mismatch {
        expected: ValueTag,
        actual: ValueTag,
    },
    InvalidUnaryOperand {
        op: UnaryOperator,
        operand: ValueTag,
    },
    InvalidBinaryOperands {
        op: BinaryOperator,
        lhs: ValueTag,
        rhs: ValueTag,
    },
    InvalidCompoundAssignment {
        op: AssignOperator,
        target: ValueTag,
    },
    FunctionAsValue(Interned<str>),
    AssignToFunction(Interned<str>),
    ReturnOutsideFunction,
    NestedFunction,
    MissingReturn(Interned<str>),
    MainNotDefined,
    InvalidMain,
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::{check_main_errors, tree_tests};

    tree_tests!(
        use checker;

        fn test_arith_precedence_is_int() {
            let expr = "2 + 3 * 4";
            let tree_ok = "
                binary + (0..9 %: int)
                  int 2 (0..1 %: int)
                  binary * (4..9 %: int)
                    int 3 (4..5 %: int)
                    int 4 (8..9 %: int)
            ";
        }

        fn test_comparisons_are_bool() {
            let expr = "(1 < 2) == not false";
            let tree_ok = "
                binary == (0..20 %: bool)
                  grouping (0..7 %: bool)
                    binary < (1..6 %: bool)
                      int 1 (1..2 %: int)
                      int 2 (5..6 %: int)
                  unary not (11..20 %: bool)
                    bool false (15..20 %: bool)
            ";
        }

        fn test_string_equality() {
            let expr = r#""a" != "b""#;
            let tree_ok = r#"
                binary != (0..10 %: bool)
                  string #0 "a" (0..3 %: string)
                  string #1 "b" (7..10 %: string)
            "#;
        }

        fn test_arith_on_bool() {
            let expr = "1 + true";
            let expected_errors = &["2..3: cannot perform + operation on types int and bool"];
            let tree_error = "
                binary + (0..8 %: error)
                  int 1 (0..1 %: int)
                  bool true (4..8 %: bool)
            ";
        }

        fn test_relational_on_strings() {
            let expr = r#""a" < "b""#;
            let expected_errors = &["4..5: cannot perform < operation on types string and string"];
        }

        fn test_equality_on_different_types() {
            let expr = "1 == false";
            let expected_errors = &["2..4: cannot perform == operation on types int and bool"];
        }

        fn test_unary_operands() {
            let expr = "-true == not 1";
            let expected_errors = &[
                "0..1: cannot perform - operation on type bool",
                "9..12: cannot perform not operation on type int",
            ];
        }

        fn test_errors_do_not_cascade() {
            let expr = "(1 + true) * 2 - 3";
            let expected_errors = &["3..4: cannot perform + operation on types int and bool"];
        }

        fn test_undefined_name() {
            let expr = "y + 1";
            let expected_errors = &["0..1: y is not defined"];
        }

        fn test_var_and_compound_assignment() {
            let program = "var x: int = 5\nx += 3\nx";
            let tree_ok = "
                var x: int (0..14 %: none)
                  int 5 (13..14 %: int)
                assign x += (15..21 %: none)
                  int 3 (20..21 %: int)
                ident x (22..23 %: int)
            ";
        }

        fn test_bool_assigned_to_int() {
            let program = "var x: int\nx = true";
            let expected_errors = &["15..19: expected type int, but got bool"];
        }

        fn test_initializer_mismatch() {
            let program = r#"var s: string = 1"#;
            let expected_errors = &["16..17: expected type string, but got int"];
        }

        fn test_compound_assignment_on_non_int() {
            let program = "var b: bool\nb += 1";
            let expected_errors = &["14..16: cannot perform += operation on type bool"];
        }

        fn test_conditions_must_be_bool() {
            let program = "if 1 then end\nwhile \"s\" do end";
            let expected_errors = &[
                "3..4: expected type bool, but got int",
                "20..23: expected type bool, but got string",
            ];
        }

        fn test_independent_errors_are_all_reported() {
            let program = "var a: int = true\nvar b: bool = 2\nvar c: int = 3";
            let expected_errors = &[
                "13..17: expected type int, but got bool",
                "32..33: expected type bool, but got int",
            ];
            let tree_error = "
                var a: int (0..17 %: error)
                  bool true (13..17 %: bool)
                var b: bool (18..33 %: error)
                  int 2 (32..33 %: int)
                var c: int (34..48 %: none)
                  int 3 (47..48 %: int)
            ";
        }

        fn test_function_as_value() {
            let program = "fn f() int return 1 end\nvar x: int = f\nf = 2";
            let expected_errors = &[
                "37..38: function `f` cannot be used as a value",
                "39..40: cannot assign to function `f`",
            ];
        }

        fn test_params_shadow_globals() {
            let program = "var a: bool\nfn f(a: int) int return a + 1 end";
            let tree_ok = "
                var a: bool (0..11 %: none)
                fn f(a: int) int (12..45 %: none)
                  return (29..41 %: none)
                    binary + (36..41 %: int)
                      ident a (36..37 %: int)
                      int 1 (40..41 %: int)
            ";
        }

        fn test_return_type_mismatch() {
            let program = "fn f() bool return 1 end";
            let expected_errors = &["19..20: expected type bool, but got int"];
        }

        fn test_return_outside_function() {
            let program = "return 1";
            let expected_errors = &["0..8: return outside of a function"];
        }

        fn test_nested_function() {
            let program = "fn f() int fn g() int return 1 end return 2 end";
            let expected_errors = &["14..15: functions can only be defined at the top level"];
        }

        fn test_function_inside_top_level_if() {
            let program = "if true then fn f() int return 1 end end";
            let expected_errors = &["16..17: functions can only be defined at the top level"];
        }

        fn test_missing_return() {
            let program = "fn f() int var x: int = 1 end";
            let expected_errors = &["3..4: function `f` must return value"];
        }

        fn test_empty_body_is_missing_return() {
            let program = "fn f() int end";
            let expected_errors = &["3..4: function `f` must return value"];
        }

        fn test_return_in_one_branch_only() {
            let program = "fn f(b: bool) int if b then return 1 end end";
            let expected_errors = &["3..4: function `f` must return value"];
        }

        fn test_return_in_both_branches() {
            let program = "fn f(b: bool) int if b then return 1 else return 2 end end";
            let expected_errors = &[];
        }

        fn test_return_after_if() {
            let program = "fn f(b: bool) int if b then return 1 end return 0 end";
            let expected_errors = &[];
        }

        fn test_return_inside_while_is_not_enough() {
            let program = "fn f() int while true do return 1 end end";
            let expected_errors = &["3..4: function `f` must return value"];
        }
    );

    #[test]
    fn main_must_be_defined() {
        assert_eq!(
            check_main_errors("var x: int"),
            ["0..0: function `main` not defined"]
        );
    }

    #[test]
    fn main_must_be_a_nullary_int_function() {
        let msg = "symbol `main` must be a function with no parameters and a return type of int";
        assert_eq!(
            check_main_errors("fn main(a: int) int return a end"),
            [format!("3..7: {msg}")]
        );
        assert_eq!(
            check_main_errors("fn main() bool return true end"),
            [format!("3..7: {msg}")]
        );
        assert_eq!(check_main_errors("var main: int"), [format!("4..8: {msg}")]);
    }

    #[test]
    fn valid_main() {
        assert!(check_main_errors("fn main() int return 0 end").is_empty());
    }
}
