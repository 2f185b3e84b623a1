use crate::{
    ast::{
        AssignOperator, BinaryOperator, Expr, ExprKind, FnDef, Ident, Param, Program,
        UnaryOperator, Untyped,
    },
    context::Context,
    lexer::{self, extract},
    token::{Span, Spanned, Token, TokenKind},
    util::intern::Interned,
    value::{Value, ValueTag},
};

type Result<T, E = ()> = std::result::Result<T, E>;

pub type ParseResult<T> = Result<T, (T, Vec<Spanned<Error>>)>;

/// Tokens which may start a statement. Used as synchronization points when
/// recovering from a syntax error.
const STATEMENT_STARTS: &[TokenKind] = &[
    TokenKind::Var,
    TokenKind::Fn,
    TokenKind::If,
    TokenKind::While,
    TokenKind::Return,
];

/// Parses a whole program.
///
/// Every declaration is recorded in `ctx.symbols` and every string literal is
/// interned in `ctx.constants` as a side effect.
pub fn parse_program(
    src: &str,
    tokens: &mut Vec<Token>,
    ctx: &mut Context,
) -> ParseResult<Program<Untyped>> {
    parse(src, tokens, ctx, Parser::parse_program, Program::default)
}

/// Parses a single expression. Mostly useful for testing.
pub fn parse_expr(
    src: &str,
    tokens: &mut Vec<Token>,
    ctx: &mut Context,
) -> ParseResult<Expr<Untyped>> {
    let default = || Expr::new(ExprKind::Literal(Value::Error), Token::eof_for(src).span());
    parse(src, tokens, ctx, Parser::parse_whole_expr, default)
}

fn parse<'src, 'tok, 'ctx, T>(
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    ctx: &'ctx mut Context,
    f: impl for<'a> FnOnce(&'a mut Parser<'src, 'tok, 'ctx>) -> Result<T>,
    default: impl FnOnce() -> T,
) -> ParseResult<T> {
    assert!(tokens.is_empty());

    lexer::lex(src, tokens);
    let mut p = Parser::new(src, tokens, ctx);
    let parse_result = f(&mut p);

    let success = parse_result.is_ok();
    let el = parse_result.unwrap_or_else(|()| default());
    if p.errors.is_empty() {
        assert!(success);
        Ok(el)
    } else {
        Err((el, p.errors))
    }
}

struct Parser<'src, 'tok, 'ctx> {
    src: &'src str,
    tokens: &'tok [Token],
    ctx: &'ctx mut Context,
    cursor: usize,
    errors: Vec<Spanned<Error>>,
}

impl Parser<'_, '_, '_> {
    fn parse_program(&mut self) -> Result<Program<Untyped>> {
        let body = self.parse_block(&[]);
        self.consume(TokenKind::Eof)?;
        Ok(Program { body })
    }

    fn parse_whole_expr(&mut self) -> Result<Expr<Untyped>> {
        let expr = self.parse_expr()?;
        self.consume(TokenKind::Eof)?;
        Ok(expr)
    }

    /// Parses statements until one of `terminators` (or the end of file) is
    /// found. Does **NOT** consume the terminator.
    fn parse_block(&mut self, terminators: &[TokenKind]) -> Vec<Expr<Untyped>> {
        let stop: Vec<_> = STATEMENT_STARTS.iter().chain(terminators).copied().collect();

        let mut body = Vec::new();
        while self.except(terminators.iter().copied()) {
            let before = self.cursor;
            match self.synchronize(&[], &stop, |p| p.parse_stmt()) {
                Ok(stmt) => body.push(stmt),
                // The statement failed on its very first token, which is a
                // synchronization point itself. Skip it to make progress.
                Err(()) if self.cursor == before => {
                    self.advance();
                }
                Err(()) => (),
            }
        }
        body
    }

    fn parse_stmt(&mut self) -> Result<Expr<Untyped>> {
        match self.peek().kind {
            TokenKind::Var => self.parse_var_def(),
            TokenKind::Fn => self.parse_fn_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            _ => self.parse_expr_or_assignment(),
        }
    }

    fn parse_var_def(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::Var)?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let (ty, ty_span) = self.parse_type()?;
        let initializer = if self.take(TokenKind::Assign) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        if let Err(other_definition_span) = self.ctx.symbols.add_variable(name.name, ty, name.span)
        {
            self.redefinition(name, other_definition_span);
        }

        let end = initializer.as_ref().map_or(ty_span, |init| init.span);
        let kind = ExprKind::VarDef {
            name,
            ty,
            initializer,
        };
        Ok(Expr::new(kind, start.span().to(end)))
    }

    fn parse_fn_def(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::Fn)?;
        let name = self.parse_ident()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, |p| p.parse_param())?;
        self.consume(TokenKind::RParen)?;
        let (return_ty, _) = self.parse_type()?;

        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|other| other.name.name == param.name.name) {
                let error = Error::DuplicateParameter {
                    name: param.name.name,
                };
                self.error(param.name.span.wrap(error));
            }
        }

        let declared = self.ctx.symbols.add_function(
            name.name,
            params.iter().map(|p| p.ty).collect(),
            params.iter().map(|p| p.name.name).collect(),
            return_ty,
            name.span,
        );
        if let Err(other_definition_span) = declared {
            self.redefinition(name, other_definition_span);
        }

        let body = self.parse_block(&[TokenKind::End]);
        let end = self.consume(TokenKind::End)?;

        let def = FnDef {
            name,
            params,
            return_ty,
            body,
        };
        Ok(Expr::new(ExprKind::FnDef(def), start.span().to(end.span())))
    }

    fn parse_param(&mut self) -> Result<Param> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::Colon)?;
        let (ty, _) = self.parse_type()?;
        Ok(Param { name, ty })
    }

    fn parse_if(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::If)?;
        let cond = self.parse_expr()?;
        self.consume(TokenKind::Then)?;
        let then_body = self.parse_block(&[TokenKind::Else, TokenKind::End]);
        let else_body = if self.take(TokenKind::Else) {
            Some(self.parse_block(&[TokenKind::End]))
        } else {
            None
        };
        let end = self.consume(TokenKind::End)?;

        let kind = ExprKind::If {
            cond: Box::new(cond),
            then_body,
            else_body,
        };
        Ok(Expr::new(kind, start.span().to(end.span())))
    }

    fn parse_while(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::While)?;
        let cond = self.parse_expr()?;
        self.consume(TokenKind::Do)?;
        let body = self.parse_block(&[TokenKind::End]);
        let end = self.consume(TokenKind::End)?;

        let kind = ExprKind::While {
            cond: Box::new(cond),
            body,
        };
        Ok(Expr::new(kind, start.span().to(end.span())))
    }

    fn parse_return(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::Return)?;
        let value = self.parse_expr()?;
        let span = start.span().to(value.span);
        let kind = ExprKind::Return {
            value: Box::new(value),
        };
        Ok(Expr::new(kind, span))
    }

    /// Parses an expression statement, or an assignment if the expression is
    /// followed by an assignment operator.
    fn parse_expr_or_assignment(&mut self) -> Result<Expr<Untyped>> {
        let lhs = self.parse_expr()?;

        let op_token = self.peek();
        let Some(op) = Self::assign_operator(op_token.kind) else {
            return Ok(lhs);
        };
        self.advance();

        let ExprKind::Literal(Value::Identifier(name)) = lhs.kind else {
            self.error(lhs.span.wrap(Error::InvalidAssignmentTarget));
            return Err(());
        };
        let target = Ident {
            name,
            span: lhs.span,
        };

        let value = self.parse_expr()?;
        let span = lhs.span.to(value.span);
        let kind = ExprKind::Assign {
            target,
            op: op_token.span().wrap(op),
            value: Box::new(value),
        };
        Ok(Expr::new(kind, span))
    }

    fn parse_type(&mut self) -> Result<(ValueTag, Span)> {
        const TYPES: &[TokenKind] = &[TokenKind::TypeInt, TokenKind::TypeBool, TokenKind::TypeString];
        let token = self.consume_any(TYPES)?;
        let ty = match token.kind {
            TokenKind::TypeInt => ValueTag::Int,
            TokenKind::TypeBool => ValueTag::Bool,
            TokenKind::TypeString => ValueTag::String,
            _ => unreachable!(),
        };
        Ok((ty, token.span()))
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: self.intern_ident(token),
            span: token.span(),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr<Untyped>> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr<Untyped>> {
        let lhs_token = self.advance();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();
            let Some(op) = Self::binary_operator(op_token.kind) else {
                break;
            };
            let (lbp, rbp) = Self::infix_binding_power(op);
            if lbp < min_bp {
                break;
            }
            self.advance();

            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span.to(rhs.span);
            let kind = ExprKind::Binary {
                lhs: Box::new(lhs),
                op: op_token.span().wrap(op),
                rhs: Box::new(rhs),
            };
            lhs = Expr::new(kind, span);
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    fn parse_nud(&mut self, token: Token) -> Result<Expr<Untyped>> {
        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let name = self.intern_ident(token);
                (ExprKind::Literal(Value::Identifier(name)), token.span())
            }
            TokenKind::Number => {
                let Ok(parsed) = extract::int(token, self.src) else {
                    self.error(token.span().wrap(Error::ParseInt));
                    return Err(());
                };
                (ExprKind::Literal(Value::Int(parsed)), token.span())
            }
            TokenKind::String => {
                let id = self.ctx.constants.add(&extract::string(token, self.src));
                (ExprKind::Literal(Value::String(id)), token.span())
            }
            TokenKind::EscapedString => {
                let id = self.ctx.constants.add(&extract::escaped_string(token, self.src));
                (ExprKind::Literal(Value::String(id)), token.span())
            }
            TokenKind::True => (ExprKind::Literal(Value::Bool(true)), token.span()),
            TokenKind::False => (ExprKind::Literal(Value::Bool(false)), token.span()),

            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                (
                    ExprKind::Grouping(Box::new(expr)),
                    token.span().to(end.span()),
                )
            }

            TokenKind::Minus if self.is_min_int_magnitude() => {
                let number = self.advance();
                let span = token.span().to(number.span());
                (ExprKind::Literal(Value::Int(i32::MIN)), span)
            }

            kind @ (TokenKind::Minus | TokenKind::Not) => {
                let op = match kind {
                    TokenKind::Minus => UnaryOperator::Neg,
                    TokenKind::Not => UnaryOperator::Not,
                    _ => unreachable!(),
                };
                let rhs = self.parse_expr_bp(Self::PREFIX_BINDING_POWER)?;
                let span = token.span().to(rhs.span);
                let unary = ExprKind::Unary {
                    op: token.span().wrap(op),
                    rhs: Box::new(rhs),
                };
                (unary, span)
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                self.error(token.span().wrap(error));
                return Err(());
            }
        };

        Ok(Expr::new(kind, span))
    }

    /// Whether the current token is `2147483648`, which is only in bounds as
    /// the operand of a negation.
    fn is_min_int_magnitude(&self) -> bool {
        let c = self.peek();
        c.kind == TokenKind::Number
            && c.span().substr(self.src).parse::<i64>() == Ok(-i64::from(i32::MIN))
    }

    /// Parses `item (separator item)*` until `end_delim` is found. Does
    /// **NOT** consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        while self.except([end_delim]) {
            let item = self.synchronize(&[separator], &[end_delim], |p| parse_item(p))?;
            items.push(item);

            if !self.take(separator) {
                if self.is(end_delim) {
                    break;
                }
                let c = self.peek();
                self.error(c.span().wrap(Error::UnexpectedAny {
                    actual: c.kind,
                    expected: Box::from([separator, end_delim]),
                }));
                return Err(());
            }
        }

        Ok(items)
    }

    const PREFIX_BINDING_POWER: u8 = 9;

    fn infix_binding_power(op: BinaryOperator) -> (u8, u8) {
        match op {
            BinaryOperator::Eq | BinaryOperator::Ne => (1, 2),
            BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge => {
                (3, 4)
            }
            BinaryOperator::Add | BinaryOperator::Sub => (5, 6),
            BinaryOperator::Mul | BinaryOperator::Div => (7, 8),
        }
    }

    fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
        let op = match kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Sub,
            TokenKind::Star => BinaryOperator::Mul,
            TokenKind::Slash => BinaryOperator::Div,
            TokenKind::EqEq => BinaryOperator::Eq,
            TokenKind::BangEq => BinaryOperator::Ne,
            TokenKind::Less => BinaryOperator::Lt,
            TokenKind::LessEq => BinaryOperator::Le,
            TokenKind::Greater => BinaryOperator::Gt,
            TokenKind::GreaterEq => BinaryOperator::Ge,
            _ => return None,
        };
        Some(op)
    }

    fn assign_operator(kind: TokenKind) -> Option<AssignOperator> {
        let op = match kind {
            TokenKind::Assign => AssignOperator::Set,
            TokenKind::PlusEq => AssignOperator::Add,
            TokenKind::MinusEq => AssignOperator::Sub,
            TokenKind::StarEq => AssignOperator::Mul,
            TokenKind::SlashEq => AssignOperator::Div,
            _ => return None,
        };
        Some(op)
    }
}

impl Parser<'_, '_, '_> {
    fn new<'src, 'tok, 'ctx>(
        src: &'src str,
        tokens: &'tok [Token],
        ctx: &'ctx mut Context,
    ) -> Parser<'src, 'tok, 'ctx> {
        let mut p = Parser {
            src,
            tokens,
            ctx,
            cursor: 0,
            errors: Vec::with_capacity(8),
        };
        p.skip_trivia();
        p
    }

    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    fn redefinition(&mut self, name: Ident, other_definition_span: Span) {
        let error = Error::Redefinition {
            name: name.name,
            other_definition_span,
        };
        self.error(name.span.wrap(error));
    }

    fn intern_ident(&mut self, token: Token) -> Interned<str> {
        self.ctx.idents.intern(extract::ident(token, self.src))
    }

    /// Moves the cursor past any trivia, reporting the lexer errors found on
    /// the way.
    fn skip_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.cursor) {
            if !token.kind.is_trivia() {
                break;
            }
            if token.kind.is_error() {
                let error = Error::Lexer(token.kind);
                self.error(token.span().wrap(error));
            }
            self.cursor += 1;
        }
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the current token and advances. Skips any trivia.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
            self.skip_trivia();
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not, records
    /// an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            self.error(c.span().wrap(Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }));
            Err(())
        }
    }

    /// Advances if the current token matches any of the provided tokens. If
    /// not, records an error.
    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<Token> {
        for t in expect {
            if self.is(*t) {
                return Ok(self.advance());
            }
        }
        let c = self.peek();
        self.error(c.span().wrap(Error::UnexpectedAny {
            actual: c.kind,
            expected: Box::from(expect),
        }));
        Err(())
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        if c.kind == TokenKind::Eof {
            return false;
        }
        except.into_iter().all(|e| c.kind != e)
    }

    fn synchronize<T>(
        &mut self,
        cont_cond: &[TokenKind],
        stop_cond: &[TokenKind],
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<T> {
        'outer: loop {
            if let Ok(val) = f(self) {
                break Ok(val);
            }
            // In the case of an error, try to advance until find a token
            // specified in `cont_cond` (in which case we retry) or in
            // `stop_cond` (in which case we stop).
            loop {
                let c = self.peek().kind;
                if c == TokenKind::Eof || stop_cond.contains(&c) {
                    break 'outer Err(());
                }
                // The token advancement must be AFTER stopping. If we break
                // out, the caller should advance (to follow the convention).
                self.advance();
                if cont_cond.contains(&c) {
                    continue 'outer;
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidAssignmentTarget,
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    ParseInt,
    Redefinition {
        name: Interned<str>,
        other_definition_span: Span,
    },
    DuplicateParameter {
        name: Interned<str>,
    },
    /// A token kind which holds the [`TokenKind::is_error`] property.
    Lexer(TokenKind),
}

impl Error {
    /// The location of the earlier definition a redefinition collides with.
    pub fn previous_definition(&self) -> Option<Span> {
        match self {
            Error::Redefinition {
                other_definition_span,
                ..
            } => Some(*other_definition_span),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        context::well_known,
        symbol::Symbol,
        util::test_utils::{parse_program, tree_tests},
        value::ValueTag,
    };

    tree_tests!(
        use parser;

        fn test_precedence() {
            let expr = "2 + 3 * 4";
            let tree_ok = "
                binary + (0..9)
                  int 2 (0..1)
                  binary * (4..9)
                    int 3 (4..5)
                    int 4 (8..9)
            ";
        }

        fn test_grouping() {
            let expr = "(1 * 2 + 3) - (1 + 2)";
            let tree_ok = "
                binary - (0..21)
                  grouping (0..11)
                    binary + (1..10)
                      binary * (1..6)
                        int 1 (1..2)
                        int 2 (5..6)
                      int 3 (9..10)
                  grouping (14..21)
                    binary + (15..20)
                      int 1 (15..16)
                      int 2 (19..20)
            ";
        }

        fn test_comparison_binds_looser_than_arith() {
            let expr = "a + 1 < b == true";
            let tree_ok = "
                binary == (0..17)
                  binary < (0..9)
                    binary + (0..5)
                      ident a (0..1)
                      int 1 (4..5)
                    ident b (8..9)
                  bool true (13..17)
            ";
        }

        fn test_unary() {
            let expr = "not -x";
            let tree_ok = "
                unary not (0..6)
                  unary - (4..6)
                    ident x (5..6)
            ";
        }

        fn test_unary_binds_tighter_than_binary() {
            let expr = "-a * b";
            let tree_ok = "
                binary * (0..6)
                  unary - (0..2)
                    ident a (1..2)
                  ident b (5..6)
            ";
        }

        fn test_string_literal() {
            let expr = r#""hello""#;
            let tree_ok = r#"string #0 "hello" (0..7)"#;
        }

        fn test_var_def() {
            let program = "var x: int = 5";
            let tree_ok = "
                var x: int (0..14)
                  int 5 (13..14)
            ";
        }

        fn test_var_def_without_initializer() {
            let program = "var flag: bool";
            let tree_ok = "var flag: bool (0..14)";
        }

        fn test_assignments() {
            let program = "var x: int\nx = 1\nx += 2\nx /= 3";
            let tree_ok = "
                var x: int (0..10)
                assign x = (11..16)
                  int 1 (15..16)
                assign x += (17..23)
                  int 2 (22..23)
                assign x /= (24..30)
                  int 3 (29..30)
            ";
        }

        fn test_if_else() {
            let program = "if a then b else c end";
            let tree_ok = "
                if (0..22)
                  ident a (3..4)
                  then
                    ident b (10..11)
                  else
                    ident c (17..18)
            ";
        }

        fn test_if_without_else() {
            let program = "if a then end";
            let tree_ok = "
                if (0..13)
                  ident a (3..4)
                  then
            ";
        }

        fn test_while() {
            let program = "while i < 3 do i += 1 end";
            let tree_ok = "
                while (0..25)
                  binary < (6..11)
                    ident i (6..7)
                    int 3 (10..11)
                  do
                    assign i += (15..21)
                      int 1 (20..21)
            ";
        }

        fn test_fn_def() {
            let program = "fn add(a: int, b: int) int return a + b end";
            let tree_ok = "
                fn add(a: int, b: int) int (0..43)
                  return (27..39)
                    binary + (34..39)
                      ident a (34..35)
                      ident b (38..39)
            ";
        }

        fn test_error_invalid_assignment_target() {
            let program = "1 = 2";
            let expected_errors = &["0..1: invalid assignment target"];
        }

        fn test_error_unexpected_token_in_expr() {
            let program = "var x: int = )";
            let expected_errors = &["13..14: unexpected `)` in expression"];
        }

        fn test_error_missing_type() {
            let program = "var x: 1";
            let expected_errors = &["7..8: expected one of `int`, `bool`, `string`, but got number"];
        }

        fn test_min_int_literal() {
            let expr = "-2147483648 - -2147483647";
            let tree_ok = "
                binary - (0..25)
                  int -2147483648 (0..11)
                  unary - (14..25)
                    int 2147483647 (15..25)
            ";
        }

        fn test_error_min_int_magnitude_alone() {
            let expr = "2147483648";
            let expected_errors = &["0..10: integer literal out of bounds"];
        }

        fn test_error_parse_int_too_large() {
            let expr = "99999999999";
            let expected_errors = &["0..11: integer literal out of bounds"];
        }

        fn test_error_unclosed_fn() {
            let program = "fn main() int return 0";
            let expected_errors = &["22..22: expected `end`, but got end of file"];
        }

        fn test_error_lexer_unexpected_char() {
            let program = "var x: int = 1 @";
            let expected_errors = &["15..16: unexpected character"];
        }

        fn test_error_lexer_unclosed_string() {
            let program = "var s: string = \"oops";
            let expected_errors = &[
                "16..21: unclosed string",
                "21..21: unexpected end of file in expression",
            ];
        }

        fn test_error_redefinition() {
            let program = "var x: int\nfn x() int return 0 end";
            let expected_errors = &["14..15: redefinition of `x`"];
        }

        fn test_error_duplicate_parameter() {
            let program = "fn f(a: int, a: bool) int return 0 end";
            let expected_errors = &["13..14: duplicate parameter `a`"];
        }

        fn test_recovery_continues_after_bad_statement() {
            let program = "var x: = 1\nvar y: int = )\nvar z: bool = true";
            let expected_errors = &[
                "7..8: expected one of `int`, `bool`, `string`, but got `=`",
                "24..25: unexpected `)` in expression",
            ];
            let tree_error = "
                var z: bool (26..44)
                  bool true (40..44)
            ";
        }
    );

    #[test]
    fn declarations_populate_the_symbol_table() {
        let (ctx, _) = parse_program(
            r#"
            var counter: int
            var greeting: string = "hi"
            fn main() int
                var local: bool = true
                return 0
            end
            "#,
        );

        let names: Vec<_> = ctx.symbols.variables().map(|v| ctx.ident(v.name)).collect();
        assert_eq!(names, ["counter", "greeting", "local"]);

        let Some(Symbol::Function(f)) = ctx.symbols.lookup(well_known::MAIN) else {
            panic!("main must be declared");
        };
        assert!(f.param_types.is_empty());
        assert_eq!(f.return_ty, ValueTag::Int);
        assert_eq!(ctx.constants.len(), 1);
    }

    #[test]
    fn identical_string_literals_share_an_id() {
        let (ctx, _) = parse_program(
            r#"
            var a: string = "same"
            var b: string = "same"
            var c: string = "other"
            "#,
        );
        let strings: Vec<_> = ctx.constants.iter().map(|(id, s)| (id.get(), s)).collect();
        assert_eq!(strings, [(0, "same"), (1, "other")]);
    }
}
