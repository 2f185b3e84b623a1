// program ::= stmt*
// stmt ::= var ID ':' TYPE ['=' expr]
//        | ID ('=' | '+=' | '-=' | '*=' | '/=') expr
//        | if expr then stmt* [else stmt*] end
//        | while expr do stmt* end
//        | fn ID '(' [ID ':' TYPE (',' ID ':' TYPE)*] ')' TYPE stmt* end
//        | return expr
//        | expr
// expr ::= expr ('==' | '!=') expr
//        | expr ('<' | '<=' | '>' | '>=') expr
//        | expr ('+' | '-') expr
//        | expr ('*' | '/') expr
//        | ('-' | not) expr
//        | '(' expr ')'
//        | ID
//        | integer
//        | string
//        | true
//        | false

// Precedence
//
// - not
// * /
// + -
// < <= > >=
// == !=

use std::fmt;

use crate::{
    token::{Span, Spanned},
    util::intern::Interned,
    value::{Value, ValueTag},
};

pub trait Info {
    /// Information attached to every expression node.
    type Expr: fmt::Debug + PartialEq + Clone;
}

/// Tree as produced by the parser.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Untyped;

impl Info for Untyped {
    type Expr = ();
}

/// Tree as produced by the type checker: every node carries its resolved
/// type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Typed;

impl Info for Typed {
    type Expr = ValueTag;
}

#[derive(Debug, PartialEq)]
pub struct Program<I: Info> {
    /// Top-level statements, in source order.
    pub body: Vec<Expr<I>>,
}

impl<I: Info> Default for Program<I> {
    fn default() -> Self {
        Program { body: Vec::new() }
    }
}

#[derive(Debug, PartialEq)]
pub struct Expr<I: Info> {
    pub kind: ExprKind<I>,
    pub span: Span,
    pub info: I::Expr,
}

impl Expr<Untyped> {
    pub fn new(kind: ExprKind<Untyped>, span: Span) -> Expr<Untyped> {
        Expr {
            kind,
            span,
            info: (),
        }
    }
}

impl<I: Info> Expr<I> {
    /// Whether this node produces a value (as opposed to a statement).
    pub fn is_value_shaped(&self) -> bool {
        self.kind.is_value_shaped()
    }
}

#[derive(Debug, PartialEq)]
pub enum ExprKind<I: Info> {
    Literal(Value),
    Unary {
        op: Spanned<UnaryOperator>,
        rhs: Box<Expr<I>>,
    },
    Binary {
        lhs: Box<Expr<I>>,
        op: Spanned<BinaryOperator>,
        rhs: Box<Expr<I>>,
    },
    Grouping(Box<Expr<I>>),
    If {
        cond: Box<Expr<I>>,
        then_body: Vec<Expr<I>>,
        else_body: Option<Vec<Expr<I>>>,
    },
    VarDef {
        name: Ident,
        ty: ValueTag,
        initializer: Option<Box<Expr<I>>>,
    },
    Assign {
        target: Ident,
        op: Spanned<AssignOperator>,
        value: Box<Expr<I>>,
    },
    While {
        cond: Box<Expr<I>>,
        body: Vec<Expr<I>>,
    },
    FnDef(FnDef<I>),
    Return {
        value: Box<Expr<I>>,
    },
}

impl<I: Info> ExprKind<I> {
    pub fn is_value_shaped(&self) -> bool {
        match self {
            ExprKind::Literal(_)
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Grouping(_) => true,
            ExprKind::If { .. }
            | ExprKind::VarDef { .. }
            | ExprKind::Assign { .. }
            | ExprKind::While { .. }
            | ExprKind::FnDef(_)
            | ExprKind::Return { .. } => false,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct FnDef<I: Info> {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_ty: ValueTag,
    pub body: Vec<Expr<I>>,
}

impl<I: Info> FnDef<I> {
    /// Total size, in bytes, of the parameter area of the stack frame.
    pub fn params_size(&self) -> u32 {
        self.params.iter().filter_map(|p| p.ty.size()).sum()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: ValueTag,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `-`
    Neg,
    Not,
}

impl UnaryOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "not",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }

    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div
        )
    }

    pub const fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Eq | BinaryOperator::Ne)
    }

    pub const fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge
        )
    }

    pub const fn is_comparison(self) -> bool {
        self.is_equality() || self.is_relational()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOperator {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
}

impl AssignOperator {
    /// The arithmetic operation of a compound assignment, if any.
    pub const fn arithmetic(self) -> Option<BinaryOperator> {
        match self {
            AssignOperator::Set => None,
            AssignOperator::Add => Some(BinaryOperator::Add),
            AssignOperator::Sub => Some(BinaryOperator::Sub),
            AssignOperator::Mul => Some(BinaryOperator::Mul),
            AssignOperator::Div => Some(BinaryOperator::Div),
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            AssignOperator::Set => "=",
            AssignOperator::Add => "+=",
            AssignOperator::Sub => "-=",
            AssignOperator::Mul => "*=",
            AssignOperator::Div => "/=",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: Interned<str>,
    pub span: Span,
}

impl From<Ident> for Interned<str> {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Interned<str> {
    fn from(value: &Ident) -> Self {
        value.name
    }
}
