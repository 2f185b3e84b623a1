use std::{fmt, ops::Range};

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: u32,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            lo: span.lo,
            len: span.len,
        }
    }

    /// Returns an end-of-file token positioned at the end of `src`.
    pub fn eof_for(src: &str) -> Token {
        let lo = u32::try_from(src.len()).expect("source too large");
        Token::new(TokenKind::Eof, Span::new_of_length(lo, 0))
    }

    pub fn span(&self) -> Span {
        Span {
            lo: self.lo,
            len: self.len,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub lo: u32,
    pub len: u32,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        let lo = u32::try_from(lo).expect("source too large");
        Self::new_of_length(lo, u32::try_from(hi).expect("source too large") - lo)
    }

    pub const fn new_of_length(lo: u32, len: u32) -> Span {
        Span { lo, len }
    }

    pub fn hi(self) -> u32 {
        self.lo + self.len
    }

    /// Returns a span that covers from the start of `self` to the end of
    /// `other`.
    pub fn to(self, other: Span) -> Span {
        let hi = other.hi().max(self.hi());
        Span::new_of_length(self.lo, hi - self.lo)
    }

    /// Shrinks (or grows) the span bounds by the provided offsets.
    pub fn offset(self, lo: i32, hi: i32) -> Span {
        let new_lo = self.lo.checked_add_signed(lo).expect("span underflow");
        let new_hi = self.hi().checked_add_signed(hi).expect("span underflow");
        Span::new_of_length(new_lo, new_hi - new_lo)
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo as usize..self.hi() as usize]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.lo, self.hi())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    If,
    Then,
    Else,
    End,
    While,
    Do,
    Var,
    Fn,
    Return,
    Not,

    True,
    False,

    TypeInt,
    TypeBool,
    TypeString,

    Plus,
    PlusEq,
    Minus,
    MinusEq,
    Star,
    StarEq,
    Slash,
    SlashEq,
    /// `=`
    Assign,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Colon,
    Comma,
    LParen,
    RParen,

    Identifier,
    String,
    /// A string which contains escape sequences, so the lexer must escape
    /// them before interning the contents.
    EscapedString,
    Number,

    Whitespace,
    Comment,
    Eof,

    ErrorUnexpectedChar,
    ErrorUnclosedString,
    ErrorUnescapedLineBreak,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        use TokenKind::*;
        matches!(self, Whitespace | Comment) || self.is_error()
    }

    pub fn is_error(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            ErrorUnexpectedChar | ErrorUnclosedString | ErrorUnescapedLineBreak
        )
    }

    /// Returns a human readable name of the token kind, as written in the
    /// source code when applicable.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            If => "`if`",
            Then => "`then`",
            Else => "`else`",
            End => "`end`",
            While => "`while`",
            Do => "`do`",
            Var => "`var`",
            Fn => "`fn`",
            Return => "`return`",
            Not => "`not`",
            True => "`true`",
            False => "`false`",
            TypeInt => "`int`",
            TypeBool => "`bool`",
            TypeString => "`string`",
            Plus => "`+`",
            PlusEq => "`+=`",
            Minus => "`-`",
            MinusEq => "`-=`",
            Star => "`*`",
            StarEq => "`*=`",
            Slash => "`/`",
            SlashEq => "`/=`",
            Assign => "`=`",
            EqEq => "`==`",
            BangEq => "`!=`",
            Less => "`<`",
            LessEq => "`<=`",
            Greater => "`>`",
            GreaterEq => "`>=`",
            Colon => "`:`",
            Comma => "`,`",
            LParen => "`(`",
            RParen => "`)`",
            Identifier => "identifier",
            String | EscapedString => "string",
            Number => "number",
            Whitespace => "whitespace",
            Comment => "comment",
            Eof => "end of file",
            ErrorUnexpectedChar | ErrorUnclosedString | ErrorUnescapedLineBreak => {
                "invalid token"
            }
        }
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "else" => TokenKind::Else,
    "end" => TokenKind::End,
    "while" => TokenKind::While,
    "do" => TokenKind::Do,
    "var" => TokenKind::Var,
    "fn" => TokenKind::Fn,
    "return" => TokenKind::Return,
    "not" => TokenKind::Not,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "int" => TokenKind::TypeInt,
    "bool" => TokenKind::TypeBool,
    "string" => TokenKind::TypeString,
};
