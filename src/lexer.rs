use std::{iter::Peekable, num::ParseIntError};

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 4_096;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        if self.is_at_end() {
            self.current_lo = self.cursor;
            return Eof;
        }
        match self.mark_advance() {
            '+' => self.with_eq(Plus, PlusEq),
            '-' => self.with_eq(Minus, MinusEq),
            '*' => self.with_eq(Star, StarEq),
            '/' => self.with_eq(Slash, SlashEq),
            '=' => self.with_eq(Assign, EqEq),
            '<' => self.with_eq(Less, LessEq),
            '>' => self.with_eq(Greater, GreaterEq),
            '!' => match self.peek() {
                '=' => self.advance_with(BangEq),
                _ => ErrorUnexpectedChar,
            },
            ':' => Colon,
            ',' => Comma,
            '(' => LParen,
            ')' => RParen,
            '#' => self.comment(),
            '"' => self.string(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_whitespace() => self.whitespace(),
            _ => ErrorUnexpectedChar,
        }
    }

    /// Returns `with` if the next character is `=` (consuming it), otherwise
    /// returns `alone`.
    fn with_eq(&mut self, alone: TokenKind, with: TokenKind) -> TokenKind {
        match self.peek() {
            '=' => self.advance_with(with),
            _ => alone,
        }
    }

    /// Lexes a string token, detecting whether it contains escape sequences.
    ///
    /// Escaping itself is deferred until the token is extracted, so strings
    /// without escapes never need an intermediate buffer.
    fn string(&mut self) -> TokenKind {
        let mut has_escaped = false;
        let mut is_escaping = false;
        loop {
            if self.is_at_end() {
                return TokenKind::ErrorUnclosedString;
            }
            let (current, current_span) = self.advance_with_span();
            match (is_escaping, current) {
                (false, '"') => {
                    return if has_escaped {
                        TokenKind::EscapedString
                    } else {
                        TokenKind::String
                    };
                }
                // The error is recorded but the string keeps being scanned.
                (false, '\n') => {
                    self.produce_spanned(TokenKind::ErrorUnescapedLineBreak, current_span);
                }
                (false, '\\') => {
                    has_escaped = true;
                    is_escaping = true;
                }
                (_, _) => {
                    is_escaping = false;
                }
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        TokenKind::Number
    }

    fn whitespace(&mut self) -> TokenKind {
        while self.peek().is_ascii_whitespace() {
            self.advance();
        }
        TokenKind::Whitespace
    }

    fn comment(&mut self) -> TokenKind {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
        TokenKind::Comment
    }
}

impl Lexer<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character (with its span) and advances the iterator.
    fn advance_with_span(&mut self) -> (char, Span) {
        let lo = self.cursor;
        let char = self.advance();
        let hi = self.cursor;
        (char, Span::new_of_bounds(lo..hi))
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Whether the input is exhausted. A `'\0'` in the source is an ordinary
    /// character, so [`peek`](Self::peek) alone can't tell.
    fn is_at_end(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        self.produce_spanned(kind, self.span());
    }

    /// Produces a token with the provided span.
    fn produce_spanned(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i32, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.span().substr(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src)
    }

    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        let s = token.span().offset(1, -1).substr(src);
        s.to_string().into_boxed_str()
    }

    pub fn escaped_string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::EscapedString);
        let s = token.span().offset(1, -1).substr(src);
        perform_escape(s).into_boxed_str()
    }
}

fn perform_escape(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len());
    let mut escaped = false;
    for char in raw.chars() {
        let char = match (escaped, char) {
            (true, 'n') => '\n',
            (true, 't') => '\t',
            (true, '0') => '\0',
            (false, '\\') => {
                escaped = true;
                continue;
            }
            // Unknown escapes (including `\\` and `\"`) map to the character
            // itself.
            (_, char) => char,
        };
        escaped = false;
        buf.push(char);
    }
    buf.shrink_to_fit();
    debug_assert!(buf.len() < raw.len(), "original string MUST be greater");
    buf
}
