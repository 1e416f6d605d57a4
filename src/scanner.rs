//! Module `scanner` implements a one‑pass, streaming lexer for the Dymond language.
//!
//! It transforms source text into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, DymondError>` on each `.next()`. An `Err` reports a
//!   lexing error; the scanner keeps going afterwards so every lexical error
//!   in the file is surfaced in one pass.
//!
//! - `scan_tokens(src) -> (Vec<Token>, Vec<DymondError>)`
//!   Convenience wrapper splitting the stream into tokens and errors.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `;`, `?`, `:`.
//! - Operators with one or two characters: `+ += ++`, `- -= --`, `* *=`,
//!   `/ /= //`, `% %=`, `! !=`, `= ==`, `> >=`, `< <= <-`.
//! - Comments: `#` to end of line, and `/* … */` block comments. An
//!   unterminated block comment silently runs to end of input.
//! - String literals: `"` … `"`, may span lines, no escape sequences.
//! - Numeric literals: digits with optional fraction and optional exponent
//!   (`e`/`E`, optional sign). A literal may also start with `.` (`.5`).
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//!
//! Every token records its line, its 1‑based column, and the text of its
//! source line so diagnostics can point at it.

use std::borrow::Cow;
use std::iter::FusedIterator;
use std::rc::Rc;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{DymondError, Result};
use crate::token::{Token, TokenType};

// ─────────────────────────────────────────────────────────────────────────────
// Keywords, including the capitalised literal aliases
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"break"  => TokenType::BREAK,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"False"  => TokenType::FALSE,
    b"for"    => TokenType::FOR,
    b"func"   => TokenType::FUNC,
    b"if"     => TokenType::IF,
    b"next"   => TokenType::NEXT,
    b"nil"    => TokenType::NIL,
    b"Null"   => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"return" => TokenType::RETURN,
    b"static" => TokenType::STATIC,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"True"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize,               // lexeme start
    curr: usize,                // next unread byte
    line: usize,
    line_start: usize,          // index of the first byte of the current line
    line_text: Rc<str>,         // text of the current line, shared by its tokens
    token_line: usize,          // line / column / text where the lexeme began
    token_column: usize,
    token_text: Rc<str>,
    pending: Option<TokenType>, // kind of the lexeme just scanned, if any
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        let bytes: &[u8] = src.as_bytes();
        let line_text: Rc<str> = Self::line_at(bytes, 0);

        Self {
            src: bytes,
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            token_line: 1,
            token_column: 1,
            token_text: line_text.clone(),
            line_text,
            pending: None,
        }
    }

    // ───── Cursor ─────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek `offset` bytes ahead without consuming. Returns `0` past EOF.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.src.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.peek_at(1)
    }

    /// Consume the next byte only when it is `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Text of the line starting at `from`, without its line break.
    fn line_at(src: &[u8], from: usize) -> Rc<str> {
        let rest: &[u8] = &src[from.min(src.len())..];
        let end: usize = memchr(b'\n', rest).unwrap_or(rest.len());
        let text: Cow<'_, str> = String::from_utf8_lossy(&rest[..end]);

        Rc::from(text.trim_end_matches('\r'))
    }

    /// Bookkeeping for a consumed `\n`.
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
        self.line_text = Self::line_at(self.src, self.curr);
    }

    fn lexeme(&self) -> Cow<'a, str> {
        let src: &'a [u8] = self.src;

        String::from_utf8_lossy(&src[self.start..self.curr])
    }

    fn error<S: Into<String>>(&self, msg: S) -> DymondError {
        DymondError::lex(
            self.token_line,
            self.token_column,
            self.token_text.clone(),
            msg,
        )
    }

    // ───── Lexemes ─────

    /// Scan one lexeme. Tokens leave their kind in `pending`; whitespace and
    /// comments leave it empty.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b',' => self.pending = Some(TokenType::COMMA),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b'?' => self.pending = Some(TokenType::QUESTION),
            b':' => self.pending = Some(TokenType::COLON),

            b'.' => {
                if self.peek().is_ascii_digit() {
                    return self.parse_number();
                }

                self.pending = Some(TokenType::DOT);
            }

            // ── one‑or‑two‑character operators ───────────────────────────
            b'+' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::PLUS_EQUAL
                } else if self.match_byte(b'+') {
                    TokenType::PLUS_PLUS
                } else {
                    TokenType::PLUS
                };

                self.pending = Some(tt);
            }

            b'-' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::MINUS_EQUAL
                } else if self.match_byte(b'-') {
                    TokenType::MINUS_MINUS
                } else {
                    TokenType::MINUS
                };

                self.pending = Some(tt);
            }

            b'*' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::STAR_EQUAL
                } else {
                    TokenType::STAR
                };

                self.pending = Some(tt);
            }

            b'%' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::PERCENT_EQUAL
                } else {
                    TokenType::PERCENT
                };

                self.pending = Some(tt);
            }

            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.pending = Some(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.pending = Some(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else if self.match_byte(b'-') {
                    TokenType::LEFT_ARROW
                } else {
                    TokenType::LESS
                };

                self.pending = Some(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.pending = Some(tt);
            }

            // ── slash family: `//` is integer division, not a comment ────
            b'/' => {
                if self.match_byte(b'*') {
                    self.skip_block_comment();

                    return Ok(());
                }

                let tt = if self.match_byte(b'/') {
                    TokenType::SLASH_SLASH
                } else if self.match_byte(b'=') {
                    TokenType::SLASH_EQUAL
                } else {
                    TokenType::SLASH
                };

                self.pending = Some(tt);
            }

            // ── line comment (# … until newline) ─────────────────────────
            b'#' => {
                // Fast‑forward to next newline using `memchr`. If none found,
                // skip to EOF.
                if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                    self.curr += pos;
                } else {
                    self.curr = self.len();
                }

                return Ok(());
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(());
            }

            b'\n' => {
                self.newline();

                return Ok(());
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => {
                return self.parse_string();
            }

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => {
                return self.parse_number();
            }

            // ── identifiers / keywords (alpha or underscore‑leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Swallow the whole UTF‑8 sequence so one bad character
                // yields one diagnostic.
                let width: usize = match b {
                    0xC0..=0xDF => 2,
                    0xE0..=0xEF => 3,
                    0xF0..=0xF7 => 4,
                    _ => 1,
                };
                self.curr = (self.start + width).min(self.len());

                return Err(self.error(format!("Unexpected character: {}", self.lexeme())));
            }
        }

        Ok(())
    }

    /// Skip a `/* … */` comment. The loop stops as soon as the next byte is
    /// `*` **or** the byte after it is `/`, then consumes two bytes.
    fn skip_block_comment(&mut self) {
        while !self.is_at_end() && self.peek() != b'*' && self.peek_next() != b'/' {
            if self.advance() == b'\n' {
                self.newline();
            }
        }

        for _ in 0..2 {
            if !self.is_at_end() && self.advance() == b'\n' {
                self.newline();
            }
        }
    }

    /// String literal. Runs to the next `"`; there are no escapes.
    fn parse_string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.newline(); // multi‑line strings are allowed
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string."));
        }

        self.advance();

        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];
        let s: Cow<'_, str> = String::from_utf8_lossy(slice);

        self.pending = Some(TokenType::STRING(s.into_owned()));

        Ok(())
    }

    /// Does an exponent (`e`/`E`, optional sign, at least one digit) start
    /// `offset` bytes ahead?
    fn exponent_at(&self, offset: usize) -> bool {
        matches!(self.peek_at(offset), b'e' | b'E')
            && (self.peek_at(offset + 1).is_ascii_digit()
                || (matches!(self.peek_at(offset + 1), b'+' | b'-')
                    && self.peek_at(offset + 2).is_ascii_digit()))
    }

    /// Parse a numeric literal (`123`, `3.14`, `.5`, `6.02e23`, `1E-3`).
    fn parse_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part (not for `.5`, whose dot is already eaten).
        if self.src[self.start] != b'.'
            && self.peek() == b'.'
            && (self.peek_next().is_ascii_digit() || self.exponent_at(1))
        {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Optional exponent.
        if self.exponent_at(0) {
            self.advance(); // "e"

            if matches!(self.peek(), b'+' | b'-') {
                self.advance();
            }

            while self.peek().is_ascii_digit() {
                self.advance();
            }

            if self.peek() == b'.' {
                return Err(self.error("Unexpected number literal."));
            }
        }

        let text: Cow<'_, str> = self.lexeme();
        let n: f64 = text
            .parse::<f64>()
            .map_err(|_| self.error(format!("Invalid number literal: {}", text)))?;

        self.pending = Some(TokenType::NUMBER(n));

        Ok(())
    }

    /// Identifier, or keyword when `KEYWORDS` knows the lexeme.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───── Iteration ─────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // One EOF, then nothing.
            if self.curr == self.len() {
                self.curr += 1;
                let column: usize = self.len() - self.line_start + 1;

                return Some(Ok(Token::new(
                    TokenType::EOF,
                    "",
                    self.line,
                    column,
                    self.line_text.clone(),
                )));
            }

            self.start = self.curr;
            self.token_line = self.line;
            self.token_column = self.start - self.line_start + 1;
            self.token_text = self.line_text.clone();
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                debug!("Scanned token ({:?}) on line {}", tt, self.token_line);

                return Some(Ok(Token::new(
                    tt,
                    &self.lexeme(),
                    self.token_line,
                    self.token_column,
                    self.token_text.clone(),
                )));
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Drain a scanner, separating tokens from lexical errors. The token list
/// always ends with `EOF`.
pub fn scan_tokens(src: &str) -> (Vec<Token>, Vec<DymondError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<DymondError> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}
