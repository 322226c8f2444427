// Licensed under the Apache-2.0 license

//! Tokenizer for the C++ declaration subset understood by the extractor.
//!
//! The lexer never fails: anything it does not classify becomes a single
//! punctuation token, and it is up to the recognizer in [`crate::extract`]
//! to reject shapes it does not understand.

/// Kind of a lexed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Ident,
    /// Numeric literal, including suffixes and digit separators (`0x10u`, `1'000`).
    Number,
    /// String or character literal, quotes included.
    Literal,
    /// `::`
    PathSep,
    /// Any other single character.
    Punct(char),
}

/// A token with its byte span in the source it was lexed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, src: &str, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(src) == name
    }
}

/// Removes `/* ... */` and `// ...` comments.
///
/// Each comment is replaced by a single space so that the tokens around it
/// stay separate. Line comments keep their terminating newline. Comment
/// markers inside string and character literals are left alone.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if in_number(bytes, i) => i += 1,
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied..i]);
                out.push(' ');
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                copied = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&text[copied..i]);
                out.push(' ');
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                copied = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Whether the quote at `i` is a digit separator (`1'024`).
fn in_number(bytes: &[u8], i: usize) -> bool {
    let mut j = i;
    while j > 0
        && (bytes[j - 1].is_ascii_alphanumeric() || matches!(bytes[j - 1], b'_' | b'\'' | b'.'))
    {
        j -= 1;
    }
    j < i && bytes[j].is_ascii_digit()
}

/// Returns the index just past the literal starting at `start`.
///
/// An unterminated literal ends at the end of its line.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Converts comment-free source text into tokens.
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the entire source.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.bytes.len() {
                break;
            }
            tokens.push(self.next_token());
        }
        tokens
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let c = self.bytes[start];
        let kind = if c.is_ascii_alphabetic() || c == b'_' {
            self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'\'' || b == b'.');
            TokenKind::Number
        } else if c == b'"' || c == b'\'' {
            self.pos = skip_literal(self.bytes, start);
            TokenKind::Literal
        } else if c == b':' && self.bytes.get(start + 1) == Some(&b':') {
            self.pos += 2;
            TokenKind::PathSep
        } else {
            // Non-ASCII input is kept whole so spans stay on char boundaries.
            let ch = self.src[start..].chars().next().unwrap_or('\u{fffd}');
            self.pos += ch.len_utf8();
            TokenKind::Punct(ch)
        };
        Token {
            kind,
            start,
            end: self.pos,
        }
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.pos < self.bytes.len() && pred(self.bytes[self.pos]) {
            self.pos += 1;
        }
    }
}
