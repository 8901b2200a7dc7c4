//! Tokenizer for build descriptors.
//!
//! Descriptors are written in a small C#-like subset. The lexer drops
//! whitespace and comments, and records the line and byte span of every
//! token so unrecognized statements can be preserved verbatim.

use std::fmt;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// String literal with escapes resolved.
    Str(String),
    Number(String),
    /// Two-character operators: `==`, `!=`, `&&`, `||`, `=>`.
    Op(&'static str),
    Punct(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "'{s}'"),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Number(s) => write!(f, "{s}"),
            TokenKind::Op(op) => write!(f, "'{op}'"),
            TokenKind::Punct(c) => write!(f, "'{c}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Token {
    pub fn is_ident(&self, value: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == value)
    }

    pub fn is_punct(&self, value: char) -> bool {
        self.kind == TokenKind::Punct(value)
    }

    pub fn is_op(&self, value: &str) -> bool {
        matches!(self.kind, TokenKind::Op(op) if op == value)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }
}

const OPERATORS: &[&str] = &["==", "!=", "&&", "||", "=>"];

/// Split `src` into tokens.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let opened = line;
                i += 2;
                loop {
                    match bytes.get(i) {
                        None => return Err(ParseError::UnterminatedComment { line: opened }),
                        Some(b'*') if bytes.get(i + 1) == Some(&b'/') => {
                            i += 2;
                            break;
                        }
                        Some(b'\n') => {
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            b'"' => {
                let start = i;
                let (value, next) = read_string(src, i + 1, line)?;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    line,
                    start,
                    end: next,
                });
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(src[start..i].to_string()),
                    line,
                    start,
                    end: i,
                });
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number(src[start..i].to_string()),
                    line,
                    start,
                    end: i,
                });
            }
            _ => {
                let start = i;
                if let Some(op) = OPERATORS
                    .iter()
                    .find(|op| src.get(i..i + 2) == Some(**op))
                {
                    i += 2;
                    tokens.push(Token {
                        kind: TokenKind::Op(*op),
                        line,
                        start,
                        end: i,
                    });
                    continue;
                }
                // Non-ASCII characters only appear inside strings and
                // comments in practice; keep whole code points regardless.
                let ch = src[i..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                i += ch.len_utf8().max(1);
                tokens.push(Token {
                    kind: TokenKind::Punct(ch),
                    line,
                    start,
                    end: i,
                });
            }
        }
    }

    Ok(tokens)
}

/// Read a string literal body starting after the opening quote.
/// Returns the unescaped value and the offset after the closing quote.
fn read_string(src: &str, from: usize, line: usize) -> Result<(String, usize), ParseError> {
    let mut value = String::new();
    let mut chars = src[from..].char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => return Ok((value, from + offset + 1)),
            '\n' => break,
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, other)) => value.push(other),
                None => break,
            },
            other => value.push(other),
        }
    }
    Err(ParseError::UnterminatedString { line })
}
