//! Bytes → [`Value`] parser.
//!
//! A plain recursive-descent JSON parser. Numbers are captured as literal
//! text, never converted; strings get their escapes resolved (including
//! `\uXXXX` surrogate pairs); objects keep duplicate keys in source order.
//! The parser can sit on a buffer holding several whitespace-separated
//! top-level values, which is what the streaming [`Decoder`](crate::Decoder)
//! uses.

use std::fmt;

use crate::value::Value;

/// Nesting bound for the parser itself; the decode engine applies its own
/// configurable limit on top.
const MAX_PARSE_DEPTH: usize = 512;

/// Syntax error with the byte offset it occurred at.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    /// Byte offset into the input.
    pub offset: usize,
    /// The specific kind of error.
    pub kind: ParseErrorKind,
}

/// Specific parse error kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseErrorKind {
    /// A character that does not fit the grammar at this position.
    UnexpectedChar {
        /// The offending byte, as a char.
        got: char,
        /// What the grammar allowed instead.
        expected: &'static str,
    },
    /// Input ended mid-value.
    UnexpectedEof {
        /// What the grammar expected next.
        expected: &'static str,
    },
    /// A malformed `\` escape inside a string.
    InvalidEscape,
    /// String contents that are not valid UTF-8.
    InvalidUtf8,
    /// Input nesting exceeded [`MAX_PARSE_DEPTH`].
    RecursionLimit,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedChar { got, expected } => write!(
                f,
                "unexpected character {got:?} at offset {}, expected {expected}",
                self.offset
            ),
            ParseErrorKind::UnexpectedEof { expected } => write!(
                f,
                "unexpected end of input at offset {}, expected {expected}",
                self.offset
            ),
            ParseErrorKind::InvalidEscape => {
                write!(f, "invalid escape sequence at offset {}", self.offset)
            }
            ParseErrorKind::InvalidUtf8 => {
                write!(f, "invalid UTF-8 in string at offset {}", self.offset)
            }
            ParseErrorKind::RecursionLimit => {
                write!(f, "value nesting too deep at offset {}", self.offset)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse exactly one JSON value; trailing whitespace is allowed, anything
/// else is an error.
pub fn parse(input: &[u8]) -> Result<Value, ParseError> {
    let mut parser = Parser::new(input);
    let value = parser.next_value()?;
    if parser.has_more() {
        return Err(parser.err_here("end of input"));
    }
    Ok(value)
}

/// Pull parser over a byte buffer, one top-level value at a time.
pub struct Parser<'de> {
    input: &'de [u8],
    pos: usize,
}

impl<'de> Parser<'de> {
    /// Start parsing at the beginning of `input`.
    pub fn new(input: &'de [u8]) -> Self {
        Parser { input, pos: 0 }
    }

    /// Whether another top-level value remains in the buffer.
    pub fn has_more(&mut self) -> bool {
        self.skip_whitespace();
        self.pos < self.input.len()
    }

    /// Parse the next top-level value.
    pub fn next_value(&mut self) -> Result<Value, ParseError> {
        self.parse_value(0)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&b) = self.input.get(self.pos) {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn err_here(&self, expected: &'static str) -> ParseError {
        match self.input.get(self.pos) {
            Some(&b) => ParseError {
                offset: self.pos,
                kind: ParseErrorKind::UnexpectedChar {
                    got: b as char,
                    expected,
                },
            },
            None => ParseError {
                offset: self.pos,
                kind: ParseErrorKind::UnexpectedEof { expected },
            },
        }
    }

    fn expect_literal(&mut self, literal: &'static [u8], expected: &'static str) -> Result<(), ParseError> {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.err_here(expected))
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth > MAX_PARSE_DEPTH {
            return Err(ParseError {
                offset: self.pos,
                kind: ParseErrorKind::RecursionLimit,
            });
        }
        match self.peek() {
            None => Err(self.err_here("value")),
            Some(b'n') => {
                self.expect_literal(b"null", "'null'")?;
                Ok(Value::Null)
            }
            Some(b't') => {
                self.expect_literal(b"true", "'true'")?;
                Ok(Value::Bool(true))
            }
            Some(b'f') => {
                self.expect_literal(b"false", "'false'")?;
                Ok(Value::Bool(false))
            }
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'[') => self.parse_array(depth),
            Some(b'{') => self.parse_object(depth),
            Some(b) if b == b'-' || b.is_ascii_digit() => self.parse_number(),
            Some(_) => Err(self.err_here("value")),
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.pos += 1; // '['
        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.parse_value(depth + 1)?);
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(self.err_here("',' or ']'")),
            }
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.pos += 1; // '{'
        let mut pairs = Vec::new();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(pairs));
        }
        loop {
            if self.peek() != Some(b'"') {
                return Err(self.err_here("object key"));
            }
            let key = self.parse_string()?;
            if self.peek() != Some(b':') {
                return Err(self.err_here("':'"));
            }
            self.pos += 1;
            let value = self.parse_value(depth + 1)?;
            pairs.push((key, value));
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(pairs));
                }
                _ => return Err(self.err_here("',' or '}'")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut out: Vec<u8> = Vec::new();
        loop {
            match self.input.get(self.pos) {
                None => {
                    return Err(ParseError {
                        offset: self.pos,
                        kind: ParseErrorKind::UnexpectedEof {
                            expected: "closing '\"'",
                        },
                    });
                }
                Some(b'"') => {
                    self.pos += 1;
                    return String::from_utf8(out).map_err(|_| ParseError {
                        offset: start,
                        kind: ParseErrorKind::InvalidUtf8,
                    });
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                }
                Some(&b) if b < 0x20 => {
                    return Err(ParseError {
                        offset: self.pos,
                        kind: ParseErrorKind::UnexpectedChar {
                            got: b as char,
                            expected: "string character",
                        },
                    });
                }
                Some(&b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let invalid = |offset| ParseError {
            offset,
            kind: ParseErrorKind::InvalidEscape,
        };
        let Some(&b) = self.input.get(self.pos) else {
            return Err(ParseError {
                offset: self.pos,
                kind: ParseErrorKind::UnexpectedEof { expected: "escape" },
            });
        };
        self.pos += 1;
        let ch = match b {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let unit = self.parse_hex4()?;
                let ch = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: pair it with a following \uXXXX low
                    // surrogate, or substitute U+FFFD like the original does.
                    if self.input[self.pos..].starts_with(b"\\u") {
                        let mark = self.pos;
                        self.pos += 2;
                        let low = self.parse_hex4()?;
                        if (0xDC00..0xE000).contains(&low) {
                            let combined =
                                0x10000 + (((unit - 0xD800) as u32) << 10) + (low - 0xDC00) as u32;
                            char::from_u32(combined).ok_or_else(|| invalid(mark))?
                        } else {
                            self.pos = mark;
                            '\u{FFFD}'
                        }
                    } else {
                        '\u{FFFD}'
                    }
                } else if (0xDC00..0xE000).contains(&unit) {
                    // Unpaired low surrogate.
                    '\u{FFFD}'
                } else {
                    char::from_u32(unit as u32).ok_or_else(|| invalid(self.pos))?
                };
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                return Ok(());
            }
            _ => return Err(invalid(self.pos - 1)),
        };
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u16, ParseError> {
        let mut unit: u16 = 0;
        for _ in 0..4 {
            let Some(&b) = self.input.get(self.pos) else {
                return Err(ParseError {
                    offset: self.pos,
                    kind: ParseErrorKind::UnexpectedEof {
                        expected: "hex digit",
                    },
                });
            };
            let digit = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'f' => b - b'a' + 10,
                b'A'..=b'F' => b - b'A' + 10,
                _ => {
                    return Err(ParseError {
                        offset: self.pos,
                        kind: ParseErrorKind::InvalidEscape,
                    });
                }
            };
            unit = (unit << 4) | digit as u16;
            self.pos += 1;
        }
        Ok(unit)
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        // Integer part: a lone zero, or a nonzero digit run.
        match self.input.get(self.pos) {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => {
                while matches!(self.input.get(self.pos), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            _ => return Err(self.err_here("digit")),
        }
        // Fraction.
        if self.input.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            if !matches!(self.input.get(self.pos), Some(b) if b.is_ascii_digit()) {
                return Err(self.err_here("fraction digit"));
            }
            while matches!(self.input.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // Exponent.
        if matches!(self.input.get(self.pos), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.input.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !matches!(self.input.get(self.pos), Some(b) if b.is_ascii_digit()) {
                return Err(self.err_here("exponent digit"));
            }
            while matches!(self.input.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let literal = std::str::from_utf8(&self.input[start..self.pos])
            .expect("number literals are ASCII")
            .to_string();
        Ok(Value::Number(literal))
    }
}
