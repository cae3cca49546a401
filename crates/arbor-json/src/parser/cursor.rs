//! Byte cursor with line/column tracking

use crate::error::{ParseError, ParseErrorKind};

/// A 1-based line/column location in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Build an error located here
    pub fn error(self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.column)
    }
}

/// Forward-only cursor over UTF-8 input.
///
/// Columns count characters: only bytes that start a character advance the
/// column, and a line feed moves to column 1 of the next line.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a str,
    input: &'a [u8],
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.offset).copied()
    }

    #[inline]
    pub fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.offset + ahead).copied()
    }

    /// Unconsumed input; empty if the cursor sits inside a character
    #[inline]
    pub fn remaining(&self) -> &'a str {
        self.text.get(self.offset..).unwrap_or_default()
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.input.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Error at the current position
    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.position().error(kind)
    }

    /// Consume one byte
    #[inline]
    pub fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        if byte == b'\n' {
            self.line = self.line.saturating_add(1);
            self.column = 1;
        } else if !is_continuation(byte) {
            self.column = self.column.saturating_add(1);
        }
        Some(byte)
    }

    /// Consume `len` bytes (clamped to the end of input)
    pub fn advance(&mut self, len: usize) {
        let end = (self.offset + len).min(self.input.len());
        for &byte in &self.input[self.offset..end] {
            if byte == b'\n' {
                self.line = self.line.saturating_add(1);
                self.column = 1;
            } else if !is_continuation(byte) {
                self.column = self.column.saturating_add(1);
            }
        }
        self.offset = end;
    }

    /// Skip JSON whitespace (space, tab, line feed, carriage return)
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.bump();
        }
    }
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}
