//! String literal decoding: escapes and UTF-16 surrogate pairs

use super::cursor::Cursor;
use crate::error::{ParseError, ParseErrorKind};

/// Decode a string literal starting at the opening quote.
///
/// Leaves the cursor just past the closing quote. `max_len` bounds the decoded
/// length in bytes.
pub fn parse_string(cursor: &mut Cursor<'_>, max_len: usize) -> Result<String, ParseError> {
    if cursor.peek() != Some(b'"') {
        return Err(cursor.error(ParseErrorKind::UnexpectedCharacter));
    }
    cursor.bump();

    let mut out = String::new();
    loop {
        // Copy the run of plain characters in one go; it ends on an ASCII byte
        let rest = cursor.remaining();
        let run = rest
            .bytes()
            .position(|b| b == b'"' || b == b'\\' || b < 0x20)
            .unwrap_or(rest.len());
        if run > 0 {
            out.push_str(&rest[..run]);
            cursor.advance(run);
            check_length(cursor, &out, max_len)?;
        }

        match cursor.peek() {
            None => return Err(cursor.error(ParseErrorKind::UnterminatedString)),
            Some(b'"') => {
                cursor.bump();
                return Ok(out);
            }
            Some(b'\\') => {
                let ch = parse_escape(cursor)?;
                out.push(ch);
                check_length(cursor, &out, max_len)?;
            }
            Some(_) => return Err(cursor.error(ParseErrorKind::ControlCharacter)),
        }
    }
}

fn check_length(cursor: &Cursor<'_>, out: &str, max_len: usize) -> Result<(), ParseError> {
    if out.len() > max_len {
        return Err(cursor.error(ParseErrorKind::StringTooLong { max: max_len }));
    }
    Ok(())
}

/// Decode one escape sequence; the cursor is on the backslash
fn parse_escape(cursor: &mut Cursor<'_>) -> Result<char, ParseError> {
    let start = cursor.position();
    cursor.bump();
    let ch = match cursor.peek() {
        Some(b'"') => '"',
        Some(b'\\') => '\\',
        Some(b'/') => '/',
        Some(b'b') => '\u{0008}',
        Some(b'f') => '\u{000C}',
        Some(b'n') => '\n',
        Some(b'r') => '\r',
        Some(b't') => '\t',
        Some(b'u') => {
            cursor.bump();
            return parse_unicode_escape(cursor, start);
        }
        None => return Err(cursor.error(ParseErrorKind::UnterminatedString)),
        Some(_) => return Err(cursor.error(ParseErrorKind::InvalidEscape)),
    };
    cursor.bump();
    Ok(ch)
}

/// Decode the code point of a `\u` escape whose four hex digits are next.
///
/// A high surrogate must be followed immediately by a `\u` low surrogate.
fn parse_unicode_escape(
    cursor: &mut Cursor<'_>,
    start: super::cursor::Position,
) -> Result<char, ParseError> {
    let first = parse_hex4(cursor)?;
    let code_point = match first {
        0xD800..=0xDBFF => {
            if cursor.peek() != Some(b'\\') || cursor.peek_at(1) != Some(b'u') {
                return Err(cursor.error(ParseErrorKind::UnterminatedSurrogatePair));
            }
            let second_start = cursor.position();
            cursor.advance(2);
            let second = parse_hex4(cursor)?;
            if !(0xDC00..=0xDFFF).contains(&second) {
                return Err(second_start.error(ParseErrorKind::InvalidSurrogatePair));
            }
            0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
        }
        0xDC00..=0xDFFF => return Err(start.error(ParseErrorKind::UnpairedLowSurrogate)),
        _ => first,
    };
    char::from_u32(code_point).ok_or_else(|| start.error(ParseErrorKind::InvalidUnicodeEscape))
}

fn parse_hex4(cursor: &mut Cursor<'_>) -> Result<u32, ParseError> {
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = cursor
            .peek()
            .and_then(|b| (b as char).to_digit(16))
            .ok_or_else(|| cursor.error(ParseErrorKind::InvalidUnicodeEscape))?;
        value = (value << 4) | digit;
        cursor.bump();
    }
    Ok(value)
}
