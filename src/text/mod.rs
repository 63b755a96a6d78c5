//! Byte-level codec between tree values and their textual form
//!
//! The wire format is standard JSON text: objects, arrays, double-quoted
//! strings with backslash escapes, decimal numbers, `true`/`false`/`null`.
//! [`to_text`] renders a [`Tree`] and [`from_text`] parses one back via a
//! recursive-descent parser over the raw bytes.
//!
//! Two properties matter to the converter layer above:
//!
//! - object key order is preserved in both directions, so a derived writer's
//!   field order survives a round trip through text;
//! - tag strings round-trip exactly, including reserved characters, because
//!   strings are escaped and unescaped by the same table.
//!
//! Numbers that are not finite (`NaN`, the infinities) have no textual
//! representation and render as `null`.

pub mod error;

pub use error::{TextError, TextResult};

use crate::tree::Tree;

/// Renders a tree value in its textual form.
pub fn to_text(tree: &Tree) -> String {
    let mut out = String::new();
    render(tree, &mut out);
    out
}

/// Parses the textual form of a single tree value.
///
/// The entire input must be consumed, up to trailing whitespace; anything
/// further is a [`TextError::TrailingData`].
pub fn from_text(input: &str) -> TextResult<Tree> {
    let mut parser = TextParser::new(input);
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(_) => Err(TextError::TrailingData { at: parser.pos }),
    }
}

fn render(tree: &Tree, out: &mut String) {
    match tree {
        Tree::Null => out.push_str("null"),
        Tree::Bool(true) => out.push_str("true"),
        Tree::Bool(false) => out.push_str("false"),
        Tree::Num(n) => {
            if n.is_finite() {
                // Integral values print without a trailing ".0" so that
                // integer leaves look like integers on the wire.
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    out.push_str(&format!("{}", *n as i64));
                } else {
                    out.push_str(&format!("{n}"));
                }
            } else {
                out.push_str("null");
            }
        }
        Tree::String(s) => render_string(s, out),
        Tree::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
            out.push(']');
        }
        Tree::Object(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_string(key, out);
                out.push(':');
                render(value, out);
            }
            out.push('}');
        }
    }
}

fn render_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

struct TextParser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TextParser<'a> {
    fn new(input: &'a str) -> Self {
        TextParser {
            buf: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn bump(&mut self) -> TextResult<u8> {
        let b = self.peek().ok_or(TextError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, want: u8) -> TextResult<()> {
        match self.bump()? {
            b if b == want => Ok(()),
            found => Err(TextError::UnexpectedByte {
                at: self.pos - 1,
                found,
            }),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> TextResult<Tree> {
        match self.peek().ok_or(TextError::UnexpectedEnd)? {
            b'{' => self.object(),
            b'[' => self.array(),
            b'"' => Ok(Tree::String(self.string()?)),
            b't' => self.literal(b"true", Tree::Bool(true)),
            b'f' => self.literal(b"false", Tree::Bool(false)),
            b'n' => self.literal(b"null", Tree::Null),
            b'-' | b'0'..=b'9' => self.number(),
            found => Err(TextError::UnexpectedByte {
                at: self.pos,
                found,
            }),
        }
    }

    fn literal(&mut self, word: &[u8], value: Tree) -> TextResult<Tree> {
        for &want in word {
            self.expect(want)?;
        }
        Ok(value)
    }

    fn object(&mut self) -> TextResult<Tree> {
        self.expect(b'{')?;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Tree::Object(entries));
        }
        loop {
            self.skip_ws();
            let key = self.string()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.bump()? {
                b',' => continue,
                b'}' => return Ok(Tree::Object(entries)),
                found => {
                    return Err(TextError::UnexpectedByte {
                        at: self.pos - 1,
                        found,
                    })
                }
            }
        }
    }

    fn array(&mut self) -> TextResult<Tree> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Tree::Array(items));
        }
        loop {
            self.skip_ws();
            items.push(self.value()?);
            self.skip_ws();
            match self.bump()? {
                b',' => continue,
                b']' => return Ok(Tree::Array(items)),
                found => {
                    return Err(TextError::UnexpectedByte {
                        at: self.pos - 1,
                        found,
                    })
                }
            }
        }
    }

    fn number(&mut self) -> TextResult<Tree> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.buf[start..self.pos])
            .map_err(|_| TextError::BadNumber { at: start })?;
        match text.parse::<f64>() {
            Ok(n) => Ok(Tree::Num(n)),
            Err(_) => Err(TextError::BadNumber { at: start }),
        }
    }

    fn string(&mut self) -> TextResult<String> {
        let start = self.pos;
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let chunk_start = self.pos;
            // Scan to the next structural byte, then copy the plain chunk
            // verbatim; the input is already valid UTF-8.
            while let Some(b) = self.peek() {
                if b == b'"' || b == b'\\' || b < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(
                std::str::from_utf8(&self.buf[chunk_start..self.pos])
                    .map_err(|_| TextError::UnterminatedString { at: start })?,
            );
            match self.peek() {
                None => return Err(TextError::UnterminatedString { at: start }),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape(&mut out)?;
                }
                Some(found) => {
                    return Err(TextError::UnexpectedByte { at: self.pos, found });
                }
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> TextResult<()> {
        let at = self.pos - 1;
        match self.bump()? {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{0008}'),
            b'f' => out.push('\u{000C}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let hi = self.hex4(at)?;
                let c = if (0xD800..=0xDBFF).contains(&hi) {
                    // High surrogate: a low surrogate escape must follow.
                    if self.bump()? != b'\\' || self.bump()? != b'u' {
                        return Err(TextError::BadEscape { at });
                    }
                    let lo = self.hex4(at)?;
                    if !(0xDC00..=0xDFFF).contains(&lo) {
                        return Err(TextError::BadEscape { at });
                    }
                    let combined = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                    char::from_u32(combined).ok_or(TextError::BadEscape { at })?
                } else {
                    char::from_u32(hi).ok_or(TextError::BadEscape { at })?
                };
                out.push(c);
            }
            _ => return Err(TextError::BadEscape { at }),
        }
        Ok(())
    }

    fn hex4(&mut self, at: usize) -> TextResult<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = match self.bump()? {
                b @ b'0'..=b'9' => u32::from(b - b'0'),
                b @ b'a'..=b'f' => u32::from(b - b'a') + 10,
                b @ b'A'..=b'F' => u32::from(b - b'A') + 10,
                _ => return Err(TextError::BadEscape { at }),
            };
            value = (value << 4) | digit;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(entries: &[(&str, Tree)]) -> Tree {
        Tree::Object(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn scalars_round_trip() {
        for (text, tree) in [
            ("null", Tree::Null),
            ("true", Tree::Bool(true)),
            ("false", Tree::Bool(false)),
            ("42", Tree::Num(42.0)),
            ("-3.5", Tree::Num(-3.5)),
            ("\"hi\"", Tree::String("hi".to_owned())),
        ] {
            assert_eq!(from_text(text).unwrap(), tree);
            assert_eq!(to_text(&tree), text);
        }
    }

    #[test]
    fn nested_structures_round_trip() {
        let tree = obj(&[
            ("name", Tree::String("nested".to_owned())),
            (
                "items",
                Tree::Array(vec![Tree::Num(1.0), Tree::Null, obj(&[])]),
            ),
        ]);
        assert_eq!(from_text(&to_text(&tree)).unwrap(), tree);
    }

    #[test]
    fn key_order_is_preserved() {
        let parsed = from_text("{\"z\": 1, \"a\": 2}").unwrap();
        assert_eq!(
            parsed,
            obj(&[("z", Tree::Num(1.0)), ("a", Tree::Num(2.0))])
        );
    }

    #[test]
    fn string_escapes_round_trip() {
        let tricky = "quote \" slash \\ newline \n tab \t nul \u{0} snowman ☃";
        let tree = Tree::String(tricky.to_owned());
        assert_eq!(from_text(&to_text(&tree)).unwrap(), tree);
        assert_eq!(
            from_text("\"\\u2603 \\ud83d\\ude00\"").unwrap(),
            Tree::String("☃ 😀".to_owned())
        );
    }

    #[test]
    fn exponents_parse() {
        assert_eq!(from_text("1e3").unwrap(), Tree::Num(1000.0));
        assert_eq!(from_text("-2.5E-1").unwrap(), Tree::Num(-0.25));
    }

    #[test]
    fn non_finite_numbers_render_null() {
        assert_eq!(to_text(&Tree::Num(f64::NAN)), "null");
        assert_eq!(to_text(&Tree::Num(f64::INFINITY)), "null");
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(from_text(""), Err(TextError::UnexpectedEnd));
        assert_eq!(
            from_text("{\"a\": 1,}").unwrap_err(),
            TextError::UnexpectedByte { at: 8, found: b'}' }
        );
        assert_eq!(
            from_text("\"open"),
            Err(TextError::UnterminatedString { at: 0 })
        );
        assert_eq!(from_text("\"\\q\""), Err(TextError::BadEscape { at: 1 }));
        assert_eq!(
            from_text("true false"),
            Err(TextError::TrailingData { at: 5 })
        );
        assert_eq!(from_text("-"), Err(TextError::BadNumber { at: 0 }));
    }

    #[test]
    fn unpaired_surrogate_is_rejected() {
        assert!(matches!(
            from_text("\"\\ud800x\""),
            Err(TextError::BadEscape { .. })
        ));
    }
}
