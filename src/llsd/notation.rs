//! LLSD notation encoding.
//!
//! A compact text syntax: `{'message':'Hello','n':i42,'when':d"2006-02-01T14:29:53.430000Z"}`.
//!
//! The writer always emits the canonical short forms. The reader also
//! accepts the alternative spellings found in the wild: `true`/`T`/`t`
//! booleans, double-quoted strings, length-prefixed `s(N)"…"` strings and
//! `b16`/`b(N)` binary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use uuid::Uuid;

use super::{
    decode_base64, descend, encode_base64, format_real, parse_real, Date, Error, Res, Value,
};

/// Serialize a value in LLSD notation.
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_value(value, &mut out);
    out.into_bytes()
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Undefined => out.push('!'),
        Value::Boolean(true) => out.push('1'),
        Value::Boolean(false) => out.push('0'),
        Value::Integer(i) => {
            let _ = write!(out, "i{i}");
        }
        Value::Real(r) => {
            let _ = write!(out, "r{}", format_real(*r));
        }
        Value::String(s) => write_quoted('\'', s, out),
        Value::Uuid(u) => {
            let _ = write!(out, "u{u}");
        }
        Value::Date(d) => {
            let _ = write!(out, "d\"{d}\"");
        }
        Value::Uri(u) => {
            out.push('l');
            write_quoted('"', u, out);
        }
        Value::Binary(b) => {
            let _ = write!(out, "b64\"{}\"", encode_base64(b));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_quoted('\'', key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_quoted(quote: char, text: &str, out: &mut String) {
    out.push(quote);
    for c in text.chars() {
        if c == quote || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quote);
}

/// Parse an LLSD notation document.
pub fn from_slice(bytes: &[u8]) -> Res<Value> {
    let mut parser = Parser {
        buf: bytes,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < bytes.len() {
        return Err(Error::TrailingData(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn next(&mut self) -> Res<u8> {
        let b = self.peek().ok_or(Error::Eof(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: u8) -> Res<()> {
        let offset = self.pos;
        if self.next()? != want {
            return Err(Error::syntax(offset, format!("expected '{}'", want as char)));
        }
        Ok(())
    }

    fn eat(&mut self, word: &[u8]) -> bool {
        if self.buf[self.pos..].starts_with(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, f: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&f) {
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }

    fn value(&mut self) -> Res<Value> {
        let offset = self.pos;
        let value = match self.next()? {
            b'!' => Value::Undefined,
            b'1' => Value::Boolean(true),
            b'0' => Value::Boolean(false),
            b't' => {
                self.eat(b"rue");
                Value::Boolean(true)
            }
            b'T' => {
                let _ = self.eat(b"RUE") || self.eat(b"rue");
                Value::Boolean(true)
            }
            b'f' => {
                self.eat(b"alse");
                Value::Boolean(false)
            }
            b'F' => {
                let _ = self.eat(b"ALSE") || self.eat(b"alse");
                Value::Boolean(false)
            }
            b'i' => {
                let text = self.token(|b| b.is_ascii_digit() || b == b'-' || b == b'+');
                Value::Integer(text.parse().map_err(|_| Error::literal("integer", text))?)
            }
            b'r' => {
                let text = self.token(|b| b.is_ascii_alphanumeric() || b"+-.".contains(&b));
                Value::Real(parse_real(&text)?)
            }
            b'u' => {
                let text = self.token(|b| b.is_ascii_hexdigit() || b == b'-');
                Value::Uuid(Uuid::parse_str(&text).map_err(|_| Error::literal("uuid", text))?)
            }
            b'b' => Value::Binary(self.binary()?),
            b's' => Value::String(utf8(self.sized()?, offset)?),
            q @ (b'\'' | b'"') => Value::String(utf8(self.quoted(q)?, offset)?),
            b'l' => {
                let q = self.next()?;
                Value::Uri(utf8(self.quoted(q)?, offset)?)
            }
            b'd' => {
                let q = self.next()?;
                let text = utf8(self.quoted(q)?, offset)?;
                Value::Date(Date::parse(&text)?)
            }
            b'[' => {
                descend(&mut self.depth, offset)?;
                let mut items = Vec::new();
                self.skip_ws();
                if self.peek() != Some(b']') {
                    loop {
                        self.skip_ws();
                        items.push(self.value()?);
                        self.skip_ws();
                        match self.next()? {
                            b',' => continue,
                            b']' => break,
                            _ => return Err(Error::syntax(self.pos - 1, "expected ',' or ']'")),
                        }
                    }
                } else {
                    self.pos += 1;
                }
                self.depth -= 1;
                Value::Array(items)
            }
            b'{' => {
                descend(&mut self.depth, offset)?;
                let mut entries = BTreeMap::new();
                self.skip_ws();
                if self.peek() != Some(b'}') {
                    loop {
                        self.skip_ws();
                        let key = self.key()?;
                        self.skip_ws();
                        self.expect(b':')?;
                        self.skip_ws();
                        entries.insert(key, self.value()?);
                        self.skip_ws();
                        match self.next()? {
                            b',' => continue,
                            b'}' => break,
                            _ => return Err(Error::syntax(self.pos - 1, "expected ',' or '}'")),
                        }
                    }
                } else {
                    self.pos += 1;
                }
                self.depth -= 1;
                Value::Map(entries)
            }
            other => {
                return Err(Error::syntax(
                    offset,
                    format!("unexpected character '{}'", other.escape_ascii()),
                ))
            }
        };
        Ok(value)
    }

    fn token(&mut self, f: impl Fn(u8) -> bool) -> String {
        String::from_utf8_lossy(self.take_while(f)).into_owned()
    }

    fn key(&mut self) -> Res<String> {
        let offset = self.pos;
        let bytes = match self.next()? {
            q @ (b'\'' | b'"') => self.quoted(q)?,
            b's' => self.sized()?,
            _ => return Err(Error::syntax(offset, "expected a map key")),
        };
        utf8(bytes, offset)
    }

    /// `(N)"…"`: a length prefix followed by exactly N raw bytes in quotes.
    fn sized(&mut self) -> Res<Vec<u8>> {
        self.expect(b'(')?;
        let digits = self.token(|b| b.is_ascii_digit());
        let len: usize = digits
            .parse()
            .map_err(|_| Error::literal("length", digits))?;
        self.expect(b')')?;
        let quote = self.next()?;
        if quote != b'"' && quote != b'\'' {
            return Err(Error::syntax(self.pos - 1, "expected a quote"));
        }
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(Error::Eof(self.buf.len()))?;
        let raw = self.buf[self.pos..end].to_vec();
        self.pos = end;
        self.expect(quote)?;
        Ok(raw)
    }

    /// Body of a backslash-escaped string; the opening quote is already consumed.
    fn quoted(&mut self, quote: u8) -> Res<Vec<u8>> {
        if quote != b'"' && quote != b'\'' {
            return Err(Error::syntax(self.pos - 1, "expected a quote"));
        }
        let mut out = Vec::new();
        loop {
            match self.next()? {
                b if b == quote => return Ok(out),
                b'\\' => {
                    let escaped = match self.next()? {
                        b'a' => 0x07,
                        b'b' => 0x08,
                        b'f' => 0x0c,
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'v' => 0x0b,
                        b'x' => {
                            let hex = self.take_fixed(2)?;
                            u8::from_str_radix(&hex, 16).map_err(|_| Error::literal("escape", hex))?
                        }
                        other => other,
                    };
                    out.push(escaped);
                }
                b => out.push(b),
            }
        }
    }

    fn take_fixed(&mut self, n: usize) -> Res<String> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(Error::Eof(self.buf.len()));
        }
        let text = String::from_utf8_lossy(&self.buf[self.pos..end]).into_owned();
        self.pos = end;
        Ok(text)
    }

    fn binary(&mut self) -> Res<Vec<u8>> {
        if self.eat(b"64") {
            self.expect(b'"')?;
            let body = self.quoted(b'"')?;
            return decode_base64(&String::from_utf8_lossy(&body));
        }
        if self.eat(b"16") {
            self.expect(b'"')?;
            let body = self.quoted(b'"')?;
            return decode_base16(&String::from_utf8_lossy(&body));
        }
        self.sized()
    }
}

fn utf8(bytes: Vec<u8>, offset: usize) -> Res<String> {
    String::from_utf8(bytes).map_err(|e| Error::Utf8(offset + e.utf8_error().valid_up_to()))
}

fn decode_base16(text: &str) -> Res<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(Error::literal("base16", text));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| Error::literal("base16", text))
        })
        .collect()
}
