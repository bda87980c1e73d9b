//! LLSD XML encoding.
//!
//! ```text
//! <?xml version="1.0" ?><llsd><map><key>message</key><string>Hello</string></map></llsd>
//! ```
//!
//! The parser understands the subset of XML that LLSD documents use:
//! a prolog, comments, elements with attributes, character and entity
//! references and CDATA sections. Namespaces and DTDs are not interpreted.

use std::borrow::Cow;
use std::fmt::Write as _;

use uuid::Uuid;

use super::{
    decode_base64, descend, encode_base64, format_real, parse_real, Date, Error, Res, Value,
};

const PROLOG: &str = r#"<?xml version="1.0" ?>"#;

/// Serialize a value as an LLSD XML document.
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut out = String::from(PROLOG);
    out.push_str("<llsd>");
    write_value(value, &mut out);
    out.push_str("</llsd>");
    out.into_bytes()
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Undefined => out.push_str("<undef />"),
        Value::Boolean(b) => {
            let _ = write!(out, "<boolean>{b}</boolean>");
        }
        Value::Integer(i) => {
            let _ = write!(out, "<integer>{i}</integer>");
        }
        Value::Real(r) => {
            let _ = write!(out, "<real>{}</real>", format_real(*r));
        }
        Value::String(s) => write_text("string", s, out),
        Value::Uuid(u) => {
            let _ = write!(out, "<uuid>{u}</uuid>");
        }
        Value::Date(d) => {
            let _ = write!(out, "<date>{d}</date>");
        }
        Value::Uri(u) => write_text("uri", u, out),
        Value::Binary(b) => {
            let _ = write!(
                out,
                r#"<binary encoding="base64">{}</binary>"#,
                encode_base64(b)
            );
        }
        Value::Array(items) => {
            out.push_str("<array>");
            for item in items {
                write_value(item, out);
            }
            out.push_str("</array>");
        }
        Value::Map(entries) => {
            out.push_str("<map>");
            for (key, item) in entries {
                write_text("key", key, out);
                write_value(item, out);
            }
            out.push_str("</map>");
        }
    }
}

fn write_text(tag: &str, text: &str, out: &mut String) {
    if text.is_empty() {
        let _ = write!(out, "<{tag} />");
        return;
    }
    let _ = write!(out, "<{tag}>");
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    let _ = write!(out, "</{tag}>");
}

/// Parse an LLSD XML document.
pub fn from_slice(bytes: &[u8]) -> Res<Value> {
    let src = std::str::from_utf8(bytes).map_err(|e| Error::Utf8(e.valid_up_to()))?;
    let mut parser = Parser {
        src,
        pos: 0,
        depth: 0,
    };
    parser.document()
}

struct Tag<'a> {
    name: &'a str,
    attrs: &'a str,
    empty: bool,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn document(&mut self) -> Res<Value> {
        self.skip_misc()?;
        let root = self.open_tag()?;
        if root.name != "llsd" {
            return Err(Error::UnknownElement(root.name.to_string()));
        }
        let value = if root.empty {
            Value::Undefined
        } else {
            self.skip_misc()?;
            let value = if self.at_close() {
                Value::Undefined
            } else {
                self.value()?
            };
            self.skip_misc()?;
            self.close_tag("llsd")?;
            value
        };
        self.skip_misc()?;
        if self.pos < self.src.len() {
            return Err(Error::TrailingData(self.pos));
        }
        Ok(value)
    }

    fn value(&mut self) -> Res<Value> {
        let offset = self.pos;
        let tag = self.open_tag()?;
        let name = tag.name;
        let value = match name {
            "undef" => {
                self.text(&tag)?;
                Value::Undefined
            }
            "boolean" => match self.text(&tag)?.trim() {
                "" | "0" | "false" => Value::Boolean(false),
                "1" | "true" => Value::Boolean(true),
                other => return Err(Error::literal("boolean", other)),
            },
            "integer" => {
                let text = self.text(&tag)?;
                let text = text.trim();
                if text.is_empty() {
                    Value::Integer(0)
                } else {
                    Value::Integer(text.parse().map_err(|_| Error::literal("integer", text))?)
                }
            }
            "real" => {
                let text = self.text(&tag)?;
                if text.trim().is_empty() {
                    Value::Real(0.0)
                } else {
                    Value::Real(parse_real(&text)?)
                }
            }
            "string" => Value::String(self.text(&tag)?),
            "uri" => Value::Uri(self.text(&tag)?),
            "uuid" => {
                let text = self.text(&tag)?;
                let text = text.trim();
                if text.is_empty() {
                    Value::Uuid(Uuid::nil())
                } else {
                    Value::Uuid(Uuid::parse_str(text).map_err(|_| Error::literal("uuid", text))?)
                }
            }
            "date" => {
                let text = self.text(&tag)?;
                if text.trim().is_empty() {
                    Value::Date(Date::EPOCH)
                } else {
                    Value::Date(Date::parse(&text)?)
                }
            }
            "binary" => {
                let encoding = attribute(tag.attrs, "encoding").unwrap_or("base64");
                if encoding != "base64" {
                    return Err(Error::literal("binary encoding", encoding));
                }
                Value::Binary(decode_base64(&self.text(&tag)?)?)
            }
            "array" => {
                descend(&mut self.depth, offset)?;
                let mut items = Vec::new();
                if !tag.empty {
                    loop {
                        self.skip_misc()?;
                        if self.at_close() {
                            break;
                        }
                        items.push(self.value()?);
                    }
                    self.close_tag("array")?;
                }
                self.depth -= 1;
                Value::Array(items)
            }
            "map" => {
                descend(&mut self.depth, offset)?;
                let mut entries = std::collections::BTreeMap::new();
                if !tag.empty {
                    loop {
                        self.skip_misc()?;
                        if self.at_close() {
                            break;
                        }
                        let key_tag = self.open_tag()?;
                        if key_tag.name != "key" {
                            return Err(Error::syntax(self.pos, "expected <key> in map"));
                        }
                        let key = self.text(&key_tag)?;
                        self.skip_misc()?;
                        let item = self.value()?;
                        entries.insert(key, item);
                    }
                    self.close_tag("map")?;
                }
                self.depth -= 1;
                Value::Map(entries)
            }
            other => return Err(Error::UnknownElement(other.to_string())),
        };
        Ok(value)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_close(&self) -> bool {
        self.rest().starts_with("</")
    }

    /// Skip whitespace, processing instructions, comments and doctypes.
    fn skip_misc(&mut self) -> Res<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("<?") {
                self.skip_past("?>")?;
            } else if trimmed.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if trimmed.starts_with("<!DOCTYPE") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_past(&mut self, end: &str) -> Res<()> {
        match self.rest().find(end) {
            Some(i) => {
                self.pos += i + end.len();
                Ok(())
            }
            None => Err(Error::Eof(self.src.len())),
        }
    }

    fn open_tag(&mut self) -> Res<Tag<'a>> {
        let rest = self.rest();
        if rest.is_empty() {
            return Err(Error::Eof(self.pos));
        }
        if !rest.starts_with('<') || rest.starts_with("</") {
            return Err(Error::syntax(self.pos, "expected an element"));
        }
        let end = tag_end(rest).ok_or(Error::Eof(self.src.len()))?;
        let inner = &rest[1..end];
        let (inner, empty) = match inner.strip_suffix('/') {
            Some(inner) => (inner, true),
            None => (inner, false),
        };
        let name_len = inner
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        if name.is_empty() {
            return Err(Error::syntax(self.pos, "empty element name"));
        }
        self.pos += end + 1;
        Ok(Tag {
            name,
            attrs: &inner[name_len..],
            empty,
        })
    }

    fn close_tag(&mut self, name: &str) -> Res<()> {
        let rest = self.rest();
        let body = rest
            .strip_prefix("</")
            .ok_or_else(|| Error::syntax(self.pos, format!("expected </{name}>")))?;
        let end = body.find('>').ok_or(Error::Eof(self.src.len()))?;
        if body[..end].trim_end() != name {
            return Err(Error::syntax(self.pos, format!("expected </{name}>")));
        }
        self.pos += 2 + end + 1;
        Ok(())
    }

    /// Character content of a scalar element, consuming its end tag.
    fn text(&mut self, tag: &Tag<'a>) -> Res<String> {
        let mut text = String::new();
        if tag.empty {
            return Ok(text);
        }
        loop {
            let rest = self.rest();
            let lt = rest.find('<').ok_or(Error::Eof(self.src.len()))?;
            text.push_str(&unescape(&rest[..lt], self.pos)?);
            let after = &rest[lt..];
            if let Some(body) = after.strip_prefix("<![CDATA[") {
                let end = body.find("]]>").ok_or(Error::Eof(self.src.len()))?;
                text.push_str(&body[..end]);
                self.pos += lt + "<![CDATA[".len() + end + "]]>".len();
            } else if after.starts_with("<!--") {
                self.pos += lt;
                self.skip_past("-->")?;
            } else {
                self.pos += lt;
                self.close_tag(tag.name)?;
                return Ok(text);
            }
        }
    }
}

// Position of the `>` closing a tag, ignoring any inside quoted attribute values.
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = attrs;
    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let quote = after.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let value_end = after[1..].find(quote)?;
        let value = &after[1..1 + value_end];
        if key == name {
            return Some(value);
        }
        rest = &after[1 + value_end + 1..];
    }
    None
}

fn unescape(text: &str, offset: usize) -> Res<Cow<'_, str>> {
    if !text.contains('&') {
        return Ok(Cow::Borrowed(text));
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| Error::syntax(offset, "unterminated entity reference"))?;
        let entity = &after[..semi];
        let c = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    Error::syntax(offset, format!("unknown entity &{entity};"))
                })?
            }
        };
        out.push(c);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}
