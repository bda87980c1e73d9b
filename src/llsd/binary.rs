//! LLSD binary encoding.
//!
//! Every value starts with a one-byte marker. Lengths and integers are
//! big-endian; dates are little-endian `f64` seconds since the epoch.
//!
//! | marker | value                                   |
//! |--------|-----------------------------------------|
//! | `!`    | undefined                               |
//! | `1` `0`| true / false                            |
//! | `i`    | `i32`                                   |
//! | `r`    | `f64`                                   |
//! | `u`    | 16 uuid bytes                           |
//! | `b`    | `u32` length + bytes                    |
//! | `s`    | `u32` length + UTF-8                    |
//! | `l`    | `u32` length + UTF-8 uri                |
//! | `d`    | `f64` (little-endian)                   |
//! | `[`    | `u32` count, values, `]`                |
//! | `{`    | `u32` count, (`k` key, value)*, `}`     |

use std::collections::BTreeMap;

use uuid::Uuid;

use super::{descend, Date, Error, Res, Value};

/// Header written in front of every binary document.
pub const HEADER: &[u8] = b"<?llsd/binary?>\n";

/// Serialize a value as an LLSD binary document, header included.
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut out = HEADER.to_vec();
    write_value(value, &mut out);
    out
}

fn write_len(len: usize, out: &mut Vec<u8>) {
    // LLSD lengths are u32 on the wire.
    out.extend_from_slice(&(len as u32).to_be_bytes());
}

fn write_bytes(marker: u8, bytes: &[u8], out: &mut Vec<u8>) {
    out.push(marker);
    write_len(bytes.len(), out);
    out.extend_from_slice(bytes);
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Undefined => out.push(b'!'),
        Value::Boolean(true) => out.push(b'1'),
        Value::Boolean(false) => out.push(b'0'),
        Value::Integer(i) => {
            out.push(b'i');
            out.extend_from_slice(&i.to_be_bytes());
        }
        Value::Real(r) => {
            out.push(b'r');
            out.extend_from_slice(&r.to_be_bytes());
        }
        Value::Uuid(u) => {
            out.push(b'u');
            out.extend_from_slice(u.as_bytes());
        }
        Value::Binary(b) => write_bytes(b'b', b, out),
        Value::String(s) => write_bytes(b's', s.as_bytes(), out),
        Value::Uri(u) => write_bytes(b'l', u.as_bytes(), out),
        Value::Date(d) => {
            out.push(b'd');
            out.extend_from_slice(&d.as_secs_f64().to_le_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            write_len(items.len(), out);
            for item in items {
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::Map(entries) => {
            out.push(b'{');
            write_len(entries.len(), out);
            for (key, item) in entries {
                write_bytes(b'k', key.as_bytes(), out);
                write_value(item, out);
            }
            out.push(b'}');
        }
    }
}

/// Parse an LLSD binary document. The header is optional.
pub fn from_slice(bytes: &[u8]) -> Res<Value> {
    let mut reader = Reader {
        buf: bytes,
        pos: 0,
        depth: 0,
    };
    if bytes.starts_with(HEADER) {
        reader.pos = HEADER.len();
    } else if bytes.starts_with(&HEADER[..HEADER.len() - 1]) {
        reader.pos = HEADER.len() - 1;
    }
    let value = reader.value()?;
    if reader.pos < bytes.len() {
        return Err(Error::TrailingData(reader.pos));
    }
    Ok(value)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Res<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::Eof(self.buf.len())),
        }
    }

    fn array<const N: usize>(&mut self) -> Res<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> Res<u8> {
        Ok(self.take(1)?[0])
    }

    fn len(&mut self) -> Res<usize> {
        Ok(u32::from_be_bytes(self.array()?) as usize)
    }

    /// A container's element count. Every element takes at least one byte,
    /// so a count beyond the remaining input is already truncated.
    fn count(&mut self) -> Res<usize> {
        let count = self.len()?;
        if count > self.buf.len() - self.pos {
            return Err(Error::Eof(self.buf.len()));
        }
        Ok(count)
    }

    fn sized(&mut self) -> Res<&'a [u8]> {
        let len = self.len()?;
        self.take(len)
    }

    fn string(&mut self) -> Res<String> {
        let start = self.pos + 4;
        let bytes = self.sized()?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| Error::Utf8(start + e.valid_up_to()))
    }

    fn expect(&mut self, marker: u8, what: &str) -> Res<()> {
        let offset = self.pos;
        if self.byte()? != marker {
            return Err(Error::syntax(offset, format!("expected {what}")));
        }
        Ok(())
    }

    fn value(&mut self) -> Res<Value> {
        let offset = self.pos;
        let value = match self.byte()? {
            b'!' => Value::Undefined,
            b'1' => Value::Boolean(true),
            b'0' => Value::Boolean(false),
            b'i' => Value::Integer(i32::from_be_bytes(self.array()?)),
            b'r' => Value::Real(f64::from_be_bytes(self.array()?)),
            b'u' => Value::Uuid(Uuid::from_bytes(self.array()?)),
            b'b' => Value::Binary(self.sized()?.to_vec()),
            b's' => Value::String(self.string()?),
            b'l' => Value::Uri(self.string()?),
            b'd' => {
                let secs = f64::from_le_bytes(self.array()?);
                Value::Date(
                    Date::from_secs_f64(secs).ok_or_else(|| Error::literal("date", secs.to_string()))?,
                )
            }
            b'[' => {
                descend(&mut self.depth, offset)?;
                let count = self.count()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.value()?);
                }
                self.expect(b']', "end of array")?;
                self.depth -= 1;
                Value::Array(items)
            }
            b'{' => {
                descend(&mut self.depth, offset)?;
                let count = self.count()?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    self.expect(b'k', "map key")?;
                    let key = self.string()?;
                    entries.insert(key, self.value()?);
                }
                self.expect(b'}', "end of map")?;
                self.depth -= 1;
                Value::Map(entries)
            }
            other => {
                return Err(Error::syntax(
                    offset,
                    format!("unknown marker 0x{other:02x}"),
                ))
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llsd::MAX_DEPTH;

    #[test]
    fn test_hello_document() {
        let value: Value = [("message", Value::from("Hello, world!"))].into_iter().collect();
        let bytes = to_vec(&value);

        let mut expected = HEADER.to_vec();
        expected.extend_from_slice(b"{\x00\x00\x00\x01k\x00\x00\x00\x07messages\x00\x00\x00\x0dHello, world!}");
        assert_eq!(bytes, expected);
        assert_eq!(from_slice(&bytes).unwrap(), value);
    }

    #[test]
    fn test_every_type_round_trips() {
        let value = Value::Array(vec![
            Value::Undefined,
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Integer(i32::MIN),
            Value::Real(-0.5),
            Value::from("snow ☃"),
            Value::Uuid(Uuid::from_u128(0x6bad258e_06f0_4a87_a659_493117c9c162)),
            Value::Date(Date::from_parts(2021, 12, 25, 6, 30, 0, 250_000)),
            Value::Uri("secondlife:///app/agent".into()),
            Value::Binary(vec![0xde, 0xad, 0xbe, 0xef]),
            [("nested", Value::Array(vec![]))].into_iter().collect(),
        ]);
        assert_eq!(from_slice(&to_vec(&value)).unwrap(), value);
    }

    #[test]
    fn test_header_is_optional() {
        assert_eq!(from_slice(b"i\x00\x00\x00\x2a").unwrap(), Value::Integer(42));
        assert_eq!(from_slice(b"<?llsd/binary?>!").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(from_slice(b""), Err(Error::Eof(_))));
        assert!(matches!(from_slice(b"i\x00\x01"), Err(Error::Eof(_))));
        assert!(matches!(from_slice(b"s\xff\xff\xff\xffabc"), Err(Error::Eof(_))));
        assert!(matches!(from_slice(b"s\x00\x00\x00\x01\xff"), Err(Error::Utf8(5))));
        assert!(matches!(from_slice(b"x"), Err(Error::Syntax { offset: 0, .. })));
        assert!(matches!(from_slice(b"[\x00\x00\x00\x01!}"), Err(Error::Syntax { .. })));
        assert!(matches!(from_slice(b"!!"), Err(Error::TrailingData(1))));
    }

    #[test]
    fn test_count_beyond_input() {
        assert!(matches!(from_slice(b"[\xff\xff\xff\xff!!]"), Err(Error::Eof(_))));
        assert!(matches!(from_slice(b"{\x7f\xff\xff\xff}"), Err(Error::Eof(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            let mut doc = Vec::new();
            for _ in 0..depth {
                doc.extend_from_slice(b"[\x00\x00\x00\x01");
            }
            doc.push(b'!');
            doc.extend(std::iter::repeat(b']').take(depth));
            doc
        };
        assert!(from_slice(&nested(MAX_DEPTH)).is_ok());
        assert!(matches!(
            from_slice(&nested(MAX_DEPTH + 1)),
            Err(Error::Syntax { reason, .. }) if reason == "nesting too deep"
        ));
        assert!(from_slice(&nested(100_000)).is_err());
    }

    #[test]
    fn test_unrepresentable_date() {
        let mut doc = b"d".to_vec();
        doc.extend_from_slice(&f64::NAN.to_le_bytes());
        assert!(matches!(from_slice(&doc), Err(Error::Literal { kind: "date", .. })));

        let mut doc = b"d".to_vec();
        doc.extend_from_slice(&1.0e300f64.to_le_bytes());
        assert!(matches!(from_slice(&doc), Err(Error::Literal { kind: "date", .. })));
    }
}
