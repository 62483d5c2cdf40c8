//! Binary `Formatter`: walks a `Decomposer` and emits the wire format from
//! `wire`. Grounded on cxxtools `bin::Formatter` (`addValue`/`beginObject`/
//! `beginMember`/`finishObject`...), restructured around a small frame
//! stack so a single `Formatter` trait method can decide on its own
//! whether it owes a `0x01` member separator, instead of relying on
//! separate `beginMember`/`finishMember` calls from the walker.

use crate::wire;
use std::io::{self, Write};
use wiretree_core::{FormatError, Formatter, Scalar};

enum Frame {
    Object,
    Array,
}

pub struct BinaryFormatter<W: Write> {
    out: W,
    stack: Vec<Frame>,
}

impl<W: Write> BinaryFormatter<W> {
    pub fn new(out: W) -> Self {
        BinaryFormatter { out, stack: Vec::new() }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn before_value(&mut self) -> io::Result<()> {
        if matches!(self.stack.last(), Some(Frame::Object)) {
            self.out.write_all(&[wire::MEMBER_SEPARATOR])?;
        }
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, value: &Scalar) -> io::Result<()> {
        let plain = name.is_empty();
        match value {
            Scalar::None => {
                self.out.write_all(&[code(wire::PLAIN_EMPTY, wire::EMPTY, plain)])?;
                write_name(&mut self.out, name)?;
                self.out.write_all(&[wire::TERMINATOR])
            }
            Scalar::Bool(b) => {
                self.out.write_all(&[code(wire::PLAIN_BOOL, wire::BOOL, plain)])?;
                write_name(&mut self.out, name)?;
                self.out.write_all(&[if *b { 1 } else { 0 }])
            }
            Scalar::Char(c) => {
                self.out.write_all(&[code(wire::PLAIN_CHAR, wire::CHAR, plain)])?;
                write_name(&mut self.out, name)?;
                let mut buf = [0u8; 4];
                self.out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
                self.out.write_all(&[wire::NAME_TERMINATOR, wire::TERMINATOR])
            }
            Scalar::Str(s) => self.write_str_scalar(name, s),
            Scalar::Bytes(b) => self.write_binary(name, b),
            Scalar::Signed(v) => wire::write_int(&mut self.out, *v, name),
            Scalar::Unsigned(v) => wire::write_uint(&mut self.out, *v, name),
            Scalar::Float(f) => self.write_float(name, *f),
        }
    }

    /// `Scalar::Str` covers both genuine text and the numeric-as-string
    /// values a lenient upstream parser (JSON) hands over for what was
    /// really an int or double. A binary string with an embedded NUL can't
    /// be framed as `PLAIN_STRING` at all (the NUL is the payload
    /// terminator), so it goes out as a length-prefixed blob instead.
    fn write_str_scalar(&mut self, name: &str, s: &str) -> io::Result<()> {
        if s.as_bytes().contains(&0) {
            return self.write_binary(name, s.as_bytes());
        }
        if let Some(reparsed) = reinterpret_numeric_string(s) {
            return match reparsed {
                NumericReinterpretation::Signed(v) => wire::write_int(&mut self.out, v, name),
                NumericReinterpretation::Unsigned(v) => wire::write_uint(&mut self.out, v, name),
                NumericReinterpretation::Float(nibbles) => self.write_bcd_digits(name, &nibbles),
            };
        }
        self.write_plain_string(name, s)
    }

    fn write_plain_string(&mut self, name: &str, s: &str) -> io::Result<()> {
        let plain = name.is_empty();
        self.out.write_all(&[code(wire::PLAIN_STRING, wire::STRING, plain)])?;
        write_name(&mut self.out, name)?;
        self.out.write_all(s.as_bytes())?;
        self.out.write_all(&[wire::NAME_TERMINATOR, wire::TERMINATOR])
    }

    /// Packs a BCD digit-nibble sequence (see `bcd_nibbles_for_float_text`)
    /// into the wire's two-nibbles-per-byte layout, matching the decode side
    /// in `parser::read_bcd_float`: a trailing odd nibble gets `0x0d` as its
    /// low nibble, followed by the frame terminator.
    fn write_bcd_digits(&mut self, name: &str, nibbles: &[u8]) -> io::Result<()> {
        let plain = name.is_empty();
        self.out.write_all(&[code(wire::PLAIN_BCD_FLOAT, wire::BCD_FLOAT, plain)])?;
        write_name(&mut self.out, name)?;
        let mut i = 0;
        while i + 1 < nibbles.len() {
            self.out.write_all(&[(nibbles[i] << 4) | nibbles[i + 1]])?;
            i += 2;
        }
        if i < nibbles.len() {
            self.out.write_all(&[(nibbles[i] << 4) | 0x0d])?;
        }
        self.out.write_all(&[wire::TERMINATOR])
    }

    fn write_binary(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let plain = name.is_empty();
        if bytes.len() <= u16::MAX as usize {
            self.out.write_all(&[code(wire::PLAIN_BINARY2, wire::BINARY2, plain)])?;
            write_name(&mut self.out, name)?;
            self.out.write_all(&(bytes.len() as u16).to_be_bytes())?;
        } else {
            self.out.write_all(&[code(wire::PLAIN_BINARY4, wire::BINARY4, plain)])?;
            write_name(&mut self.out, name)?;
            self.out.write_all(&(bytes.len() as u32).to_be_bytes())?;
        }
        self.out.write_all(bytes)
    }

    /// Bit-exact short/medium/long float encoding (see `wire`). A
    /// `Scalar::Float` arrives as a real `f64`, never as a numeric string,
    /// so it always takes this binary path; the BCD encoding is reserved
    /// for `Scalar::Str` values reinterpreted by `write_str_scalar`.
    fn write_float(&mut self, name: &str, v: f64) -> io::Result<()> {
        let plain = name.is_empty();
        let write_short = |out: &mut W, e: u8, m: u16| -> io::Result<()> {
            out.write_all(&[code(wire::PLAIN_SHORT_FLOAT, wire::SHORT_FLOAT, plain)])?;
            write_name(out, name)?;
            out.write_all(&[e])?;
            out.write_all(&m.to_be_bytes())
        };

        if v.is_nan() {
            return write_short(&mut self.out, 0x7f, 0x0100);
        }
        if v == f64::INFINITY {
            return write_short(&mut self.out, 0x7f, 0x0000);
        }
        if v == f64::NEG_INFINITY {
            return write_short(&mut self.out, 0xff, 0x0000);
        }
        if v == 0.0 {
            let e = if v.is_sign_negative() { 0xff } else { 0x7f };
            return write_short(&mut self.out, e, 0x0200);
        }

        let (neg, exp, m) = wire::decompose_finite_nonzero(v);
        tracing::trace!(value = v, exp, m, neg, "encoding float");
        if m & 0x0000_ffff_ffff_ffff == 0 && exp.abs() <= 63 {
            tracing::trace!("output short float");
            let e = (exp + 63) as u8 | if neg { 0x80 } else { 0 };
            write_short(&mut self.out, e, (m >> 48) as u16)
        } else if m & 0xffff_ffff == 0 && exp.abs() <= 63 {
            tracing::trace!("output medium float");
            let e = (exp + 63) as u8 | if neg { 0x80 } else { 0 };
            self.out.write_all(&[code(wire::PLAIN_MEDIUM_FLOAT, wire::MEDIUM_FLOAT, plain)])?;
            write_name(&mut self.out, name)?;
            self.out.write_all(&[e])?;
            self.out.write_all(&((m >> 32) as u32).to_be_bytes())
        } else {
            tracing::trace!("output long float");
            let mut e = (exp + 16383) as u16;
            if neg {
                e |= 0x8000;
            }
            self.out.write_all(&[code(wire::PLAIN_LONG_FLOAT, wire::LONG_FLOAT, plain)])?;
            write_name(&mut self.out, name)?;
            self.out.write_all(&e.to_be_bytes())?;
            self.out.write_all(&m.to_be_bytes())
        }
    }
}

enum NumericReinterpretation {
    Signed(i64),
    Unsigned(u64),
    Float(Vec<u8>),
}

/// Mirrors the addValue-time reinterpretation from §4.3: a numeric string
/// becomes a signed int if it carries a leading sign, an unsigned int
/// otherwise, and only a true float (one with a `.`/`e`/`E`, not just
/// anything `f64::from_str` tolerates such as `"inf"`/`"NaN"`) falls back to
/// BCD digits. Anything else keeps its original string representation.
fn reinterpret_numeric_string(s: &str) -> Option<NumericReinterpretation> {
    if s.is_empty() {
        return None;
    }
    let signed = s.starts_with('-') || s.starts_with('+');
    if signed {
        if let Ok(v) = s.parse::<i64>() {
            return Some(NumericReinterpretation::Signed(v));
        }
    } else if let Ok(v) = s.parse::<u64>() {
        return Some(NumericReinterpretation::Unsigned(v));
    }

    if s.contains(['.', 'e', 'E']) && s.parse::<f64>().is_ok() {
        if let Some(nibbles) = bcd_nibbles_for_float_text(s) {
            return Some(NumericReinterpretation::Float(nibbles));
        }
    }
    None
}

/// Maps each character of a float literal to the BCD nibble `push_bcd_nibble`
/// (parser side) decodes it back from; `None` if the text uses anything the
/// BCD alphabet can't represent (e.g. `"inf"`).
fn bcd_nibbles_for_float_text(s: &str) -> Option<Vec<u8>> {
    s.chars()
        .map(|c| match c {
            '0'..='9' => Some(c as u8 - b'0'),
            '+' => Some(0x0a),
            '-' => Some(0x0b),
            '.' => Some(0x0c),
            'e' | 'E' => Some(0x0e),
            _ => None,
        })
        .collect()
}

fn code(plain_code: u8, named_code: u8, plain: bool) -> u8 {
    if plain { plain_code } else { named_code }
}

fn write_name<W: Write>(out: &mut W, name: &str) -> io::Result<()> {
    if name.is_empty() {
        return Ok(());
    }
    out.write_all(name.as_bytes())?;
    out.write_all(&[wire::NAME_TERMINATOR])
}

impl<W: Write> Formatter for BinaryFormatter<W> {
    fn add_value(&mut self, name: &str, _type_name: &str, value: &Scalar) -> Result<(), FormatError> {
        self.before_value()?;
        self.write_scalar(name, value)?;
        Ok(())
    }

    fn add_null(&mut self, name: &str, _type_name: &str) -> Result<(), FormatError> {
        self.before_value()?;
        let plain = name.is_empty();
        self.out.write_all(&[code(wire::PLAIN_EMPTY, wire::EMPTY, plain)])?;
        write_name(&mut self.out, name)?;
        self.out.write_all(&[wire::TERMINATOR])?;
        Ok(())
    }

    fn begin_array(&mut self, name: &str, type_name: &str) -> Result<(), FormatError> {
        self.before_value()?;
        self.out.write_all(&[wire::CATEGORY_ARRAY])?;
        self.out.write_all(name.as_bytes())?;
        self.out.write_all(&[wire::NAME_TERMINATOR])?;
        wire::write_type_code(&mut self.out, type_name, name.is_empty())?;
        self.stack.push(Frame::Array);
        Ok(())
    }

    fn finish_array(&mut self) -> Result<(), FormatError> {
        self.stack.pop();
        self.out.write_all(&[wire::TERMINATOR])?;
        Ok(())
    }

    fn begin_object(&mut self, name: &str, type_name: &str) -> Result<(), FormatError> {
        self.before_value()?;
        self.out.write_all(&[wire::CATEGORY_OBJECT])?;
        self.out.write_all(name.as_bytes())?;
        self.out.write_all(&[wire::NAME_TERMINATOR])?;
        // cxxtools always writes the *named* type-code variant here, even
        // when the object itself is unnamed — only `beginArray` chooses
        // plain-vs-named from its own name.
        wire::write_type_code(&mut self.out, type_name, false)?;
        self.stack.push(Frame::Object);
        Ok(())
    }

    fn finish_object(&mut self) -> Result<(), FormatError> {
        self.stack.pop();
        self.out.write_all(&[wire::TERMINATOR])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BinaryParser;
    use std::io::Cursor;
    use wiretree_core::Node;

    fn roundtrip(node: &Node) -> Node {
        let mut out = Vec::new();
        {
            let mut fmt = BinaryFormatter::new(&mut out);
            node.decompose("", &mut fmt).unwrap();
        }
        let mut cursor = Cursor::new(out);
        let mut decoded = Node::void();
        BinaryParser::new().parse_root(&mut cursor, &mut decoded).unwrap();
        decoded
    }

    #[test]
    fn string_with_embedded_nul_round_trips_as_binary() {
        let node = Node::value("a\0b");
        let mut out = Vec::new();
        {
            let mut fmt = BinaryFormatter::new(&mut out);
            node.decompose("", &mut fmt).unwrap();
        }
        assert_eq!(out[0], wire::PLAIN_BINARY2);

        let decoded = roundtrip(&node);
        assert_eq!(decoded.as_bytes().unwrap(), b"a\0b");
    }

    #[test]
    fn unsigned_numeric_string_is_reinterpreted_as_an_int() {
        let node = Node::value("1000");
        let mut out = Vec::new();
        {
            let mut fmt = BinaryFormatter::new(&mut out);
            node.decompose("", &mut fmt).unwrap();
        }
        assert_eq!(out[0], wire::PLAIN_UINT16);

        let decoded = roundtrip(&node);
        assert_eq!(decoded.as_i64().unwrap(), 1000);
    }

    #[test]
    fn signed_numeric_string_is_reinterpreted_as_an_int() {
        let node = Node::value("-42");
        let mut out = Vec::new();
        {
            let mut fmt = BinaryFormatter::new(&mut out);
            node.decompose("", &mut fmt).unwrap();
        }
        assert_eq!(out[0], wire::PLAIN_INT8);

        let decoded = roundtrip(&node);
        assert_eq!(decoded.as_i64().unwrap(), -42);
    }

    #[test]
    fn float_numeric_string_falls_back_to_bcd() {
        let node = Node::value("32.12");
        let mut out = Vec::new();
        {
            let mut fmt = BinaryFormatter::new(&mut out);
            node.decompose("", &mut fmt).unwrap();
        }
        assert_eq!(out[0], wire::PLAIN_BCD_FLOAT);

        let decoded = roundtrip(&node);
        assert_eq!(decoded.as_f64().unwrap(), 32.12);
    }

    #[test]
    fn non_numeric_string_stays_a_plain_string() {
        let decoded = roundtrip(&Node::value("foobar"));
        assert_eq!(decoded.as_text().unwrap(), "foobar");
    }
}
