//! JSON formatter. No direct cxxtools counterpart ships in the retrieved
//! sources (only the parser does); grounded instead on the frame-stack
//! design `wiretree_binary::formatter` uses to decide separator placement
//! from its own nesting context, adapted here for commas/indentation
//! instead of the binary format's `0x01` byte.

use std::io::{self, Write};
use wiretree_core::{FormatError, Formatter, Scalar};

enum Frame {
    Object { wrote_member: bool },
    Array { wrote_element: bool },
}

pub struct JsonFormatter<W: Write> {
    out: W,
    stack: Vec<Frame>,
    beautify: bool,
    plainkey: bool,
}

impl<W: Write> JsonFormatter<W> {
    pub fn new(out: W) -> Self {
        JsonFormatter { out, stack: Vec::new(), beautify: false, plainkey: false }
    }

    pub fn beautify(mut self, beautify: bool) -> Self {
        self.beautify = beautify;
        self
    }

    pub fn plainkey(mut self, plainkey: bool) -> Self {
        self.plainkey = plainkey;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn newline_indent(&mut self, depth: usize) -> io::Result<()> {
        if self.beautify {
            self.out.write_all(b"\n")?;
            for _ in 0..depth {
                self.out.write_all(b"    ")?;
            }
        }
        Ok(())
    }

    /// Writes the comma/indentation preceding a member or element, and the
    /// `"name":` prefix for object members.
    fn before_value(&mut self, name: &str) -> io::Result<()> {
        let depth = self.depth();
        match self.stack.last_mut() {
            Some(Frame::Object { wrote_member }) => {
                if *wrote_member {
                    self.out.write_all(b",")?;
                }
                *wrote_member = true;
                self.newline_indent(depth)?;
                self.write_key(name)?;
                self.out.write_all(b":")?;
                if self.beautify {
                    self.out.write_all(b" ")?;
                }
            }
            Some(Frame::Array { wrote_element }) => {
                if *wrote_element {
                    self.out.write_all(b",")?;
                }
                *wrote_element = true;
                self.newline_indent(depth)?;
            }
            None => {}
        }
        Ok(())
    }

    fn write_key(&mut self, name: &str) -> io::Result<()> {
        if self.plainkey && is_bare_identifier(name) {
            self.out.write_all(name.as_bytes())
        } else {
            write_json_string(&mut self.out, name)
        }
    }

    fn write_scalar(&mut self, type_name: &str, value: &Scalar) -> io::Result<()> {
        match value {
            Scalar::None => self.out.write_all(b"null"),
            Scalar::Bool(b) => self.out.write_all(if *b { b"true" } else { b"false" }),
            Scalar::Char(c) => write_json_string(&mut self.out, &c.to_string()),
            Scalar::Str(s) if type_name == "json" => self.out.write_all(s.as_bytes()),
            Scalar::Str(s) => write_json_string(&mut self.out, s),
            Scalar::Bytes(b) => write_json_string(&mut self.out, &hex_encode(b)),
            Scalar::Signed(v) => write!(self.out, "{v}"),
            Scalar::Unsigned(v) => write!(self.out, "{v}"),
            Scalar::Float(v) => write_json_float(&mut self.out, *v),
        }
    }
}

fn is_bare_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_json_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    out.write_all(b"\"")?;
    for c in s.chars() {
        match c {
            '"' => out.write_all(b"\\\"")?,
            '\\' => out.write_all(b"\\\\")?,
            '\n' => out.write_all(b"\\n")?,
            '\r' => out.write_all(b"\\r")?,
            '\t' => out.write_all(b"\\t")?,
            '\u{8}' => out.write_all(b"\\b")?,
            '\u{c}' => out.write_all(b"\\f")?,
            c if (c as u32) < 0x20 || (c as u32) > 0x7e => {
                let cp = c as u32;
                if cp > 0xffff {
                    let v = cp - 0x10000;
                    let hi = 0xd800 + (v >> 10);
                    let lo = 0xdc00 + (v & 0x3ff);
                    write!(out, "\\u{hi:04x}\\u{lo:04x}")?;
                } else {
                    write!(out, "\\u{cp:04x}")?;
                }
            }
            c => {
                let mut buf = [0u8; 4];
                out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            }
        }
    }
    out.write_all(b"\"")
}

fn write_json_float<W: Write>(out: &mut W, v: f64) -> io::Result<()> {
    if v.is_nan() || v.is_infinite() {
        // JSON has no literal for these; emit the nearest-sibling textual
        // form so a lenient reader (this crate's own parser, or anything
        // treating an unquoted token leniently) can still round-trip it.
        return write!(out, "{v}");
    }
    if v == v.trunc() && v.abs() < 1e15 {
        write!(out, "{v:.1}")
    } else {
        write!(out, "{v}")
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

impl<W: Write> Formatter for JsonFormatter<W> {
    fn add_value(&mut self, name: &str, type_name: &str, value: &Scalar) -> Result<(), FormatError> {
        self.before_value(name)?;
        self.write_scalar(type_name, value)?;
        Ok(())
    }

    fn add_null(&mut self, name: &str, _type_name: &str) -> Result<(), FormatError> {
        self.before_value(name)?;
        self.out.write_all(b"null")?;
        Ok(())
    }

    fn begin_array(&mut self, name: &str, _type_name: &str) -> Result<(), FormatError> {
        self.before_value(name)?;
        self.out.write_all(b"[")?;
        self.stack.push(Frame::Array { wrote_element: false });
        Ok(())
    }

    fn finish_array(&mut self) -> Result<(), FormatError> {
        let wrote_element = matches!(self.stack.pop(), Some(Frame::Array { wrote_element: true }));
        if wrote_element {
            self.newline_indent(self.depth())?;
        }
        self.out.write_all(b"]")?;
        Ok(())
    }

    fn begin_object(&mut self, name: &str, _type_name: &str) -> Result<(), FormatError> {
        self.before_value(name)?;
        self.out.write_all(b"{")?;
        self.stack.push(Frame::Object { wrote_member: false });
        Ok(())
    }

    fn finish_object(&mut self) -> Result<(), FormatError> {
        let wrote_member = matches!(self.stack.pop(), Some(Frame::Object { wrote_member: true }));
        if wrote_member {
            self.newline_indent(self.depth())?;
        }
        self.out.write_all(b"}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiretree_core::{Decomposer, Node};

    fn format(node: &Node) -> String {
        let mut out = Vec::new();
        {
            let mut fmt = JsonFormatter::new(&mut out);
            node.decompose("", &mut fmt).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn minimal_object_has_no_extra_whitespace() {
        let mut obj = Node::object_named("");
        obj.add_member(Node::value_named("a", 1i64));
        obj.add_member(Node::value_named("b", "x"));
        assert_eq!(format(&obj), r#"{"a":1,"b":"x"}"#);
    }

    #[test]
    fn non_ascii_code_point_is_escaped() {
        let node = Node::value("h\u{e9}llo".to_string());
        assert_eq!(format(&node), r#""h\u00e9llo""#);
    }

    #[test]
    fn json_typed_string_passes_through_unescaped() {
        let mut node = Node::value_named("raw", "{\"already\":true}".to_string());
        node.set_type_name("json".to_string());
        assert_eq!(format(&node), r#"{"already":true}"#);
    }

    #[test]
    fn plainkey_emits_unquoted_identifier_keys() {
        let mut obj = Node::object_named("");
        obj.add_member(Node::value_named("alpha", 1i64));
        let mut out = Vec::new();
        {
            let mut fmt = JsonFormatter::new(&mut out).plainkey(true);
            obj.decompose("", &mut fmt).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "{alpha:1}");
    }
}
