use std::fmt;

/// Formats a byte slice as a `cxxtools::hexDump`-style dump: 16 bytes per
/// row, hex on the left, the printable-ASCII rendering on the right.
/// Grounded on `include/cxxtools/hexdump.h` / `hdstream.h`.
pub struct HexDump<'a>(&'a [u8]);

pub fn hex_dump(bytes: &[u8]) -> HexDump<'_> {
    HexDump(bytes)
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.chunks(16) {
            for b in chunk {
                write!(f, "{b:02x} ")?;
            }
            for _ in chunk.len()..16 {
                write!(f, "   ")?;
            }
            write!(f, " ")?;
            for &b in chunk {
                let c = if (0x20..0x7f).contains(&b) { b as char } else { '.' };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_dump_pads_hex_column_and_renders_ascii() {
        let out = hex_dump(b"hi").to_string();
        assert!(out.starts_with("68 69"));
        assert!(out.trim_end().ends_with("hi"));
    }

    #[test]
    fn non_printable_bytes_become_dots() {
        let out = hex_dump(&[0x00, 0x01, b'A']).to_string();
        assert!(out.contains("..A"));
    }
}
