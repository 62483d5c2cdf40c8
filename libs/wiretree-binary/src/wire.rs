//! Byte-level constants for the self-describing binary wire format.
//!
//! Every value starts with a 1-byte type code. Codes come in two parallel
//! ranges: "plain" (no member name follows, used for array elements and at
//! the root) and "named" (a member name follows, null-terminated). The
//! named range is the plain range shifted by `NAMED_OFFSET`, which keeps
//! the plain/named pairing a single arithmetic relationship instead of a
//! second lookup table.
//!
//! The sentinel bytes below this module's type-code range (`0x00`, `0x01`,
//! `0xff`, and the RPC framing leaders) are never valid type codes.

use crate::error::WireError;
use std::io::{self, Read, Write};

pub const NAME_TERMINATOR: u8 = 0x00;
pub const TERMINATOR: u8 = 0xff;
pub const MEMBER_SEPARATOR: u8 = 0x01;

pub const CATEGORY_OBJECT: u8 = 0x3d;
pub const CATEGORY_ARRAY: u8 = 0x3e;

pub const RPC_REQUEST_NO_DOMAIN: u8 = 0xc0;
pub const RPC_REQUEST_DOMAIN: u8 = 0xc3;
pub const RPC_REPLY_OK: u8 = 0x41;
pub const RPC_REPLY_ERROR: u8 = 0x42;

const NAMED_OFFSET: u8 = 0x20;

pub const PLAIN_EMPTY: u8 = 0x02;
pub const PLAIN_BOOL: u8 = 0x03;
pub const PLAIN_CHAR: u8 = 0x04;
pub const PLAIN_STRING: u8 = 0x05;
pub const PLAIN_INT8: u8 = 0x06;
pub const PLAIN_INT16: u8 = 0x07;
pub const PLAIN_INT32: u8 = 0x08;
pub const PLAIN_INT64: u8 = 0x09;
pub const PLAIN_UINT8: u8 = 0x0a;
pub const PLAIN_UINT16: u8 = 0x0b;
pub const PLAIN_UINT32: u8 = 0x0c;
pub const PLAIN_UINT64: u8 = 0x0d;
pub const PLAIN_BCD_FLOAT: u8 = 0x0e;
pub const PLAIN_SHORT_FLOAT: u8 = 0x0f;
pub const PLAIN_MEDIUM_FLOAT: u8 = 0x10;
pub const PLAIN_LONG_FLOAT: u8 = 0x11;
pub const PLAIN_BINARY2: u8 = 0x12;
pub const PLAIN_BINARY4: u8 = 0x13;
pub const PLAIN_OTHER: u8 = 0x14;
pub const PLAIN_PAIR: u8 = 0x15;
pub const PLAIN_ARRAY: u8 = 0x16;
pub const PLAIN_LIST: u8 = 0x17;
pub const PLAIN_DEQUE: u8 = 0x18;
pub const PLAIN_SET: u8 = 0x19;
pub const PLAIN_MULTISET: u8 = 0x1a;
pub const PLAIN_MAP: u8 = 0x1b;
pub const PLAIN_MULTIMAP: u8 = 0x1c;

pub const EMPTY: u8 = PLAIN_EMPTY + NAMED_OFFSET;
pub const BOOL: u8 = PLAIN_BOOL + NAMED_OFFSET;
pub const CHAR: u8 = PLAIN_CHAR + NAMED_OFFSET;
pub const STRING: u8 = PLAIN_STRING + NAMED_OFFSET;
pub const INT8: u8 = PLAIN_INT8 + NAMED_OFFSET;
pub const INT16: u8 = PLAIN_INT16 + NAMED_OFFSET;
pub const INT32: u8 = PLAIN_INT32 + NAMED_OFFSET;
pub const INT64: u8 = PLAIN_INT64 + NAMED_OFFSET;
pub const UINT8: u8 = PLAIN_UINT8 + NAMED_OFFSET;
pub const UINT16: u8 = PLAIN_UINT16 + NAMED_OFFSET;
pub const UINT32: u8 = PLAIN_UINT32 + NAMED_OFFSET;
pub const UINT64: u8 = PLAIN_UINT64 + NAMED_OFFSET;
pub const BCD_FLOAT: u8 = PLAIN_BCD_FLOAT + NAMED_OFFSET;
pub const SHORT_FLOAT: u8 = PLAIN_SHORT_FLOAT + NAMED_OFFSET;
pub const MEDIUM_FLOAT: u8 = PLAIN_MEDIUM_FLOAT + NAMED_OFFSET;
pub const LONG_FLOAT: u8 = PLAIN_LONG_FLOAT + NAMED_OFFSET;
pub const BINARY2: u8 = PLAIN_BINARY2 + NAMED_OFFSET;
pub const BINARY4: u8 = PLAIN_BINARY4 + NAMED_OFFSET;
pub const OTHER: u8 = PLAIN_OTHER + NAMED_OFFSET;
pub const PAIR: u8 = PLAIN_PAIR + NAMED_OFFSET;
pub const ARRAY: u8 = PLAIN_ARRAY + NAMED_OFFSET;
pub const LIST: u8 = PLAIN_LIST + NAMED_OFFSET;
pub const DEQUE: u8 = PLAIN_DEQUE + NAMED_OFFSET;
pub const SET: u8 = PLAIN_SET + NAMED_OFFSET;
pub const MULTISET: u8 = PLAIN_MULTISET + NAMED_OFFSET;
pub const MAP: u8 = PLAIN_MAP + NAMED_OFFSET;
pub const MULTIMAP: u8 = PLAIN_MULTIMAP + NAMED_OFFSET;

pub fn is_named(code: u8) -> bool {
    code >= NAMED_OFFSET
}

/// Looks up the well-known container code for a type name (`"array"`,
/// `"map"`, ...). Returns `None` for anything that falls back to `Other`.
fn well_known_code(type_name: &str, plain: bool) -> Option<u8> {
    let base = match type_name {
        "pair" => PLAIN_PAIR,
        "array" => PLAIN_ARRAY,
        "list" => PLAIN_LIST,
        "deque" => PLAIN_DEQUE,
        "set" => PLAIN_SET,
        "multiset" => PLAIN_MULTISET,
        "map" => PLAIN_MAP,
        "multimap" => PLAIN_MULTIMAP,
        _ => return None,
    };
    Some(if plain { base } else { base + NAMED_OFFSET })
}

/// Writes a type-name tag: a well-known container code, or `Other` followed
/// by the literal type name and a NUL terminator.
pub fn write_type_code<W: Write>(out: &mut W, type_name: &str, plain: bool) -> io::Result<()> {
    if let Some(code) = well_known_code(type_name, plain) {
        out.write_all(&[code])
    } else {
        out.write_all(&[if plain { PLAIN_OTHER } else { OTHER }])?;
        out.write_all(type_name.as_bytes())?;
        out.write_all(&[NAME_TERMINATOR])
    }
}

fn well_known_name(code: u8) -> Option<&'static str> {
    let plain = code & !NAMED_OFFSET;
    Some(match plain {
        PLAIN_PAIR => "pair",
        PLAIN_ARRAY => "array",
        PLAIN_LIST => "list",
        PLAIN_DEQUE => "deque",
        PLAIN_SET => "set",
        PLAIN_MULTISET => "multiset",
        PLAIN_MAP => "map",
        PLAIN_MULTIMAP => "multimap",
        _ => return None,
    })
}

/// Reads back a type-name tag written by [`write_type_code`].
pub fn read_type_code<R: Read>(input: &mut R) -> Result<String, WireError> {
    let code = read_u8(input)?;
    if let Some(name) = well_known_name(code) {
        return Ok(name.to_string());
    }
    if code == PLAIN_OTHER || code == OTHER {
        read_cstring(input)
    } else {
        Err(WireError::UnexpectedTypeCode(code))
    }
}

pub fn read_u8<R: Read>(input: &mut R) -> Result<u8, WireError> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads bytes up to (and consuming) a `\x00` terminator.
pub fn read_cstring<R: Read>(input: &mut R) -> Result<String, WireError> {
    let mut buf = Vec::new();
    loop {
        let b = read_u8(input)?;
        if b == NAME_TERMINATOR {
            break;
        }
        buf.push(b);
    }
    Ok(String::from_utf8(buf)?)
}

/// Reads a string/char-style payload: UTF-8 bytes up to `\x00`, followed by
/// the mandatory `\xff` that closes every such payload.
pub fn read_text_payload<R: Read>(input: &mut R) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    loop {
        let b = read_u8(input)?;
        if b == NAME_TERMINATOR {
            break;
        }
        buf.push(b);
    }
    expect_terminator(input)?;
    Ok(buf)
}

pub fn expect_terminator<R: Read>(input: &mut R) -> Result<(), WireError> {
    let b = read_u8(input)?;
    if b != TERMINATOR {
        return Err(WireError::UnexpectedTypeCode(b));
    }
    Ok(())
}

/// Picks the narrowest signed/unsigned code+width that represents `v`,
/// writes the code, the name (if any), and the big-endian payload.
pub fn write_int<W: Write>(out: &mut W, v: i64, name: &str) -> io::Result<()> {
    if v >= 0 {
        write_uint(out, v as u64, name)
    } else if let Ok(v) = i8::try_from(v) {
        write_code(out, PLAIN_INT8, INT8, name)?;
        out.write_all(&v.to_be_bytes())
    } else if let Ok(v) = i16::try_from(v) {
        write_code(out, PLAIN_INT16, INT16, name)?;
        out.write_all(&v.to_be_bytes())
    } else if let Ok(v) = i32::try_from(v) {
        write_code(out, PLAIN_INT32, INT32, name)?;
        out.write_all(&v.to_be_bytes())
    } else {
        write_code(out, PLAIN_INT64, INT64, name)?;
        out.write_all(&v.to_be_bytes())
    }
}

pub fn write_uint<W: Write>(out: &mut W, v: u64, name: &str) -> io::Result<()> {
    if let Ok(v) = u8::try_from(v) {
        write_code(out, PLAIN_UINT8, UINT8, name)?;
        out.write_all(&v.to_be_bytes())
    } else if let Ok(v) = u16::try_from(v) {
        write_code(out, PLAIN_UINT16, UINT16, name)?;
        out.write_all(&v.to_be_bytes())
    } else if let Ok(v) = u32::try_from(v) {
        write_code(out, PLAIN_UINT32, UINT32, name)?;
        out.write_all(&v.to_be_bytes())
    } else {
        write_code(out, PLAIN_UINT64, UINT64, name)?;
        out.write_all(&v.to_be_bytes())
    }
}

fn write_code<W: Write>(out: &mut W, plain_code: u8, named_code: u8, name: &str) -> io::Result<()> {
    let plain = name.is_empty();
    out.write_all(&[if plain { plain_code } else { named_code }])?;
    if !plain {
        out.write_all(name.as_bytes())?;
        out.write_all(&[NAME_TERMINATOR])?;
    }
    Ok(())
}

/// Reads the big-endian payload for an int/uint type code, sign-extending
/// for the signed codes. Decoding accepts any width regardless of how the
/// caller stores the result.
pub fn read_int_payload<R: Read>(input: &mut R, code: u8) -> Result<i64, WireError> {
    let plain = code & !(0x20);
    Ok(match plain {
        PLAIN_INT8 => read_be::<R, 1>(input)? as i8 as i64,
        PLAIN_INT16 => read_be::<R, 2>(input)? as i16 as i64,
        PLAIN_INT32 => read_be::<R, 4>(input)? as i32 as i64,
        PLAIN_INT64 => read_be::<R, 8>(input)? as i64,
        PLAIN_UINT8 => read_be::<R, 1>(input)? as i64,
        PLAIN_UINT16 => read_be::<R, 2>(input)? as i64,
        PLAIN_UINT32 => read_be::<R, 4>(input)? as i64,
        PLAIN_UINT64 => read_be::<R, 8>(input)? as i64,
        _ => return Err(WireError::UnexpectedTypeCode(code)),
    })
}

pub fn read_uint_payload<R: Read>(input: &mut R, code: u8) -> Result<u64, WireError> {
    let plain = code & !(0x20);
    Ok(match plain {
        PLAIN_UINT8 => read_be::<R, 1>(input)?,
        PLAIN_UINT16 => read_be::<R, 2>(input)?,
        PLAIN_UINT32 => read_be::<R, 4>(input)?,
        PLAIN_UINT64 => read_be::<R, 8>(input)?,
        PLAIN_INT8 => read_be::<R, 1>(input)?,
        PLAIN_INT16 => read_be::<R, 2>(input)?,
        PLAIN_INT32 => read_be::<R, 4>(input)?,
        PLAIN_INT64 => read_be::<R, 8>(input)?,
        _ => return Err(WireError::UnexpectedTypeCode(code)),
    })
}

fn read_be<R: Read, const N: usize>(input: &mut R) -> Result<u64, WireError> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf)?;
    let mut acc: u64 = 0;
    for b in buf {
        acc = (acc << 8) | b as u64;
    }
    Ok(acc)
}

/// Bit-exact decomposition of a finite, non-zero `f64` into sign, the
/// frexp-style exponent (`v == s * 2^exp`, `0.5 <= s < 1`), and a 64-bit
/// mantissa `m = floor((2s - 1) * 2^64)`.
///
/// Derived directly from the IEEE-754 bit layout instead of calling libm's
/// `frexp`: for a normal double the 52-bit stored fraction *is* `(2s-1)`
/// scaled to 52 bits, so `m` is just that fraction shifted up to 64 bits.
/// Subnormals are scaled into the normal range first and the exponent
/// corrected back down, which avoids re-deriving the subnormal bit-shift
/// arithmetic separately.
pub fn decompose_finite_nonzero(v: f64) -> (bool, i32, u64) {
    let neg = v.is_sign_negative();
    let v = v.abs();
    let bits = v.to_bits();
    let raw_exp = ((bits >> 52) & 0x7ff) as i32;
    if raw_exp == 0 {
        let scaled = v * 2f64.powi(64);
        let (_, exp, m) = decompose_finite_nonzero(scaled);
        return (neg, exp - 64, m);
    }
    let frac = bits & 0x000f_ffff_ffff_ffff;
    let exp = raw_exp - 1023 + 1;
    let m = frac << 12;
    (neg, exp, m)
}

/// Inverse of [`decompose_finite_nonzero`]: rebuilds the `f64` bit pattern
/// directly rather than going through `ldexp`, so the round trip is exact.
pub fn reassemble_finite(neg: bool, exp: i32, m: u64) -> f64 {
    let frac = m >> 12;
    let raw_exp = (exp + 1022).clamp(0, 0x7fe) as u64;
    let bits = ((neg as u64) << 63) | (raw_exp << 52) | frac;
    f64::from_bits(bits)
}
