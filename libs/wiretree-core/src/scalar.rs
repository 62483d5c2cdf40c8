use std::borrow::Cow;

use crate::error::TreeError;

/// Tagged scalar value held by a [`crate::tree::Node`].
///
/// Strategy mirrors `gauss-api`'s `Value<'a>`: numeric and boolean variants
/// are eager (no parsing cost on access), text and binary are `String`/
/// `Vec<u8>` since a `Node` owns its data across an entire codec pass
/// rather than borrowing into a single input buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    None,
    Str(String),
    Bytes(Vec<u8>),
    Char(char),
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Scalar {
    pub fn is_none(&self) -> bool {
        matches!(self, Scalar::None)
    }

    pub fn to_bool(&self) -> Result<bool, TreeError> {
        match self {
            Scalar::Bool(v) => Ok(*v),
            Scalar::Signed(v) => Ok(*v != 0),
            Scalar::Unsigned(v) => Ok(*v != 0),
            Scalar::Str(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(TreeError::conversion(format!("cannot convert {other:?} to bool"))),
            },
            Scalar::None => Err(TreeError::conversion("null has no bool value")),
            other => Err(TreeError::conversion(format!("cannot convert {other:?} to bool"))),
        }
    }

    pub fn to_i64(&self) -> Result<i64, TreeError> {
        match self {
            Scalar::Signed(v) => Ok(*v),
            Scalar::Unsigned(v) => {
                i64::try_from(*v).map_err(|_| TreeError::range(format!("{v} does not fit in i64")))
            }
            Scalar::Bool(v) => Ok(*v as i64),
            Scalar::Char(c) => Ok(*c as i64),
            Scalar::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Ok(*f as i64)
                } else {
                    Err(TreeError::range(format!("{f} does not fit in i64")))
                }
            }
            Scalar::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| TreeError::conversion(format!("cannot parse {s:?} as i64"))),
            Scalar::None => Err(TreeError::conversion("null has no integer value")),
            Scalar::Bytes(_) => Err(TreeError::conversion("cannot convert byte string to i64")),
        }
    }

    pub fn to_u64(&self) -> Result<u64, TreeError> {
        match self {
            Scalar::Unsigned(v) => Ok(*v),
            Scalar::Signed(v) => {
                u64::try_from(*v).map_err(|_| TreeError::range(format!("{v} does not fit in u64")))
            }
            Scalar::Bool(v) => Ok(*v as u64),
            Scalar::Char(c) => Ok(*c as u64),
            Scalar::Float(f) => {
                if f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64 {
                    Ok(*f as u64)
                } else {
                    Err(TreeError::range(format!("{f} does not fit in u64")))
                }
            }
            Scalar::Str(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| TreeError::conversion(format!("cannot parse {s:?} as u64"))),
            Scalar::None => Err(TreeError::conversion("null has no integer value")),
            Scalar::Bytes(_) => Err(TreeError::conversion("cannot convert byte string to u64")),
        }
    }

    pub fn to_f64(&self) -> Result<f64, TreeError> {
        match self {
            Scalar::Float(v) => Ok(*v),
            Scalar::Signed(v) => Ok(*v as f64),
            Scalar::Unsigned(v) => Ok(*v as f64),
            Scalar::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Scalar::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| TreeError::conversion(format!("cannot parse {s:?} as f64"))),
            Scalar::None => Err(TreeError::conversion("null has no float value")),
            other => Err(TreeError::conversion(format!("cannot convert {other:?} to f64"))),
        }
    }

    pub fn to_char(&self) -> Result<char, TreeError> {
        match self {
            Scalar::Char(c) => Ok(*c),
            Scalar::Str(s) if s.chars().count() == 1 => Ok(s.chars().next().unwrap()),
            Scalar::Signed(v) if *v >= 0 => char::from_u32(*v as u32)
                .ok_or_else(|| TreeError::range(format!("{v} is not a valid char"))),
            Scalar::Unsigned(v) => char::from_u32(*v as u32)
                .ok_or_else(|| TreeError::range(format!("{v} is not a valid char"))),
            other => Err(TreeError::conversion(format!("cannot convert {other:?} to char"))),
        }
    }

    pub fn to_text(&self) -> Result<Cow<'_, str>, TreeError> {
        match self {
            Scalar::Str(s) => Ok(Cow::Borrowed(s)),
            Scalar::Bool(v) => Ok(Cow::Owned(v.to_string())),
            Scalar::Signed(v) => Ok(Cow::Owned(v.to_string())),
            Scalar::Unsigned(v) => Ok(Cow::Owned(v.to_string())),
            Scalar::Float(v) => Ok(Cow::Owned(v.to_string())),
            Scalar::Char(c) => Ok(Cow::Owned(c.to_string())),
            Scalar::None => Err(TreeError::conversion("null has no string value")),
            Scalar::Bytes(_) => Err(TreeError::conversion("cannot convert byte string to text")),
        }
    }

    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>, TreeError> {
        match self {
            Scalar::Bytes(b) => Ok(Cow::Borrowed(b)),
            Scalar::Str(s) => Ok(Cow::Borrowed(s.as_bytes())),
            other => Err(TreeError::conversion(format!("cannot convert {other:?} to bytes"))),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<char> for Scalar {
    fn from(v: char) -> Self {
        Scalar::Char(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Bytes(v)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),* $(,)?) => {
        $(impl From<$t> for Scalar {
            fn from(v: $t) -> Self { Scalar::Signed(v as i64) }
        })*
    };
}
impl_from_signed!(i8, i16, i32, i64);

macro_rules! impl_from_unsigned {
    ($($t:ty),* $(,)?) => {
        $(impl From<$t> for Scalar {
            fn from(v: $t) -> Self { Scalar::Unsigned(v as u64) }
        })*
    };
}
impl_from_unsigned!(u8, u16, u32, u64);

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v as f64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_to_unsigned_range_checked() {
        let s = Scalar::Signed(-1);
        assert!(s.to_u64().is_err());
    }

    #[test]
    fn unsigned_to_signed_overflow_checked() {
        let s = Scalar::Unsigned(u64::MAX);
        assert!(s.to_i64().is_err());
    }

    #[test]
    fn float_roundtrips_through_text() {
        let s = Scalar::Str("3.125".to_string());
        assert_eq!(s.to_f64().unwrap(), 3.125);
    }

    #[test]
    fn bool_from_text() {
        assert!(Scalar::Str("true".into()).to_bool().unwrap());
        assert!(!Scalar::Str("false".into()).to_bool().unwrap());
        assert!(Scalar::Str("nope".into()).to_bool().is_err());
    }
}
