//! Blanket `Composer`/`Decomposer` impls for primitive Rust types and the
//! handful of standard containers spec.md's round-trip property (§8) names:
//! vectors, sets and maps. Supplements spec.md per SPEC_FULL.md §3.2 — the
//! original's templated `operator<<=`/`operator>>=` free functions covered
//! the same ground for every STL container it supported.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use crate::error::{FormatError, TreeError};
use crate::scalar::Scalar;
use crate::traits::{Composer, Decomposer, Formatter};
use crate::tree::Category;

macro_rules! impl_decompose_via_scalar {
    ($($t:ty => $type_name:expr),* $(,)?) => {
        $(impl Decomposer for $t {
            fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
                formatter.add_value(name, $type_name, &Scalar::from(*self))
            }
        })*
    };
}

impl_decompose_via_scalar!(
    bool => "bool",
    i8 => "int", i16 => "int", i32 => "int", i64 => "int",
    u8 => "int", u16 => "int", u32 => "int", u64 => "int",
    f32 => "double", f64 => "double",
    char => "char",
);

impl Decomposer for str {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        formatter.add_value(name, "string", &Scalar::Str(self.to_string()))
    }
}

impl Decomposer for String {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        self.as_str().decompose(name, formatter)
    }
}

/// Newtype marking a byte sequence as opaque binary data rather than a
/// positional array of `u8`. Needed because Rust has no specialization:
/// `Vec<u8>` would otherwise match both "array of integers" and "binary
/// blob" impls. Mirrors the same disambiguation `serde_bytes` performs for
/// serde, and is the one place this crate asks for an explicit wrapper
/// instead of inferring intent from the element type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Decomposer for Bytes {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        formatter.add_value(name, "binary", &Scalar::Bytes(self.0.clone()))
    }
}

impl Composer for Bytes {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        self.0 = value.to_bytes()?.into_owned();
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        Err(TreeError::conversion("binary value cannot be null"))
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("binary blob has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion("binary blob has no elements"))
    }
}

macro_rules! impl_compose_int {
    ($($t:ty => $to:ident),* $(,)?) => {
        $(impl Composer for $t {
            fn set_category(&mut self, _category: Category) {}
            fn set_type_name(&mut self, _type_name: String) {}

            fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
                let wide = value.$to()?;
                *self = <$t>::try_from(wide)
                    .map_err(|_| TreeError::range(format!("{wide} does not fit in {}", stringify!($t))))?;
                Ok(())
            }

            fn set_null(&mut self) -> Result<(), TreeError> {
                Err(TreeError::conversion(format!("{} cannot be null", stringify!($t))))
            }

            fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
                Err(TreeError::conversion(format!("{} has no member named {name}", stringify!($t))))
            }

            fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
                Err(TreeError::conversion(format!("{} has no elements", stringify!($t))))
            }
        })*
    };
}

impl_compose_int!(
    i8 => to_i64, i16 => to_i64, i32 => to_i64, i64 => to_i64,
    u8 => to_u64, u16 => to_u64, u32 => to_u64, u64 => to_u64,
);

impl Composer for bool {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        *self = value.to_bool()?;
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        Err(TreeError::conversion("bool cannot be null"))
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("bool has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion("bool has no elements"))
    }
}

impl Composer for char {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        *self = value.to_char()?;
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        Err(TreeError::conversion("char cannot be null"))
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("char has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion("char has no elements"))
    }
}

impl Composer for f32 {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        *self = value.to_f64()? as f32;
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        Err(TreeError::conversion("f32 cannot be null"))
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("f32 has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion("f32 has no elements"))
    }
}

impl Composer for f64 {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        *self = value.to_f64()?;
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        Err(TreeError::conversion("f64 cannot be null"))
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("f64 has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion("f64 has no elements"))
    }
}

impl Composer for String {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        *self = value.to_text()?.into_owned();
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        Err(TreeError::conversion("string cannot be null, use Option<String>"))
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("string has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion("string has no elements"))
    }
}

/// Absent ⇒ null on the wire; parses null or a missing member as `None`.
/// Supplement from `original_source/include/cxxtools/serializationinfo.h`
/// (SPEC_FULL.md §3.2).
impl<T: Decomposer> Decomposer for Option<T> {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        match self {
            Some(v) => v.decompose(name, formatter),
            None => formatter.add_null(name, ""),
        }
    }
}

impl<T: Composer + Default> Composer for Option<T> {
    fn set_category(&mut self, category: Category) {
        if !matches!(category, Category::Void) {
            self.get_or_insert_with(T::default).set_category(category);
        }
    }

    fn set_type_name(&mut self, type_name: String) {
        if let Some(inner) = self {
            inner.set_type_name(type_name);
        }
    }

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        if value.is_none() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).set_scalar(value)
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        *self = None;
        Ok(())
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        self.get_or_insert_with(T::default).begin_member(name)
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        self.get_or_insert_with(T::default).begin_element()
    }

    fn finalize(&mut self) -> Result<(), TreeError> {
        match self {
            Some(inner) => inner.finalize(),
            None => Ok(()),
        }
    }
}

impl<T: Decomposer> Decomposer for Vec<T> {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        formatter.begin_array(name, "array")?;
        for item in self {
            item.decompose("", formatter)?;
        }
        formatter.finish_array()
    }
}

impl<T: Composer + Default> Composer for Vec<T> {
    fn set_category(&mut self, _category: Category) {}
    fn set_type_name(&mut self, _type_name: String) {}

    fn set_scalar(&mut self, _value: Scalar) -> Result<(), TreeError> {
        Err(TreeError::conversion("array has no scalar value"))
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        self.clear();
        Ok(())
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        Err(TreeError::conversion(format!("array has no member named {name}")))
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        self.push(T::default());
        Ok(self.last_mut().unwrap())
    }
}

/// Serialize-only: a `HashSet` has no stable in-place slot to hand out
/// before the element is fully known, so there's no `Composer` impl here.
/// Reading one back goes through `Vec<T>` (or a `Node` tree) and
/// `.collect()`, same as `Decomposer for BTreeMap` below.
impl<T: Decomposer + Eq + Hash> Decomposer for HashSet<T> {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        formatter.begin_array(name, "set")?;
        for item in self {
            item.decompose("", formatter)?;
        }
        formatter.finish_array()
    }
}

/// Encoded as an array of `{key, value}` objects — the wire format's
/// well-known "Map" aggregate is a typed array per spec.md §4.1, and a
/// pair-of-members object is the most direct way to carry an arbitrary
/// key type through it without inventing a separate tuple encoding.
impl<K: Decomposer, V: Decomposer> Decomposer for BTreeMap<K, V> {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        formatter.begin_array(name, "Map")?;
        for (k, v) in self {
            formatter.begin_object("", "")?;
            k.decompose("key", formatter)?;
            v.decompose("value", formatter)?;
            formatter.finish_object()?;
        }
        formatter.finish_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    #[test]
    fn option_none_composes_as_null() {
        let mut opt: Option<i64> = None;
        opt.set_null().unwrap();
        assert_eq!(opt, None);
    }

    #[test]
    fn option_some_delegates_to_inner_composer() {
        let mut opt: Option<i64> = None;
        opt.set_scalar(Scalar::Signed(7)).unwrap();
        assert_eq!(opt, Some(7));
    }

    #[test]
    fn vec_composer_grows_in_place() {
        let mut v: Vec<i64> = Vec::new();
        v.begin_element().unwrap().set_scalar(Scalar::Signed(1)).unwrap();
        v.begin_element().unwrap().set_scalar(Scalar::Signed(2)).unwrap();
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn vec_u8_is_a_positional_array_not_a_blob() {
        let mut v: Vec<u8> = Vec::new();
        v.begin_element().unwrap().set_scalar(Scalar::Unsigned(9)).unwrap();
        assert_eq!(v, vec![9]);
    }

    #[test]
    fn node_decomposer_is_available_for_blanket_containers() {
        let n = Node::value(3i64);
        let v = vec![n];
        assert_eq!(v.len(), 1);
    }
}
