use crate::error::{FormatError, TreeError};
use crate::scalar::Scalar;
use crate::tree::Category;

/// A sink that a parser drives to populate a user value.
///
/// The capability set is fixed: a parser can set the node's category/type
/// hint, hand it a scalar or a null, or walk into a named (object) or
/// positional (array) child. Every parser (binary, JSON) is written purely
/// against this trait and never against [`crate::tree::Node`] directly, so
/// the same parser can fill a `Node` tree or a user struct (via
/// `#[derive(Compose)]` from wiretree-derive) without caring which.
pub trait Composer {
    /// Record a type hint for the value about to be written (best-effort;
    /// implementors for concrete Rust types may ignore it).
    fn set_category(&mut self, category: Category);

    fn set_type_name(&mut self, type_name: String);

    /// Accept a scalar leaf value.
    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError>;

    /// Accept an explicit null.
    fn set_null(&mut self) -> Result<(), TreeError>;

    /// Enter a named child (object member), returning a sink for it.
    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError>;

    /// Enter the next positional child (array element), returning a sink
    /// for it.
    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError>;

    /// Called once the parser has finished driving this node and all of
    /// its children. Most implementors have nothing to do here; collection
    /// types that stage elements before committing them override it.
    fn finalize(&mut self) -> Result<(), TreeError> {
        Ok(())
    }
}

/// Event sink a [`Decomposer`] writes into. Implemented by the binary and
/// JSON formatters; `name` is empty for unnamed (array element / root)
/// values, matching the plain/named code split of the wire format.
pub trait Formatter {
    fn add_value(&mut self, name: &str, type_name: &str, value: &Scalar) -> Result<(), FormatError>;

    fn add_null(&mut self, name: &str, type_name: &str) -> Result<(), FormatError>;

    fn begin_array(&mut self, name: &str, type_name: &str) -> Result<(), FormatError>;

    fn finish_array(&mut self) -> Result<(), FormatError>;

    fn begin_object(&mut self, name: &str, type_name: &str) -> Result<(), FormatError>;

    fn finish_object(&mut self) -> Result<(), FormatError>;
}

/// A source a formatter pulls from. Walks `self` and emits the matching
/// sequence of [`Formatter`] events; never touches the wire directly so the
/// same impl serves both the binary and JSON formatter.
pub trait Decomposer {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError>;
}
