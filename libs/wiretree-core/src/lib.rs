//! Generic structured-data serialization core: a SerializationInfo-style
//! tree ([`tree::Node`]), and the `Composer`/`Decomposer` sink/source
//! traits that decouple value producers and consumers from wire codecs.
//!
//! Wire codecs (binary, JSON) and the RPC client live in sibling crates
//! and depend only on the traits exported here.

pub mod error;
pub mod impls;
pub mod scalar;
pub mod traits;
pub mod tree;

pub use error::{FormatError, TreeError};
pub use impls::Bytes;
pub use scalar::Scalar;
pub use traits::{Composer, Decomposer, Formatter};
pub use tree::{Category, Node};
