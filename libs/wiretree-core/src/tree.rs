use crate::error::{FormatError, TreeError};
use crate::scalar::Scalar;
use crate::traits::{Composer, Decomposer, Formatter};

/// What kind of value a [`Node`] currently holds.
///
/// `Reference` is carried for wire compatibility (spec says to treat it as
/// `Void` for the core contract) — nothing in this crate ever constructs
/// one, but a parser that reads a foreign document containing a reference
/// placeholder can still represent it instead of erroring out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Void,
    Value,
    Object,
    Array,
    Reference,
}

/// One node of a SerializationInfo-style tree: a scalar leaf, or an
/// ordered sequence of named (object) or positional (array) children.
///
/// Unlike the C++ original, a `Node` holds no parent pointer — codecs pass
/// context down explicitly while walking, and the tree is strictly
/// tree-shaped (owned by its parent's member vector, or by the caller at
/// the root), which is the ownership-strict rendering the design notes
/// call for.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    category: Category,
    name: String,
    type_name: Option<String>,
    value: Scalar,
    members: Vec<Node>,
}

impl Default for Node {
    fn default() -> Self {
        Self::void()
    }
}

impl Node {
    pub fn void() -> Self {
        Node {
            category: Category::Void,
            name: String::new(),
            type_name: None,
            value: Scalar::None,
            members: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut n = Self::void();
        n.name = name.into();
        n
    }

    pub fn value(value: impl Into<Scalar>) -> Self {
        Self::named("").with_value(value)
    }

    pub fn value_named(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::named(name).with_value(value)
    }

    fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.category = Category::Value;
        self.value = value.into();
        self
    }

    pub fn null_named(name: impl Into<String>) -> Self {
        let mut n = Self::named(name);
        n.category = Category::Value;
        n
    }

    pub fn object_named(name: impl Into<String>) -> Self {
        let mut n = Self::named(name);
        n.category = Category::Object;
        n
    }

    pub fn array_named(name: impl Into<String>) -> Self {
        let mut n = Self::named(name);
        n.category = Category::Array;
        n
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = normalize_type_name(type_name.into());
    }

    pub fn scalar(&self) -> &Scalar {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        matches!(self.category, Category::Void) || self.value.is_none()
    }

    pub fn members(&self) -> &[Node] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Node] {
        &mut self.members
    }

    pub fn find_member(&self, name: &str) -> Option<&Node> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_member_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.members.iter_mut().find(|m| m.name == name)
    }

    pub fn get_member(&self, name: &str) -> Result<&Node, TreeError> {
        self.find_member(name)
            .ok_or_else(|| TreeError::MemberNotFound(name.to_string()))
    }

    /// Append an object member, promoting `Void`/`Value` category to
    /// `Object`. Never demotes an `Array` node — per the tree invariant,
    /// once a node is positional its children stay positional.
    pub fn add_member(&mut self, member: Node) -> &mut Node {
        self.promote_to_object();
        self.members.push(member);
        self.members.last_mut().unwrap()
    }

    /// Append an array element. Promotes `Void` to `Array`; does not touch
    /// an already-`Object` node (mixing the two on one node is a caller
    /// bug, not something this type tries to paper over).
    pub fn push_element(&mut self, element: Node) -> &mut Node {
        if matches!(self.category, Category::Void) {
            self.category = Category::Array;
        }
        self.members.push(element);
        self.members.last_mut().unwrap()
    }

    fn promote_to_object(&mut self) {
        if !matches!(self.category, Category::Object | Category::Array) {
            self.category = Category::Object;
        }
    }

    pub fn as_bool(&self) -> Result<bool, TreeError> {
        self.value.to_bool()
    }

    pub fn as_i64(&self) -> Result<i64, TreeError> {
        self.value.to_i64()
    }

    pub fn as_u64(&self) -> Result<u64, TreeError> {
        self.value.to_u64()
    }

    pub fn as_f64(&self) -> Result<f64, TreeError> {
        self.value.to_f64()
    }

    pub fn as_char(&self) -> Result<char, TreeError> {
        self.value.to_char()
    }

    pub fn as_text(&self) -> Result<std::borrow::Cow<'_, str>, TreeError> {
        self.value.to_text()
    }

    pub fn as_bytes(&self) -> Result<std::borrow::Cow<'_, [u8]>, TreeError> {
        self.value.to_bytes()
    }
}

/// A wire-read type name is always present syntactically (the format always
/// writes a type code), but an empty string means "no custom type" — the
/// same thing a freshly built `Node` expresses with `None`. Folding the two
/// keeps `parse(format(node))` comparable to the original for nodes that
/// never had a custom type name to begin with.
fn normalize_type_name(type_name: String) -> Option<String> {
    if type_name.is_empty() { None } else { Some(type_name) }
}

impl Composer for Node {
    fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    fn set_type_name(&mut self, type_name: String) {
        self.type_name = normalize_type_name(type_name);
    }

    fn set_scalar(&mut self, value: Scalar) -> Result<(), TreeError> {
        if matches!(self.category, Category::Void) {
            self.category = Category::Value;
        }
        self.value = value;
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), TreeError> {
        if matches!(self.category, Category::Void) {
            self.category = Category::Value;
        }
        self.value = Scalar::None;
        Ok(())
    }

    fn begin_member(&mut self, name: &str) -> Result<&mut dyn Composer, TreeError> {
        self.promote_to_object();
        self.members.push(Node::named(name));
        Ok(self.members.last_mut().unwrap())
    }

    fn begin_element(&mut self) -> Result<&mut dyn Composer, TreeError> {
        if matches!(self.category, Category::Void) {
            self.category = Category::Array;
        }
        self.members.push(Node::void());
        Ok(self.members.last_mut().unwrap())
    }
}

impl Decomposer for Node {
    fn decompose(&self, name: &str, formatter: &mut dyn Formatter) -> Result<(), FormatError> {
        let type_name = self.type_name.as_deref().unwrap_or("");
        match self.category {
            Category::Void | Category::Reference => formatter.add_null(name, type_name),
            Category::Value => {
                if self.value.is_none() {
                    formatter.add_null(name, type_name)
                } else {
                    formatter.add_value(name, type_name, &self.value)
                }
            }
            Category::Object => {
                formatter.begin_object(name, type_name)?;
                for member in &self.members {
                    member.decompose(member.name(), formatter)?;
                }
                formatter.finish_object()
            }
            Category::Array => {
                formatter.begin_array(name, type_name)?;
                for member in &self.members {
                    member.decompose("", formatter)?;
                }
                formatter.finish_array()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_member_promotes_void_to_object() {
        let mut n = Node::void();
        n.add_member(Node::value_named("a", 1i64));
        assert_eq!(n.category(), Category::Object);
        assert_eq!(n.get_member("a").unwrap().as_i64().unwrap(), 1);
    }

    #[test]
    fn adding_member_never_demotes_array() {
        let mut n = Node::array_named("xs");
        n.push_element(Node::value(1i64));
        n.add_member(Node::value(2i64));
        assert_eq!(n.category(), Category::Array);
        assert_eq!(n.members().len(), 2);
    }

    #[test]
    fn missing_member_is_an_error() {
        let n = Node::object_named("o");
        assert!(matches!(n.get_member("missing"), Err(TreeError::MemberNotFound(_))));
    }

    #[test]
    fn value_node_has_no_members() {
        let n = Node::value(42i64);
        assert!(n.members().is_empty());
    }

    #[test]
    fn empty_type_name_normalizes_to_none() {
        let mut n = Node::void();
        Composer::set_type_name(&mut n, String::new());
        assert_eq!(n.type_name(), None);

        Composer::set_type_name(&mut n, "widget".to_string());
        assert_eq!(n.type_name(), Some("widget"));
    }
}
