//! Read access to parsed trees
//!
//! A parse yields a [`Document`], a root handle into the pool. Reads go
//! through [`ValueRef`], a borrowed view that never exposes the pool's node
//! layout. Typed getters are soft: a tag mismatch returns `None` rather than
//! an error, and [`OptionalValue`] carries the same getters over
//! `Option<ValueRef>` so optional fields can be looked up in one chain:
//!
//! ```
//! use arbor_json::{OptionalValue, ValuePool};
//!
//! let mut pool = ValuePool::new();
//! let doc = pool.parse_scoped(r#"{"person": {"born": 1901}}"#).unwrap();
//! let root = doc.root();
//! assert_eq!(root.get("person").get("born").as_f64(), Some(1901.0));
//! assert_eq!(root.get("person").get("died").as_f64(), None);
//! ```

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use crate::arena::{Node, ValueId, ValuePool};

/// JSON value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    fn value_type(&self) -> ValueType {
        match self {
            Node::Null => ValueType::Null,
            Node::Bool(_) => ValueType::Bool,
            Node::Number(_) => ValueType::Number,
            Node::String(_) => ValueType::String,
            Node::Array(_) => ValueType::Array,
            Node::Object(_) => ValueType::Object,
        }
    }
}

/// Root handle of a parsed tree.
///
/// The tree stays allocated in its pool until the handle is passed to
/// [`ValuePool::destroy`] or [`ValuePool::take`]. Dropping the handle without
/// doing so leaves the slots occupied until the pool is reset.
#[must_use = "a parsed document holds pool slots until it is destroyed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Document {
    root: Option<ValueId>,
}

impl Document {
    pub(crate) fn new(root: ValueId) -> Self {
        Self { root: Some(root) }
    }

    /// Root handle, or `None` once released
    pub fn id(&self) -> Option<ValueId> {
        self.root
    }

    pub fn is_released(&self) -> bool {
        self.root.is_none()
    }
}

/// Borrowed view of one value in a pool
#[derive(Clone, Copy)]
pub struct ValueRef<'p> {
    pool: &'p ValuePool,
    id: ValueId,
    node: &'p Node,
}

impl<'p> ValueRef<'p> {
    /// Handle of the viewed value
    pub fn id(self) -> ValueId {
        self.id
    }

    pub fn value_type(self) -> ValueType {
        self.node.value_type()
    }

    pub fn is_null(self) -> bool {
        matches!(self.node, Node::Null)
    }

    pub fn as_bool(self) -> Option<bool> {
        match self.node {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(self) -> Option<f64> {
        match self.node {
            Node::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(self) -> Option<&'p str> {
        match self.node {
            Node::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Number of elements; 0 when this is not an array
    pub fn array_len(self) -> usize {
        self.items().len()
    }

    pub fn get_index(self, index: usize) -> Option<ValueRef<'p>> {
        let id = *self.items().get(index)?;
        self.pool.resolve(id)
    }

    /// Array elements in source order; empty when this is not an array
    pub fn elements(self) -> impl Iterator<Item = ValueRef<'p>> {
        let pool = self.pool;
        self.items().iter().filter_map(move |id| pool.resolve(*id))
    }

    /// Number of entries; 0 when this is not an object
    pub fn object_len(self) -> usize {
        self.members().len()
    }

    pub fn key_at(self, index: usize) -> Option<&'p str> {
        self.members().get(index).map(|(key, _)| key.as_str())
    }

    pub fn value_at(self, index: usize) -> Option<ValueRef<'p>> {
        let (_, id) = self.members().get(index)?;
        self.pool.resolve(*id)
    }

    pub fn entry_at(self, index: usize) -> Option<(&'p str, ValueRef<'p>)> {
        let (key, id) = self.members().get(index)?;
        Some((key.as_str(), self.pool.resolve(*id)?))
    }

    /// Object entries in insertion order; empty when this is not an object
    pub fn entries(self) -> impl Iterator<Item = (&'p str, ValueRef<'p>)> {
        let pool = self.pool;
        self.members()
            .iter()
            .filter_map(move |(key, id)| Some((key.as_str(), pool.resolve(*id)?)))
    }

    /// First entry with this key (linear scan)
    pub fn get(self, key: &str) -> Option<ValueRef<'p>> {
        let (_, id) = self.members().iter().find(|(name, _)| name == key)?;
        self.pool.resolve(*id)
    }

    /// Copy this subtree out of the pool
    pub fn to_value(self) -> Value {
        match self.node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(*n),
            Node::String(s) => Value::String(s.clone()),
            Node::Array(_) => Value::Array(self.elements().map(ValueRef::to_value).collect()),
            Node::Object(_) => Value::Object(
                self.entries()
                    .map(|(key, value)| (key.to_string(), value.to_value()))
                    .collect(),
            ),
        }
    }

    fn items(self) -> &'p [ValueId] {
        match self.node {
            Node::Array(items) => items,
            _ => &[],
        }
    }

    fn members(self) -> &'p [(String, ValueId)] {
        match self.node {
            Node::Object(entries) => entries,
            _ => &[],
        }
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRef")
            .field("id", &self.id)
            .field("type", &self.value_type())
            .finish()
    }
}

impl Serialize for ValueRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.node {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => serializer.serialize_f64(*n),
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(_) => serializer.collect_seq(self.elements()),
            Node::Object(_) => {
                let mut map = serializer.serialize_map(Some(self.object_len()))?;
                for (key, value) in self.entries() {
                    map.serialize_entry(key, &value)?;
                }
                map.end()
            }
        }
    }
}

/// Soft accessors on a possibly missing value.
///
/// A missing value reports [`ValueType::Null`], zero lengths and `None` from
/// every getter, so lookups chain without branching.
pub trait OptionalValue<'p> {
    fn value_type(&self) -> ValueType;
    fn as_bool(&self) -> Option<bool>;
    fn as_f64(&self) -> Option<f64>;
    fn as_str(&self) -> Option<&'p str>;
    fn array_len(&self) -> usize;
    fn get_index(&self, index: usize) -> Option<ValueRef<'p>>;
    fn object_len(&self) -> usize;
    fn key_at(&self, index: usize) -> Option<&'p str>;
    fn value_at(&self, index: usize) -> Option<ValueRef<'p>>;
    fn get(&self, key: &str) -> Option<ValueRef<'p>>;
}

impl<'p> OptionalValue<'p> for Option<ValueRef<'p>> {
    fn value_type(&self) -> ValueType {
        self.map_or(ValueType::Null, ValueRef::value_type)
    }

    fn as_bool(&self) -> Option<bool> {
        self.and_then(ValueRef::as_bool)
    }

    fn as_f64(&self) -> Option<f64> {
        self.and_then(ValueRef::as_f64)
    }

    fn as_str(&self) -> Option<&'p str> {
        self.and_then(ValueRef::as_str)
    }

    fn array_len(&self) -> usize {
        self.map_or(0, ValueRef::array_len)
    }

    fn get_index(&self, index: usize) -> Option<ValueRef<'p>> {
        self.and_then(|value| value.get_index(index))
    }

    fn object_len(&self) -> usize {
        self.map_or(0, ValueRef::object_len)
    }

    fn key_at(&self, index: usize) -> Option<&'p str> {
        self.and_then(|value| value.key_at(index))
    }

    fn value_at(&self, index: usize) -> Option<ValueRef<'p>> {
        self.and_then(|value| value.value_at(index))
    }

    fn get(&self, key: &str) -> Option<ValueRef<'p>> {
        self.and_then(|value| value.get(key))
    }
}

impl ValuePool {
    /// View of a document's root; `None` once the document is released
    pub fn root(&self, document: &Document) -> Option<ValueRef<'_>> {
        self.resolve(document.root?)
    }

    /// View of any live value; `None` for stale handles
    pub fn resolve(&self, id: ValueId) -> Option<ValueRef<'_>> {
        let node = self.node(id)?;
        Some(ValueRef {
            pool: self,
            id,
            node,
        })
    }

    /// Release a document's whole tree and mark the handle released.
    ///
    /// Idempotent: a released document frees nothing. Returns the number of
    /// slots returned to the free-list.
    pub fn destroy(&mut self, document: &mut Document) -> usize {
        match document.root.take() {
            Some(root) => self.destroy_subtree(root),
            None => 0,
        }
    }

    /// Move a document's tree out of the pool, releasing its slots
    pub fn take(&mut self, document: &mut Document) -> Option<Value> {
        let root = document.root.take()?;
        self.take_tree(root)
    }

    fn take_tree(&mut self, id: ValueId) -> Option<Value> {
        let value = match self.take_node(id)? {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(b),
            Node::Number(n) => Value::Number(n),
            Node::String(s) => Value::String(s),
            Node::Array(items) => Value::Array(
                items
                    .into_iter()
                    .filter_map(|child| self.take_tree(child))
                    .collect(),
            ),
            Node::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .filter_map(|(key, child)| Some((key, self.take_tree(child)?)))
                    .collect(),
            ),
        };
        Some(value)
    }
}

/// A document that releases its tree when dropped.
///
/// Holds the pool mutably for its whole lifetime.
pub struct ScopedDocument<'p> {
    pool: &'p mut ValuePool,
    document: Document,
}

impl<'p> ScopedDocument<'p> {
    pub(crate) fn new(pool: &'p mut ValuePool, document: Document) -> Self {
        Self { pool, document }
    }

    pub fn root(&self) -> Option<ValueRef<'_>> {
        self.pool.root(&self.document)
    }

    /// Move the tree out as an owned value
    pub fn into_value(mut self) -> Option<Value> {
        self.pool.take(&mut self.document)
    }

    /// Give up automatic release and return the plain handle
    pub fn into_document(mut self) -> Document {
        Document {
            root: self.document.root.take(),
        }
    }
}

impl fmt::Debug for ScopedDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedDocument")
            .field("root", &self.document.root)
            .finish()
    }
}

impl Drop for ScopedDocument<'_> {
    fn drop(&mut self) {
        let released = self.pool.destroy(&mut self.document);
        if released > 0 {
            trace!(released, "scoped document released");
        }
    }
}

/// Owned JSON value, detached from any pool
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Entries in insertion order
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Number of elements; 0 when this is not an array
    pub fn array_len(&self) -> usize {
        self.as_array().map_or(0, <[Value]>::len)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array()?.get(index)
    }

    /// Number of entries; 0 when this is not an object
    pub fn object_len(&self) -> usize {
        self.as_object().map_or(0, <[(String, Value)]>::len)
    }

    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.as_object()?.get(index).map(|(key, _)| key.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.as_object()?.get(index).map(|(_, value)| value)
    }

    /// First entry with this key (linear scan)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        value.to_value()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "Ada",
        "born": 1815,
        "alive": false,
        "children": ["Byron", "Anne", "Ralph"],
        "spouse": null
    }"#;

    #[test]
    fn test_value_type_tags() {
        let mut pool = ValuePool::new();
        let mut doc = pool.parse(SAMPLE).unwrap();
        let root = pool.root(&doc).unwrap();
        assert_eq!(root.value_type(), ValueType::Object);
        assert_eq!(root.get("name").value_type(), ValueType::String);
        assert_eq!(root.get("born").value_type(), ValueType::Number);
        assert_eq!(root.get("alive").value_type(), ValueType::Bool);
        assert_eq!(root.get("children").value_type(), ValueType::Array);
        assert_eq!(root.get("spouse").value_type(), ValueType::Null);
        assert_eq!(root.get("missing").value_type(), ValueType::Null);
        assert_eq!(ValueType::Object.to_string(), "object");
        pool.destroy(&mut doc);
    }

    #[test]
    fn test_soft_getters_on_mismatch() {
        let mut pool = ValuePool::new();
        let doc = pool.parse_scoped(SAMPLE).unwrap();
        let root = doc.root();
        assert_eq!(root.get("name").as_f64(), None);
        assert_eq!(root.get("born").as_str(), None);
        assert_eq!(root.get("spouse").as_bool(), None);
        assert_eq!(root.get("name").array_len(), 0);
        assert_eq!(root.get("name").object_len(), 0);
        assert!(root.get("name").get_index(0).is_none());
        assert!(root.get("born").key_at(0).is_none());
    }

    #[test]
    fn test_index_accessors() {
        let mut pool = ValuePool::new();
        let doc = pool.parse_scoped(SAMPLE).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.object_len(), 5);
        assert_eq!(root.key_at(1), Some("born"));
        assert_eq!(root.value_at(1).as_f64(), Some(1815.0));
        assert!(root.key_at(5).is_none());

        let (key, value) = root.entry_at(0).unwrap();
        assert_eq!(key, "name");
        assert_eq!(value.as_str(), Some("Ada"));

        let children = root.get("children").unwrap();
        assert_eq!(children.array_len(), 3);
        assert_eq!(children.get_index(2).as_str(), Some("Ralph"));
        assert!(children.get_index(3).is_none());
        let names: Vec<_> = children.elements().filter_map(ValueRef::as_str).collect();
        assert_eq!(names, ["Byron", "Anne", "Ralph"]);

        let keys: Vec<_> = root.entries().map(|(key, _)| key).collect();
        assert_eq!(keys, ["name", "born", "alive", "children", "spouse"]);
    }

    #[test]
    fn test_to_value_and_take_agree() {
        let mut pool = ValuePool::new();
        let mut doc = pool.parse(SAMPLE).unwrap();
        let copied = pool.root(&doc).unwrap().to_value();
        let live = pool.stats().live_count();
        assert_eq!(live, 9);

        let taken = pool.take(&mut doc).unwrap();
        assert_eq!(copied, taken);
        assert!(doc.is_released());
        assert_eq!(pool.stats().live_count(), 0);
        assert!(pool.take(&mut doc).is_none());

        let anne = taken.get("children").and_then(|c| c.get_index(1));
        assert_eq!(anne.and_then(Value::as_str), Some("Anne"));
        assert_eq!(taken.key_at(4), Some("spouse"));
        assert!(taken.value_at(4).is_some_and(Value::is_null));
        assert_eq!(taken.object_len(), 5);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut pool = ValuePool::new();
        let mut doc = pool.parse("[1, [2, 3]]").unwrap();
        assert_eq!(pool.destroy(&mut doc), 5);
        assert_eq!(pool.destroy(&mut doc), 0);
        assert!(pool.root(&doc).is_none());
    }

    #[test]
    fn test_scoped_document_releases_on_drop() {
        let mut pool = ValuePool::new();
        {
            let doc = pool.parse_scoped(r#"{"a": [true, false]}"#).unwrap();
            assert_eq!(doc.root().get("a").array_len(), 2);
        }
        assert_eq!(pool.stats().live_count(), 0);

        let doc = pool.parse_scoped("[1]").unwrap();
        let mut detached = doc.into_document();
        assert_eq!(pool.stats().live_count(), 2);
        pool.destroy(&mut detached);
        assert_eq!(pool.stats().live_count(), 0);
    }

    #[test]
    fn test_scoped_into_value() {
        let mut pool = ValuePool::new();
        let value = pool.parse_scoped(r#"["x"]"#).unwrap().into_value();
        assert_eq!(value, Some(Value::Array(vec![Value::from("x")])));
        assert_eq!(pool.stats().live_count(), 0);
    }

    #[test]
    fn test_stale_id_does_not_resolve() {
        let mut pool = ValuePool::new();
        let mut doc = pool.parse("true").unwrap();
        let id = doc.id().unwrap();
        pool.destroy(&mut doc);
        assert!(pool.resolve(id).is_none());
    }

    #[test]
    fn test_serialize_preserves_order() {
        let mut pool = ValuePool::new();
        let doc = pool.parse_scoped(r#"{"z": 1, "a": [null, "s", true]}"#).unwrap();
        let root = doc.root().unwrap();
        let text = serde_json::to_string(&root).unwrap();
        assert_eq!(text, r#"{"z":1.0,"a":[null,"s",true]}"#);
        assert_eq!(serde_json::to_string(&root.to_value()).unwrap(), text);
    }
}
