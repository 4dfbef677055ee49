//! Query tree values.
//!
//! A [`QueryNode`] is either a leaf string or a [`Branch`] of ordered
//! key → node entries. Keys within a branch are unique; inserting an
//! existing key replaces the value in place so serialization order stays
//! stable.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A node in the query-parameter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// A single string value.
    Leaf(String),
    /// An ordered mapping of child keys to nodes.
    Branch(Branch),
}

impl QueryNode {
    /// An empty branch, the shape of an empty query.
    pub fn empty() -> Self {
        QueryNode::Branch(Branch::new())
    }

    /// Create a leaf holding `value`.
    pub fn leaf(value: impl Into<String>) -> Self {
        QueryNode::Leaf(value.into())
    }

    /// Create a branch from `(key, node)` pairs. Later duplicates overwrite
    /// earlier ones.
    pub fn branch<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, QueryNode)>,
    {
        let mut branch = Branch::new();
        for (key, node) in entries {
            branch.insert(key, node);
        }
        QueryNode::Branch(branch)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, QueryNode::Leaf(_))
    }

    /// True for leaves never; true for branches without entries.
    pub fn is_empty(&self) -> bool {
        match self {
            QueryNode::Leaf(_) => false,
            QueryNode::Branch(b) => b.is_empty(),
        }
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            QueryNode::Leaf(v) => Some(v),
            QueryNode::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            QueryNode::Branch(b) => Some(b),
            QueryNode::Leaf(_) => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut Branch> {
        match self {
            QueryNode::Branch(b) => Some(b),
            QueryNode::Leaf(_) => None,
        }
    }

    /// Resolve a path of keys to the node it locates.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&QueryNode> {
        let mut current = self;
        for key in path {
            current = current.as_branch()?.get(key.as_ref())?;
        }
        Some(current)
    }

    /// Set the node at `path`, creating intermediate branches and replacing
    /// any leaf found on the way. An empty path replaces `self`.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], node: QueryNode) {
        let Some((last, parents)) = path.split_last() else {
            *self = node;
            return;
        };

        let mut current = self;
        for key in parents {
            current = current.force_branch().entry(key.as_ref());
        }
        current.force_branch().insert(last.as_ref(), node);
    }

    /// Turn this node into a branch if it is a leaf, discarding the leaf.
    pub(crate) fn force_branch(&mut self) -> &mut Branch {
        if self.is_leaf() {
            *self = QueryNode::empty();
        }
        match self {
            QueryNode::Branch(b) => b,
            QueryNode::Leaf(_) => unreachable!("leaf replaced above"),
        }
    }
}

impl Default for QueryNode {
    fn default() -> Self {
        QueryNode::empty()
    }
}

impl From<&str> for QueryNode {
    fn from(value: &str) -> Self {
        QueryNode::Leaf(value.to_string())
    }
}

impl From<String> for QueryNode {
    fn from(value: String) -> Self {
        QueryNode::Leaf(value)
    }
}

/// `false` is the conventional "delete this path" marker in removal specs.
impl From<bool> for QueryNode {
    fn from(value: bool) -> Self {
        QueryNode::Leaf(value.to_string())
    }
}

impl From<Branch> for QueryNode {
    fn from(branch: Branch) -> Self {
        QueryNode::Branch(branch)
    }
}

/// Objects become branches and arrays become branches keyed by index.
/// Scalars become leaves; `null` becomes an empty leaf.
impl From<Value> for QueryNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => QueryNode::branch(map.into_iter().map(|(k, v)| (k, v.into()))),
            Value::Array(items) => QueryNode::branch(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), QueryNode::from(v))),
            ),
            Value::String(s) => QueryNode::Leaf(s),
            Value::Null => QueryNode::Leaf(String::new()),
            other => QueryNode::Leaf(other.to_string()),
        }
    }
}

impl From<&QueryNode> for Value {
    fn from(node: &QueryNode) -> Self {
        match node {
            QueryNode::Leaf(v) => Value::String(v.clone()),
            QueryNode::Branch(b) => Value::Object(
                b.iter()
                    .map(|(k, child)| (k.to_string(), Value::from(child)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for QueryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryNode::Leaf(v) => serializer.serialize_str(v),
            QueryNode::Branch(b) => {
                let mut map = serializer.serialize_map(Some(b.len()))?;
                for (k, v) in b.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Ordered, key-unique children of a branch node.
///
/// Equality ignores entry order: two branches are equal when they hold the
/// same keys mapped to equal nodes.
#[derive(Debug, Clone, Default)]
pub struct Branch {
    entries: Vec<(String, QueryNode)>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&QueryNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut QueryNode> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite `key`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, node: QueryNode) -> Option<QueryNode> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, node)),
            None => {
                self.entries.push((key, node));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryNode> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// The child at `key`, inserted as an empty branch when absent.
    pub(crate) fn entry(&mut self, key: &str) -> &mut QueryNode {
        let index = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.to_string(), QueryNode::empty()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// The key `a[]` appends under: one past the largest numeric key.
    pub fn next_index(&self) -> u64 {
        self.entries
            .iter()
            .filter_map(|(k, _)| k.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl Eq for Branch {}

impl<K: Into<String>> FromIterator<(K, QueryNode)> for Branch {
    fn from_iter<I: IntoIterator<Item = (K, QueryNode)>>(iter: I) -> Self {
        let mut branch = Branch::new();
        for (k, v) in iter {
            branch.insert(k, v);
        }
        branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_overwrites_leaf_with_branch() {
        let mut root = QueryNode::branch([("a", QueryNode::leaf("1"))]);
        root.set(&["a", "b"], QueryNode::leaf("2"));

        assert_eq!(root.get(&["a", "b"]).and_then(QueryNode::as_leaf), Some("2"));
        assert!(root.get(&["a"]).is_some_and(|n| !n.is_leaf()));
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut branch = Branch::new();
        branch.insert("x", "1".into());
        branch.insert("y", "2".into());
        branch.insert("x", "3".into());

        let keys: Vec<_> = branch.keys().collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(branch.get("x"), Some(&QueryNode::leaf("3")));
    }

    #[test]
    fn test_branch_equality_ignores_order() {
        let a = QueryNode::branch([("x", QueryNode::leaf("1")), ("y", QueryNode::leaf("2"))]);
        let b = QueryNode::branch([("y", QueryNode::leaf("2")), ("x", QueryNode::leaf("1"))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_next_index() {
        let mut branch = Branch::new();
        assert_eq!(branch.next_index(), 0);
        branch.insert("0", "a".into());
        branch.insert("name", "b".into());
        branch.insert("4", "c".into());
        assert_eq!(branch.next_index(), 5);
    }

    #[test]
    fn test_from_json() {
        let node = QueryNode::from(json!({"user": {"name": false}, "tags": ["a", "b"], "n": 3}));

        assert_eq!(node.get(&["user", "name"]), Some(&QueryNode::leaf("false")));
        assert_eq!(node.get(&["tags", "1"]), Some(&QueryNode::leaf("b")));
        assert_eq!(node.get(&["n"]), Some(&QueryNode::leaf("3")));
        assert_eq!(Value::from(&node)["tags"]["0"], json!("a"));
    }
}
