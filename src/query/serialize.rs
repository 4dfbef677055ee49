//! Tree → query string.

use url::form_urlencoded;

use crate::query::node::QueryNode;

/// Serialize a tree into a query string (no leading `?`).
///
/// Traversal is depth-first in insertion order. Key segments and values are
/// form-urlencoded; the bracket delimiters between segments are written
/// literally. Empty branches produce no output. A bare leaf at the root has
/// no key and serializes to nothing.
pub fn serialize(node: &QueryNode) -> String {
    let mut pairs = Vec::new();
    if let QueryNode::Branch(root) = node {
        for (key, child) in root.iter() {
            collect(child, encode(key), &mut pairs);
        }
    }
    pairs.join("&")
}

fn collect(node: &QueryNode, prefix: String, pairs: &mut Vec<String>) {
    match node {
        QueryNode::Leaf(value) => pairs.push(format!("{}={}", prefix, encode(value))),
        QueryNode::Branch(branch) => {
            for (key, child) in branch.iter() {
                collect(child, format!("{}[{}]", prefix, encode(key)), pairs);
            }
        }
    }
}

fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
