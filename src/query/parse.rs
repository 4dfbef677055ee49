//! Query string → tree.
//!
//! Pairs are split on `&` and the first `=`, then form-urlencoded decoding is
//! applied (`+` is a space). The decoded key is read as a bracket path:
//!
//! ```text
//! a            → [a]
//! a[b][c]      → [a, b, c]
//! a[]          → [a, <next index under a>]
//! a[b / a[b]c  → ["a[b"] / ["a[b]c"]   (unbalanced: one flat key)
//! ```
//!
//! At most [`MAX_NESTING`] bracket segments are split off a key; whatever
//! follows stays one literal segment, so tree depth is bounded.

use url::form_urlencoded;

use crate::query::node::QueryNode;

/// Bracket segments read from one key before the rest is kept literal.
pub const MAX_NESTING: usize = 64;

/// One step of a decoded key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    /// `[]`: the next sequential numeric key.
    Append,
}

/// Parse a query string (without the leading `?`) into a branch node.
pub fn parse(query: &str) -> QueryNode {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut root = QueryNode::empty();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        insert_pair(&mut root, &key, value.into_owned());
    }

    root
}

fn insert_pair(root: &mut QueryNode, raw_key: &str, value: String) {
    let segments = split_key(raw_key);

    let mut current = root;
    for segment in &segments {
        let branch = current.force_branch();
        let key = match segment {
            Segment::Key(k) => k.clone(),
            Segment::Append => branch.next_index().to_string(),
        };
        current = branch.entry(&key);
    }
    *current = QueryNode::Leaf(value);
}

/// Split a decoded key into path segments, or one flat segment when the
/// brackets do not nest cleanly.
fn split_key(raw: &str) -> Vec<Segment> {
    let flat = || vec![Segment::Key(raw.to_string())];

    let Some(open) = raw.find('[') else {
        return flat();
    };
    if open == 0 {
        return flat();
    }

    let mut segments = vec![Segment::Key(raw[..open].to_string())];
    let mut rest = &raw[open..];

    while !rest.is_empty() {
        if segments.len() > MAX_NESTING {
            segments.push(Segment::Key(rest.to_string()));
            break;
        }
        let Some(inner) = rest.strip_prefix('[') else {
            return flat();
        };
        let Some(close) = inner.find(']') else {
            return flat();
        };
        let name = &inner[..close];
        if name.contains('[') {
            return flat();
        }
        segments.push(if name.is_empty() {
            Segment::Append
        } else {
            Segment::Key(name.to_string())
        });
        rest = &inner[close + 1..];
    }

    segments
}

/// Percent-decode one URI component. Unlike form data, `+` stays literal.
pub(crate) fn percent_decode(value: &str) -> String {
    let escaped = value.replace('+', "%2B");
    form_urlencoded::parse(format!("v={}", escaped).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
