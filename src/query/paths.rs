//! Path-addressed removal and merge.
//!
//! Both operations take a spec tree shaped like the target. In a spec, a
//! leaf at some path acts on the whole subtree there; a branch descends into
//! the children it names and leaves every other key alone.

use crate::query::node::{Branch, QueryNode};

/// Remove every subtree that `spec` marks with a leaf.
///
/// Paths named by `spec` but absent from `node` are ignored. A branch that
/// becomes empty because all of its entries were removed is dropped as well;
/// branches that were already empty are kept.
///
/// ```
/// use app_dispatch::query::{parse, remove_at_paths, serialize};
/// use serde_json::json;
///
/// let q = parse("user[alias]=mr.pete&user[name]=pete&toc=1");
/// let scrubbed = remove_at_paths(&q, &json!({"user": {"name": false}}).into());
/// assert_eq!(serialize(&scrubbed), "user[alias]=mr.pete&toc=1");
/// ```
pub fn remove_at_paths(node: &QueryNode, spec: &QueryNode) -> QueryNode {
    prune(node, spec).unwrap_or_else(QueryNode::empty)
}

fn prune(node: &QueryNode, spec: &QueryNode) -> Option<QueryNode> {
    match (node, spec) {
        (_, QueryNode::Leaf(_)) => None,
        (QueryNode::Leaf(_), QueryNode::Branch(_)) => Some(node.clone()),
        (QueryNode::Branch(children), QueryNode::Branch(spec)) => {
            Some(QueryNode::Branch(prune_branch(children, spec)))
        }
    }
}

fn prune_branch(children: &Branch, spec: &Branch) -> Branch {
    let mut kept = Branch::new();
    for (key, child) in children.iter() {
        let Some(child_spec) = spec.get(key) else {
            kept.insert(key, child.clone());
            continue;
        };
        if let Some(pruned) = prune(child, child_spec) {
            if pruned.is_empty() && !child.is_empty() {
                continue;
            }
            kept.insert(key, pruned);
        }
    }
    kept
}

/// Deep-merge `spec` into `node`.
///
/// A leaf in `spec` overwrites whatever `node` holds at that path. A branch
/// in `spec` merges child by child, keeping the siblings `spec` doesn't name;
/// if `node` holds a leaf there it is replaced by the merged branch.
pub fn merge_at_paths(node: &QueryNode, spec: &QueryNode) -> QueryNode {
    match (node, spec) {
        (_, QueryNode::Leaf(_)) => spec.clone(),
        (QueryNode::Branch(children), QueryNode::Branch(spec)) => {
            QueryNode::Branch(merge_branch(children, spec))
        }
        (QueryNode::Leaf(_), QueryNode::Branch(spec)) => {
            QueryNode::Branch(merge_branch(&Branch::new(), spec))
        }
    }
}

fn merge_branch(children: &Branch, spec: &Branch) -> Branch {
    let mut merged = children.clone();
    for (key, child_spec) in spec.iter() {
        let next = match merged.get(key) {
            Some(existing) => merge_at_paths(existing, child_spec),
            None => merge_at_paths(&QueryNode::empty(), child_spec),
        };
        merged.insert(key, next);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse, serialize};
    use serde_json::json;

    const SAMPLE: &str =
        "user[alias]=mr.pete&user[name]=pete&toc=1&options[contact_methods][email]=pete@ex.com";

    fn spec(value: serde_json::Value) -> QueryNode {
        QueryNode::from(value)
    }

    #[test]
    fn test_remove_nested_paths() {
        let q = parse(SAMPLE);
        let removal = spec(json!({
            "user": {"name": false},
            "options": {"contact_methods": {"email": false}}
        }));

        let result = remove_at_paths(&q, &removal);
        assert_eq!(serialize(&result), "user[alias]=mr.pete&toc=1");
        assert!(result.get(&["options"]).is_none());
    }

    #[test]
    fn test_remove_whole_subtree() {
        let q = parse(SAMPLE);
        let result = remove_at_paths(&q, &spec(json!({"user": false})));
        assert_eq!(
            serialize(&result),
            "toc=1&options[contact_methods][email]=pete%40ex.com"
        );
    }

    #[test]
    fn test_remove_absent_paths_is_noop() {
        let q = parse(SAMPLE);
        let removal = spec(json!({"missing": false, "user": {"nope": false}, "toc": {"deeper": false}}));
        assert_eq!(remove_at_paths(&q, &removal), q);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let q = parse(SAMPLE);
        let removal = spec(json!({"user": {"alias": false}, "toc": false}));
        let once = remove_at_paths(&q, &removal);
        assert_eq!(remove_at_paths(&once, &removal), once);
    }

    #[test]
    fn test_remove_keeps_preexisting_empty_branch() {
        let mut q = parse("a=1");
        q.set(&["box"], QueryNode::empty());
        let result = remove_at_paths(&q, &spec(json!({"box": {"x": false}})));
        assert_eq!(result.get(&["box"]), Some(&QueryNode::empty()));
    }

    #[test]
    fn test_root_leaf_spec_clears_everything() {
        let q = parse(SAMPLE);
        assert!(remove_at_paths(&q, &QueryNode::from(false)).is_empty());
    }

    #[test]
    fn test_merge_keeps_siblings() {
        let q = parse(SAMPLE);
        let update = spec(json!({"user": {"name": "peter", "age": "40"}}));

        let result = merge_at_paths(&q, &update);
        assert_eq!(result.get(&["user", "alias"]), Some(&QueryNode::leaf("mr.pete")));
        assert_eq!(result.get(&["user", "name"]), Some(&QueryNode::leaf("peter")));
        assert_eq!(result.get(&["user", "age"]), Some(&QueryNode::leaf("40")));
        assert_eq!(result.get(&["toc"]), Some(&QueryNode::leaf("1")));
    }

    #[test]
    fn test_merge_leaf_replaces_branch_and_back() {
        let q = parse(SAMPLE);
        let flattened = merge_at_paths(&q, &spec(json!({"options": "none"})));
        assert_eq!(flattened.get(&["options"]), Some(&QueryNode::leaf("none")));

        let nested = merge_at_paths(&flattened, &spec(json!({"toc": {"page": "2"}})));
        assert_eq!(nested.get(&["toc", "page"]), Some(&QueryNode::leaf("2")));
    }

    #[test]
    fn test_merge_then_remove_restores_original() {
        let q = parse(SAMPLE);
        let update = spec(json!({"user": {"age": "40"}, "fresh": {"a": {"b": "c"}}}));

        let merged = merge_at_paths(&q, &update);
        assert_eq!(remove_at_paths(&merged, &update), q);
    }
}
