//! Structural merge and prune over node trees
//!
//! Both functions take their inputs by reference and build fresh trees, so
//! neither argument is ever modified.
//!
//! Sequences are atomic: `merge` replaces them wholesale and `prune` keeps or
//! drops them whole, since list items (container specs, ports) are
//! positionally correlated.

use crate::yaml::{Comments, Node, NodeKind};

/// Return `base` with everything present in `overlay` overriding it.
///
/// Keys only in `base` are kept in place, keys only in `overlay` are appended
/// after them. On a kind mismatch `overlay` replaces `base`, unless `overlay`
/// is the zero node.
pub fn merge(base: &Node, overlay: &Node) -> Node {
    if base.kind != overlay.kind {
        return if overlay.is_zero() {
            base.clone()
        } else {
            overlay.clone()
        };
    }

    let mut merged = match base.kind {
        NodeKind::Mapping => merge_mapping(base, overlay),
        NodeKind::Sequence | NodeKind::Document => overlay.clone(),
        NodeKind::Scalar if base.value != overlay.value => overlay.clone(),
        NodeKind::Scalar => base.clone(),
    };
    merged.comments = Comments::merged(&overlay.comments, &base.comments);
    merged
}

fn merge_mapping(base: &Node, overlay: &Node) -> Node {
    let mut merged = base.clone();

    for (key, value) in overlay.entries() {
        let slot = merged
            .children
            .chunks_exact(2)
            .position(|pair| pair[0].value == key.value)
            .map(|idx| idx * 2);

        match slot {
            Some(idx) => {
                let existing = &merged.children[idx];
                let mut new_key = existing.clone();
                new_key.comments = Comments::merged(&key.comments, &existing.comments);
                let new_value = merge(&merged.children[idx + 1], value);
                merged.children[idx] = new_key;
                merged.children[idx + 1] = new_value;
            }
            None => {
                merged.children.push(key.clone());
                merged.children.push(value.clone());
            }
        }
    }

    if !overlay.tag.is_empty() {
        merged.tag = overlay.tag.clone();
    }
    merged
}

/// Return the part of `value` that differs from `base`.
///
/// When nothing differs the result is the "defaulted" marker for `base`
/// (see [`Node::defaulted`]): same kind, tag and comments, no content.
pub fn prune(base: &Node, value: &Node) -> Node {
    prune_node(base, value).unwrap_or_else(|| Node::defaulted(base))
}

/// `None` means "no override"
fn prune_node(base: &Node, value: &Node) -> Option<Node> {
    if base.kind != value.kind {
        return Some(value.clone());
    }

    match value.kind {
        NodeKind::Mapping => {
            let mut delta = Node {
                children: Vec::new(),
                ..value.clone()
            };
            for (key, child) in value.entries() {
                let kept = match base.get(&key.value) {
                    Some(base_child) => prune_node(base_child, child),
                    None => Some(child.clone()),
                };
                if let Some(kept) = kept {
                    delta.children.push(key.clone());
                    delta.children.push(kept);
                }
            }
            (!delta.is_empty()).then_some(delta)
        }
        NodeKind::Sequence | NodeKind::Document => {
            let unchanged = base.children.len() == value.children.len()
                && base
                    .children
                    .iter()
                    .zip(&value.children)
                    .all(|(b, v)| prune_node(b, v).is_none());
            (!unchanged).then(|| value.clone())
        }
        NodeKind::Scalar => (base.value != value.value).then(|| value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::{parse, serialize};

    fn yaml(text: &str) -> Node {
        parse(text).unwrap().children.into_iter().next().unwrap_or_default()
    }

    #[test]
    fn test_merge_overrides_and_appends() {
        let base = yaml("replicas: 1\nimage:\n  repository: nginx\n  tag: \"1.0\"\n");
        let overlay = yaml("image:\n  tag: \"2.0\"\nextra: true\n");

        let merged = merge(&base, &overlay);

        assert_eq!(
            serialize(&merged),
            "replicas: 1\nimage:\n  repository: nginx\n  tag: \"2.0\"\nextra: true\n"
        );
        // inputs untouched
        assert_eq!(base.get_path("image.tag").unwrap().value, "1.0");
    }

    #[test]
    fn test_merge_sequences_replace_wholesale() {
        let base = yaml("ports:\n  - 80\n  - 443\n");
        let overlay = yaml("ports:\n  - 8080\n");

        let merged = merge(&base, &overlay);
        let ports = merged.get("ports").unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.children[0].value, "8080");
    }

    #[test]
    fn test_merge_kind_mismatch() {
        let base = yaml("a:\n  b: 1\n");
        let overlay = yaml("a: flat\n");

        assert_eq!(merge(&base, &overlay).get("a").unwrap().value, "flat");
        assert_eq!(merge(&base, &Node::default()), base);
    }

    #[test]
    fn test_merge_comments_first_non_empty() {
        let base = yaml("# from defaults\nreplicas: 1 # default\n");
        let overlay = yaml("# mine\nreplicas: 3\n");

        let merged = merge(&base, &overlay);
        let (key, value) = merged.entries().next().unwrap();
        assert_eq!(key.comments.head, "# mine");
        assert_eq!(value.value, "3");
        assert_eq!(value.comments.line, "# default");
    }

    #[test]
    fn test_prune_keeps_only_differences() {
        let base = yaml("replicas: 1\nimage:\n  repository: nginx\n  tag: \"1.0\"\n");
        let value = yaml("replicas: 1\nimage:\n  repository: nginx\n  tag: \"2.0\"\nextra: x\n");

        let delta = prune(&base, &value);
        assert_eq!(serialize(&delta), "image:\n  tag: \"2.0\"\nextra: x\n");
    }

    #[test]
    fn test_prune_sequences_whole() {
        let base = yaml("hosts:\n  - a\n  - b\n");

        let changed = prune(&base, &yaml("hosts:\n  - a\n  - c\n"));
        assert_eq!(changed.get("hosts").unwrap().len(), 2);

        let longer = prune(&base, &yaml("hosts:\n  - a\n  - b\n  - c\n"));
        assert_eq!(longer.get("hosts").unwrap().len(), 3);

        let same = prune(&base, &yaml("hosts:\n  - a\n  - b\n"));
        assert!(same.is_empty());
    }

    #[test]
    fn test_prune_self_collapses_to_defaulted_marker() {
        let base = yaml("# defaults\n\na: 1\nb:\n  c: [1, 2]\n  d: {}\n");

        let delta = prune(&base, &base);
        assert!(delta.is_mapping());
        assert!(delta.is_empty());
        assert_eq!(delta.comments.head, "# defaults");
    }

    #[test]
    fn test_prune_kind_change_is_an_override() {
        let base = yaml("resources:\n  limits:\n    cpu: 1\n");
        let value = yaml("resources: ~\n");

        let delta = prune(&base, &value);
        assert!(delta.get("resources").unwrap().is_null());
    }

    #[test]
    fn test_merge_prune_inverse() {
        let base = yaml("replicas: 1\nimage:\n  tag: \"1.0\"\n  pullPolicy: IfNotPresent\nports:\n  - 80\n");
        let value = yaml(
            "replicas: 5\nimage:\n  tag: \"1.0\"\n  pullPolicy: Always\nports:\n  - 80\n  - 81\nnew:\n  key: v\n",
        );

        let rebuilt = merge(&base, &prune(&base, &value));
        assert_eq!(serialize(&rebuilt), serialize(&value));
    }

    #[test]
    fn test_version_upgrade_keeps_operator_overrides_only() {
        let old_defaults = yaml("replicas: 1\nimage:\n  tag: \"1.0\"\n");
        let new_defaults = yaml("replicas: 1\nimage:\n  tag: \"1.1\"\n");
        let overrides = yaml("replicas: 3\n");

        let delta = prune(&old_defaults, &merge(&old_defaults, &overrides));
        let reprojected = prune(&new_defaults, &merge(&new_defaults, &delta));

        assert_eq!(serialize(&reprojected), "replicas: 3\n");
    }

    #[test]
    fn test_version_upgrade_drops_overrides_matching_new_defaults() {
        let old_defaults = yaml("replicas: 1\nworkers: 2\n");
        let new_defaults = yaml("replicas: 3\nworkers: 2\n");
        let overrides = yaml("replicas: 3\nworkers: 4\n");

        let delta = prune(&old_defaults, &merge(&old_defaults, &overrides));
        let reprojected = prune(&new_defaults, &merge(&new_defaults, &delta));

        assert_eq!(serialize(&reprojected), "workers: 4\n");
    }
}
