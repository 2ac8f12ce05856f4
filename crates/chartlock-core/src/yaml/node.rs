//! Ordered, comment-carrying YAML node tree
//!
//! `Node` is a plain value type: cloning is a deep copy, and every engine
//! function takes `&Node` and returns a fresh tree, so subtrees are never
//! shared between the defaults snapshot, the overrides and merge results.

use serde_yaml::Value;

use super::tags;

/// Kind of a node. Two nodes are only comparable when their kinds match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    /// A stream of documents; children are the document roots
    Document,
    /// Children alternate key, value
    Mapping,
    Sequence,
    #[default]
    Scalar,
}

/// How a scalar was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

/// Comments attached to a node, each stored with its `#` markers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Comments {
    pub head: String,
    pub line: String,
    pub foot: String,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.line.is_empty() && self.foot.is_empty()
    }

    /// First-non-empty per slot, `preferred` wins
    pub fn merged(preferred: &Comments, fallback: &Comments) -> Comments {
        fn pick(a: &str, b: &str) -> String {
            if a.is_empty() { b.to_string() } else { a.to_string() }
        }

        Comments {
            head: pick(&preferred.head, &fallback.head),
            line: pick(&preferred.line, &fallback.line),
            foot: pick(&preferred.foot, &fallback.foot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub kind: NodeKind,
    pub tag: String,
    pub value: String,
    pub style: ScalarStyle,
    pub children: Vec<Node>,
    pub comments: Comments,
}

impl Node {
    /// Empty mapping
    pub fn mapping() -> Self {
        Self {
            kind: NodeKind::Mapping,
            tag: tags::MAP.to_string(),
            ..Self::default()
        }
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Sequence,
            tag: tags::SEQ.to_string(),
            children: items,
            ..Self::default()
        }
    }

    /// Plain scalar whose tag is resolved from its text (`3` is an int, `true` a bool)
    pub fn scalar(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            kind: NodeKind::Scalar,
            tag: tags::resolve(&value).to_string(),
            value,
            ..Self::default()
        }
    }

    /// Scalar that is always a string, whatever it looks like
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Scalar,
            tag: tags::STR.to_string(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn null() -> Self {
        Self {
            kind: NodeKind::Scalar,
            tag: tags::NULL.to_string(),
            ..Self::default()
        }
    }

    /// Document stream holding the given roots
    pub fn document(roots: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Document,
            children: roots,
            ..Self::default()
        }
    }

    /// The "defaulted" marker: same kind, tag and comments as `base`, no content
    pub fn defaulted(base: &Node) -> Self {
        Self {
            kind: base.kind,
            tag: base.tag.clone(),
            style: base.style,
            comments: base.comments.clone(),
            ..Self::default()
        }
    }

    /// True for the zero value (`Node::default()`), i.e. "nothing here"
    pub fn is_zero(&self) -> bool {
        self.kind == NodeKind::Scalar
            && self.tag.is_empty()
            && self.value.is_empty()
            && self.children.is_empty()
            && self.comments.is_empty()
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == NodeKind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Sequence
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == NodeKind::Scalar
    }

    pub fn is_null(&self) -> bool {
        self.is_scalar() && self.tag == tags::NULL
    }

    /// Iterate a mapping's `(key, value)` pairs in document order
    pub fn entries(&self) -> impl Iterator<Item = (&Node, &Node)> {
        debug_assert!(
            self.kind != NodeKind::Mapping || self.children.len() % 2 == 0,
            "mapping with odd child count"
        );
        self.children
            .chunks_exact(2)
            .filter(|_| self.kind == NodeKind::Mapping)
            .map(|pair| (&pair[0], &pair[1]))
    }

    /// Number of entries (mapping) or items (sequence)
    pub fn len(&self) -> usize {
        match self.kind {
            NodeKind::Mapping => self.children.len() / 2,
            _ => self.children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Index of the value slot for `key`, by exact scalar match
    fn value_index(&self, key: &str) -> Option<usize> {
        if self.kind != NodeKind::Mapping {
            return None;
        }
        self.children
            .chunks_exact(2)
            .position(|pair| pair[0].value == key)
            .map(|idx| idx * 2 + 1)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.value_index(key).map(|idx| &self.children[idx])
    }

    /// Look up a dotted path such as `image.tag`
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        path.split('.')
            .try_fold(self, |node, segment| match node.kind {
                NodeKind::Sequence => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| node.children.get(idx)),
                _ => node.get(segment),
            })
    }

    /// Replace the value for `key`, or append a new entry
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.value_index(&key) {
            Some(idx) => self.children[idx] = value,
            None => {
                self.children.push(Node::string(key));
                self.children.push(value);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.value_index(key)?;
        let value = self.children.remove(idx);
        self.children.remove(idx - 1);
        Some(value)
    }

    /// Deep copy with every comment cleared
    pub fn strip_comments(&self) -> Node {
        let mut copy = self.clone();
        copy.visit_mut(&mut |node| node.comments = Comments::default());
        copy
    }

    /// Pre-order walk over this node and all descendants
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    /// Build a tree from a `serde_yaml::Value` (used for flow collections)
    pub fn from_value(value: &Value) -> Node {
        match value {
            Value::Null => Node::null(),
            Value::Bool(b) => Node::scalar(b.to_string()),
            Value::Number(n) => {
                let text = n.to_string();
                Node {
                    tag: if n.is_f64() { tags::FLOAT } else { tags::INT }.to_string(),
                    ..Node::scalar(text)
                }
            }
            Value::String(s) => Node::string(s.clone()),
            Value::Sequence(items) => Node::sequence(items.iter().map(Node::from_value).collect()),
            Value::Mapping(map) => {
                let mut node = Node::mapping();
                for (key, value) in map {
                    node.children.push(Node::from_value(key));
                    node.children.push(Node::from_value(value));
                }
                node
            }
            Value::Tagged(tagged) => {
                let mut node = Node::from_value(&tagged.value);
                node.tag = tagged.tag.to_string();
                node
            }
        }
    }

    /// Convert to a `serde_yaml::Value`, dropping comments and styles
    pub fn to_value(&self) -> Value {
        match self.kind {
            NodeKind::Document => self.children.first().map(Node::to_value).unwrap_or(Value::Null),
            NodeKind::Mapping => {
                let mut map = serde_yaml::Mapping::new();
                for (key, value) in self.entries() {
                    map.insert(key.to_value(), value.to_value());
                }
                Value::Mapping(map)
            }
            NodeKind::Sequence => Value::Sequence(self.children.iter().map(Node::to_value).collect()),
            NodeKind::Scalar => match self.tag.as_str() {
                tags::NULL => Value::Null,
                tags::BOOL => Value::Bool(self.value.eq_ignore_ascii_case("true")),
                tags::INT | tags::FLOAT => serde_yaml::from_str::<Value>(&self.value)
                    .ok()
                    .filter(|v| v.is_number())
                    .unwrap_or_else(|| Value::String(self.value.clone())),
                _ => Value::String(self.value.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut map = Node::mapping();
        map.insert("replicas", Node::scalar("1"));
        map.insert("name", Node::string("web"));
        map.insert("replicas", Node::scalar("3"));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("replicas").unwrap().value, "3");
        assert_eq!(map.get("replicas").unwrap().tag, tags::INT);
        assert!(map.get("missing").is_none());
    }

    #[test]
    fn test_remove_keeps_pairs_aligned() {
        let mut map = Node::mapping();
        map.insert("a", Node::scalar("1"));
        map.insert("b", Node::scalar("2"));
        map.insert("c", Node::scalar("3"));

        assert_eq!(map.remove("b").unwrap().value, "2");
        let keys: Vec<_> = map.entries().map(|(k, _)| k.value.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_get_path() {
        let mut image = Node::mapping();
        image.insert("tag", Node::string("1.0"));
        let mut root = Node::mapping();
        root.insert("image", image);
        root.insert("ports", Node::sequence(vec![Node::scalar("80")]));

        assert_eq!(root.get_path("image.tag").unwrap().value, "1.0");
        assert_eq!(root.get_path("ports.0").unwrap().value, "80");
        assert!(root.get_path("image.repository").is_none());
    }

    #[test]
    fn test_zero_and_defaulted() {
        assert!(Node::default().is_zero());
        assert!(!Node::null().is_zero());

        let mut base = Node::mapping();
        base.comments.head = "# top".to_string();
        base.insert("a", Node::scalar("1"));
        let marker = Node::defaulted(&base);
        assert!(marker.is_mapping());
        assert!(marker.is_empty());
        assert_eq!(marker.comments.head, "# top");
        assert!(!marker.is_zero());
    }

    #[test]
    fn test_strip_comments_is_deep() {
        let mut child = Node::scalar("1");
        child.comments.line = "# inline".to_string();
        let mut root = Node::mapping();
        root.comments.head = "# head".to_string();
        root.insert("a", child);

        let stripped = root.strip_comments();
        assert!(stripped.comments.is_empty());
        assert!(stripped.get("a").unwrap().comments.is_empty());
        // original untouched
        assert_eq!(root.get("a").unwrap().comments.line, "# inline");
    }

    #[test]
    fn test_value_conversion() {
        let value: Value = serde_yaml::from_str("{a: 1, b: [x, true], c: ~, d: 1.5}").unwrap();
        let node = Node::from_value(&value);

        assert_eq!(node.get("a").unwrap().tag, tags::INT);
        assert_eq!(node.get("b").unwrap().children[1].tag, tags::BOOL);
        assert!(node.get("c").unwrap().is_null());
        assert_eq!(node.get("d").unwrap().tag, tags::FLOAT);
        assert_eq!(node.to_value(), value);
    }
}
