//! Per-release value document
//!
//! Persisted as a three-document YAML stream:
//!
//! 1. the lock `{chart, version}` the overrides were last reconciled against
//! 2. the overrides, the only section meant for hand editing
//! 3. a snapshot of the chart defaults at the locked version
//!
//! Older layouts are read as well: a single document is a plain values file
//! used as overrides, two documents are a lock and overrides without a
//! snapshot.

use std::path::Path;

use crate::error::{CoreError, Result};
use crate::fs::{read_optional, write_atomic};
use crate::manifest::ChartRef;
use crate::yaml::{self, Node, NodeKind};

pub const LOCK_HEADER: &str = "## This section is automatically generated by chartlock. DO NOT EDIT.";

pub const OVERRIDES_HEADER: &str = "\
## This section contains the non-default values for this chart.
## If you want to change a value, add it here.
## If you want to reset a value to default, remove it here.
## If you want to reset all values to default, delete this entire section.
## You can also modify the section below, any changes there will be reset however they will be copied into this section.";

const MAX_SECTIONS: usize = 3;

/// Chart version the stored overrides were reconciled against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lock {
    pub chart: String,
    pub version: String,
}

impl Lock {
    pub fn new(chart: &ChartRef) -> Self {
        Self {
            chart: chart.name.clone(),
            version: chart.version.clone(),
        }
    }

    /// Legacy documents carry no lock
    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
    }

    fn to_node(&self) -> Node {
        let mut node = Node::mapping();
        node.insert("chart", Node::string(&self.chart));
        node.insert("version", Node::string(&self.version));
        node.comments.head = LOCK_HEADER.to_string();
        node
    }

    fn from_node(node: &Node, path: &str) -> Result<Self> {
        let node = section(node, "lock", path)?;
        let field = |key: &str| {
            node.get(key)
                .filter(|n| n.is_scalar() && !n.is_null())
                .map(|n| n.value.clone())
                .unwrap_or_default()
        };
        Ok(Self {
            chart: field("chart"),
            version: field("version"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueDocument {
    pub lock: Lock,

    /// Mapping of the values that differ from the chart defaults
    pub overrides: Node,

    /// Chart defaults at `lock.version`; the zero node when the stored
    /// document predates snapshots
    pub defaults: Node,
}

impl ValueDocument {
    pub fn new(lock: Lock, overrides: Node, defaults: Node) -> Self {
        Self {
            lock,
            overrides,
            defaults,
        }
    }

    /// Fresh document with no overrides
    pub fn initial(chart: &ChartRef, defaults: &Node) -> Self {
        Self::new(Lock::new(chart), Node::mapping(), defaults.clone())
    }

    /// Parse stored text; `None` when the text holds no document at all
    pub fn parse(text: &str, path: &str) -> Result<Option<Self>> {
        let stream = yaml::parse_named(text, path)?;
        let mut sections = stream.children.into_iter();

        let doc = match sections.len() {
            0 => return Ok(None),
            1 => {
                let values = sections.next().unwrap_or_default();
                Self::new(Lock::default(), section(&values, "values", path)?.strip_comments(), Node::default())
            }
            2 | 3 => {
                let lock = sections.next().unwrap_or_default();
                let overrides = sections.next().unwrap_or_default();
                let defaults = match sections.next() {
                    Some(defaults) => section(&defaults, "defaults", path)?,
                    None => Node::default(),
                };
                Self::new(
                    Lock::from_node(&lock, path)?,
                    without_header(section(&overrides, "overrides", path)?),
                    defaults,
                )
            }
            n => {
                return Err(CoreError::InvalidDocument {
                    path: path.to_string(),
                    message: format!("expected at most {} documents, found {}", MAX_SECTIONS, n),
                });
            }
        };

        Ok(Some(doc))
    }

    /// Load from disk; a missing file is `None`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match read_optional(path)? {
            Some(text) => Self::parse(&text, &path.display().to_string()),
            None => Ok(None),
        }
    }

    /// Render the three-section stream with its header comments
    pub fn to_yaml(&self) -> String {
        let mut overrides = self.overrides.clone();
        overrides.comments.head = OVERRIDES_HEADER.to_string();

        let defaults = if self.defaults.is_zero() {
            Node::mapping()
        } else {
            self.defaults.clone()
        };

        yaml::serialize(&Node::document(vec![self.lock.to_node(), overrides, defaults]))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.to_yaml().as_bytes())
    }
}

/// Drop the generated header from the overrides section.
///
/// A comment typed right under the header, with no blank line between, makes
/// the reader attach the header to the first key instead of the section.
fn without_header(mut overrides: Node) -> Node {
    overrides.comments.head = strip_header(&overrides.comments.head);
    if let Some(first) = overrides.children.first_mut() {
        first.comments.head = strip_header(&first.comments.head);
    }
    overrides
}

fn strip_header(comment: &str) -> String {
    match comment.strip_prefix(OVERRIDES_HEADER) {
        Some(rest) => rest.trim_start_matches('\n').to_string(),
        None => comment.to_string(),
    }
}

/// A section must be a mapping; an empty (null) section reads as `{}`
fn section(node: &Node, name: &str, path: &str) -> Result<Node> {
    match node.kind {
        NodeKind::Mapping => Ok(node.clone()),
        NodeKind::Scalar if node.is_null() => {
            let mut empty = Node::mapping();
            empty.comments = node.comments.clone();
            Ok(empty)
        }
        _ => Err(CoreError::InvalidDocument {
            path: path.to_string(),
            message: format!("{} section must be a mapping", name),
        }),
    }
}
