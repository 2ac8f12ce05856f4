//! Comment-preserving YAML tree
//!
//! Values files are edited by hand, so their comments and key order are
//! carried through parsing, merging and re-emission.

pub mod node;
pub mod reader;
pub mod tags;
pub mod writer;

pub use node::{Comments, Node, NodeKind, ScalarStyle};
pub use reader::{parse, parse_named};
pub use writer::serialize;

/// Remove every comment from a YAML stream, keeping structure and values
pub fn strip_comments(text: &str) -> crate::error::Result<String> {
    let stream = parse(text)?;
    Ok(serialize(&stream.strip_comments()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments_text() {
        let text = "# head\n\na: 1 # one\n# between\nb:\n  - x # item\n";
        assert_eq!(strip_comments(text).unwrap(), "a: 1\nb:\n  - x\n");
    }
}
