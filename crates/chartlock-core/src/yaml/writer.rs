//! Block-style YAML emitter
//!
//! Writes two-space indented block YAML, keeping comments in the positions the
//! reader assigns them, so that reading emitted text yields an equal tree.

use super::node::{Node, NodeKind, ScalarStyle};
use super::tags;

const INDENT: usize = 2;

/// Serialize a node. A `Document` node is written as a stream with `---`
/// between its roots.
pub fn serialize(node: &Node) -> String {
    let mut out = String::new();

    if node.kind == NodeKind::Document {
        if node.children.is_empty() {
            write_comment_lines(&mut out, &node.comments.head, 0);
            return out;
        }
        for (idx, root) in node.children.iter().enumerate() {
            if idx > 0 {
                out.push_str("---\n");
            }
            write_root(&mut out, root);
        }
    } else {
        write_root(&mut out, node);
    }

    out
}

fn write_root(out: &mut String, node: &Node) {
    if !node.comments.head.is_empty() {
        write_comment_lines(out, &node.comments.head, 0);
        out.push('\n');
    }

    match node.kind {
        NodeKind::Mapping if !node.is_empty() => write_mapping(out, node, 0, false),
        NodeKind::Sequence if !node.is_empty() => write_sequence(out, node, 0, false),
        NodeKind::Mapping | NodeKind::Sequence => {
            out.push_str(if node.is_mapping() { "{}" } else { "[]" });
            push_line_comment(out, &node.comments.line);
            out.push('\n');
        }
        NodeKind::Document => {
            for root in &node.children {
                write_root(out, root);
            }
        }
        _ => {
            let text = inline_or_block(node, 0);
            out.push_str(if text.is_empty() { "null" } else { text.trim_start() });
            if !is_block_text(&text) {
                push_line_comment(out, &node.comments.line);
                out.push('\n');
            }
        }
    }

    if !node.comments.foot.is_empty() {
        out.push('\n');
        write_comment_lines(out, &node.comments.foot, 0);
    }
}

fn write_mapping(out: &mut String, node: &Node, indent: usize, inline_first: bool) {
    for (idx, (key, value)) in node.entries().enumerate() {
        let first_inline = inline_first && idx == 0;
        if !first_inline {
            write_comment_lines(out, &key.comments.head, indent);
            write_comment_lines(out, &value.comments.head, indent);
            push_indent(out, indent);
        }

        out.push_str(&scalar_inline(key));
        out.push(':');

        let line_comment = if key.comments.line.is_empty() {
            &value.comments.line
        } else {
            &key.comments.line
        };
        write_value(out, value, indent, line_comment);

        write_comment_lines(out, &value.comments.foot, indent);
        write_comment_lines(out, &key.comments.foot, indent);
    }
}

fn write_sequence(out: &mut String, node: &Node, indent: usize, inline_first: bool) {
    for (idx, item) in node.children.iter().enumerate() {
        let first_inline = inline_first && idx == 0;
        if !first_inline {
            write_comment_lines(out, &item.comments.head, indent);
            if item.is_mapping() {
                if let Some((key, _)) = item.entries().next() {
                    write_comment_lines(out, &key.comments.head, indent);
                }
            }
            push_indent(out, indent);
        }

        match item.kind {
            NodeKind::Mapping if !item.is_empty() => {
                out.push_str("- ");
                write_mapping(out, item, indent + INDENT, true);
            }
            NodeKind::Sequence if !item.is_empty() => {
                out.push_str("- ");
                write_sequence(out, item, indent + INDENT, true);
            }
            _ => {
                out.push('-');
                write_value(out, item, indent, &item.comments.line);
            }
        }

        write_comment_lines(out, &item.comments.foot, indent);
    }
}

/// Write what follows `key:` or `-`, up to and including the newline
fn write_value(out: &mut String, value: &Node, indent: usize, line_comment: &str) {
    match value.kind {
        NodeKind::Mapping | NodeKind::Sequence if value.is_empty() => {
            out.push_str(if value.is_mapping() { " {}" } else { " []" });
            push_line_comment(out, line_comment);
            out.push('\n');
        }
        NodeKind::Mapping => {
            push_line_comment(out, line_comment);
            out.push('\n');
            write_mapping(out, value, indent + INDENT, false);
        }
        NodeKind::Sequence => {
            push_line_comment(out, line_comment);
            out.push('\n');
            write_sequence(out, value, indent + INDENT, false);
        }
        NodeKind::Scalar | NodeKind::Document => {
            let text = inline_or_block(value, indent + INDENT);
            if is_block_text(&text) {
                // `|` header, then the indented body lines
                let (header, body) = text.split_once('\n').unwrap_or((&text, ""));
                out.push(' ');
                out.push_str(header);
                push_line_comment(out, line_comment);
                out.push('\n');
                out.push_str(body);
            } else {
                if !text.is_empty() {
                    out.push(' ');
                    out.push_str(&text);
                }
                push_line_comment(out, line_comment);
                out.push('\n');
            }
        }
    }
}

fn is_block_text(text: &str) -> bool {
    text.starts_with('|')
}

/// Scalar text, either single-line or a `|` block with its body lines
/// indented to `indent` (the block form always contains a newline)
fn inline_or_block(node: &Node, indent: usize) -> String {
    if node.value.contains('\n')
        && matches!(node.style, ScalarStyle::Literal | ScalarStyle::Folded)
        && is_str_tag(&node.tag)
        && block_safe(&node.value)
    {
        return literal_block(&node.value, indent);
    }
    scalar_inline(node)
}

fn is_str_tag(tag: &str) -> bool {
    tag.is_empty() || tag == tags::STR
}

fn block_safe(value: &str) -> bool {
    let first = value.lines().next().unwrap_or("");
    !first.starts_with(' ')
        && !value.trim_end_matches('\n').is_empty()
        && !value.chars().any(|c| c.is_control() && c != '\n')
        && !value.lines().any(|l| !l.is_empty() && l.trim().is_empty())
}

fn literal_block(value: &str, indent: usize) -> String {
    let trailing = value.len() - value.trim_end_matches('\n').len();
    let chomp = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };

    let body = if trailing == 0 {
        value
    } else {
        &value[..value.len() - 1]
    };

    let mut out = format!("|{}\n", chomp);
    for line in body.split('\n') {
        if !line.is_empty() {
            push_indent(&mut out, indent);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Single-line representation of a scalar, quoted when needed so the text
/// reads back with the same tag and value
pub(crate) fn scalar_inline(node: &Node) -> String {
    let tag = node.tag.as_str();

    if is_str_tag(tag) {
        return quote_str(&node.value, node.style);
    }

    if matches!(tag, tags::NULL | tags::BOOL | tags::INT | tags::FLOAT) {
        if tags::resolve(&node.value) == tag {
            return node.value.clone();
        }
        return format!("{} {}", tag, double_quoted(&node.value));
    }

    if node.kind != NodeKind::Scalar {
        return format!("{} {}", tag, double_quoted(&node.value));
    }

    format!("{} {}", tag, quote_str(&node.value, node.style))
}

fn quote_str(value: &str, style: ScalarStyle) -> String {
    if value.contains('\n') || value.chars().any(char::is_control) {
        return double_quoted(value);
    }
    match style {
        ScalarStyle::SingleQuoted => return format!("'{}'", value.replace('\'', "''")),
        ScalarStyle::DoubleQuoted => return double_quoted(value),
        _ => {}
    }
    if plain_safe(value) && tags::resolve(value) == tags::STR {
        value.to_string()
    } else {
        double_quoted(value)
    }
}

fn double_quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.escape_default()))
}

/// Whether `value` can be written without quotes
fn plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };

    if value.trim() != value {
        return false;
    }
    if "[]{}#&*!|>'\"%@`,".contains(first) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        match value.chars().nth(1) {
            None | Some(' ') => return false,
            _ => {}
        }
    }
    if value == "---" || value == "..." {
        return false;
    }

    !(value.contains(": ") || value.contains(" #") || value.ends_with(':') || value.contains('\t'))
}

fn write_comment_lines(out: &mut String, text: &str, indent: usize) {
    if text.is_empty() {
        return;
    }
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            out.push('\n');
            continue;
        }
        push_indent(out, indent);
        if !line.starts_with('#') {
            out.push_str("# ");
        }
        out.push_str(line);
        out.push('\n');
    }
}

fn push_line_comment(out: &mut String, comment: &str) {
    let comment = comment.trim();
    if comment.is_empty() {
        return;
    }
    out.push(' ');
    if !comment.starts_with('#') {
        out.push_str("# ");
    }
    out.push_str(comment);
}

fn push_indent(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat_n(' ', indent));
}
