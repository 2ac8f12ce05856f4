//! Comment-preserving reader for block-style YAML streams
//!
//! Handles the subset found in chart values files and value documents: block
//! mappings and sequences (including compact `- key: v` items), plain, quoted
//! and block (`|`, `>`) scalars, single-line or multi-line flow collections,
//! explicit tags, anchors and multi-document streams. Flow collections and
//! quoted scalars are decoded by `serde_yaml`. An alias is replaced by a copy
//! of its anchored node (without comments), so anchors do not survive a
//! rewrite. Aliases inside flow collections are not resolved.
//!
//! Comment attachment:
//! - a comment block at the top of a document followed by a blank line is the
//!   root's head comment
//! - other full-line comments are the head comment of the next entry
//! - a trailing `# ...` is the line comment of the scalar on that line, or of
//!   the key when its value is a block collection
//! - comments after the last entry of a document are the root's foot comment

use std::collections::HashMap;

use serde_yaml::Value;

use super::node::{Node, ScalarStyle};
use super::tags;
use crate::error::{CoreError, Result};

/// Parse a stream into a `Document` node whose children are the document roots
pub fn parse(text: &str) -> Result<Node> {
    parse_named(text, "<input>")
}

/// Like [`parse`], naming `path` in error messages
pub fn parse_named(text: &str, path: &str) -> Result<Node> {
    let segments = split_documents(text, path)?;

    let mut stream = Node::document(Vec::new());
    let mut carry: Vec<&str> = Vec::new();

    for segment in segments {
        let mut parser = Parser::new(segment.lines, path);
        match parser.parse_document(&carry)? {
            Some(root) => {
                stream.children.push(root);
                carry.clear();
            }
            None if segment.explicit => {
                // `---` followed by nothing but comments is an empty document
                let mut root = Node::null();
                root.comments.head = parser.take_pending();
                stream.children.push(root);
                carry.clear();
            }
            None => carry = std::mem::take(&mut parser.pending),
        }
    }

    if !carry.is_empty() {
        let trailing = join_comments(&carry);
        match stream.children.last_mut() {
            Some(last) if last.comments.foot.is_empty() => last.comments.foot = trailing,
            Some(last) => {
                last.comments.foot.push('\n');
                last.comments.foot.push_str(&trailing);
            }
            None => stream.comments.head = trailing,
        }
    }

    Ok(stream)
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    /// Content after the indentation, trailing whitespace removed
    text: &'a str,
    /// Whole source line
    raw: &'a str,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    fn is_comment(&self) -> bool {
        self.text.starts_with('#')
    }

    fn is_trivia(&self) -> bool {
        self.is_blank() || self.is_comment()
    }
}

fn make_line<'a>(raw: &'a str, number: usize, path: &str) -> Result<Line<'a>> {
    let content = raw.trim_start_matches(' ');
    let indent = raw.len() - content.len();
    if content.starts_with('\t') && !content.trim().is_empty() {
        return Err(CoreError::Parse {
            path: path.to_string(),
            line: number,
            message: "tabs are not allowed for indentation".to_string(),
        });
    }
    Ok(Line {
        number,
        indent,
        text: content.trim_end(),
        raw,
    })
}

struct Segment<'a> {
    /// Opened by a `---` marker
    explicit: bool,
    lines: Vec<Line<'a>>,
}

/// Split the stream on `---` / `...` markers
fn split_documents<'a>(text: &'a str, path: &str) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut in_document = false;

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let trimmed = raw.trim_end();

        if trimmed == "---" || trimmed.starts_with("--- ") {
            if in_document || !current.is_empty() {
                segments.push(Segment {
                    explicit: in_document,
                    lines: std::mem::take(&mut current),
                });
            }
            in_document = true;
            let rest = &raw[3..];
            if !rest.trim().is_empty() {
                // `--- value` puts the root on the marker line
                let content = rest.trim_start();
                current.push(Line {
                    number,
                    indent: 0,
                    text: content.trim_end(),
                    raw: content,
                });
            }
            continue;
        }

        if trimmed == "..." {
            segments.push(Segment {
                explicit: in_document,
                lines: std::mem::take(&mut current),
            });
            in_document = false;
            continue;
        }

        if !in_document && current.iter().all(Line::is_trivia) && trimmed.starts_with('%') {
            // directives
            continue;
        }

        current.push(make_line(raw, number, path)?);
    }

    if !current.is_empty() {
        segments.push(Segment {
            explicit: in_document,
            lines: current,
        });
    }

    Ok(segments)
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    path: &'a str,
    pending: Vec<&'a str>,
    /// Nodes recorded under `&name` in this document
    anchors: HashMap<&'a str, Node>,
}

impl<'a> Parser<'a> {
    fn new(lines: Vec<Line<'a>>, path: &'a str) -> Self {
        Self {
            lines,
            pos: 0,
            path,
            pending: Vec::new(),
            anchors: HashMap::new(),
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> CoreError {
        CoreError::Parse {
            path: self.path.to_string(),
            line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    /// Advance past blank and comment lines, queueing the comments
    fn skip_trivia(&mut self) -> Option<Line<'a>> {
        while let Some(line) = self.peek() {
            if !line.is_trivia() {
                return Some(line);
            }
            if line.is_comment() {
                self.pending.push(line.text);
            }
            self.pos += 1;
        }
        None
    }

    fn take_pending(&mut self) -> String {
        let text = join_comments(&self.pending);
        self.pending.clear();
        text
    }

    /// Parse one document; `None` when the segment holds only comments
    fn parse_document(&mut self, carried: &[&'a str]) -> Result<Option<Node>> {
        let Some(first) = self.lines.iter().position(|l| !l.is_trivia()) else {
            self.pending.extend(carried.iter().copied());
            self.pending
                .extend(self.lines.iter().filter(|l| l.is_comment()).map(|l| l.text));
            return Ok(None);
        };

        // comments up to the last blank line before content are the document head
        let split = self.lines[..first]
            .iter()
            .rposition(Line::is_blank)
            .unwrap_or(0);
        let mut head: Vec<&str> = carried.to_vec();
        let mut last_was_blank = false;
        for line in &self.lines[..split] {
            if line.is_comment() {
                if last_was_blank && !head.is_empty() {
                    head.push("");
                }
                head.push(line.text);
                last_was_blank = false;
            } else {
                last_was_blank = true;
            }
        }
        self.pos = split;

        let start = self.skip_trivia().map(|l| l.indent).unwrap_or(0);
        let mut root = self.parse_node(start, None)?;

        if let Some(extra) = self.skip_trivia() {
            return Err(self.error(extra.number, "unexpected content after document root"));
        }

        let foot = self.take_pending();
        if !foot.is_empty() {
            root.comments.foot = foot;
        }
        let head = head.join("\n");
        if !head.is_empty() {
            root.comments.head = head;
        }

        Ok(Some(root))
    }

    /// Parse the block whose first content line is the current line, at `indent`
    fn parse_node(&mut self, indent: usize, parent: Option<usize>) -> Result<Node> {
        let Some(line) = self.peek() else {
            return Ok(Node::null());
        };

        if is_sequence_item(line.text) {
            return self.parse_sequence(indent);
        }
        if split_key(line.text).is_some() {
            return self.parse_mapping(indent);
        }

        let head = self.take_pending();
        self.pos += 1;
        let (mut node, comment) = self.parse_value(line.text, parent, line.number, false)?;
        if let Some(comment) = comment {
            node.comments.line = comment;
        }
        node.comments.head = head;
        Ok(node)
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<Node> {
        let mut node = Node::mapping();

        while let Some(line) = self.skip_trivia() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.error(line.number, "bad indentation of a mapping entry"));
            }
            if is_sequence_item(line.text) {
                return Err(self.error(line.number, "expected a mapping key, found a sequence item"));
            }
            let Some((raw_key, rest)) = split_key(line.text) else {
                return Err(self.error(line.number, "expected a mapping key"));
            };

            let mut key = self.parse_key(raw_key, line.number)?;
            if node.get(&key.value).is_some() {
                return Err(self.error(line.number, format!("duplicate key '{}'", key.value)));
            }
            key.comments.head = self.take_pending();
            self.pos += 1;

            let (value, comment) = self.parse_value(rest, Some(indent), line.number, true)?;
            if let Some(comment) = comment {
                key.comments.line = comment;
            }

            node.children.push(key);
            node.children.push(value);
        }

        Ok(node)
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<Node> {
        let mut node = Node::sequence(Vec::new());

        while let Some(line) = self.skip_trivia() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.error(line.number, "bad indentation of a sequence item"));
            }
            if !is_sequence_item(line.text) {
                if node.is_empty() {
                    return Err(self.error(line.number, "expected a sequence item"));
                }
                break;
            }

            let head = self.take_pending();
            let after = &line.text[1..];
            let (anchor, inner) = match take_anchor(after.trim_start()) {
                (Some(name), rest) if is_sequence_item(rest) || split_key(rest).is_some() => (Some(name), rest),
                _ => (None, after.trim_start()),
            };
            let offset = line.text.len() - inner.len();

            let mut item = if !inner.is_empty()
                && !inner.starts_with('#')
                && (is_sequence_item(inner) || split_key(inner).is_some())
            {
                // compact nested block: re-read the remainder of this line as
                // the first line of a block indented past the dash
                let nested = indent + offset;
                self.lines[self.pos].indent = nested;
                self.lines[self.pos].text = inner;
                let item = self.parse_node(nested, Some(indent))?;
                if let Some(name) = anchor {
                    self.anchors.insert(name, item.strip_comments());
                }
                item
            } else {
                self.pos += 1;
                let (mut item, comment) = self.parse_value(inner, Some(indent), line.number, false)?;
                if let Some(comment) = comment {
                    item.comments.line = comment;
                }
                item
            };

            if !head.is_empty() {
                item.comments.head = if item.comments.head.is_empty() {
                    head
                } else {
                    format!("{}\n{}", head, item.comments.head)
                };
            }
            node.children.push(item);
        }

        Ok(node)
    }

    fn parse_key(&mut self, raw: &'a str, number: usize) -> Result<Node> {
        let raw = raw.trim();
        if let Some(alias) = raw.strip_prefix('*') {
            let key = self.resolve_alias(alias, number)?;
            if !key.is_scalar() {
                return Err(CoreError::InvalidTree {
                    message: format!("{} line {}: mapping key '*{}' is not a scalar", self.path, number, alias),
                });
            }
            return Ok(key);
        }
        if let (Some(name), rest) = take_anchor(raw) {
            let key = self.parse_key(rest, number)?;
            self.anchors.insert(name, key.strip_comments());
            return Ok(key);
        }
        if raw.starts_with('"') || raw.starts_with('\'') {
            let decoded: String = serde_yaml::from_str(raw)
                .map_err(|e| self.error(number, format!("invalid quoted key: {}", e)))?;
            let mut key = Node::string(decoded);
            key.style = quote_style(raw);
            return Ok(key);
        }
        if raw.is_empty() || raw.starts_with(['[', '{', '?', '&', '*', '!']) {
            return Err(self.error(number, format!("unsupported mapping key '{}'", raw)));
        }
        Ok(Node::scalar(raw))
    }

    /// Parse the value text following `key:` or `- `.
    ///
    /// Returns the node and, when the value itself sits on later lines, the
    /// trailing comment of the introducing line (owned by the key or item).
    fn parse_value(
        &mut self,
        rest: &'a str,
        parent: Option<usize>,
        number: usize,
        sequence_at_parent: bool,
    ) -> Result<(Node, Option<String>)> {
        let rest = rest.trim();

        if let Some(alias) = rest.strip_prefix('*') {
            let (name, remainder) = alias.split_once(char::is_whitespace).unwrap_or((alias, ""));
            let mut node = self.resolve_alias(name, number)?;
            node.comments.line = trailing_comment(remainder)
                .map_err(|m| self.error(number, m))?
                .unwrap_or_default();
            return Ok((node, None));
        }

        // properties come in either order: `&name !tag` or `!tag &name`
        let (anchor, rest) = take_anchor(rest);
        let (tag, rest) = take_tag(rest);
        let (anchor, rest) = match anchor {
            Some(name) => (Some(name), rest),
            None => take_anchor(rest),
        };

        let (node, comment) = self.parse_properties_value(tag, rest, parent, number, sequence_at_parent)?;
        if let Some(name) = anchor {
            self.anchors.insert(name, node.strip_comments());
        }
        Ok((node, comment))
    }

    fn resolve_alias(&self, name: &str, number: usize) -> Result<Node> {
        self.anchors
            .get(name)
            .cloned()
            .ok_or_else(|| self.error(number, format!("unknown alias '*{}'", name)))
    }

    /// [`Parser::parse_value`] once the anchor and tag are split off
    fn parse_properties_value(
        &mut self,
        tag: Option<&'a str>,
        rest: &'a str,
        parent: Option<usize>,
        number: usize,
        sequence_at_parent: bool,
    ) -> Result<(Node, Option<String>)> {
        if rest.starts_with('"') || rest.starts_with('\'') {
            let (mut node, comment) = self.parse_quoted(rest, number)?;
            if let Some(tag) = tag {
                node.tag = tags::normalize(tag);
            }
            node.comments.line = comment.unwrap_or_default();
            return Ok((node, None));
        }

        if rest.starts_with(['[', '{']) {
            let (mut node, comment) = self.parse_flow(rest, number)?;
            if let Some(tag) = tag {
                node.tag = tags::normalize(tag);
            }
            node.comments.line = comment.unwrap_or_default();
            return Ok((node, None));
        }

        let (content, comment) = split_comment(rest);
        let comment = comment.map(str::to_string);

        if content.starts_with(['|', '>']) {
            let mut node = self.parse_block_scalar(content, parent, number)?;
            if let Some(tag) = tag {
                node.tag = tags::normalize(tag);
            }
            node.comments.line = comment.unwrap_or_default();
            return Ok((node, None));
        }

        if content.is_empty() {
            let mut node = match self.skip_trivia() {
                Some(next) if parent.is_none_or(|p| next.indent > p) => {
                    self.parse_node(next.indent, parent)?
                }
                Some(next)
                    if sequence_at_parent
                        && Some(next.indent) == parent
                        && is_sequence_item(next.text) =>
                {
                    self.parse_sequence(next.indent)?
                }
                _ => Node::null(),
            };
            if let Some(tag) = tag {
                node.tag = tags::normalize(tag);
            }
            return Ok((node, comment));
        }

        let text = self.continue_plain(content, parent);
        let mut node = match tag {
            Some(tag) => Node {
                tag: tags::normalize(tag),
                ..Node::string(text)
            },
            None => Node::scalar(text),
        };
        node.comments.line = comment.unwrap_or_default();
        Ok((node, None))
    }

    /// Join continuation lines of a multi-line plain scalar
    fn continue_plain(&mut self, first: &str, parent: Option<usize>) -> String {
        let mut text = first.to_string();
        while let Some(next) = self.peek() {
            let deeper = parent.is_none_or(|p| next.indent > p);
            if next.is_trivia() || !deeper || is_sequence_item(next.text) || split_key(next.text).is_some() {
                break;
            }
            let (content, _) = split_comment(next.text);
            text.push(' ');
            text.push_str(content);
            self.pos += 1;
        }
        text
    }

    fn parse_quoted(&mut self, first: &'a str, number: usize) -> Result<(Node, Option<String>)> {
        let quote = if first.starts_with('"') { '"' } else { '\'' };
        let mut buffer = first.to_string();

        let end = loop {
            if let Some(end) = quoted_end(&buffer, quote) {
                break end;
            }
            let Some(next) = self.peek() else {
                return Err(self.error(number, "unterminated quoted scalar"));
            };
            buffer.push('\n');
            buffer.push_str(next.raw.trim());
            self.pos += 1;
        };

        let (literal, remainder) = buffer.split_at(end);
        let value: String = serde_yaml::from_str(literal)
            .map_err(|e| self.error(number, format!("invalid quoted scalar: {}", e)))?;
        let comment = trailing_comment(remainder).map_err(|m| self.error(number, m))?;

        let mut node = Node::string(value);
        node.style = quote_style(literal);
        Ok((node, comment))
    }

    fn parse_flow(&mut self, first: &'a str, number: usize) -> Result<(Node, Option<String>)> {
        let mut buffer = first.to_string();

        let end = loop {
            if let Some(end) = flow_end(&buffer) {
                break end;
            }
            let Some(next) = self.peek() else {
                return Err(self.error(number, "unterminated flow collection"));
            };
            buffer.push('\n');
            buffer.push_str(next.text);
            self.pos += 1;
        };

        let (flow, remainder) = buffer.split_at(end);
        let value: Value = serde_yaml::from_str(flow)
            .map_err(|e| self.error(number, format!("invalid flow collection: {}", e)))?;
        let comment = trailing_comment(remainder).map_err(|m| self.error(number, m))?;
        Ok((Node::from_value(&value), comment))
    }

    fn parse_block_scalar(&mut self, header: &str, parent: Option<usize>, number: usize) -> Result<Node> {
        let folded = header.starts_with('>');
        let mut chomp = Chomp::Clip;
        let mut explicit_indent = None;
        for c in header[1..].chars() {
            match c {
                '-' => chomp = Chomp::Strip,
                '+' => chomp = Chomp::Keep,
                '1'..='9' => explicit_indent = c.to_digit(10).map(|d| d as usize),
                _ => return Err(self.error(number, format!("invalid block scalar header '{}'", header))),
            }
        }

        let parent_indent = parent.unwrap_or(0);
        let mut block_indent = explicit_indent.map(|d| parent.map_or(d, |p| p + d));
        let mut lines: Vec<&str> = Vec::new();

        while let Some(line) = self.peek() {
            if line.raw.trim().is_empty() {
                lines.push("");
                self.pos += 1;
                continue;
            }
            let column = line.indent;
            if parent.is_some() && column <= parent_indent {
                break;
            }
            let indent = *block_indent.get_or_insert(column);
            if column < indent {
                break;
            }
            lines.push(&line.raw[indent..]);
            self.pos += 1;
        }

        let trailing = lines.iter().rev().take_while(|l| l.is_empty()).count();
        let body = &lines[..lines.len() - trailing];

        let mut value = if folded { fold_lines(body) } else { body.join("\n") };
        if !body.is_empty() {
            match chomp {
                Chomp::Strip => {}
                Chomp::Clip => value.push('\n'),
                Chomp::Keep => {
                    value.push('\n');
                    value.push_str(&"\n".repeat(trailing));
                }
            }
        }

        let mut node = Node::string(value);
        node.style = if folded { ScalarStyle::Folded } else { ScalarStyle::Literal };
        Ok(node)
    }
}

#[derive(Debug, Clone, Copy)]
enum Chomp {
    Strip,
    Clip,
    Keep,
}

fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;
    for line in lines {
        if let Some(p) = prev {
            if line.is_empty() {
                out.push('\n');
            } else if p.is_empty() {
                // the blank line already produced the break
            } else if p.starts_with(' ') || line.starts_with(' ') {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(line);
        prev = Some(line);
    }
    out
}

fn join_comments(lines: &[&str]) -> String {
    lines.join("\n")
}

fn quote_style(literal: &str) -> ScalarStyle {
    if literal.starts_with('"') {
        ScalarStyle::DoubleQuoted
    } else {
        ScalarStyle::SingleQuoted
    }
}

fn is_sequence_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

/// Split off a leading `&anchor` token
fn take_anchor(text: &str) -> (Option<&str>, &str) {
    let Some(body) = text.strip_prefix('&') else {
        return (None, text);
    };
    let (name, rest) = match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], body[idx..].trim_start()),
        None => (body, ""),
    };
    if name.is_empty() {
        return (None, text);
    }
    (Some(name), rest)
}

/// Split off a leading `!tag` token
fn take_tag(text: &str) -> (Option<&str>, &str) {
    if !text.starts_with('!') {
        return (None, text);
    }
    match text.find(char::is_whitespace) {
        Some(idx) => (Some(&text[..idx]), text[idx..].trim_start()),
        None => (Some(text), ""),
    }
}

/// Find the `key: rest` split of a mapping entry line
fn split_key(text: &str) -> Option<(&str, &str)> {
    if text.starts_with('#') {
        return None;
    }
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(b'"') => {
                if c == b'\\' {
                    i += 1;
                } else if c == b'"' {
                    quote = None;
                }
            }
            Some(_) => {
                if c == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 1;
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                b'"' | b'\'' if i == 0 => quote = Some(c),
                b'[' | b'{' => depth += 1,
                b']' | b'}' => depth = depth.saturating_sub(1),
                b'#' if i > 0 && bytes[i - 1] == b' ' => return None,
                b':' if depth == 0 && (i + 1 == bytes.len() || bytes[i + 1] == b' ') => {
                    let key = &text[..i];
                    if key.trim().is_empty() {
                        return None;
                    }
                    return Some((key, &text[i + 1..]));
                }
                _ => {}
            },
        }
        i += 1;
    }

    None
}

/// Split a trailing `# comment` from plain content
fn split_comment(text: &str) -> (&str, Option<&str>) {
    let bytes = text.as_bytes();
    for (i, &c) in bytes.iter().enumerate() {
        if c == b'#' && (i == 0 || bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
            return (text[..i].trim_end(), Some(&text[i..]));
        }
    }
    (text, None)
}

/// Byte offset just past the closing quote, if the literal is terminated
fn quoted_end(text: &str, quote: char) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        let c = bytes[i];
        if quote == '"' {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == b'"' {
                return Some(i + 1);
            }
        } else if c == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Byte offset just past the bracket closing the flow collection
fn flow_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i] as char;
                let end = quoted_end(&text[i..], quote)?;
                i += end;
                continue;
            }
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Whatever follows a closed quote or flow collection may only be a comment
fn trailing_comment(remainder: &str) -> std::result::Result<Option<String>, String> {
    let remainder = remainder.trim();
    if remainder.is_empty() {
        Ok(None)
    } else if remainder.starts_with('#') {
        Ok(Some(remainder.to_string()))
    } else {
        Err(format!("unexpected text after value: '{}'", remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(text: &str) -> Node {
        let stream = parse(text).unwrap();
        assert_eq!(stream.children.len(), 1, "expected a single document");
        stream.children.into_iter().next().unwrap()
    }

    #[test]
    fn test_nested_mapping() {
        let node = root("image:\n  repository: nginx\n  tag: \"1.0\"\nreplicas: 3\n");

        assert!(node.is_mapping());
        assert_eq!(node.get_path("image.repository").unwrap().value, "nginx");
        let tag = node.get_path("image.tag").unwrap();
        assert_eq!(tag.value, "1.0");
        assert_eq!(tag.tag, tags::STR);
        assert_eq!(tag.style, ScalarStyle::DoubleQuoted);
        assert_eq!(node.get("replicas").unwrap().tag, tags::INT);
    }

    #[test]
    fn test_sequences() {
        let node = root(
            "ports:\n  - 80\n  - 443\nhosts:\n- a.example.com\n- b.example.com\ncontainers:\n  - name: web\n    image: nginx\n  - name: sidecar\n",
        );

        assert_eq!(node.get("ports").unwrap().len(), 2);
        assert_eq!(node.get("hosts").unwrap().children[1].value, "b.example.com");
        let containers = node.get("containers").unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers.children[0].get("image").unwrap().value, "nginx");
        assert_eq!(containers.children[1].get("name").unwrap().value, "sidecar");
    }

    #[test]
    fn test_comments_attach() {
        let text = "# Default values\n# for the chart\n\n# number of pods\nreplicas: 1 # keep low\nimage: # the image\n  tag: latest\n# trailing\n";
        let node = root(text);

        assert_eq!(node.comments.head, "# Default values\n# for the chart");
        let (key, value) = node.entries().next().unwrap();
        assert_eq!(key.comments.head, "# number of pods");
        assert_eq!(value.comments.line, "# keep low");
        let (image_key, _) = node.entries().nth(1).unwrap();
        assert_eq!(image_key.comments.line, "# the image");
        assert_eq!(node.comments.foot, "# trailing");
    }

    #[test]
    fn test_multi_document_stream() {
        let stream = parse("a: 1\n---\n# head\n\nb: 2\n---\n{}\n").unwrap();

        assert_eq!(stream.children.len(), 3);
        assert_eq!(stream.children[1].comments.head, "# head");
        assert!(stream.children[2].is_mapping());
        assert!(stream.children[2].is_empty());
    }

    #[test]
    fn test_explicit_empty_document() {
        let stream = parse("a: 1\n---\n## notes only\n---\nb: 2\n").unwrap();

        assert_eq!(stream.children.len(), 3);
        assert!(stream.children[1].is_null());
        assert_eq!(stream.children[1].comments.head, "## notes only");
    }

    #[test]
    fn test_block_scalars() {
        let node = root("script: |\n  echo one\n  echo two\nfolded: >-\n  a\n  b\n\n  c\nnext: x\n");

        assert_eq!(node.get("script").unwrap().value, "echo one\necho two\n");
        assert_eq!(node.get("script").unwrap().style, ScalarStyle::Literal);
        assert_eq!(node.get("folded").unwrap().value, "a b\nc");
        assert_eq!(node.get("next").unwrap().value, "x");
    }

    #[test]
    fn test_flow_and_null_values() {
        let node = root("tolerations: []\nlabels: {app: web}\nempty:\nname: ~\n");

        assert!(node.get("tolerations").unwrap().is_sequence());
        assert_eq!(node.get("labels").unwrap().get("app").unwrap().value, "web");
        assert!(node.get("empty").unwrap().is_null());
        assert!(node.get("name").unwrap().is_null());
    }

    #[test]
    fn test_plain_scalars_with_special_chars() {
        let node = root("url: http://example.com:8080/path\nmsg: it's fine # note\nenv: ${DB_HOST}\n");

        assert_eq!(node.get("url").unwrap().value, "http://example.com:8080/path");
        assert_eq!(node.get("msg").unwrap().value, "it's fine");
        assert_eq!(node.get("msg").unwrap().comments.line, "# note");
        assert_eq!(node.get("env").unwrap().value, "${DB_HOST}");
    }

    #[test]
    fn test_empty_and_comment_only_streams() {
        assert!(parse("").unwrap().children.is_empty());

        let stream = parse("# nothing here\n").unwrap();
        assert!(stream.children.is_empty());
        assert_eq!(stream.comments.head, "# nothing here");
    }

    #[test]
    fn test_errors_name_path_and_line() {
        let err = parse_named("a: 1\n   b: 2\n", "values.yaml").unwrap_err();
        match err {
            CoreError::Parse { path, line, .. } => {
                assert_eq!(path, "values.yaml");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(parse("a: *missing\n").is_err());
        assert!(parse("a: 1\na: 2\n").is_err());
        assert!(parse("a: \"open\n").is_err());
    }

    #[test]
    fn test_anchored_mapping_is_copied_into_alias() {
        let node = root("base: &b\n  a: 1 # one\n  nested:\n    c: x\nother: *b\nlist:\n  - *b\n");

        let other = node.get("other").unwrap();
        assert!(other.is_mapping());
        assert_eq!(other.get("a").unwrap().value, "1");
        assert_eq!(other.get_path("nested.c").unwrap().value, "x");
        assert!(other.get("a").unwrap().comments.is_empty());
        assert_eq!(node.get("base").unwrap().get("a").unwrap().comments.line, "# one");
        assert_eq!(node.get("list").unwrap().children[0].get("a").unwrap().value, "1");
    }

    #[test]
    fn test_anchored_scalars() {
        let node = root(
            "port: &port 8080\nname: &name !!str web # label\nservice:\n  targetPort: *port # same\n  selector: *name\nitems:\n  - &first key: v\n  - *first\n",
        );

        assert_eq!(node.get("port").unwrap().value, "8080");
        let target = node.get_path("service.targetPort").unwrap();
        assert_eq!(target.value, "8080");
        assert_eq!(target.tag, tags::INT);
        assert_eq!(target.comments.line, "# same");
        let selector = node.get_path("service.selector").unwrap();
        assert_eq!(selector.value, "web");
        assert_eq!(selector.tag, tags::STR);

        let items = node.get("items").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.children[1].get("key").unwrap().value, "v");
    }

    #[test]
    fn test_alias_key_must_be_scalar() {
        let err = parse("m: &m\n  a: 1\n*m : 2\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTree { .. }));

        let node = root("k: &k name\n*k : value\n");
        assert_eq!(node.get("name").unwrap().value, "value");
    }

    #[test]
    fn test_nested_sequence_of_sequences() {
        let node = root("matrix:\n  - - 1\n    - 2\n  - - 3\n");
        let matrix = node.get("matrix").unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.children[0].len(), 2);
        assert_eq!(matrix.children[1].children[0].value, "3");
    }
}
