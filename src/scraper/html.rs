//! Tree-sitter HTML helpers
//!
//! The installer page is parsed with `tree-sitter-html`, which always
//! produces a tree (broken markup becomes `ERROR` nodes), so these helpers
//! walk whatever structure is there and never fail.
//!
//! The page-specific heuristics live here as plain functions so they can be
//! exercised against small fixtures:
//! - [`classify_channel`]: beta vs public from the nearest preceding text block
//! - [`locate_row`]: nearest enclosing `<tr>` of a link

use tree_sitter::{Node, Parser, Tree};
use tracing::warn;

use crate::release::Channel;
use crate::scraper::error::ExtractError;

/// Elements whose text decides the channel of the links that follow them
pub const CONTEXT_TAGS: [&str; 5] = ["h2", "h3", "h4", "p", "strong"];

/// Parse HTML into a tree-sitter tree
pub fn parse_html(source: &str) -> Result<Tree, ExtractError> {
    let mut parser = Parser::new();
    let language = tree_sitter_html::LANGUAGE;
    parser.set_language(&language.into()).map_err(|e| {
        warn!("Failed to set HTML language for tree-sitter: {}", e);
        ExtractError::TreeSitter(e.to_string())
    })?;

    parser.parse(source, None).ok_or_else(|| {
        warn!("Failed to parse HTML content");
        ExtractError::ParseFailed("Failed to parse HTML".to_string())
    })
}

/// Tag name of an element node (`<TD>` yields "TD"), None for other nodes
pub fn tag_name<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    if node.kind() != "element" {
        return None;
    }

    let mut cursor = node.walk();
    let tag = node
        .named_children(&mut cursor)
        .find(|child| matches!(child.kind(), "start_tag" | "self_closing_tag"))?;

    let mut cursor = tag.walk();
    let name = tag
        .named_children(&mut cursor)
        .find(|child| child.kind() == "tag_name")?;

    source.get(name.byte_range())
}

/// Whether `node` is an element with the given tag, case-insensitive
pub fn is_element(node: Node, source: &str, name: &str) -> bool {
    tag_name(node, source).is_some_and(|tag| tag.eq_ignore_ascii_case(name))
}

/// Value of an attribute on an element, with `&amp;` decoded
///
/// Returns `Some("")` for a present but empty attribute.
pub fn attribute_value(node: Node, source: &str, name: &str) -> Option<String> {
    let mut cursor = node.walk();
    let tag = node
        .named_children(&mut cursor)
        .find(|child| matches!(child.kind(), "start_tag" | "self_closing_tag"))?;

    let mut tag_cursor = tag.walk();
    for attribute in tag.named_children(&mut tag_cursor) {
        if attribute.kind() != "attribute" {
            continue;
        }

        let mut attr_cursor = attribute.walk();
        let mut matched = false;
        let mut value = None;

        for part in attribute.named_children(&mut attr_cursor) {
            match part.kind() {
                "attribute_name" => {
                    matched = source
                        .get(part.byte_range())
                        .is_some_and(|n| n.eq_ignore_ascii_case(name));
                }
                "attribute_value" => value = source.get(part.byte_range()),
                "quoted_attribute_value" => {
                    let mut quoted_cursor = part.walk();
                    value = part
                        .named_children(&mut quoted_cursor)
                        .find(|inner| inner.kind() == "attribute_value")
                        .and_then(|inner| source.get(inner.byte_range()))
                        .or(Some(""));
                }
                _ => {}
            }
        }

        if matched {
            return Some(value.unwrap_or("").replace("&amp;", "&"));
        }
    }

    None
}

/// All element nodes below `root` in document (pre-)order
pub fn elements_in_order<'t>(root: Node<'t>) -> Vec<Node<'t>> {
    let mut elements = Vec::new();
    collect_elements(root, &mut elements);
    elements
}

fn collect_elements<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if node.kind() == "element" {
        out.push(node);
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_elements(child, out);
    }
}

/// Visible text below `node`, with text fragments joined by single spaces
///
/// Script and style bodies, comments and attribute values are not text.
pub fn text_content(node: Node, source: &str) -> String {
    let mut pieces = Vec::new();
    collect_text(node, source, &mut pieces);
    pieces.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: Node, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "text" => {
            if let Some(text) = source.get(node.byte_range()) {
                out.push(text.to_string());
            }
        }
        "entity" => {
            if let Some(raw) = source.get(node.byte_range()) {
                out.push(decode_entity(raw));
            }
        }
        "script_element" | "style_element" | "comment" | "start_tag" | "end_tag"
        | "self_closing_tag" | "doctype" => {}
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_text(child, source, out);
            }
        }
    }
}

/// Decode a single character reference such as `&nbsp;` or `&#8212;`
fn decode_entity(raw: &str) -> String {
    let name = raw.trim_start_matches('&').trim_end_matches(';');

    let numeric = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    };

    if let Some(c) = numeric.and_then(char::from_u32) {
        return c.to_string();
    }

    match name {
        "nbsp" => " ",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        _ => raw,
    }
    .to_string()
}

/// Nearest `<tr>` ancestor of `node`
pub fn locate_row<'t>(node: Node<'t>, source: &str) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if is_element(ancestor, source, "tr") {
            return Some(ancestor);
        }
        current = ancestor.parent();
    }
    None
}

/// Number of `<td>` elements inside a row
pub fn count_cells(row: Node, source: &str) -> usize {
    elements_in_order(row)
        .into_iter()
        .filter(|element| is_element(*element, source, "td"))
        .count()
}

/// Decide the channel from the text of the blocks preceding a link,
/// nearest first.
///
/// Blank blocks are skipped; the first block with text decides: beta if it
/// mentions "BETA" in any letter case, public otherwise. No text at all
/// means public.
pub fn classify_channel<I, S>(preceding_blocks: I) -> Channel
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    preceding_blocks
        .into_iter()
        .find(|block| !block.as_ref().trim().is_empty())
        .map(|block| {
            if block.as_ref().to_uppercase().contains("BETA") {
                Channel::Beta
            } else {
                Channel::Public
            }
        })
        .unwrap_or(Channel::Public)
}
