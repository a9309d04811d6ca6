// ABOUTME: HTML serialization over scraper trees with a skip set of removed subtrees.
// ABOUTME: Shared escaping and void-element rules for every serializer in the crate.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Node};

/// Escapes text content (`&`, `<`, `>`).
pub fn escape_text_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Escapes special characters in attribute values.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Checks if a tag is a void element (self-closing in HTML5).
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// True when `node` or one of its ancestors is in `skip`.
pub fn is_skipped(node: NodeRef<Node>, skip: &HashSet<NodeId>) -> bool {
    skip.contains(&node.id()) || node.ancestors().any(|a| skip.contains(&a.id()))
}

/// Serializes the children of `root`, omitting every subtree rooted in `skip`.
pub fn inner_html_skipping(root: ElementRef, skip: &HashSet<NodeId>) -> String {
    let mut output = String::new();
    for child in root.children() {
        serialize_node(child, skip, &mut output);
    }
    output
}

fn serialize_node(node: NodeRef<Node>, skip: &HashSet<NodeId>, output: &mut String) {
    if skip.contains(&node.id()) {
        return;
    }

    match node.value() {
        Node::Text(text) => escape_text_into(text, output),
        Node::Element(el) => {
            let tag_name = el.name();
            output.push('<');
            output.push_str(tag_name);
            for (name, value) in el.attrs() {
                output.push(' ');
                output.push_str(name);
                output.push_str("=\"");
                output.push_str(&escape_attr(value));
                output.push('"');
            }

            if is_void_element(tag_name) {
                output.push_str(" />");
                return;
            }
            output.push('>');
            for child in node.children() {
                serialize_node(child, skip, output);
            }
            output.push_str("</");
            output.push_str(tag_name);
            output.push('>');
        }
        _ => {}
    }
}
