// ABOUTME: HTML sanitizer applied to all extracted article content.
// ABOUTME: Ammonia allow-list, deny-list subtree removal, empty pruning and whitespace-normalized output.

//! Content sanitization.
//!
//! `sanitize_html` is idempotent: the output depends only on the parsed tree,
//! and serializing that tree again yields the same tree.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{Html, Node};

use crate::dom::cleaners::{is_disallowed, STRIP_TAGS};
use crate::dom::serialize::{escape_attr, escape_text_into, is_void_element};

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "hr", "strong", "b", "em", "i", "u", "s", "sub", "sup", "small", "mark", "abbr",
    "cite", "q", "time", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd",
    "blockquote", "pre", "code", "img", "a", "span", "div", "section", "article", "figure",
    "table", "thead", "tbody", "tfoot", "tr", "td", "th", "caption",
];

/// Attributes kept on output, per tag.
const OUTPUT_ATTRS: &[(&str, &[&str])] = &[
    ("a", &["href", "title"]),
    ("img", &["src", "srcset", "alt", "title", "width", "height"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan"]),
    ("time", &["datetime"]),
    ("blockquote", &["cite"]),
    ("q", &["cite"]),
    ("ol", &["start"]),
];

fn output_attrs(tag: &str) -> &'static [&'static str] {
    OUTPUT_ATTRS
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, attrs)| *attrs)
        .unwrap_or(&[])
}

/// Elements whose opening or closing ends a line of text.
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd",
    "blockquote", "pre", "div", "section", "article", "figure", "table", "thead", "tbody",
    "tfoot", "tr", "td", "th", "caption",
];

/// Kept even when empty so table structure survives; they never make a parent non-empty.
const KEEP_EMPTY_TAGS: &[&str] = &["td", "th"];

static AMMONIA: Lazy<ammonia::Builder<'static>> = Lazy::new(|| {
    let clean_content: HashSet<&str> = STRIP_TAGS
        .iter()
        .copied()
        .filter(|t| !ALLOWED_TAGS.contains(t))
        .collect();

    let mut builder = ammonia::Builder::new();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(clean_content)
        .generic_attributes(["class", "id", "role"].into_iter().collect())
        .link_rel(None)
        .url_schemes(["http", "https", "mailto"].into_iter().collect())
        .strip_comments(true);
    for (tag, attrs) in OUTPUT_ATTRS {
        builder.add_tag_attributes(*tag, attrs.iter());
    }
    builder
});

fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Sanitizes an HTML fragment for republication.
pub fn sanitize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let cleaned = AMMONIA.clean(html).to_string();
    let fragment = Html::parse_fragment(&cleaned);
    let root = fragment.root_element();

    let mut skip = HashSet::new();
    for child in root.children() {
        mark_removed(child, &mut skip);
    }

    let mut writer = TextWriter::default();
    for child in root.children() {
        writer.node(child, &skip);
    }
    writer.finish()
}

/// Marks deny-listed and empty elements; returns whether `node` carries content.
fn mark_removed(node: NodeRef<Node>, skip: &mut HashSet<NodeId>) -> bool {
    match node.value() {
        Node::Text(text) => !text.trim().is_empty(),
        Node::Element(el) => {
            if is_disallowed(el) {
                skip.insert(node.id());
                return false;
            }
            let mut has_content = false;
            for child in node.children() {
                has_content |= mark_removed(child, skip);
            }
            match el.name() {
                "img" => {
                    let has_src = el.attr("src").is_some_and(|s| !s.trim().is_empty());
                    if !has_src {
                        skip.insert(node.id());
                    }
                    has_src
                }
                "hr" => true,
                "br" | "wbr" => false,
                _ if has_content => true,
                tag if KEEP_EMPTY_TAGS.contains(&tag) => false,
                _ => {
                    skip.insert(node.id());
                    false
                }
            }
        }
        _ => false,
    }
}

/// Serializer that collapses whitespace across node boundaries.
///
/// A pending space is flushed before the next character or inline opening tag,
/// and dropped at block boundaries. Removed subtrees count as whitespace.
struct TextWriter {
    out: String,
    pending_space: bool,
    suppress_space: bool,
    last_was_br: bool,
}

impl Default for TextWriter {
    fn default() -> Self {
        Self {
            out: String::new(),
            pending_space: false,
            suppress_space: true,
            last_was_br: false,
        }
    }
}

impl TextWriter {
    fn soft_space(&mut self) {
        if !self.suppress_space {
            self.pending_space = true;
        }
    }

    fn flush_space(&mut self) {
        if self.pending_space {
            self.out.push(' ');
            self.pending_space = false;
            self.suppress_space = true;
        }
    }

    fn block_boundary(&mut self) {
        self.pending_space = false;
        self.suppress_space = true;
    }

    fn text(&mut self, text: &str) {
        for word in text.split_inclusive(char::is_whitespace) {
            let trimmed = word.trim_end_matches(char::is_whitespace);
            if !trimmed.is_empty() {
                self.flush_space();
                escape_text_into(trimmed, &mut self.out);
                self.suppress_space = false;
                self.last_was_br = false;
            }
            if trimmed.len() < word.len() {
                self.soft_space();
            }
        }
    }

    fn open_tag(&mut self, tag: &str, attrs: scraper::node::Attrs<'_>) {
        self.out.push('<');
        self.out.push_str(tag);
        let allowed = output_attrs(tag);
        for (name, value) in attrs {
            if allowed.contains(&name) {
                self.out.push(' ');
                self.out.push_str(name);
                self.out.push_str("=\"");
                self.out.push_str(&escape_attr(value));
                self.out.push('"');
            }
        }
    }

    fn node(&mut self, node: NodeRef<Node>, skip: &HashSet<NodeId>) {
        if skip.contains(&node.id()) {
            self.soft_space();
            return;
        }
        let Node::Element(el) = node.value() else {
            if let Node::Text(text) = node.value() {
                self.text(text);
            }
            return;
        };

        let tag = el.name();
        if tag == "br" {
            if !self.last_was_br {
                self.out.push_str("<br />");
                self.last_was_br = true;
            }
            self.block_boundary();
            return;
        }
        self.last_was_br = false;

        let block = is_block(tag);
        if block {
            self.block_boundary();
        } else {
            self.flush_space();
        }
        self.open_tag(tag, el.attrs());

        if is_void_element(tag) {
            self.out.push_str(" />");
            if block {
                self.block_boundary();
            } else {
                self.suppress_space = false;
            }
            return;
        }

        self.out.push('>');
        for child in node.children() {
            self.node(child, skip);
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        if block {
            self.block_boundary();
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Block-aware plain text of an HTML fragment, entities decoded and whitespace collapsed.
pub fn to_plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    collect_text(*fragment.root_element(), &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: NodeRef<Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => {
                let tag = el.name();
                if matches!(tag, "script" | "style" | "noscript" | "template") {
                    continue;
                }
                if is_block(tag) {
                    out.push(' ');
                }
                collect_text(child, out);
                if is_block(tag) {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Truncates plain text to at most `max_chars` characters plus a trailing `…`.
///
/// Cuts at the last whitespace inside the budget when there is one, never inside
/// an `&name;` entity, and trims trailing spaces and punctuation before the ellipsis.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let mut head = &text[..cut];

    let next_is_boundary = text[cut..].starts_with(char::is_whitespace);
    if !next_is_boundary {
        if let Some(ws) = head.rfind(char::is_whitespace) {
            if ws > 0 {
                head = &head[..ws];
            }
        }
    }

    if let Some(amp) = head.rfind('&') {
        let tail = &head[amp + 1..];
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '#') {
            head = &head[..amp];
        }
    }

    let head = head.trim_end_matches(|c: char| c.is_whitespace() || ",;:.-–—".contains(c));
    format!("{head}…")
}

/// Plain-text summary of an HTML fragment.
pub fn summarize(html: &str, max_chars: usize) -> String {
    truncate_text(&to_plain_text(html), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn removes_scripts_and_keeps_text() {
        assert_eq!(
            sanitize_html("<p>Hello <script>alert(1)</script>world</p>"),
            "<p>Hello world</p>"
        );
    }

    #[test]
    fn removes_denylisted_blocks_and_roles() {
        let html = r#"<div class="share-buttons">Share</div><p>Body</p><div role="complementary">Aside</div><div class="related-news"><a href="/x">Other</a></div>"#;
        assert_eq!(sanitize_html(html), "<p>Body</p>");
    }

    #[test]
    fn removes_empty_elements_bottom_up() {
        assert_eq!(
            sanitize_html("<div><p> </p><span>&nbsp;</span></div><p>Text</p>"),
            "<p>Text</p>"
        );
        assert_eq!(sanitize_html("<p><br></p><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn keeps_images_and_filters_attributes() {
        assert_eq!(
            sanitize_html(r#"<p class="lead" style="color:red"><img src="https://e.com/a.jpg" onerror="x()" alt="A"></p>"#),
            r#"<p><img src="https://e.com/a.jpg" alt="A" /></p>"#
        );
        assert_eq!(
            sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#),
            "<a>x</a>"
        );
    }

    #[test]
    fn collapses_whitespace_and_breaks() {
        assert_eq!(
            sanitize_html("<p>  a \n\t b <b> c </b> d</p>\n\n<p>e<br><br><br>f</p>"),
            "<p>a b <b>c</b> d</p><p>e<br />f</p>"
        );
    }

    #[test]
    fn decodes_entities_and_escapes_minimally() {
        assert_eq!(
            sanitize_html("<p>&quot;Tom &amp; Jerry&quot; &lt;3 &eacute;</p>"),
            "<p>\"Tom &amp; Jerry\" &lt;3 é</p>"
        );
    }

    #[test]
    fn keeps_table_cells() {
        let out = sanitize_html("<table><tr><td>1</td><td></td></tr><tr><td></td></tr></table>");
        assert_eq!(out, "<table><tbody><tr><td>1</td><td></td></tr></tbody></table>");
    }

    #[test]
    fn sanitize_is_idempotent_on_corpus() {
        let corpus = [
            "<p>Hello <script>alert(1)</script>world</p>",
            "<div> <p>a</p> <p> b </p> </div> tail ",
            "<p><b>a </b>c</p><p><a href=\"/x\">x</a><a href=\"/y\"> y</a></p>",
            "<ul><li>one</li><li class=\"ad\">two</li><li></li></ul>",
            "<p>x<div>nested block</div>y</p>",
            "a<span class=\"social\">s</span>b<img src=\"/a.png\">",
            "<pre>\n  code\n  here</pre>",
            "<table><td>loose</td></table><font>old</font>",
            "<p>e<br>  <br>f<br></p><br>",
            "&lt;script&gt;alert(1)&lt;/script&gt;",
        ];
        for html in corpus {
            let once = sanitize_html(html);
            assert_eq!(sanitize_html(&once), once, "input: {html}");
        }
    }

    #[test]
    fn plain_text_and_summary() {
        assert_eq!(
            to_plain_text("<h2>Title</h2><p>First&nbsp;line.</p><p>Second <b>bold</b></p><script>x</script>"),
            "Title First line. Second bold"
        );
        assert_eq!(summarize("<p>one two three four</p>", 9), "one two…");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("çağrı ışık", 20), "çağrı ışık");
        assert_eq!(truncate_text("çağrı ışık öğün", 12), "çağrı ışık…");
        assert_eq!(truncate_text("şşşşşşşşşş", 4), "şşşş…");
    }

    #[test]
    fn truncate_never_splits_entity() {
        assert_eq!(truncate_text("AT&amp;T rocks", 5), "AT…");
        assert_eq!(truncate_text("one, two, three", 9), "one, two…");
    }

    #[test]
    fn truncate_keeps_literal_ampersand() {
        assert_eq!(truncate_text("R&D budget grows", 2), "R&…");
        assert_eq!(truncate_text("Q & A session", 3), "Q &…");
    }

    fn fragment_strategy() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![
            "[a-zA-Z &<>;]{0,12}".prop_map(|s| s),
            Just("<br>".to_string()),
            Just("<img src=\"https://e.com/i.png\">".to_string()),
            Just("&amp;".to_string()),
            Just("&nbsp;".to_string()),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            (
                prop::sample::select(vec![
                    "p", "div", "span", "b", "a", "ul", "li", "script", "nav", "section", "font",
                    "table", "td", "pre",
                ]),
                prop::sample::select(vec!["", " class=\"ad\"", " class=\"body\"", " role=\"banner\""]),
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(tag, attr, children)| {
                    format!("<{tag}{attr}>{}</{tag}>", children.concat())
                })
        })
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(html in fragment_strategy()) {
            let once = sanitize_html(&html);
            prop_assert_eq!(sanitize_html(&once), once);
        }
    }
}
