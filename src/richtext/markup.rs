// Markup Parser and Serializer
// Turns clipboard/initial markup into detached node fragments and writes
// nodes back out as markup. Parsing is best-effort and never fails.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use super::node_tree::{NodeId, NodeKind, NodeTree, Tag};
use super::style::StyleMap;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("valid attribute pattern")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid entity pattern")
});

/// Tags that never have children
const VOID_TAGS: &[&str] = &["br", "img", "hr", "meta", "link", "input", "wbr"];

/// Tags whose whole content is dropped
const DISCARDED_TAGS: &[&str] = &["script", "style", "head", "title", "template"];

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Start {
        name: String,
        attributes: &'a str,
        self_closing: bool,
    },
    End {
        name: String,
    },
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer { input, pos: 0 }
    }

    /// Byte index of the `>` closing a tag that starts at `from`, honouring quotes
    fn tag_end(&self, from: usize) -> Option<usize> {
        let mut quote: Option<char> = None;
        for (i, ch) in self.input[from..].char_indices() {
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(ch),
                (None, '>') => return Some(from + i),
                _ => {}
            }
        }
        None
    }

    fn skip_past(&mut self, marker: &str) {
        self.pos = match self.input[self.pos..].find(marker) {
            Some(i) => self.pos + i + marker.len(),
            None => self.input.len(),
        };
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return None;
            }

            if rest.starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
                continue;
            }

            let closing = rest.starts_with("</");
            let name_start = if closing { 2 } else { 1 };
            let is_tag = rest.starts_with('<')
                && rest[name_start..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic());

            if is_tag {
                let Some(end) = self.tag_end(self.pos) else {
                    // Unterminated tag: the rest is not markup
                    self.pos = self.input.len();
                    return None;
                };
                let body = &self.input[self.pos + name_start..end];
                self.pos = end + 1;

                let name_len = body
                    .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                    .unwrap_or(body.len());
                let name = body[..name_len].to_ascii_lowercase();
                if closing {
                    return Some(Token::End { name });
                }
                let attributes = body[name_len..].trim_end();
                let self_closing = attributes.ends_with('/');
                return Some(Token::Start {
                    name,
                    attributes: attributes.trim_end_matches('/'),
                    self_closing,
                });
            }

            // Text runs up to the next '<' that is not the one we are standing on
            let first = rest.chars().next().map_or(1, char::len_utf8);
            let text_end = rest[first..]
                .find('<')
                .map(|i| i + first)
                .unwrap_or(rest.len());
            self.pos += text_end;
            return Some(Token::Text(&rest[..text_end]));
        }
    }
}

fn style_attribute(attributes: &str) -> StyleMap {
    ATTRIBUTE
        .captures_iter(attributes)
        .find(|caps| caps[1].eq_ignore_ascii_case("style"))
        .and_then(|caps| caps.get(2).or(caps.get(3)).or(caps.get(4)))
        .map(|m| StyleMap::parse(&decode_entities(m.as_str())))
        .unwrap_or_default()
}

/// Decode the character references markup text commonly carries
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            match decoded {
                Some(ch) => ch.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Parse markup into a detached fragment whose root element has tag [`Tag::Root`]
pub fn parse_fragment(tree: &mut NodeTree, markup: &str) -> NodeId {
    let root = tree.create_element(Tag::Root);
    let mut node_stack: Vec<NodeId> = vec![root];
    let mut discarding: Option<String> = None;

    for token in Tokenizer::new(markup) {
        if let Some(open) = &discarding {
            if matches!(&token, Token::End { name } if name == open) {
                discarding = None;
            }
            continue;
        }

        let parent = node_stack.last().copied().unwrap_or(root);
        match token {
            Token::Text(raw) => {
                let text = decode_entities(raw);
                if !text.is_empty() {
                    let id = tree.create_text(text);
                    tree.append_child(parent, id);
                }
            }
            Token::Start {
                name,
                attributes,
                self_closing,
            } => {
                if DISCARDED_TAGS.contains(&name.as_str()) {
                    if !self_closing {
                        discarding = Some(name);
                    }
                    continue;
                }
                let id = tree.create_styled(Tag::from_name(&name), style_attribute(attributes));
                tree.append_child(parent, id);
                if !self_closing && !VOID_TAGS.contains(&name.as_str()) {
                    node_stack.push(id);
                }
            }
            Token::End { name } => {
                let open = node_stack
                    .iter()
                    .skip(1)
                    .rposition(|&id| tree.tag(id).is_some_and(|t| t.name() == name));
                match open {
                    Some(index) => node_stack.truncate(index + 1),
                    None => trace!(tag = %name, "ignoring unmatched end tag"),
                }
            }
        }
    }

    root
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn write_node(tree: &NodeTree, id: NodeId, out: &mut String) {
    match tree.kind(id) {
        NodeKind::Text(data) => escape_text(data, out),
        NodeKind::Element { tag: Tag::Root, .. } => write_children(tree, id, out),
        NodeKind::Element { tag, style } => {
            out.push('<');
            out.push_str(tag.name());
            if !style.is_empty() {
                out.push_str(" style=\"");
                out.push_str(&style.to_declarations().replace('"', "&quot;"));
                out.push('"');
            }
            out.push('>');
            if *tag == Tag::Break {
                return;
            }
            write_children(tree, id, out);
            out.push_str("</");
            out.push_str(tag.name());
            out.push('>');
        }
    }
}

fn write_children(tree: &NodeTree, id: NodeId, out: &mut String) {
    for &child in tree.children(id) {
        write_node(tree, child, out);
    }
}

/// Markup of the children of `id`
pub fn to_markup(tree: &NodeTree, id: NodeId) -> String {
    let mut out = String::new();
    write_children(tree, id, &mut out);
    out
}

/// Markup of `id` itself, including its own tag
pub fn outer_markup(tree: &NodeTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::style::StyleProperty;

    fn round_trip(markup: &str) -> String {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, markup);
        to_markup(&tree, root)
    }

    #[test]
    fn test_nested_blocks() {
        assert_eq!(
            round_trip("<div>111<div>222<div>333</div></div></div>"),
            "<div>111<div>222<div>333</div></div></div>"
        );
    }

    #[test]
    fn test_style_attribute_parsed() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(
            &mut tree,
            "<span style=\"font-family: Times,serif; font-weight: bold;\">aaa</span>",
        );
        let span = tree.children(root)[0];
        let style = tree.style(span).unwrap();
        assert_eq!(style.get(StyleProperty::FontWeight), Some("bold"));
        assert_eq!(style.get(StyleProperty::FontFamily), Some("Times,serif"));
    }

    #[test]
    fn test_single_quoted_style() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<span style='font-weight:bold'>x</span>");
        let span = tree.children(root)[0];
        assert_eq!(tree.style(span).unwrap().get(StyleProperty::FontWeight), Some("bold"));
    }

    #[test]
    fn test_malformed_markup_recovers() {
        assert_eq!(round_trip("a</span>b<div>c"), "ab<div>c</div>");
        assert_eq!(round_trip("1 < 2"), "1 &lt; 2");
        assert_eq!(round_trip("x<div"), "x");
    }

    #[test]
    fn test_comments_and_discarded_content() {
        assert_eq!(
            round_trip("<!DOCTYPE html><style>p{}</style><!--StartFragment-->hi<br>there"),
            "hi<br>there"
        );
    }

    #[test]
    fn test_entities_decoded() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "a&amp;b&#65;&#x42;&bogus;");
        assert_eq!(tree.text_content(root), "a&bAB&bogus;");
    }
}
