//! Block renderer
//!
//! Maps a block sequence to a display tree. Pure: no mutation, no I/O, and
//! malformed or legacy input renders as less output rather than an error.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::block::{Block, decode_sequence};

mod html;

pub use html::to_html;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Node {
    Element {
        tag: &'static str,
        attrs: IndexMap<&'static str, String>,
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
}

impl Node {
    fn element(tag: &'static str, children: Vec<Node>) -> Self {
        Self::Element {
            tag,
            attrs: IndexMap::new(),
            children,
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    fn with_text(tag: &'static str, text: &str) -> Self {
        Self::element(tag, vec![Self::text(text)])
    }
}

pub fn text_content(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Text { text } => out.push_str(text),
            Node::Element { children, .. } => text_content(out, children),
        }
    }
}

fn render_block(block: &Block) -> Option<Node> {
    Some(match block {
        Block::Heading { text } => Node::with_text("h2", text),
        Block::Subheading { text } => Node::with_text("h3", text),
        Block::Paragraph { text } => Node::with_text("p", text),
        Block::List { items } => Node::element(
            "ul",
            items
                .iter()
                .filter(|item| !item.trim().is_empty())
                .map(|item| Node::with_text("li", item))
                .collect(),
        ),
        Block::Table { headers, rows } => {
            let head = Node::element(
                "thead",
                vec![Node::element(
                    "tr",
                    headers
                        .iter()
                        .map(|header| Node::with_text("th", header))
                        .collect(),
                )],
            );
            let body = Node::element(
                "tbody",
                rows.iter()
                    .map(|row| {
                        Node::element(
                            "tr",
                            headers
                                .iter()
                                .map(|header| {
                                    Node::with_text(
                                        "td",
                                        row.get(header).map(String::as_str).unwrap_or(""),
                                    )
                                })
                                .collect(),
                        )
                    })
                    .collect(),
            );
            Node::element("table", vec![head, body])
        }
        Block::Image { url, alt, .. } => {
            if url.trim().is_empty() {
                return None;
            }
            Node::Element {
                tag: "img",
                attrs: IndexMap::from([("src", url.clone()), ("alt", alt.clone())]),
                children: Vec::new(),
            }
        }
        Block::Link { text, href } => Node::Element {
            tag: "a",
            attrs: IndexMap::from([
                ("href", href.clone()),
                ("target", "_blank".to_owned()),
                ("rel", "noopener noreferrer".to_owned()),
            ]),
            children: vec![Node::text(text)],
        },
    })
}

pub fn render(blocks: &[Block]) -> Vec<Node> {
    blocks.iter().filter_map(render_block).collect()
}

/// Render a stored `content` array. Entries that do not decode are skipped.
pub fn render_stored(content: &Value) -> Vec<Node> {
    render(&decode_sequence(content))
}

#[cfg(test)]
mod tests {
    use indexmap::indexmap;
    use serde_json::json;

    use super::*;
    use crate::block::ImageMode;

    #[test]
    fn list_hides_blank_items() {
        let nodes = render(&[Block::List {
            items: vec!["a".into(), " ".into(), "b".into()],
        }]);
        assert_eq!(to_html(&nodes), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn table_cells_join_by_header_name() {
        let nodes = render(&[Block::Table {
            headers: vec!["Name".into(), "Age".into()],
            rows: vec![
                indexmap! { "Name".into() => "Ann".into(), "Age".into() => "30".into() },
                indexmap! { "Old".into() => "lost".into(), "Age".into() => "41".into() },
            ],
        }]);
        assert_eq!(
            to_html(&nodes),
            "<table><thead><tr><th>Name</th><th>Age</th></tr></thead>\
             <tbody><tr><td>Ann</td><td>30</td></tr><tr><td></td><td>41</td></tr></tbody></table>"
        );
    }

    #[test]
    fn image_without_url_renders_nothing() {
        let image = |url: &str| Block::Image {
            mode: ImageMode::Url,
            url: url.into(),
            alt: "a \"cat\"".into(),
        };
        assert!(render(&[image("")]).is_empty());
        assert_eq!(
            to_html(&render(&[image("https://cdn/cat.png")])),
            r#"<img src="https://cdn/cat.png" alt="a &quot;cat&quot;"/>"#
        );
    }

    #[test]
    fn link_opens_in_new_tab() {
        let nodes = render(&[Block::Link {
            text: "Docs <here>".into(),
            href: "https://example.com/?a=1&b=2".into(),
        }]);
        assert_eq!(
            to_html(&nodes),
            r#"<a href="https://example.com/?a=1&amp;b=2" target="_blank" rel="noopener noreferrer">Docs &lt;here&gt;</a>"#
        );
    }

    #[test]
    fn stored_unknown_types_render_as_nothing() {
        let stored = json!([
            { "type": "Heading", "text": "Title" },
            { "type": "Video", "src": "x" },
            { "type": "Subheading", "text": "Sub" },
        ]);
        assert_eq!(to_html(&render_stored(&stored)), "<h2>Title</h2><h3>Sub</h3>");
    }

    #[test]
    fn rendering_is_idempotent() {
        let blocks = [
            Block::Paragraph {
                text: "one".into(),
            },
            Block::List {
                items: vec!["x".into(), "".into()],
            },
        ];
        assert_eq!(render(&blocks), render(&blocks));
        let mut text = String::new();
        text_content(&mut text, &render(&blocks));
        assert_eq!(text, "onex");
    }

    #[test]
    fn tree_serializes_tagged() {
        let nodes = render(&[Block::Heading { text: "Hi".into() }]);
        assert_eq!(
            serde_json::to_value(&nodes).unwrap(),
            json!([{
                "type": "element",
                "tag": "h2",
                "attrs": {},
                "children": [{ "type": "text", "text": "Hi" }],
            }])
        );
    }
}
