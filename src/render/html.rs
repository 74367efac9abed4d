use std::fmt::Write as _;

use super::Node;

const VOID_ELEMENTS: &[&str] = &["img", "br", "hr"];

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text { text } => {
            html_escape::encode_text_to_string(text, out);
        }
        Node::Element {
            tag,
            attrs,
            children,
        } => {
            let _ = write!(out, "<{tag}");
            for (name, value) in attrs {
                let _ = write!(out, " {name}=\"");
                html_escape::encode_double_quoted_attribute_to_string(value, out);
                out.push('"');
            }
            if VOID_ELEMENTS.contains(tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(out, child);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

/// Serialize a display tree to an HTML fragment.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}
