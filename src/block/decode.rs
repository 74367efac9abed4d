//! Lenient decoding of stored blocks
//!
//! Posts written by older dashboard builds carry blank list items, missing
//! fields, numeric table cells and block types that no longer exist. None of
//! that may prevent the rest of a post from rendering.

use std::cell::RefCell;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::{Block, BlockKind, ContentSequence, ImageMode};

/// Something that was dropped or replaced while decoding a stored document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeWarning {
    #[error("content is not an array")]
    ContentNotArray,
    #[error("block {index} has unknown type {tag:?}")]
    UnknownBlock { index: usize, tag: String },
    #[error("block {index} ({kind}) is malformed: {reason}")]
    MalformedBlock {
        index: usize,
        kind: BlockKind,
        reason: String,
    },
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("unreadable date {0}")]
    UnreadableDate(String),
}

tokio::task_local! {
    static DROPPED: RefCell<Vec<DecodeWarning>>;
}

/// Attach `warning` to the document being decoded inside [`tracking`].
/// Elsewhere it only reaches the debug log.
pub(crate) fn note(warning: DecodeWarning) {
    debug!(%warning, "lenient decode");
    let _ = DROPPED.try_with(|dropped| dropped.borrow_mut().push(warning));
}

/// Run a decode and return its result together with everything it noted.
pub fn tracking<T>(decode: impl FnOnce() -> T) -> (T, Vec<DecodeWarning>) {
    DROPPED.sync_scope(RefCell::new(Vec::new()), || {
        let decoded = decode();
        (decoded, DROPPED.with(RefCell::take))
    })
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .map(scalar_to_string)
        .unwrap_or_default())
}

pub(crate) fn strings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(values)) => values.into_iter().map(scalar_to_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![scalar_to_string(other)],
    })
}

pub(crate) fn rows<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<IndexMap<String, String>>, D::Error> {
    let Some(Value::Array(rows)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(rows
        .into_iter()
        .map(|row| match row {
            Value::Object(cells) => cells
                .into_iter()
                .map(|(header, cell)| (header, scalar_to_string(cell)))
                .collect(),
            _ => IndexMap::new(),
        })
        .collect())
}

pub(crate) fn image_mode<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ImageMode, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(mode)) if mode.eq_ignore_ascii_case("url") => ImageMode::Url,
        _ => ImageMode::Upload,
    })
}

/// Decode a stored `content` array, skipping entries that are not blocks.
///
/// Skipped entries are reported as [`DecodeWarning`]s.
pub fn decode_sequence(value: &Value) -> ContentSequence {
    let Value::Array(entries) = value else {
        if !value.is_null() {
            note(DecodeWarning::ContentNotArray);
        }
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match Block::deserialize(entry) {
            Ok(block) => Some(block),
            Err(error) => {
                let tag = entry.get("type").and_then(Value::as_str).unwrap_or("");
                note(match tag.parse::<BlockKind>() {
                    Ok(kind) => DecodeWarning::MalformedBlock {
                        index,
                        kind,
                        reason: error.to_string(),
                    },
                    Err(_) => DecodeWarning::UnknownBlock {
                        index,
                        tag: tag.to_owned(),
                    },
                });
                None
            }
        })
        .collect()
}

pub(crate) fn sequence<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ContentSequence, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
    Ok(decode_sequence(&value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn skips_unknown_and_keeps_the_rest() {
        let stored = json!([
            { "type": "Heading", "text": "Intro" },
            { "type": "Quote", "text": "gone" },
            "not a block",
            { "type": "Paragraph" },
        ]);
        let (blocks, warnings) = tracking(|| decode_sequence(&stored));
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    text: "Intro".into()
                },
                Block::Paragraph {
                    text: String::new()
                },
            ]
        );
        assert_eq!(
            warnings,
            [
                DecodeWarning::UnknownBlock {
                    index: 1,
                    tag: "Quote".into()
                },
                DecodeWarning::UnknownBlock {
                    index: 2,
                    tag: String::new()
                },
            ]
        );
        assert_eq!(warnings[0].to_string(), r#"block 1 has unknown type "Quote""#);
    }

    #[test]
    fn notes_outside_tracking_are_dropped() {
        assert!(decode_sequence(&json!([{ "type": "Quote" }])).is_empty());
        let (_, warnings) = tracking(|| decode_sequence(&json!("text")));
        assert_eq!(warnings, [DecodeWarning::ContentNotArray]);
    }

    #[test]
    fn tolerates_legacy_shapes() {
        let stored = json!([
            { "type": "List", "items": ["a", null, "", 3] },
            { "type": "Table", "headers": ["n"], "rows": [{ "n": 1 }, "junk"] },
            {
                "type": "Image",
                "mode": "url",
                "url": "https://cdn/x.png",
                "file": null,
                "preview": "",
                "uploading": false
            },
        ]);
        let blocks = decode_sequence(&stored);
        assert_eq!(
            blocks[0],
            Block::List {
                items: vec!["a".into(), "".into(), "".into(), "3".into()]
            }
        );
        let Block::Table { headers, rows } = &blocks[1] else {
            panic!("expected table, got {:?}", blocks[1]);
        };
        assert_eq!(headers, &["n"]);
        assert_eq!(rows[0]["n"], "1");
        assert!(rows[1].is_empty());
        assert_eq!(
            blocks[2],
            Block::Image {
                mode: ImageMode::Url,
                url: "https://cdn/x.png".into(),
                alt: String::new(),
            }
        );
    }

    #[test]
    fn non_array_content_is_empty() {
        assert!(decode_sequence(&Value::Null).is_empty());
        assert!(decode_sequence(&json!({ "type": "Heading" })).is_empty());
    }
}
