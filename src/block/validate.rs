//! Commit rules per block kind

use itertools::Itertools;

use super::{Block, BlockKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} text must not be blank")]
    BlankText(BlockKind),
    #[error("link needs both display text and an address")]
    IncompleteLink,
    #[error("list needs at least one non-blank item")]
    EmptyList,
    #[error("table needs at least one non-blank header")]
    NoHeaders,
    #[error("table needs at least one row with a non-blank cell")]
    NoCells,
    #[error("table has more than one column named {0:?}")]
    DuplicateHeader(String),
    #[error("image has no resolved url")]
    UnresolvedImage,
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub fn validate(block: &Block) -> Result<(), ValidationError> {
    match block {
        Block::Heading { text } | Block::Subheading { text } | Block::Paragraph { text } => {
            if is_blank(text) {
                return Err(ValidationError::BlankText(block.kind()));
            }
        }
        Block::Link { text, href } => {
            if is_blank(text) || is_blank(href) {
                return Err(ValidationError::IncompleteLink);
            }
        }
        Block::List { items } => {
            if items.iter().all(|item| is_blank(item)) {
                return Err(ValidationError::EmptyList);
            }
        }
        Block::Table { headers, rows } => {
            if headers.iter().all(|header| is_blank(header)) {
                return Err(ValidationError::NoHeaders);
            }
            if let Some(duplicate) = headers.iter().duplicates().next() {
                return Err(ValidationError::DuplicateHeader(duplicate.clone()));
            }
            if !rows
                .iter()
                .any(|row| row.values().any(|cell| !is_blank(cell)))
            {
                return Err(ValidationError::NoCells);
            }
        }
        Block::Image { url, .. } => {
            if is_blank(url) {
                return Err(ValidationError::UnresolvedImage);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use indexmap::indexmap;

    use super::*;
    use crate::block::ImageMode;

    #[test]
    fn text_blocks_need_text() {
        assert_eq!(
            validate(&Block::Heading { text: "  ".into() }),
            Err(ValidationError::BlankText(BlockKind::Heading))
        );
        assert_eq!(
            validate(&Block::Paragraph {
                text: "body".into()
            }),
            Ok(())
        );
    }

    #[test]
    fn link_needs_both_fields() {
        assert_eq!(
            validate(&Block::Link {
                text: "docs".into(),
                href: " ".into(),
            }),
            Err(ValidationError::IncompleteLink)
        );
        assert_eq!(
            validate(&Block::Link {
                text: String::new(),
                href: String::new(),
            }),
            Err(ValidationError::IncompleteLink)
        );
    }

    #[test]
    fn list_needs_one_real_item() {
        assert_eq!(
            validate(&Block::List {
                items: vec!["".into(), "  ".into()]
            }),
            Err(ValidationError::EmptyList)
        );
        assert_eq!(
            validate(&Block::List {
                items: vec!["".into(), "a".into()]
            }),
            Ok(())
        );
    }

    #[test]
    fn table_rules() {
        let table = |headers: &[&str], cell: &str| Block::Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: vec![indexmap! { headers[0].to_string() => cell.to_string() }],
        };
        assert_eq!(validate(&table(&[" "], "x")), Err(ValidationError::NoHeaders));
        assert_eq!(validate(&table(&["A"], " ")), Err(ValidationError::NoCells));
        assert_eq!(
            validate(&table(&["A", "A"], "x")),
            Err(ValidationError::DuplicateHeader("A".into()))
        );
        assert_eq!(validate(&table(&["A", "B"], "x")), Ok(()));
    }

    #[test]
    fn image_needs_url() {
        assert_eq!(
            validate(&Block::Image {
                mode: ImageMode::Upload,
                url: String::new(),
                alt: "cat".into(),
            }),
            Err(ValidationError::UnresolvedImage)
        );
    }
}
