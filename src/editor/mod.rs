//! Block editor
//!
//! Holds the committed blocks of one post and the draft of the block being
//! written. Every edit is synchronous; only [`BlockEditor::commit`] awaits,
//! and it borrows the editor mutably until the upload and append are done.

use std::{fmt, str::FromStr};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    block::{self, Block, BlockKind, ContentSequence, ImageMode, ValidationError},
    storage::{BlobStore, LocalFile, path_hint},
};

mod image;
mod list;
mod table;

pub use image::{ImageDraft, ImageSource};
pub use list::ListDraft;
pub use table::{ColumnId, MAX_DIMENSION, MIN_DIMENSION, TableDraft};

pub const BLOCK_IMAGE_PREFIX: &str = "blog-block-images";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("no block type selected")]
    NoDraft,
    #[error("current draft is a {found} block, not {expected}")]
    WrongDraft { expected: BlockKind, found: BlockKind },
    #[error("{kind} blocks have no {field} field")]
    FieldNotApplicable { kind: BlockKind, field: DraftField },
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("a list needs at least one item")]
    LastListItem,
    #[error("no column named {0:?}")]
    UnknownHeader(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError<E> {
    #[error("no block type selected")]
    NoDraft,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("image upload failed: {0}")]
    Upload(E),
}

/// Scalar fields addressable through [`BlockEditor::update_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Text,
    Href,
    Alt,
    Url,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Href => "href",
            Self::Alt => "alt",
            Self::Url => "url",
        })
    }
}

impl FromStr for DraftField {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "href" => Ok(Self::Href),
            "alt" => Ok(Self::Alt),
            "url" => Ok(Self::Url),
            other => Err(EditorError::UnknownField(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    Heading { text: String },
    Subheading { text: String },
    Paragraph { text: String },
    List(ListDraft),
    Table(TableDraft),
    Image(ImageDraft),
    Link { text: String, href: String },
}

impl Draft {
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Heading => Self::Heading {
                text: String::new(),
            },
            BlockKind::Subheading => Self::Subheading {
                text: String::new(),
            },
            BlockKind::Paragraph => Self::Paragraph {
                text: String::new(),
            },
            BlockKind::List => Self::List(ListDraft::default()),
            BlockKind::Table => Self::Table(TableDraft::default()),
            BlockKind::Image => Self::Image(ImageDraft::default()),
            BlockKind::Link => Self::Link {
                text: String::new(),
                href: String::new(),
            },
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Heading { .. } => BlockKind::Heading,
            Self::Subheading { .. } => BlockKind::Subheading,
            Self::Paragraph { .. } => BlockKind::Paragraph,
            Self::List(_) => BlockKind::List,
            Self::Table(_) => BlockKind::Table,
            Self::Image(_) => BlockKind::Image,
            Self::Link { .. } => BlockKind::Link,
        }
    }
}

#[derive(Debug, Default)]
pub struct BlockEditor {
    content: ContentSequence,
    draft: Option<Draft>,
}

macro_rules! draft_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<&mut $ty, EditorError> {
            match self.draft.as_mut() {
                Some(Draft::$variant(draft)) => Ok(draft),
                Some(other) => Err(EditorError::WrongDraft {
                    expected: BlockKind::$variant,
                    found: other.kind(),
                }),
                None => Err(EditorError::NoDraft),
            }
        }
    };
}

impl BlockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &[Block] {
        &self.content
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Drops the committed blocks and any draft.
    pub fn reset(&mut self) {
        self.content.clear();
        self.draft = None;
    }

    /// Replaces any unsaved draft with the empty shape of `kind`.
    pub fn select_type(&mut self, kind: BlockKind) {
        self.draft = Some(Draft::empty(kind));
    }

    pub fn update_field(&mut self, field: DraftField, value: impl Into<String>) -> Result<(), EditorError> {
        let draft = self.draft.as_mut().ok_or(EditorError::NoDraft)?;
        let value = value.into();
        match (draft, field) {
            (
                Draft::Heading { text }
                | Draft::Subheading { text }
                | Draft::Paragraph { text }
                | Draft::Link { text, .. },
                DraftField::Text,
            ) => *text = value,
            (Draft::Link { href, .. }, DraftField::Href) => *href = value,
            (Draft::Image(image), DraftField::Alt) => image.alt = value,
            (Draft::Image(image), DraftField::Url) => image.set_url_mode(value),
            (draft, field) => {
                return Err(EditorError::FieldNotApplicable {
                    kind: draft.kind(),
                    field,
                });
            }
        }
        Ok(())
    }

    draft_accessor!(list_draft, List, ListDraft);
    draft_accessor!(table_draft, Table, TableDraft);
    draft_accessor!(image_draft, Image, ImageDraft);

    pub fn add_item(&mut self) -> Result<(), EditorError> {
        self.list_draft()?.add_item();
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> Result<(), EditorError> {
        self.list_draft()?.remove_item(index).map(drop)
    }

    pub fn update_item(&mut self, index: usize, value: impl Into<String>) -> Result<(), EditorError> {
        self.list_draft()?.update_item(index, value)
    }

    pub fn set_column_count(&mut self, n: i64) -> Result<(), EditorError> {
        self.table_draft()?.set_column_count(n);
        Ok(())
    }

    pub fn set_row_count(&mut self, n: i64) -> Result<(), EditorError> {
        self.table_draft()?.set_row_count(n);
        Ok(())
    }

    pub fn rename_header(&mut self, index: usize, name: impl Into<String>) -> Result<(), EditorError> {
        self.table_draft()?.rename_header(index, name)
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        header: &str,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.table_draft()?.set_cell(row, header, value)
    }

    pub fn begin_upload(&mut self, file: LocalFile) -> Result<(), EditorError> {
        self.image_draft()?.begin_upload(file);
        Ok(())
    }

    pub fn set_url_mode(&mut self, url: impl Into<String>) -> Result<(), EditorError> {
        self.image_draft()?.set_url_mode(url);
        Ok(())
    }

    pub fn set_image_mode(&mut self, mode: ImageMode) -> Result<(), EditorError> {
        self.image_draft()?.set_mode(mode);
        Ok(())
    }

    pub fn set_alt(&mut self, alt: impl Into<String>) -> Result<(), EditorError> {
        self.image_draft()?.alt = alt.into();
        Ok(())
    }

    /// Validate the draft, upload a pending image, then append.
    ///
    /// Returns the position of the appended block. On error nothing is
    /// appended and the draft is left as it was.
    pub async fn commit<B: BlobStore>(&mut self, blobs: &B) -> Result<usize, CommitError<B::Error>> {
        let draft = self.draft.as_ref().ok_or(CommitError::NoDraft)?;
        let block = match draft {
            Draft::Heading { text } => Block::Heading { text: text.clone() },
            Draft::Subheading { text } => Block::Subheading { text: text.clone() },
            Draft::Paragraph { text } => Block::Paragraph { text: text.clone() },
            Draft::Link { text, href } => Block::Link {
                text: text.clone(),
                href: href.clone(),
            },
            Draft::List(list) => list.to_block(),
            Draft::Table(table) => table.to_block(),
            Draft::Image(ImageDraft {
                source: ImageSource::Url(url),
                alt,
            }) => Block::Image {
                mode: ImageMode::Url,
                url: url.clone(),
                alt: alt.clone(),
            },
            Draft::Image(ImageDraft {
                source: ImageSource::Upload { file: None, .. },
                ..
            }) => return Err(ValidationError::UnresolvedImage.into()),
            Draft::Image(ImageDraft {
                source: ImageSource::Upload {
                    file: Some(file), ..
                },
                alt,
            }) => {
                let path = path_hint(BLOCK_IMAGE_PREFIX, &file.name, Utc::now());
                let url = blobs
                    .upload(&path, &file.content_type, file.body.clone())
                    .await
                    .inspect_err(|error| warn!(%error, %path, "failed to upload block image"))
                    .map_err(CommitError::Upload)?;
                // `url` is the uploaded blob; `mode` still records how the image was added
                Block::Image {
                    mode: ImageMode::Upload,
                    url: url.to_string(),
                    alt: alt.clone(),
                }
            }
        };
        block::validate(&block)
            .inspect_err(|error| debug!(%error, kind = %block.kind(), "draft rejected"))?;
        let index = self.content.len();
        debug!(index, kind = %block.kind(), "block committed");
        self.content.push(block);
        self.draft = None;
        Ok(index)
    }

    pub fn remove(&mut self, index: usize) -> Result<Block, EditorError> {
        let len = self.content.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        Ok(self.content.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use indexmap::indexmap;

    use super::*;
    use crate::storage::memory;

    #[tokio::test]
    async fn heading_commit_resets_draft() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Heading);
        editor.update_field(DraftField::Text, "Intro").unwrap();
        assert_eq!(editor.commit(&blobs).await.unwrap(), 0);
        assert_eq!(
            editor.content(),
            [Block::Heading {
                text: "Intro".into()
            }]
        );
        assert_eq!(editor.draft(), None);
    }

    #[tokio::test]
    async fn table_rename_scenario() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Table);
        editor.set_column_count(2).unwrap();
        let table = editor.table_draft().unwrap();
        assert_eq!(table.headers(), ["Col1", "Col2"]);
        editor.set_cell(0, "Col1", "x").unwrap();
        editor.rename_header(0, "Name").unwrap();
        editor.commit(&blobs).await.unwrap();
        assert_eq!(
            editor.content(),
            [Block::Table {
                headers: vec!["Name".into(), "Col2".into()],
                rows: vec![indexmap! { "Name".into() => "x".into(), "Col2".into() => "".into() }],
            }]
        );
    }

    #[tokio::test]
    async fn url_image_skips_upload() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Image);
        editor
            .begin_upload(LocalFile::new("y.png", b"png".to_vec()))
            .unwrap();
        editor.set_image_mode(ImageMode::Url).unwrap();
        let Some(Draft::Image(image)) = editor.draft() else {
            panic!("expected an image draft, got {:?}", editor.draft());
        };
        assert!(image.pending_file().is_none());
        assert_eq!(image.preview(), Some(""));
        editor.set_url_mode("http://x/y.png").unwrap();
        editor.commit(&blobs).await.unwrap();
        assert_eq!(
            editor.content(),
            [Block::Image {
                mode: ImageMode::Url,
                url: "http://x/y.png".into(),
                alt: String::new(),
            }]
        );
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn uploaded_image_carries_blob_url() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Image);
        editor.update_field(DraftField::Alt, "chart").unwrap();
        editor
            .begin_upload(LocalFile::new("chart.png", b"png".to_vec()))
            .unwrap();
        editor.commit(&blobs).await.unwrap();
        let Block::Image { mode, url, alt } = &editor.content()[0] else {
            panic!("expected image, got {:?}", editor.content());
        };
        assert_eq!(*mode, ImageMode::Upload);
        assert_eq!(alt, "chart");
        assert!(url.starts_with("https://blobs.invalid/blog-block-images/"));
        assert!(url.ends_with("_chart.png"));
        let stored = blobs.fetch(&url.parse().unwrap()).await.unwrap();
        assert_eq!(stored, (Bytes::from_static(b"png"), "image/png".to_owned()));
    }

    #[tokio::test]
    async fn failed_upload_preserves_draft() {
        let blobs = memory::BlobClient::default();
        blobs.set_unavailable(true);
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Image);
        editor
            .begin_upload(LocalFile::new("chart.png", b"png".to_vec()))
            .unwrap();
        let before = editor.draft().cloned();
        assert!(matches!(
            editor.commit(&blobs).await,
            Err(CommitError::Upload(memory::Error::Unavailable))
        ));
        assert!(editor.content().is_empty());
        assert_eq!(editor.draft().cloned(), before);
    }

    #[tokio::test]
    async fn untouched_link_is_rejected() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Link);
        assert!(matches!(
            editor.commit(&blobs).await,
            Err(CommitError::Validation(ValidationError::IncompleteLink))
        ));
        assert!(editor.content().is_empty());
        assert!(matches!(editor.draft(), Some(Draft::Link { .. })));
    }

    #[tokio::test]
    async fn list_commit_keeps_blank_items() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::List);
        assert!(matches!(
            editor.commit(&blobs).await,
            Err(CommitError::Validation(ValidationError::EmptyList))
        ));
        editor.add_item().unwrap();
        editor.update_item(1, "second").unwrap();
        editor.commit(&blobs).await.unwrap();
        assert_eq!(
            editor.content(),
            [Block::List {
                items: vec!["".into(), "second".into()]
            }]
        );
    }

    #[test]
    fn field_edits_check_the_draft_kind() {
        let mut editor = BlockEditor::new();
        assert_eq!(
            editor.update_field(DraftField::Text, "x"),
            Err(EditorError::NoDraft)
        );
        editor.select_type(BlockKind::Paragraph);
        assert_eq!(
            editor.update_field(DraftField::Href, "x"),
            Err(EditorError::FieldNotApplicable {
                kind: BlockKind::Paragraph,
                field: DraftField::Href,
            })
        );
        assert_eq!(
            editor.add_item(),
            Err(EditorError::WrongDraft {
                expected: BlockKind::List,
                found: BlockKind::Paragraph,
            })
        );
        assert_eq!(
            "caption".parse::<DraftField>(),
            Err(EditorError::UnknownField("caption".into()))
        );
    }

    #[test]
    fn selecting_discards_the_draft() {
        let mut editor = BlockEditor::new();
        editor.select_type(BlockKind::Heading);
        editor.update_field(DraftField::Text, "unsaved").unwrap();
        editor.select_type(BlockKind::Heading);
        assert_eq!(
            editor.draft(),
            Some(&Draft::Heading {
                text: String::new()
            })
        );
    }

    #[tokio::test]
    async fn remove_by_position() {
        let blobs = memory::BlobClient::default();
        let mut editor = BlockEditor::new();
        for text in ["a", "b", "c"] {
            editor.select_type(BlockKind::Paragraph);
            editor.update_field(DraftField::Text, text).unwrap();
            editor.commit(&blobs).await.unwrap();
        }
        assert_eq!(
            editor.remove(1).unwrap(),
            Block::Paragraph { text: "b".into() }
        );
        assert_eq!(editor.content().len(), 2);
        assert_eq!(
            editor.remove(2),
            Err(EditorError::IndexOutOfRange { index: 2, len: 2 })
        );
    }
}
