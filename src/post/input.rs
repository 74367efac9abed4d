//! Post authoring from a YAML file.
//!
//! Every block in the file is replayed through the [`BlockEditor`] operations
//! an admin would use, so the same validation and upload rules apply.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Authoring, PostMetadata};
use crate::{
    block::BlockKind,
    editor::{BlockEditor, CommitError, DraftField, EditorError},
    storage::{BlobStore, DocumentStore, LocalFile},
};

#[derive(Debug, Deserialize)]
pub struct PostInput {
    #[serde(flatten)]
    pub metadata: PostMetadata,
    /// Relative to the input file.
    #[serde(default)]
    pub cover: Option<PathBuf>,
    #[serde(default)]
    pub blocks: Vec<BlockInput>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum BlockInput {
    Heading {
        text: String,
    },
    Subheading {
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        items: Vec<String>,
    },
    Table {
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    Image {
        #[serde(default)]
        file: Option<PathBuf>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        alt: String,
    },
    Link {
        text: String,
        href: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum InputError<E> {
    #[error("failed to read {path:?}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("block {index}: {error}")]
    Edit { index: usize, error: EditorError },
    #[error("block {index}: {error}")]
    Commit {
        index: usize,
        error: CommitError<E>,
    },
    #[error("block {index}: image needs either file or url, not both")]
    AmbiguousImage { index: usize },
}

async fn open(base: &Path, path: &Path) -> Result<LocalFile, std::io::Error> {
    LocalFile::open(&base.join(path)).await
}

fn edit<E>(
    index: usize,
    f: impl FnOnce() -> Result<(), EditorError>,
) -> Result<(), InputError<E>> {
    f().map_err(|error| InputError::Edit { index, error })
}

async fn fill<E>(
    editor: &mut BlockEditor,
    index: usize,
    block: BlockInput,
    base: &Path,
) -> Result<(), InputError<E>> {
    match block {
        BlockInput::Heading { text } => {
            editor.select_type(BlockKind::Heading);
            edit(index, || editor.update_field(DraftField::Text, text))
        }
        BlockInput::Subheading { text } => {
            editor.select_type(BlockKind::Subheading);
            edit(index, || editor.update_field(DraftField::Text, text))
        }
        BlockInput::Paragraph { text } => {
            editor.select_type(BlockKind::Paragraph);
            edit(index, || editor.update_field(DraftField::Text, text))
        }
        BlockInput::Link { text, href } => {
            editor.select_type(BlockKind::Link);
            edit(index, || {
                editor.update_field(DraftField::Text, text)?;
                editor.update_field(DraftField::Href, href)
            })
        }
        BlockInput::List { items } => {
            editor.select_type(BlockKind::List);
            edit(index, || {
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        editor.add_item()?;
                    }
                    editor.update_item(i, item)?;
                }
                Ok(())
            })
        }
        BlockInput::Table { headers, rows } => {
            editor.select_type(BlockKind::Table);
            edit(index, || {
                editor.set_column_count(headers.len() as i64)?;
                editor.set_row_count(rows.len() as i64)?;
                let columns = editor.table_draft()?.column_count();
                if headers.len() > columns {
                    warn!(index, columns, "extra table columns ignored");
                }
                for (i, header) in headers.into_iter().take(columns).enumerate() {
                    editor.rename_header(i, header)?;
                }
                let keys = editor.table_draft()?.headers();
                let row_count = editor.table_draft()?.row_count();
                for (row, cells) in rows.into_iter().take(row_count).enumerate() {
                    for (key, cell) in keys.iter().zip(cells) {
                        editor.set_cell(row, key, cell)?;
                    }
                }
                Ok(())
            })
        }
        BlockInput::Image { file, url, alt } => {
            editor.select_type(BlockKind::Image);
            match (file, url) {
                (Some(_), Some(_)) => return Err(InputError::AmbiguousImage { index }),
                (Some(path), None) => {
                    let file = open(base, &path)
                        .await
                        .map_err(|error| InputError::<E>::Io { path, error })?;
                    edit::<E>(index, || editor.begin_upload(file))?;
                }
                (None, Some(url)) => edit::<E>(index, || editor.set_url_mode(url))?,
                (None, None) => {}
            }
            edit(index, || editor.set_alt(alt))
        }
    }
}

/// Load metadata, cover and blocks into `authoring`, committing each block.
///
/// Stops at the first block that fails to commit; blocks committed before it
/// stay in the editor.
pub async fn replay<D: DocumentStore, B: BlobStore>(
    input: PostInput,
    base: &Path,
    authoring: &mut Authoring<'_, D, B>,
) -> Result<(), InputError<B::Error>> {
    authoring.metadata = input.metadata;
    if let Some(path) = input.cover {
        let cover = open(base, &path)
            .await
            .map_err(|error| InputError::<B::Error>::Io { path, error })?;
        authoring.set_cover(Some(cover));
    }
    let blobs = authoring.blobs();
    for (index, block) in input.blocks.into_iter().enumerate() {
        let editor = authoring.editor_mut();
        fill::<B::Error>(editor, index, block, base).await?;
        let position = editor
            .commit(blobs)
            .await
            .map_err(|error| InputError::Commit { index, error })?;
        debug!(index, position, "block replayed");
    }
    Ok(())
}
