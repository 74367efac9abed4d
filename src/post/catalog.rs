use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::{Category, PostDocument, PostMetadata, to_document};
use crate::{
    Error, ErrorContext, ErrorDetail,
    block::decode::{DecodeWarning, tracking},
    render::{Node, render},
    storage::{BlobStore, Document, DocumentStore, OrderBy, Outcome},
    timestamp,
};

#[derive(Serialize)]
struct MetadataPatch<'a> {
    title: &'a str,
    summary: &'a str,
    category: Category,
    trending: bool,
    #[serde(with = "timestamp")]
    date: DateTime<Utc>,
}

/// A stored post with whatever was dropped while decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEntry {
    pub id: String,
    pub post: PostDocument,
    pub warnings: Vec<DecodeWarning>,
}

fn decode_post(
    document: Document,
) -> (Result<PostDocument, serde_json::Error>, Vec<DecodeWarning>) {
    tracking(|| serde_json::from_value(Value::Object(document)))
}

/// Posts that have already been submitted.
pub struct PostCatalog<'s, D, B> {
    documents: &'s D,
    blobs: &'s B,
    collection: String,
}

impl<'s, D: DocumentStore, B: BlobStore> PostCatalog<'s, D, B> {
    pub fn new(documents: &'s D, blobs: &'s B, collection: impl Into<String>) -> Self {
        Self {
            documents,
            blobs,
            collection: collection.into(),
        }
    }

    /// Newest first, undated posts last. Documents that do not decode at all
    /// are left out.
    pub async fn list(&self) -> Result<Vec<PostEntry>, Error> {
        let context = ErrorContext::new("list posts");
        let documents = self
            .documents
            .read_all(&self.collection, Some(&OrderBy::desc("date")))
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        let mut entries = Vec::with_capacity(documents.len());
        for (id, document) in documents {
            match decode_post(document) {
                (Ok(post), warnings) => {
                    if !warnings.is_empty() {
                        debug!(%id, warnings = warnings.len(), "post decoded with warnings");
                    }
                    entries.push(PostEntry { id, post, warnings });
                }
                (Err(error), _) => warn!(%id, %error, "skipping undecodable post"),
            }
        }
        Ok(entries)
    }

    pub async fn get(&self, id: &str) -> Result<Option<PostDocument>, Error> {
        let context = ErrorContext::new("get post").with_target(id);
        let Some(document) = self
            .documents
            .get(&self.collection, id)
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?
        else {
            return Ok(None);
        };
        let (decoded, warnings) = decode_post(document);
        if !warnings.is_empty() {
            debug!(id, warnings = warnings.len(), "post decoded with warnings");
        }
        decoded
            .map(Some)
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))
    }

    /// Overwrite the metadata of a stored post. Content and cover stay as they are.
    pub async fn update(&self, id: &str, metadata: &PostMetadata) -> Result<(), Error> {
        let context = ErrorContext::new("update post").with_target(id);
        metadata.validate().map_err(|detail| context.error(detail))?;
        let patch = to_document(&MetadataPatch {
            title: &metadata.title,
            summary: &metadata.summary,
            category: metadata.category,
            trending: metadata.trending,
            date: metadata.publish_date(),
        })
        .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        match self
            .documents
            .update(&self.collection, id, patch)
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?
        {
            Outcome::Done => {
                info!(id, "post updated");
                Ok(())
            }
            Outcome::NotFound => Err(context.error(ErrorDetail::PersistenceFailed(
                "post does not exist".to_owned(),
            ))),
        }
    }

    /// Deleting a post that is already gone succeeds. The cover image is
    /// removed afterwards, best effort.
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let context = ErrorContext::new("delete post").with_target(id);
        let cover = match self.get(id).await {
            Ok(post) => post.and_then(|post| post.image.parse::<Url>().ok()),
            Err(error) => {
                debug!(%error, "reading post before delete failed");
                None
            }
        };
        let outcome = self
            .documents
            .delete(&self.collection, id)
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        if outcome == Outcome::NotFound {
            debug!(id, "post was already deleted");
            return Ok(());
        }
        if let Some(url) = cover {
            match self.blobs.delete(&url).await {
                Ok(Outcome::Done) => debug!(%url, "cover image deleted"),
                Ok(Outcome::NotFound) => debug!(%url, "cover image was already gone"),
                Err(error) => warn!(%error, %url, "failed to delete cover image"),
            }
        }
        Ok(())
    }

    /// Display tree of a stored post, `None` if it does not exist.
    pub async fn render(&self, id: &str) -> Result<Option<Vec<Node>>, Error> {
        Ok(self.get(id).await?.map(|post| render(&post.content)))
    }
}
