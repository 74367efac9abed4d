//! Promotional banners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    Error, ErrorContext, ErrorDetail,
    block::decode,
    post::to_document,
    storage::{BlobStore, DocumentStore, LocalFile, OrderBy, Outcome, path_hint},
    timestamp,
};

pub const BANNER_PREFIX: &str = "promotions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    #[serde(default, deserialize_with = "decode::string")]
    pub name: String,
    #[serde(default, deserialize_with = "decode::string")]
    pub url: String,
    /// Banner url in the blob store.
    #[serde(default, deserialize_with = "decode::string")]
    pub image: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct PromotionDraft {
    pub name: String,
    pub url: String,
    pub banner: Option<LocalFile>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromotionPatch<'a> {
    name: &'a str,
    url: &'a str,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
}

fn persistence(context: &ErrorContext, error: impl ToString) -> Error {
    context.error(ErrorDetail::PersistenceFailed(error.to_string()))
}

pub struct Promotions<'s, D, B> {
    documents: &'s D,
    blobs: &'s B,
    collection: String,
}

impl<'s, D: DocumentStore, B: BlobStore> Promotions<'s, D, B> {
    pub fn new(documents: &'s D, blobs: &'s B, collection: impl Into<String>) -> Self {
        Self {
            documents,
            blobs,
            collection: collection.into(),
        }
    }

    /// Uploads the banner, then writes the document. The draft is consumed
    /// only on success.
    pub async fn create(&self, draft: &mut PromotionDraft) -> Result<String, Error> {
        let context = ErrorContext::new("create promotion").with_target(draft.name.clone());
        let banner = match &draft.banner {
            Some(banner) if !draft.name.trim().is_empty() && !draft.url.trim().is_empty() => {
                banner
            }
            _ => {
                return Err(context.error(ErrorDetail::ValidationFailed(
                    "name, url and a banner image are required".to_owned(),
                )));
            }
        };
        let path = path_hint(BANNER_PREFIX, &banner.name, Utc::now());
        let image = self
            .blobs
            .upload(&path, &banner.content_type, banner.body.clone())
            .await
            .map_err(|error| {
                warn!(%error, %path, "failed to upload banner");
                context.error(ErrorDetail::UploadFailed(error.to_string()))
            })?;
        let promotion = Promotion {
            name: draft.name.clone(),
            url: draft.url.clone(),
            image: image.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let document = to_document(&promotion).map_err(|error| persistence(&context, error))?;
        let id = match self.documents.create(&self.collection, document).await {
            Ok(id) => id,
            Err(error) => {
                if let Err(error) = self.blobs.delete(&image).await {
                    warn!(%error, %image, "failed to clean up banner");
                }
                return Err(persistence(&context, error));
            }
        };
        info!(%id, name = %promotion.name, "promotion created");
        *draft = PromotionDraft::default();
        Ok(id)
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<(String, Promotion)>, Error> {
        let context = ErrorContext::new("list promotions");
        let documents = self
            .documents
            .read_all(&self.collection, Some(&OrderBy::desc("createdAt")))
            .await
            .map_err(|error| persistence(&context, error))?;
        Ok(documents
            .into_iter()
            .filter_map(|(id, document)| {
                match serde_json::from_value::<Promotion>(Value::Object(document)) {
                    Ok(promotion) => Some((id, promotion)),
                    Err(error) => {
                        warn!(%id, %error, "skipping undecodable promotion");
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn update(&self, id: &str, name: &str, url: &str) -> Result<(), Error> {
        let context = ErrorContext::new("update promotion").with_target(id);
        if name.trim().is_empty() || url.trim().is_empty() {
            return Err(context.error(ErrorDetail::ValidationFailed(
                "name and url are required".to_owned(),
            )));
        }
        let patch = to_document(&PromotionPatch {
            name,
            url,
            updated_at: Utc::now(),
        })
        .map_err(|error| persistence(&context, error))?;
        match self
            .documents
            .update(&self.collection, id, patch)
            .await
            .map_err(|error| persistence(&context, error))?
        {
            Outcome::Done => Ok(()),
            Outcome::NotFound => Err(persistence(&context, "promotion does not exist")),
        }
    }

    /// Removes the document, then its banner. A banner that is already gone
    /// is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let context = ErrorContext::new("delete promotion").with_target(id);
        let banner = self
            .documents
            .get(&self.collection, id)
            .await
            .map_err(|error| persistence(&context, error))?
            .and_then(|document| {
                document
                    .get("image")
                    .and_then(Value::as_str)
                    .and_then(|image| image.parse::<Url>().ok())
            });
        if self
            .documents
            .delete(&self.collection, id)
            .await
            .map_err(|error| persistence(&context, error))?
            == Outcome::NotFound
        {
            debug!(id, "promotion was already deleted");
        }
        if let Some(banner) = banner {
            let outcome = self
                .blobs
                .delete(&banner)
                .await
                .map_err(|error| persistence(&context, error))?;
            debug!(%banner, ?outcome, "banner removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory;

    fn draft(name: &str) -> PromotionDraft {
        PromotionDraft {
            name: name.into(),
            url: "https://example.com/sale".into(),
            banner: Some(LocalFile::new("banner.png", b"png".to_vec())),
        }
    }

    #[tokio::test]
    async fn create_requires_every_field() {
        let documents = memory::DocumentClient::default();
        let blobs = memory::BlobClient::default();
        let promotions = Promotions::new(&documents, &blobs, "promotions");
        let mut missing_banner = PromotionDraft {
            banner: None,
            ..draft("Sale")
        };
        let error = promotions.create(&mut missing_banner).await.unwrap_err();
        assert!(matches!(*error.detail, ErrorDetail::ValidationFailed(_)));
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn lifecycle() {
        let documents = memory::DocumentClient::default();
        let blobs = memory::BlobClient::default();
        let promotions = Promotions::new(&documents, &blobs, "promotions");
        let mut sale = draft("Sale");
        let id = promotions.create(&mut sale).await.unwrap();
        assert!(sale.banner.is_none());
        assert_eq!(blobs.len().await, 1);

        promotions
            .update(&id, "Summer sale", "https://example.com/summer")
            .await
            .unwrap();
        let listed = promotions.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1.name, "Summer sale");
        assert!(listed[0].1.updated_at.is_some());
        assert!(listed[0].1.image.contains("/promotions/"));

        assert!(promotions.update(&id, " ", "x").await.is_err());
        assert!(promotions.update("missing", "a", "b").await.is_err());

        promotions.delete(&id).await.unwrap();
        assert_eq!(documents.len("promotions").await, 0);
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn delete_ignores_missing_banner() {
        let documents = memory::DocumentClient::default();
        let blobs = memory::BlobClient::default();
        let promotions = Promotions::new(&documents, &blobs, "promotions");
        let id = promotions.create(&mut draft("Sale")).await.unwrap();
        let (_, promotion) = promotions.list().await.unwrap().remove(0);
        blobs.delete(&promotion.image.parse().unwrap()).await.unwrap();
        promotions.delete(&id).await.unwrap();
        assert_eq!(documents.len("promotions").await, 0);
        promotions.delete(&id).await.unwrap();
    }
}
