//! Stores selected from configuration.

use bytes::Bytes;
use derive_debug::Dbg;
use tracing::info;
use url::Url;

use super::{BlobStore, Document, DocumentStore, OrderBy, Outcome, d1, r2, sqlite};
use crate::config::{BlobBackend, Config, DocumentBackend};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlite::Error),
    #[error("d1: {0}")]
    D1(#[from] d1::Error),
    #[error("r2: {0}")]
    R2(#[from] r2::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("missing secret {0}")]
    MissingSecret(&'static str),
}

/// Credentials for the remote backends, read from the environment by the CLI.
#[derive(Dbg, Default, Clone)]
pub struct Secrets {
    #[dbg(skip)]
    pub cloudflare_api_token: Option<String>,
    pub r2_access_key_id: Option<String>,
    #[dbg(skip)]
    pub r2_secret_access_key: Option<String>,
}

pub enum Documents {
    Sqlite(sqlite::DocumentClient),
    D1(d1::Client),
}

pub enum Blobs {
    Sqlite(sqlite::BlobClient),
    R2(r2::Client),
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, BackendError> {
    value.as_deref().ok_or(BackendError::MissingSecret(name))
}

async fn open_documents(
    backend: &DocumentBackend,
    secrets: &Secrets,
) -> Result<Documents, BackendError> {
    match backend {
        DocumentBackend::Sqlite { url } => {
            info!(url, "using sqlite document store");
            let storage = sqlite::LocalStorage::open(url, Url::parse("file:///")?)
                .await
                .map_err(sqlite::Error::from)?;
            Ok(Documents::Sqlite(storage.document_client()))
        }
        DocumentBackend::D1 {
            account_id,
            database_id,
        } => {
            info!(account_id, database_id, "using D1 document store");
            let token = require(&secrets.cloudflare_api_token, "CLOUDFLARE_API_TOKEN")?;
            let client = d1::Client::new(account_id, database_id, token.to_owned())?;
            client.ensure_schema().await?;
            Ok(Documents::D1(client))
        }
    }
}

async fn open_blobs(backend: &BlobBackend, secrets: &Secrets) -> Result<Blobs, BackendError> {
    match backend {
        BlobBackend::Sqlite { url, public_base } => {
            info!(url, %public_base, "using sqlite blob store");
            let storage = sqlite::LocalStorage::open(url, public_base.clone())
                .await
                .map_err(sqlite::Error::from)?;
            Ok(Blobs::Sqlite(storage.blob_client()))
        }
        BlobBackend::R2 {
            account_id,
            bucket,
            public_base,
        } => {
            info!(account_id, bucket, %public_base, "using R2 blob store");
            let access_key_id = require(&secrets.r2_access_key_id, "R2_ACCESS_KEY_ID")?;
            let secret_access_key =
                require(&secrets.r2_secret_access_key, "R2_SECRET_ACCESS_KEY")?;
            Ok(Blobs::R2(
                r2::Client::new(
                    account_id,
                    access_key_id,
                    secret_access_key,
                    bucket.clone(),
                    public_base.clone(),
                )
                .await,
            ))
        }
    }
}

pub async fn open(config: &Config, secrets: &Secrets) -> Result<(Documents, Blobs), BackendError> {
    futures::try_join!(
        open_documents(&config.documents, secrets),
        open_blobs(&config.blobs, secrets)
    )
}

impl DocumentStore for Documents {
    type Error = BackendError;

    async fn create(&self, collection: &str, document: Document) -> Result<String, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.create(collection, document).await?,
            Self::D1(client) => client.create(collection, document).await?,
        })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.get(collection, id).await?,
            Self::D1(client) => client.get(collection, id).await?,
        })
    }

    async fn read_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.read_all(collection, order).await?,
            Self::D1(client) => client.read_all(collection, order).await?,
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Outcome, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.update(collection, id, patch).await?,
            Self::D1(client) => client.update(collection, id, patch).await?,
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Outcome, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.delete(collection, id).await?,
            Self::D1(client) => client.delete(collection, id).await?,
        })
    }
}

impl BlobStore for Blobs {
    type Error = BackendError;

    async fn upload(&self, path: &str, content_type: &str, body: Bytes) -> Result<Url, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.upload(path, content_type, body).await?,
            Self::R2(client) => client.upload(path, content_type, body).await?,
        })
    }

    async fn delete(&self, url: &Url) -> Result<Outcome, Self::Error> {
        Ok(match self {
            Self::Sqlite(client) => client.delete(url).await?,
            Self::R2(client) => client.delete(url).await?,
        })
    }
}
