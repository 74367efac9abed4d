use aws_config::BehaviorVersion;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::{BlobStore, Outcome, object_key, object_url};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to delete object: {0}")]
    Delete(String),
    #[error("Failed to put object: {0}")]
    Put(String),
    #[error("invalid object path {path:?}: {error}")]
    InvalidPath {
        path: String,
        error: url::ParseError,
    },
}

/// Blob store on a Cloudflare R2 bucket served from `public_base`.
pub struct Client {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: Url,
}

impl Client {
    pub async fn new(
        account_id: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: String,
        public_base: Url,
    ) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(format!("https://{account_id}.r2.cloudflarestorage.com"))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None, // session token is not used with R2
                None,
                "R2",
            ))
            .region("auto")
            .load()
            .await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket,
            public_base,
        }
    }
}

impl BlobStore for Client {
    type Error = Error;

    async fn upload(&self, path: &str, content_type: &str, body: Bytes) -> Result<Url, Self::Error> {
        let url = object_url(&self.public_base, path).map_err(|error| Error::InvalidPath {
            path: path.to_owned(),
            error,
        })?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(body.into())
            .send()
            .await
            .map_err(|error| Error::Put(error.to_string()))?;
        debug!(bucket = %self.bucket, key = path, "object uploaded");
        Ok(url)
    }

    async fn delete(&self, url: &Url) -> Result<Outcome, Self::Error> {
        let Some(key) = object_key(&self.public_base, url) else {
            return Ok(Outcome::NotFound);
        };
        // S3 deletes are idempotent, so probe first to report a missing object.
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => {}
            Err(error) => {
                let error = error.into_service_error();
                if error.is_not_found() {
                    return Ok(Outcome::NotFound);
                }
                return Err(Error::Delete(error.to_string()));
            }
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|error| Error::Delete(error.to_string()))?;
        debug!(bucket = %self.bucket, %key, "object deleted");
        Ok(Outcome::Done)
    }
}
