//! Document and blob store collaborators
//!
//! The authoring core only talks to these traits; concrete backends are
//! chosen from configuration and handed in at construction time.

use std::{
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use derive_debug::Dbg;
use serde_json::Value;
use url::Url;

pub mod backend;
pub mod d1;
pub mod memory;
pub mod r2;
mod sql;
pub mod sqlite;

/// A schemaless stored document.
pub type Document = serde_json::Map<String, Value>;

/// Result of an update or delete addressed at one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

pub trait DocumentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send;

    fn read_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> impl Future<Output = Result<Vec<(String, Document)>, Self::Error>> + Send;

    /// Apply `patch` to the stored document as a JSON merge patch (RFC 7396).
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send;

    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send;
}

pub trait BlobStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store `body` under `path` and return the url it can be fetched from.
    fn upload(
        &self,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<Url, Self::Error>> + Send;

    fn delete(&self, url: &Url) -> impl Future<Output = Result<Outcome, Self::Error>> + Send;
}

/// A file picked by the admin that has not been uploaded yet.
#[derive(Dbg, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    #[dbg(skip)]
    pub body: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        Self {
            name,
            content_type,
            body: body.into(),
        }
    }

    pub async fn open(path: &Path) -> Result<Self, std::io::Error> {
        let body = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());
        Ok(Self::new(name, body))
    }

    /// Inline preview of the file; not a retrievable url.
    pub fn data_url(&self) -> String {
        use base64::Engine as _;
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.body)
        )
    }
}

/// Object path for an upload: `{prefix}/{timestamp_ms}_{filename}`.
pub fn path_hint(prefix: &str, filename: &str, now: DateTime<Utc>) -> String {
    let filename = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    format!("{prefix}/{}_{filename}", now.timestamp_millis())
}

pub(crate) fn object_url(base: &Url, key: &str) -> Result<Url, url::ParseError> {
    base.join(key)
}

/// Inverse of [`object_url`]. `None` when `url` does not live under `base`.
pub(crate) fn object_key(base: &Url, url: &Url) -> Option<String> {
    let key = url.as_str().strip_prefix(base.as_str())?;
    urlencoding::decode(key).ok().map(|key| key.into_owned())
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 20 hex characters, unique within a process and unlikely to collide across processes.
pub(crate) fn generate_id(collection: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(collection.as_bytes());
    hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(&SEQUENCE.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    let hex = hasher.finalize().to_hex();
    hex[..20].to_owned()
}

pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
