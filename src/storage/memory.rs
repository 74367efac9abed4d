//! In-process stores, used by tests and dry runs.

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering as AtomicOrdering},
};

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

use super::{
    BlobStore, Direction, Document, DocumentStore, OrderBy, Outcome, generate_id, merge_patch,
    object_key, object_url,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store is unavailable")]
    Unavailable,
    #[error("invalid object path {path:?}: {error}")]
    InvalidPath {
        path: String,
        error: url::ParseError,
    },
}

#[derive(Default)]
pub struct DocumentClient {
    collections: tokio::sync::Mutex<HashMap<String, IndexMap<String, Document>>>,
    unavailable: AtomicBool,
}

impl DocumentClient {
    /// Makes every following call fail with [`Error::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn check(&self) -> Result<(), Error> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            Err(Error::Unavailable)
        } else {
            Ok(())
        }
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(IndexMap::len)
            .unwrap_or_default()
    }
}

fn compare_field(lhs: Option<&Value>, rhs: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
        }
    }
    match (lhs, rhs) {
        (Some(Value::Bool(l)), Some(Value::Bool(r))) => l.cmp(r),
        (Some(Value::Number(l)), Some(Value::Number(r))) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(l)), Some(Value::String(r))) => l.cmp(r),
        _ => rank(lhs).cmp(&rank(rhs)),
    }
}

impl DocumentStore for DocumentClient {
    type Error = Error;

    async fn create(&self, collection: &str, document: Document) -> Result<String, Self::Error> {
        self.check()?;
        let id = generate_id(collection);
        self.collections
            .lock()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Self::Error> {
        self.check()?;
        Ok(self
            .collections
            .lock()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn read_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, Self::Error> {
        self.check()?;
        let mut documents = self
            .collections
            .lock()
            .await
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, document)| (id.clone(), document.clone()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if let Some(order) = order {
            documents.sort_by(|(_, lhs), (_, rhs)| {
                let ordering = compare_field(lhs.get(&order.field), rhs.get(&order.field));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        Ok(documents)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Outcome, Self::Error> {
        self.check()?;
        let mut collections = self.collections.lock().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        else {
            return Ok(Outcome::NotFound);
        };
        let mut merged = Value::Object(std::mem::take(document));
        merge_patch(&mut merged, &Value::Object(patch));
        if let Value::Object(merged) = merged {
            *document = merged;
        }
        Ok(Outcome::Done)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Outcome, Self::Error> {
        self.check()?;
        let removed = self
            .collections
            .lock()
            .await
            .get_mut(collection)
            .and_then(|documents| documents.shift_remove(id));
        Ok(match removed {
            Some(_) => Outcome::Done,
            None => Outcome::NotFound,
        })
    }
}

pub struct BlobClient {
    base: Url,
    objects: tokio::sync::Mutex<IndexMap<String, (Bytes, String)>>,
    unavailable: AtomicBool,
}

impl Default for BlobClient {
    fn default() -> Self {
        Self::new(Url::parse("https://blobs.invalid/").unwrap())
    }
}

impl BlobClient {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            objects: Default::default(),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn fetch(&self, url: &Url) -> Option<(Bytes, String)> {
        let key = object_key(&self.base, url)?;
        self.objects.lock().await.get(&key).cloned()
    }
}

impl BlobStore for BlobClient {
    type Error = Error;

    async fn upload(&self, path: &str, content_type: &str, body: Bytes) -> Result<Url, Self::Error> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(Error::Unavailable);
        }
        let url = object_url(&self.base, path).map_err(|error| Error::InvalidPath {
            path: path.to_owned(),
            error,
        })?;
        self.objects
            .lock()
            .await
            .insert(path.to_owned(), (body, content_type.to_owned()));
        Ok(url)
    }

    async fn delete(&self, url: &Url) -> Result<Outcome, Self::Error> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(Error::Unavailable);
        }
        let Some(key) = object_key(&self.base, url) else {
            return Ok(Outcome::NotFound);
        };
        Ok(match self.objects.lock().await.shift_remove(&key) {
            Some(_) => Outcome::Done,
            None => Outcome::NotFound,
        })
    }
}
