//! Cloudflare D1 document store, driven through the HTTP query API.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_with::{json::JsonString, serde_as};
use tracing::{debug, trace, warn};
use url::Url;

use super::{Document, DocumentStore, OrderBy, Outcome, generate_id, sql};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(reqwest::Error),
    #[error("Query failed: {errors:?} {messages:?}")]
    QueryFailed {
        errors: Vec<ResponseInfo>,
        messages: Vec<ResponseInfo>,
    },
    #[error("Empty result: {errors:?} {messages:?}")]
    EmptyResult {
        errors: Vec<ResponseInfo>,
        messages: Vec<ResponseInfo>,
    },
    #[error("Parse JSON error: {0}")]
    ParseJson(serde_json::Error),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseInfoPointer {
    pub pointer: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseInfo {
    pub code: u16,
    pub message: String,
    pub documentation_url: Option<String>,
    pub source: Option<ResponseInfoPointer>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
struct Response<R> {
    #[serde(default)]
    errors: Vec<ResponseInfo>,
    #[serde(default)]
    messages: Vec<ResponseInfo>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: R,
}

#[derive(Serialize)]
struct Request<'a> {
    sql: &'a str,
    params: &'a [&'a str],
}

#[derive(Deserialize, Default)]
struct QueryResultMeta {
    changes: Option<u64>,
    duration: Option<f64>,
    rows_read: Option<u64>,
    rows_written: Option<u64>,
}

#[derive(Deserialize)]
struct QueryResult<R> {
    #[serde(default)]
    meta: QueryResultMeta,
    #[serde(default = "Vec::new")]
    results: Vec<R>,
}

#[serde_as]
#[derive(Deserialize)]
struct DocumentRow {
    id: String,
    #[serde_as(as = "JsonString")]
    body: Document,
}

#[derive(Deserialize)]
struct Ignored {}

pub struct Client {
    token: String,
    client: reqwest::Client,
    url: Url,
}

impl Client {
    pub fn new(account_id: &str, database_id: &str, token: String) -> Result<Self, url::ParseError> {
        Ok(Self {
            token,
            url: format!(
                "https://api.cloudflare.com/client/v4/accounts/{account_id}/d1/database/{database_id}/query"
            )
            .parse()?,
            client: reqwest::Client::new(),
        })
    }

    async fn query<R: DeserializeOwned>(
        &self,
        statement: &str,
        params: &[&str],
    ) -> Result<QueryResult<R>, Error> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.token)
            .json(&Request {
                sql: statement,
                params,
            })
            .send()
            .await
            .map_err(Error::Transport)?
            .text()
            .await
            .map_err(Error::Transport)?;
        trace!(text = response, "D1 response");

        let mut response = serde_json::from_str::<Response<Vec<QueryResult<R>>>>(&response)
            .map_err(Error::ParseJson)?;
        if !response.success {
            warn!(errors = ?response.errors, messages = ?response.messages, "failed to execute query");
            return Err(Error::QueryFailed {
                errors: response.errors,
                messages: response.messages,
            });
        }
        let Some(result) = response.result.pop() else {
            warn!(errors = ?response.errors, messages = ?response.messages, "empty query result");
            return Err(Error::EmptyResult {
                errors: response.errors,
                messages: response.messages,
            });
        };
        let meta = &result.meta;
        debug!(
            messages = ?response.messages,
            changes = ?meta.changes,
            duration_ms = ?meta.duration,
            rows_read = ?meta.rows_read,
            rows_written = ?meta.rows_written,
            "query succeeded"
        );
        Ok(result)
    }

    /// Creates the documents table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), Error> {
        self.query::<Ignored>(sql::CREATE_DOCUMENTS, &[]).await?;
        Ok(())
    }
}

fn outcome(meta: &QueryResultMeta) -> Outcome {
    match meta.changes {
        Some(0) => Outcome::NotFound,
        _ => Outcome::Done,
    }
}

impl DocumentStore for Client {
    type Error = Error;

    async fn create(&self, collection: &str, document: Document) -> Result<String, Self::Error> {
        let id = generate_id(collection);
        let body = serde_json::to_string(&document).map_err(Error::ParseJson)?;
        self.query::<Ignored>(sql::INSERT_DOCUMENT, &[collection, &id, &body])
            .await?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Self::Error> {
        let result = self
            .query::<DocumentRow>(sql::SELECT_DOCUMENT, &[collection, id])
            .await?;
        Ok(result.results.into_iter().next().map(|row| row.body))
    }

    async fn read_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, Self::Error> {
        let statement = sql::select_documents(order);
        let path = order.map(|order| sql::json_path(&order.field));
        let params = match &path {
            Some(path) => vec![collection, path.as_str()],
            None => vec![collection],
        };
        let result = self.query::<DocumentRow>(&statement, &params).await?;
        Ok(result
            .results
            .into_iter()
            .map(|row| (row.id, row.body))
            .collect())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Outcome, Self::Error> {
        let patch = serde_json::to_string(&patch).map_err(Error::ParseJson)?;
        let result = self
            .query::<Ignored>(sql::PATCH_DOCUMENT, &[&patch, collection, id])
            .await?;
        Ok(outcome(&result.meta))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Outcome, Self::Error> {
        let result = self
            .query::<Ignored>(sql::DELETE_DOCUMENT, &[collection, id])
            .await?;
        Ok(outcome(&result.meta))
    }
}
