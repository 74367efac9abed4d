use std::str::FromStr as _;

use bytes::Bytes;
use sqlx::FromRow;
use tracing::{debug, error};
use url::Url;

use super::{
    BlobStore, Document, DocumentStore, OrderBy, Outcome, generate_id, object_key, object_url,
    sql,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("failed to encode document: {0}")]
    Encode(serde_json::Error),
    #[error("invalid object path {path:?}: {error}")]
    InvalidPath {
        path: String,
        error: url::ParseError,
    },
}

/// Documents and blobs kept in one SQLite database.
pub struct LocalStorage {
    pool: sqlx::SqlitePool,
    public_base: Url,
}

pub struct DocumentClient {
    pool: sqlx::SqlitePool,
}

pub struct BlobClient {
    pool: sqlx::SqlitePool,
    public_base: Url,
}

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    #[sqlx(json)]
    body: Document,
}

impl LocalStorage {
    /// `public_base` is the url prefix blobs are served from; it must end with `/`.
    pub async fn open(url: &str, public_base: Url) -> Result<Self, sqlx::Error> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)
            .inspect_err(|error| error!(%error, %url, "Failed to open local storage db"))?
            .create_if_missing(true);
        let pool = sqlx::pool::PoolOptions::<sqlx::Sqlite>::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .inspect_err(|error| error!(%error, %url, "Failed to open local storage db"))?;
        sqlx::query(sql::CREATE_DOCUMENTS)
            .execute(&pool)
            .await
            .inspect_err(|error| error!(%error, %url, "Failed to execute DDL to storage db"))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blobs(
                key TEXT NOT NULL PRIMARY KEY,
                content_type TEXT NOT NULL,
                body BLOB NOT NULL
            )
        "#,
        )
        .execute(&pool)
        .await
        .inspect_err(|error| error!(%error, %url, "Failed to execute DDL to storage db"))?;
        Ok(Self { pool, public_base })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    pub fn document_client(&self) -> DocumentClient {
        DocumentClient {
            pool: self.pool.clone(),
        }
    }

    pub fn blob_client(&self) -> BlobClient {
        BlobClient {
            pool: self.pool.clone(),
            public_base: self.public_base.clone(),
        }
    }
}

impl DocumentStore for DocumentClient {
    type Error = Error;

    async fn create(&self, collection: &str, document: Document) -> Result<String, Self::Error> {
        let id = generate_id(collection);
        let body = serde_json::to_string(&document).map_err(Error::Encode)?;
        sqlx::query(sql::INSERT_DOCUMENT)
            .bind(collection)
            .bind(&id)
            .bind(body)
            .execute(&self.pool)
            .await?;
        debug!(collection, %id, "document created");
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, Self::Error> {
        let row = sqlx::query_as::<_, DocumentRow>(sql::SELECT_DOCUMENT)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.body))
    }

    async fn read_all(
        &self,
        collection: &str,
        order: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, Self::Error> {
        let statement = sql::select_documents(order);
        let mut query = sqlx::query_as::<_, DocumentRow>(&statement).bind(collection);
        if let Some(order) = order {
            query = query.bind(sql::json_path(&order.field));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|row| (row.id, row.body)).collect())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Outcome, Self::Error> {
        let patch = serde_json::to_string(&patch).map_err(Error::Encode)?;
        let result = sqlx::query(sql::PATCH_DOCUMENT)
            .bind(patch)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(if result.rows_affected() == 0 {
            Outcome::NotFound
        } else {
            Outcome::Done
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Outcome, Self::Error> {
        let result = sqlx::query(sql::DELETE_DOCUMENT)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(if result.rows_affected() == 0 {
            Outcome::NotFound
        } else {
            Outcome::Done
        })
    }
}

impl BlobStore for BlobClient {
    type Error = Error;

    async fn upload(&self, path: &str, content_type: &str, body: Bytes) -> Result<Url, Self::Error> {
        let url = object_url(&self.public_base, path).map_err(|error| Error::InvalidPath {
            path: path.to_owned(),
            error,
        })?;
        sqlx::query(
            r#"
            INSERT INTO blobs(key, content_type, body)
            VALUES (?, ?, ?)
            ON CONFLICT(key)
            DO UPDATE SET
                content_type = EXCLUDED.content_type,
                body = EXCLUDED.body
        "#,
        )
        .bind(path)
        .bind(content_type)
        .bind(body.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(url)
    }

    async fn delete(&self, url: &Url) -> Result<Outcome, Self::Error> {
        let Some(key) = object_key(&self.public_base, url) else {
            return Ok(Outcome::NotFound);
        };
        let result = sqlx::query("DELETE FROM blobs WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(if result.rows_affected() == 0 {
            Outcome::NotFound
        } else {
            Outcome::Done
        })
    }
}
