//! Statements shared by the SQLite and D1 document stores.

use super::{Direction, OrderBy};

pub(crate) const CREATE_DOCUMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS documents(
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY(collection, id)
    )
"#;

pub(crate) const INSERT_DOCUMENT: &str =
    "INSERT INTO documents(collection, id, body) VALUES (?, ?, ?)";

pub(crate) const SELECT_DOCUMENT: &str =
    "SELECT id, body FROM documents WHERE collection = ? AND id = ?";

pub(crate) const PATCH_DOCUMENT: &str =
    "UPDATE documents SET body = json_patch(body, ?) WHERE collection = ? AND id = ?";

pub(crate) const DELETE_DOCUMENT: &str = "DELETE FROM documents WHERE collection = ? AND id = ?";

/// Bind `collection`, then [`json_path`] of the order field when `order` is given.
pub(crate) fn select_documents(order: Option<&OrderBy>) -> String {
    match order {
        Some(OrderBy { direction, .. }) => {
            let direction = match direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            format!(
                "SELECT id, body FROM documents WHERE collection = ? \
                 ORDER BY json_extract(body, ?) {direction}, rowid"
            )
        }
        None => "SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid".to_owned(),
    }
}

pub(crate) fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}
