use std::path::Path;

use url::Url;

use crate::{
    post::{
        Authoring,
        input::{PostInput, replay},
    },
    storage::{BlobStore, DocumentStore, sqlite::LocalStorage},
};

mod failure;
mod roundtrip;

pub(crate) const FIXTURES: &str = "src/tests/fixtures";

pub(crate) async fn local_storage() -> LocalStorage {
    LocalStorage::open(
        "sqlite::memory:",
        Url::parse("https://cdn.example.com/").unwrap(),
    )
    .await
    .unwrap()
}

/// Loads `post.yaml` from the fixtures into a fresh authoring session.
pub(crate) async fn authored<'s, D: DocumentStore, B: BlobStore>(
    documents: &'s D,
    blobs: &'s B,
) -> Authoring<'s, D, B> {
    let input = tokio::fs::read_to_string(Path::new(FIXTURES).join("post.yaml"))
        .await
        .unwrap();
    let input: PostInput = serde_yaml::from_str(&input).unwrap();
    let mut authoring = Authoring::new(documents, blobs, "blogs");
    replay(input, Path::new(FIXTURES), &mut authoring)
        .await
        .unwrap();
    authoring
}
