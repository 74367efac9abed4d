use crate::{
    ErrorDetail,
    block::BlockKind,
    storage::{DocumentStore, memory},
    tests::authored,
};

#[tokio::test]
async fn failed_submit_keeps_the_session() {
    let documents = memory::DocumentClient::default();
    let blobs = memory::BlobClient::default();
    let mut authoring = authored(&documents, &blobs).await;
    // the inline diagram is uploaded at commit time
    assert_eq!(blobs.len().await, 1);

    documents.set_unavailable(true);
    let metadata = authoring.metadata.clone();
    let content = authoring.editor().content().to_vec();
    let error = authoring.submit().await.unwrap_err();
    assert!(matches!(*error.detail, ErrorDetail::PersistenceFailed(_)));
    assert!(error.user_message().starts_with("Error: Persistence failed"));

    assert_eq!(blobs.len().await, 1, "cover upload was not cleaned up");
    assert_eq!(authoring.metadata, metadata);
    assert_eq!(authoring.editor().content(), content);
    assert_eq!(authoring.cover().map(|cover| cover.name.as_str()), Some("cover.svg"));

    documents.set_unavailable(false);
    let id = authoring.submit().await.unwrap();
    assert_eq!(documents.len("blogs").await, 1);
    assert_eq!(blobs.len().await, 2);
    assert!(authoring.editor().content().is_empty());

    let stored = documents.get("blogs", &id).await.unwrap().unwrap();
    let kinds = stored["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|block| block["type"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        BlockKind::ALL.iter().map(|kind| kind.as_str()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn failed_upload_leaves_no_draft_behind() {
    let documents = memory::DocumentClient::default();
    let blobs = memory::BlobClient::default();
    let mut authoring = authored(&documents, &blobs).await;
    let before = authoring.editor().content().len();

    blobs.set_unavailable(true);
    let editor = authoring.editor_mut();
    editor.select_type(BlockKind::Image);
    editor
        .begin_upload(crate::storage::LocalFile::new("late.png", b"png".to_vec()))
        .unwrap();
    let blobs = authoring.blobs();
    assert!(authoring.editor_mut().commit(blobs).await.is_err());
    assert_eq!(authoring.editor().content().len(), before);
    assert!(authoring.editor().draft().is_some());
}
