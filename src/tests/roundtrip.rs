use sqlx::prelude::FromRow;

use crate::{
    block::{Block, BlockKind, ImageMode},
    post::{Category, PostCatalog},
    render::{render, to_html},
    tests::{authored, local_storage},
};

#[derive(FromRow, Debug, PartialEq, Eq)]
struct BlobRow {
    key: String,
    content_type: String,
}

#[tokio::test]
async fn persisted_post_renders_like_the_draft() {
    let storage = local_storage().await;
    let documents = storage.document_client();
    let blobs = storage.blob_client();

    let mut authoring = authored(&documents, &blobs).await;
    let content = authoring.editor().content().to_vec();
    assert_eq!(
        content.iter().map(Block::kind).collect::<Vec<_>>(),
        BlockKind::ALL
    );
    let before = render(&content);

    let id = authoring.submit().await.unwrap();
    assert!(authoring.editor().content().is_empty());

    let catalog = PostCatalog::new(&documents, &blobs, "blogs");
    let stored = catalog.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Shipping a block editor");
    assert_eq!(stored.category, Category::WebDevelopment);
    assert!(stored.trending);
    assert_eq!(
        stored.date.map(|date| date.to_rfc3339()).as_deref(),
        Some("2024-03-15T00:00:00+00:00")
    );
    assert_eq!(stored.content, content);

    let after = catalog.render(&id).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(to_html(&after), to_html(&before));

    let html = to_html(&after);
    assert!(html.contains("<li>typed content</li><li>predictable rendering</li>"));
    assert!(html.contains("<td>Heading</td><td>h2</td>"));
    assert!(html.contains("href=\"https://example.com/blocks?ref=blog&amp;lang=en\""));

    let Block::Image { mode, url, alt } = &stored.content[5] else {
        panic!("expected image, got {:?}", stored.content[5]);
    };
    assert_eq!(*mode, ImageMode::Upload);
    assert_eq!(alt, "Editor architecture");
    assert!(url.starts_with("https://cdn.example.com/blog-block-images/"));
    assert!(stored.image.starts_with("https://cdn.example.com/blog-images/"));

    let mut rows = sqlx::query_as::<_, BlobRow>("SELECT key, content_type FROM blobs ORDER BY key")
        .fetch_all(storage.pool())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let cover = rows.pop().unwrap();
    assert!(cover.key.starts_with("blog-images/") && cover.key.ends_with("_cover.svg"));
    assert_eq!(cover.content_type, "image/svg+xml");
    assert!(rows[0].key.ends_with("_diagram.svg"));
}
