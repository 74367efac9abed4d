//! Post assembly
//!
//! An [`Authoring`] session gathers metadata, an optional cover image and the
//! blocks of a [`BlockEditor`], and turns them into one stored document.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    Error, ErrorContext, ErrorDetail,
    block::{
        Block,
        decode::{self, DecodeWarning},
    },
    editor::BlockEditor,
    storage::{BlobStore, Document, DocumentStore, LocalFile, path_hint},
    timestamp,
};

mod catalog;
pub mod input;

pub use catalog::{PostCatalog, PostEntry};

pub const COVER_PREFIX: &str = "blog-images";

macro_rules! categories {
    ($($(#[$attr:meta])* $variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum Category {
            $($(#[$attr])* #[serde(rename = $name)] $variant,)*
        }

        impl Category {
            pub const ALL: &[Category] = &[$(Self::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

categories! {
    #[default]
    AiTech => "AI & Tech",
    Programming => "Programming",
    MachineLearning => "Machine Learning",
    DataScience => "Data Science",
    WebDevelopment => "Web Development",
    Cloud => "Cloud",
    DevOps => "DevOps",
    MobileApps => "Mobile Apps",
    Cybersecurity => "Cybersecurity",
    UiUx => "UI/UX",
    Productivity => "Productivity",
    Business => "Business",
    Startup => "Startup",
    Blockchain => "Blockchain",
    Healthcare => "Healthcare",
    Education => "Education",
    Finance => "Finance",
    Marketing => "Marketing",
    Gaming => "Gaming",
    JobNotifications => "Job Notifications",
    Other => "Other",
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown category {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// Stored categories outside the known set read back as [`Category::Other`].
fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Category, D::Error> {
    let name = decode::string(deserializer)?;
    if name.is_empty() {
        return Ok(Category::default());
    }
    Ok(name.parse().unwrap_or_else(|_| {
        decode::note(DecodeWarning::UnknownCategory(name));
        Category::Other
    }))
}

/// Missing dates stay `None`; dates that do not parse are noted and dropped.
fn lenient_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let date = timestamp::parse(&value);
    if date.is_none() {
        decode::note(DecodeWarning::UnreadableDate(value.to_string()));
    }
    Ok(date)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub trending: bool,
    /// Publish date; the time of submission when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl PostMetadata {
    pub(crate) fn validate(&self) -> Result<(), ErrorDetail> {
        if self.title.trim().is_empty() || self.summary.trim().is_empty() {
            return Err(ErrorDetail::ValidationFailed(
                "title and summary are required".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn publish_date(&self) -> DateTime<Utc> {
        self.date.map(timestamp::midnight_utc).unwrap_or_else(Utc::now)
    }
}

/// A post as persisted in the posts collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDocument {
    #[serde(default, deserialize_with = "decode::string")]
    pub title: String,
    #[serde(default, deserialize_with = "decode::string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: Category,
    #[serde(default)]
    pub trending: bool,
    /// Posts from older builds may have no date. They list after dated posts.
    #[serde(
        default,
        serialize_with = "timestamp::option::serialize",
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<DateTime<Utc>>,
    /// Cover image url; empty when the post has none.
    #[serde(default, deserialize_with = "decode::string")]
    pub image: String,
    #[serde(default, deserialize_with = "decode::sequence")]
    pub content: Vec<Block>,
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(document) => Ok(document),
        other => Err(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// One post being written.
pub struct Authoring<'s, D, B> {
    documents: &'s D,
    blobs: &'s B,
    collection: String,
    pub metadata: PostMetadata,
    cover: Option<LocalFile>,
    editor: BlockEditor,
}

impl<'s, D: DocumentStore, B: BlobStore> Authoring<'s, D, B> {
    pub fn new(documents: &'s D, blobs: &'s B, collection: impl Into<String>) -> Self {
        Self {
            documents,
            blobs,
            collection: collection.into(),
            metadata: PostMetadata::default(),
            cover: None,
            editor: BlockEditor::new(),
        }
    }

    pub fn editor(&self) -> &BlockEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut BlockEditor {
        &mut self.editor
    }

    pub fn blobs(&self) -> &'s B {
        self.blobs
    }

    pub fn cover(&self) -> Option<&LocalFile> {
        self.cover.as_ref()
    }

    pub fn set_cover(&mut self, cover: Option<LocalFile>) {
        self.cover = cover;
    }

    /// Persist the post and reset the session.
    ///
    /// On failure the session is left exactly as it was. A cover uploaded
    /// before the document write failed is deleted again, best effort.
    pub async fn submit(&mut self) -> Result<String, Error> {
        let context = ErrorContext::new("submit post").with_target(self.metadata.title.clone());
        self.metadata
            .validate()
            .map_err(|detail| context.error(detail))?;
        if self.editor.draft().is_some() {
            debug!("uncommitted draft is not part of the submitted post");
        }

        let image = match &self.cover {
            Some(cover) => {
                let path = path_hint(COVER_PREFIX, &cover.name, Utc::now());
                let url = self
                    .blobs
                    .upload(&path, &cover.content_type, cover.body.clone())
                    .await
                    .map_err(|error| {
                        warn!(%error, %path, "failed to upload cover image");
                        context.error(ErrorDetail::UploadFailed(error.to_string()))
                    })?;
                Some(url)
            }
            None => None,
        };

        let post = PostDocument {
            title: self.metadata.title.clone(),
            summary: self.metadata.summary.clone(),
            category: self.metadata.category,
            trending: self.metadata.trending,
            date: Some(self.metadata.publish_date()),
            image: image.as_ref().map(ToString::to_string).unwrap_or_default(),
            content: self.editor.content().to_vec(),
        };
        let created = match to_document(&post) {
            Ok(document) => self
                .documents
                .create(&self.collection, document)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };
        match created {
            Ok(id) => {
                info!(%id, title = %post.title, blocks = post.content.len(), "post submitted");
                self.metadata = PostMetadata::default();
                self.cover = None;
                self.editor.reset();
                Ok(id)
            }
            Err(reason) => {
                warn!(%reason, "failed to create post document");
                if let Some(url) = image {
                    if let Err(error) = self.blobs.delete(&url).await {
                        warn!(%error, %url, "failed to clean up cover image");
                    }
                }
                Err(context.error(ErrorDetail::PersistenceFailed(reason)))
            }
        }
    }
}
