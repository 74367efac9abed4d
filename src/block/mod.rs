//! Content block schema
//!
//! A post body is an ordered sequence of blocks. Each block is one of a closed
//! set of kinds and is persisted as a JSON object tagged by `type`.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod decode;
mod validate;

pub use decode::{DecodeWarning, decode_sequence};
pub use validate::{ValidationError, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Heading,
    Subheading,
    Paragraph,
    List,
    Table,
    Image,
    Link,
}

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        Self::Heading,
        Self::Subheading,
        Self::Paragraph,
        Self::List,
        Self::Table,
        Self::Image,
        Self::Link,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "Heading",
            Self::Subheading => "Subheading",
            Self::Paragraph => "Paragraph",
            Self::List => "List",
            Self::Table => "Table",
            Self::Image => "Image",
            Self::Link => "Link",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown block type {0:?}")]
pub struct UnknownBlockKind(pub String);

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownBlockKind(s.to_owned()))
    }
}

/// How an image block obtained its url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    #[default]
    Upload,
    Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Heading {
        #[serde(default, deserialize_with = "decode::string")]
        text: String,
    },
    Subheading {
        #[serde(default, deserialize_with = "decode::string")]
        text: String,
    },
    Paragraph {
        #[serde(default, deserialize_with = "decode::string")]
        text: String,
    },
    List {
        #[serde(default, deserialize_with = "decode::strings")]
        items: Vec<String>,
    },
    /// Rows are keyed by header text, not by column position.
    Table {
        #[serde(default, deserialize_with = "decode::strings")]
        headers: Vec<String>,
        #[serde(default, deserialize_with = "decode::rows")]
        rows: Vec<IndexMap<String, String>>,
    },
    Image {
        #[serde(default, deserialize_with = "decode::image_mode")]
        mode: ImageMode,
        #[serde(default, deserialize_with = "decode::string")]
        url: String,
        #[serde(default, deserialize_with = "decode::string")]
        alt: String,
    },
    Link {
        #[serde(default, deserialize_with = "decode::string")]
        text: String,
        #[serde(default, deserialize_with = "decode::string")]
        href: String,
    },
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Heading { .. } => BlockKind::Heading,
            Self::Subheading { .. } => BlockKind::Subheading,
            Self::Paragraph { .. } => BlockKind::Paragraph,
            Self::List { .. } => BlockKind::List,
            Self::Table { .. } => BlockKind::Table,
            Self::Image { .. } => BlockKind::Image,
            Self::Link { .. } => BlockKind::Link,
        }
    }
}

/// Committed blocks of one post, in display order.
pub type ContentSequence = Vec<Block>;
