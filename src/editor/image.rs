use crate::{block::ImageMode, storage::LocalFile};

/// Where the image of a draft comes from. Only one path is live at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A picked local file and its inline preview. Neither is a retrievable url.
    Upload {
        file: Option<LocalFile>,
        preview: Option<String>,
    },
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDraft {
    pub source: ImageSource,
    pub alt: String,
}

impl Default for ImageDraft {
    fn default() -> Self {
        Self {
            source: ImageSource::Upload {
                file: None,
                preview: None,
            },
            alt: String::new(),
        }
    }
}

impl ImageDraft {
    pub fn mode(&self) -> ImageMode {
        match self.source {
            ImageSource::Upload { .. } => ImageMode::Upload,
            ImageSource::Url(_) => ImageMode::Url,
        }
    }

    pub fn begin_upload(&mut self, file: LocalFile) {
        let preview = file.data_url();
        self.source = ImageSource::Upload {
            file: Some(file),
            preview: Some(preview),
        };
    }

    pub fn set_url_mode(&mut self, url: impl Into<String>) {
        self.source = ImageSource::Url(url.into());
    }

    /// Switching discards whatever the other mode held. `alt` is kept.
    pub fn set_mode(&mut self, mode: ImageMode) {
        if self.mode() == mode {
            return;
        }
        self.source = match mode {
            ImageMode::Upload => ImageSource::Upload {
                file: None,
                preview: None,
            },
            ImageMode::Url => ImageSource::Url(String::new()),
        };
    }

    pub fn pending_file(&self) -> Option<&LocalFile> {
        match &self.source {
            ImageSource::Upload { file, .. } => file.as_ref(),
            ImageSource::Url(_) => None,
        }
    }

    pub fn preview(&self) -> Option<&str> {
        match &self.source {
            ImageSource::Upload { preview, .. } => preview.as_deref(),
            ImageSource::Url(url) => Some(url),
        }
    }
}
