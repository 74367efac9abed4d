//! Job listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    Error, ErrorContext, ErrorDetail,
    block::decode,
    post::to_document,
    storage::{DocumentStore, OrderBy, Outcome},
    timestamp,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(default, deserialize_with = "decode::string")]
    pub title: String,
    #[serde(default, deserialize_with = "decode::string")]
    pub location: String,
    /// Employment type, e.g. "Full-time".
    #[serde(rename = "type", default, deserialize_with = "decode::string")]
    pub kind: String,
    #[serde(default, deserialize_with = "decode::string")]
    pub description: String,
    #[serde(default, deserialize_with = "decode::strings")]
    pub requirements: Vec<String>,
    #[serde(with = "timestamp")]
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl JobDraft {
    /// Blank input is ignored; the rest is trimmed.
    pub fn add_requirement(&mut self, requirement: &str) -> bool {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            return false;
        }
        self.requirements.push(requirement.to_owned());
        true
    }

    pub fn remove_requirement(&mut self, index: usize) -> Option<String> {
        (index < self.requirements.len()).then(|| self.requirements.remove(index))
    }

    fn to_posting(&self, posted_at: DateTime<Utc>) -> Result<JobPosting, ErrorDetail> {
        let requirements = self
            .requirements
            .iter()
            .map(|requirement| requirement.trim())
            .filter(|requirement| !requirement.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let fields = [&self.title, &self.location, &self.kind, &self.description];
        if fields.iter().any(|field| field.trim().is_empty()) || requirements.is_empty() {
            return Err(ErrorDetail::ValidationFailed(
                "fill all fields and add at least one requirement".to_owned(),
            ));
        }
        Ok(JobPosting {
            title: self.title.clone(),
            location: self.location.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            requirements,
            posted_at,
        })
    }
}

pub struct Jobs<'s, D> {
    documents: &'s D,
    collection: String,
}

impl<'s, D: DocumentStore> Jobs<'s, D> {
    pub fn new(documents: &'s D, collection: impl Into<String>) -> Self {
        Self {
            documents,
            collection: collection.into(),
        }
    }

    /// Resets `draft` on success.
    pub async fn create(&self, draft: &mut JobDraft) -> Result<String, Error> {
        let context = ErrorContext::new("create job").with_target(draft.title.clone());
        let posting = draft
            .to_posting(Utc::now())
            .map_err(|detail| context.error(detail))?;
        let document = to_document(&posting)
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        let id = self
            .documents
            .create(&self.collection, document)
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        info!(%id, title = %posting.title, "job posted");
        *draft = JobDraft::default();
        Ok(id)
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<(String, JobPosting)>, Error> {
        let context = ErrorContext::new("list jobs");
        let documents = self
            .documents
            .read_all(&self.collection, Some(&OrderBy::desc("postedAt")))
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        Ok(documents
            .into_iter()
            .filter_map(
                |(id, document)| match serde_json::from_value(Value::Object(document)) {
                    Ok(job) => Some((id, job)),
                    Err(error) => {
                        warn!(%id, %error, "skipping undecodable job");
                        None
                    }
                },
            )
            .collect())
    }

    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let context = ErrorContext::new("delete job").with_target(id);
        let outcome = self
            .documents
            .delete(&self.collection, id)
            .await
            .map_err(|error| context.error(ErrorDetail::PersistenceFailed(error.to_string())))?;
        if outcome == Outcome::NotFound {
            debug!(id, "job was already deleted");
        }
        Ok(())
    }
}
