use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::domain::{CourseId, SequenceId, UnitId};
use shared::protocol::{
    BookmarkPostBody, CompletionBatchPayload, CompletionPostBody, CourseBlocksPayload,
    CourseMetadataPayload, PositionPostBody, SequenceMetadataPayload,
};
use url::Url;

use crate::error::ApiFailure;

/// Authenticated course-domain API the orchestrators call. Injected so the
/// orchestration layer can be exercised against a double; the reqwest-backed
/// implementation lives below.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn get_course_metadata(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseMetadataPayload, ApiFailure>;

    async fn get_course_blocks(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseBlocksPayload, ApiFailure>;

    async fn get_sequence_metadata(
        &self,
        sequence_id: &SequenceId,
    ) -> Result<SequenceMetadataPayload, ApiFailure>;

    async fn post_completion_check(
        &self,
        course_id: &CourseId,
        sequence_id: &SequenceId,
        unit_id: &UnitId,
    ) -> Result<CompletionBatchPayload, ApiFailure>;

    /// `position` is the 1-based wire form.
    async fn post_sequence_position(
        &self,
        course_id: &CourseId,
        sequence_id: &SequenceId,
        position: u32,
    ) -> Result<(), ApiFailure>;

    async fn post_bookmark(
        &self,
        sequence_id: &SequenceId,
        bookmarked: bool,
    ) -> Result<(), ApiFailure>;
}

/// Default collaborator when no backend is configured; every call fails.
pub struct MissingCourseApi;

fn unavailable() -> ApiFailure {
    ApiFailure::Network("course api is unavailable".to_string())
}

#[async_trait]
impl CourseApi for MissingCourseApi {
    async fn get_course_metadata(
        &self,
        _course_id: &CourseId,
    ) -> Result<CourseMetadataPayload, ApiFailure> {
        Err(unavailable())
    }

    async fn get_course_blocks(
        &self,
        _course_id: &CourseId,
    ) -> Result<CourseBlocksPayload, ApiFailure> {
        Err(unavailable())
    }

    async fn get_sequence_metadata(
        &self,
        _sequence_id: &SequenceId,
    ) -> Result<SequenceMetadataPayload, ApiFailure> {
        Err(unavailable())
    }

    async fn post_completion_check(
        &self,
        _course_id: &CourseId,
        _sequence_id: &SequenceId,
        _unit_id: &UnitId,
    ) -> Result<CompletionBatchPayload, ApiFailure> {
        Err(unavailable())
    }

    async fn post_sequence_position(
        &self,
        _course_id: &CourseId,
        _sequence_id: &SequenceId,
        _position: u32,
    ) -> Result<(), ApiFailure> {
        Err(unavailable())
    }

    async fn post_bookmark(
        &self,
        _sequence_id: &SequenceId,
        _bookmarked: bool,
    ) -> Result<(), ApiFailure> {
        Err(unavailable())
    }
}

pub struct HttpCourseApi {
    http: Client,
    base_url: String,
    username: String,
}

impl HttpCourseApi {
    pub fn new(base_url: impl AsRef<str>, username: impl Into<String>) -> Result<Self> {
        let base_url = base_url.as_ref();
        Url::parse(base_url).with_context(|| format!("invalid course api url '{base_url}'"))?;
        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
        })
    }
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    async fn get_course_metadata(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseMetadataPayload, ApiFailure> {
        let payload = self
            .http
            .get(format!(
                "{}/api/courses/v2/courses/{course_id}",
                self.base_url
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    async fn get_course_blocks(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseBlocksPayload, ApiFailure> {
        let payload = self
            .http
            .get(format!("{}/api/courses/v2/blocks/", self.base_url))
            .query(&[
                ("course_id", course_id.as_str()),
                ("username", &self.username),
                ("depth", "all"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    async fn get_sequence_metadata(
        &self,
        sequence_id: &SequenceId,
    ) -> Result<SequenceMetadataPayload, ApiFailure> {
        let payload = self
            .http
            .get(format!(
                "{}/api/courseware/sequence/{sequence_id}",
                self.base_url
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    async fn post_completion_check(
        &self,
        course_id: &CourseId,
        _sequence_id: &SequenceId,
        unit_id: &UnitId,
    ) -> Result<CompletionBatchPayload, ApiFailure> {
        let body = CompletionPostBody {
            username: self.username.clone(),
            course_key: course_id.clone(),
            blocks: HashMap::from([(unit_id.clone(), 1.0)]),
        };
        let payload = self
            .http
            .post(format!(
                "{}/api/completion/v1/completion-batch",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    async fn post_sequence_position(
        &self,
        course_id: &CourseId,
        sequence_id: &SequenceId,
        position: u32,
    ) -> Result<(), ApiFailure> {
        self.http
            .post(format!(
                "{}/api/courseware/course/{course_id}/sequence/{sequence_id}/position",
                self.base_url
            ))
            .json(&PositionPostBody { position })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn post_bookmark(
        &self,
        sequence_id: &SequenceId,
        bookmarked: bool,
    ) -> Result<(), ApiFailure> {
        if bookmarked {
            self.http
                .post(format!("{}/api/bookmarks/v1/bookmarks/", self.base_url))
                .json(&BookmarkPostBody {
                    usage_id: sequence_id.as_str().to_string(),
                })
                .send()
                .await?
                .error_for_status()?;
        } else {
            self.http
                .delete(format!(
                    "{}/api/bookmarks/v1/bookmarks/{},{sequence_id}/",
                    self.base_url, self.username
                ))
                .send()
                .await?
                .error_for_status()?;
        }
        Ok(())
    }
}
