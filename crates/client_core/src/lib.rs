//! Client-side data orchestration for the course-viewing experience.
//!
//! [`CourseClient`] coordinates the fetch lifecycle of courses and
//! sequences: it fans requests out to the injected [`CourseApi`], merges
//! successful payloads into the normalized [`EntityStore`], folds partial
//! failures into a single terminal [`ResourceStatus`], and applies user
//! mutations optimistically with rollback. Request failures never escape an
//! orchestrated call; the UI observes statuses and store records only.

use std::sync::Arc;

use futures::join;
use shared::domain::{CourseId, SequenceId, UnitId};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error};

pub mod error;
pub mod normalize;
pub mod status;
pub mod store;
pub mod transport;

pub use error::{ApiFailure, ClientError};
pub use status::{FetchAttempt, ResourceKey, ResourceStatus, StatusTracker};
pub use store::{
    CourseRecord, EntityStore, GatedContent, MergeRecord, SectionRecord, SequenceRecord,
    UnitRecord,
};
pub use transport::{CourseApi, HttpCourseApi, MissingCourseApi};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    StatusChanged {
        resource: ResourceKey,
        status: ResourceStatus,
    },
    Error(String),
}

#[derive(Default)]
struct ClientState {
    store: EntityStore,
    statuses: StatusTracker,
}

pub struct CourseClient {
    api: Arc<dyn CourseApi>,
    state: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl CourseClient {
    pub fn new() -> Arc<Self> {
        Self::with_api(Arc::new(MissingCourseApi))
    }

    pub fn with_api(api: Arc<dyn CourseApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            state: Mutex::new(ClientState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn course_status(&self, course_id: &CourseId) -> ResourceStatus {
        let state = self.state.lock().await;
        state
            .statuses
            .status(&ResourceKey::Course(course_id.clone()))
    }

    pub async fn sequence_status(&self, sequence_id: &SequenceId) -> ResourceStatus {
        let state = self.state.lock().await;
        state
            .statuses
            .status(&ResourceKey::Sequence(sequence_id.clone()))
    }

    pub async fn course(&self, course_id: &CourseId) -> Option<CourseRecord> {
        self.state.lock().await.store.course(course_id).cloned()
    }

    pub async fn sequence(&self, sequence_id: &SequenceId) -> Option<SequenceRecord> {
        self.state.lock().await.store.sequence(sequence_id).cloned()
    }

    pub async fn unit(&self, unit_id: &UnitId) -> Option<UnitRecord> {
        self.state.lock().await.store.unit(unit_id).cloned()
    }

    /// Fetches course metadata and the course block tree concurrently and
    /// drives `pending -> {loaded, denied, failed}` for the course.
    ///
    /// Both requests are load-critical: either failure classifies the fetch
    /// as `Failed`, but the sibling's successful payload is still merged.
    /// Request failures are absorbed here; the terminal status is the
    /// outcome.
    pub async fn fetch_course(&self, course_id: &CourseId) {
        let resource = ResourceKey::Course(course_id.clone());
        let attempt = self.begin(resource.clone()).await;

        let (metadata, blocks) = join!(
            self.api.get_course_metadata(course_id),
            self.api.get_course_blocks(course_id),
        );

        let mut load_failed = false;
        let mut access_denied = false;
        {
            let mut state = self.state.lock().await;
            match metadata {
                Ok(payload) => {
                    access_denied = !payload.course_access.has_access;
                    state
                        .store
                        .merge_course(course_id.clone(), normalize::project_course_metadata(&payload));
                }
                Err(err) => {
                    load_failed = true;
                    self.report_error(&format!("course metadata fetch failed for {course_id}"), &err);
                }
            }
            match blocks {
                Ok(payload) => {
                    normalize::merge_block_tree(&mut state.store, course_id, &payload);
                }
                Err(err) => {
                    load_failed = true;
                    self.report_error(&format!("course blocks fetch failed for {course_id}"), &err);
                }
            }
        }

        let status = if load_failed {
            ResourceStatus::Failed
        } else if access_denied {
            ResourceStatus::Denied
        } else {
            ResourceStatus::Loaded
        };
        self.settle(resource, attempt, status).await;
    }

    /// Fetches sequence metadata and merges it onto records the course
    /// fetch may already have created for the same ids.
    pub async fn fetch_sequence(&self, sequence_id: &SequenceId) {
        let resource = ResourceKey::Sequence(sequence_id.clone());
        let attempt = self.begin(resource.clone()).await;

        let status = match self.api.get_sequence_metadata(sequence_id).await {
            Ok(payload) => {
                let (sequence, units) = normalize::project_sequence_metadata(&payload);
                let mut state = self.state.lock().await;
                state.store.merge_sequence(sequence_id.clone(), sequence);
                for (unit_id, unit) in units {
                    state.store.merge_unit(unit_id, unit);
                }
                ResourceStatus::Loaded
            }
            Err(err) => {
                self.report_error(
                    &format!("sequence metadata fetch failed for {sequence_id}"),
                    &err,
                );
                ResourceStatus::Failed
            }
        };
        self.settle(resource, attempt, status).await;
    }

    /// Optimistically saves the learner's unit position in a sequence.
    ///
    /// The store is updated before the POST is issued; on request failure
    /// the captured previous value (including "previously unset") is
    /// restored exactly and the error is reported. After this call settles
    /// the store holds either the new value or the original one, never an
    /// intermediate. Requires the sequence to have been loaded.
    pub async fn save_sequence_position(
        &self,
        course_id: &CourseId,
        sequence_id: &SequenceId,
        unit_index: usize,
    ) -> Result<(), ClientError> {
        let previous = {
            let mut state = self.state.lock().await;
            let Some(sequence) = state.store.sequence(sequence_id) else {
                return Err(ClientError::SequenceNotLoaded(sequence_id.clone()));
            };
            let previous = sequence.active_unit_index;
            state.store.merge_sequence(
                sequence_id.clone(),
                SequenceRecord {
                    active_unit_index: Some(unit_index),
                    ..Default::default()
                },
            );
            previous
        };

        // 1-based on the wire; saturate rather than wrap for indexes that
        // exceed the wire width.
        let position = u32::try_from(unit_index).map_or(u32::MAX, |index| index.saturating_add(1));
        if let Err(err) = self
            .api
            .post_sequence_position(course_id, sequence_id, position)
            .await
        {
            self.state
                .lock()
                .await
                .store
                .set_sequence_active_unit_index(sequence_id, previous);
            self.report_error(
                &format!("position save failed for {sequence_id}, rolled back"),
                &err,
            );
        }
        Ok(())
    }

    /// Detached variant of [`Self::save_sequence_position`]: the save runs
    /// as a fire-and-forget task and the caller does not observe its
    /// completion. Intentional non-blocking contract for navigation paths
    /// that must not wait on the network; outcomes surface on the event
    /// channel only.
    pub fn spawn_save_sequence_position(
        self: &Arc<Self>,
        course_id: CourseId,
        sequence_id: SequenceId,
        unit_index: usize,
    ) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = client
                .save_sequence_position(&course_id, &sequence_id, unit_index)
                .await
            {
                let _ = client.events.send(ClientEvent::Error(err.to_string()));
            }
        });
    }

    /// Optimistically flips the sequence bookmark flag, with the same
    /// rollback contract as [`Self::save_sequence_position`].
    pub async fn toggle_bookmark(&self, sequence_id: &SequenceId) -> Result<(), ClientError> {
        let (previous, bookmarked) = {
            let mut state = self.state.lock().await;
            let Some(sequence) = state.store.sequence(sequence_id) else {
                return Err(ClientError::SequenceNotLoaded(sequence_id.clone()));
            };
            let previous = sequence.bookmarked;
            let bookmarked = !previous.unwrap_or(false);
            state.store.merge_sequence(
                sequence_id.clone(),
                SequenceRecord {
                    bookmarked: Some(bookmarked),
                    ..Default::default()
                },
            );
            (previous, bookmarked)
        };

        if let Err(err) = self.api.post_bookmark(sequence_id, bookmarked).await {
            self.state
                .lock()
                .await
                .store
                .set_sequence_bookmarked(sequence_id, previous);
            self.report_error(
                &format!("bookmark update failed for {sequence_id}, rolled back"),
                &err,
            );
        }
        Ok(())
    }

    /// Asks the server whether a unit is now complete and merges the result
    /// onto the unit record. Requires both the sequence and the unit to
    /// already be in the store (a prior course or sequence fetch).
    pub async fn check_block_completion(
        &self,
        course_id: &CourseId,
        sequence_id: &SequenceId,
        unit_id: &UnitId,
    ) -> Result<(), ClientError> {
        {
            let state = self.state.lock().await;
            if state.store.sequence(sequence_id).is_none() {
                return Err(ClientError::SequenceNotLoaded(sequence_id.clone()));
            }
            if state.store.unit(unit_id).is_none() {
                return Err(ClientError::UnitNotLoaded(unit_id.clone()));
            }
        }

        match self
            .api
            .post_completion_check(course_id, sequence_id, unit_id)
            .await
        {
            Ok(payload) => {
                if payload.complete {
                    self.state.lock().await.store.merge_unit(
                        unit_id.clone(),
                        UnitRecord {
                            complete: Some(true),
                            ..Default::default()
                        },
                    );
                }
            }
            Err(err) => {
                self.report_error(&format!("completion check failed for {unit_id}"), &err);
            }
        }
        Ok(())
    }

    async fn begin(&self, resource: ResourceKey) -> FetchAttempt {
        let attempt = {
            let mut state = self.state.lock().await;
            state.statuses.begin(resource.clone())
        };
        self.emit_status(resource, ResourceStatus::Pending);
        attempt
    }

    async fn settle(&self, resource: ResourceKey, attempt: FetchAttempt, status: ResourceStatus) {
        let applied = {
            let mut state = self.state.lock().await;
            state.statuses.settle(&resource, attempt, status)
        };
        if applied {
            self.emit_status(resource, status);
        } else {
            debug!(
                resource = %resource,
                ?status,
                "dropping stale terminal status from a superseded fetch attempt"
            );
        }
    }

    fn emit_status(&self, resource: ResourceKey, status: ResourceStatus) {
        let _ = self
            .events
            .send(ClientEvent::StatusChanged { resource, status });
    }

    fn report_error(&self, context: &str, err: &ApiFailure) {
        error!("{context}: {err}");
        let _ = self
            .events
            .send(ClientEvent::Error(format!("{context}: {err}")));
    }
}

#[cfg(test)]
mod tests;
