use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BlockKind, CourseId, SequenceId, UnitId};

/// Access-denial codes the course metadata endpoint reports when a
/// well-formed response carries `has_access = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessErrorCode {
    AuditExpired,
    CourseNotStarted,
    EnrollmentRequired,
    UnfulfilledMilestones,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseAccessPayload {
    pub has_access: bool,
    #[serde(default)]
    pub error_code: Option<AccessErrorCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentPayload {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseMetadataPayload {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub course_access: CourseAccessPayload,
    #[serde(default)]
    pub enrollment: Option<EnrollmentPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockKind,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseBlocksPayload {
    pub root: String,
    pub blocks: HashMap<String, BlockPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatedContentPayload {
    pub gated: bool,
    #[serde(default)]
    pub prereq_id: Option<String>,
    #[serde(default)]
    pub gated_section_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceItemPayload {
    pub id: UnitId,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub complete: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceMetadataPayload {
    pub item_id: SequenceId,
    pub display_name: String,
    #[serde(default)]
    pub gated_content: Option<GatedContentPayload>,
    /// 1-based unit position as served; absent when the learner has no
    /// saved position in this sequence.
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub is_time_limited: bool,
    #[serde(default)]
    pub save_position: bool,
    #[serde(default)]
    pub complete: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
    #[serde(default)]
    pub items: Vec<SequenceItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionPostBody {
    pub username: String,
    pub course_key: CourseId,
    pub blocks: HashMap<UnitId, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionBatchPayload {
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPostBody {
    /// 1-based on the wire.
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkPostBody {
    pub usage_id: String,
}
