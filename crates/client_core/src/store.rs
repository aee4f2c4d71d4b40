use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use shared::domain::{CourseId, SectionId, SequenceId, UnitId};
use shared::protocol::AccessErrorCode;

/// Field-level union of two partial records: `Some` fields of `incoming`
/// overwrite the existing value, `None` fields leave it untouched. Merging
/// the same partial twice is a no-op the second time, and merges of
/// non-overlapping partials commute.
pub trait MergeRecord {
    fn merge_from(&mut self, incoming: Self);
}

macro_rules! merge_fields {
    ($dst:expr, $src:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field;
            }
        )+
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseRecord {
    pub name: Option<String>,
    pub number: Option<String>,
    pub org: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub has_access: Option<bool>,
    pub access_error_code: Option<AccessErrorCode>,
    pub enrollment_mode: Option<String>,
    pub is_enrollment_active: Option<bool>,
    /// Ordered child section ids from the block tree.
    pub section_ids: Option<Vec<SectionId>>,
}

impl MergeRecord for CourseRecord {
    fn merge_from(&mut self, incoming: Self) {
        merge_fields!(
            self,
            incoming,
            [
                name,
                number,
                org,
                start,
                end,
                has_access,
                access_error_code,
                enrollment_mode,
                is_enrollment_active,
                section_ids,
            ]
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionRecord {
    pub title: Option<String>,
    pub course_id: Option<CourseId>,
    pub sequence_ids: Option<Vec<SequenceId>>,
}

impl MergeRecord for SectionRecord {
    fn merge_from(&mut self, incoming: Self) {
        merge_fields!(self, incoming, [title, course_id, sequence_ids]);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatedContent {
    pub gated: bool,
    pub prereq_id: Option<String>,
    pub gated_section_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceRecord {
    pub title: Option<String>,
    pub course_id: Option<CourseId>,
    pub section_id: Option<SectionId>,
    /// Ordered child unit ids.
    pub unit_ids: Option<Vec<UnitId>>,
    pub gated_content: Option<GatedContent>,
    /// 0-based index of the learner's saved unit position.
    pub active_unit_index: Option<usize>,
    pub is_time_limited: Option<bool>,
    pub save_position: Option<bool>,
    pub complete: Option<bool>,
    pub bookmarked: Option<bool>,
}

impl MergeRecord for SequenceRecord {
    fn merge_from(&mut self, incoming: Self) {
        merge_fields!(
            self,
            incoming,
            [
                title,
                course_id,
                section_id,
                unit_ids,
                gated_content,
                active_unit_index,
                is_time_limited,
                save_position,
                complete,
                bookmarked,
            ]
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitRecord {
    pub title: Option<String>,
    pub sequence_id: Option<SequenceId>,
    pub page_title: Option<String>,
    pub complete: Option<bool>,
    pub bookmarked: Option<bool>,
}

impl MergeRecord for UnitRecord {
    fn merge_from(&mut self, incoming: Self) {
        merge_fields!(
            self,
            incoming,
            [title, sequence_id, page_title, complete, bookmarked]
        );
    }
}

/// Normalized, type-partitioned entity store. Grows monotonically through
/// merge writes; nothing in this layer deletes a record.
#[derive(Debug, Default)]
pub struct EntityStore {
    courses: HashMap<CourseId, CourseRecord>,
    sections: HashMap<SectionId, SectionRecord>,
    sequences: HashMap<SequenceId, SequenceRecord>,
    units: HashMap<UnitId, UnitRecord>,
}

impl EntityStore {
    pub fn merge_course(&mut self, id: CourseId, partial: CourseRecord) {
        merge_into(&mut self.courses, id, partial);
    }

    pub fn merge_section(&mut self, id: SectionId, partial: SectionRecord) {
        merge_into(&mut self.sections, id, partial);
    }

    pub fn merge_sequence(&mut self, id: SequenceId, partial: SequenceRecord) {
        merge_into(&mut self.sequences, id, partial);
    }

    pub fn merge_unit(&mut self, id: UnitId, partial: UnitRecord) {
        merge_into(&mut self.units, id, partial);
    }

    pub fn course(&self, id: &CourseId) -> Option<&CourseRecord> {
        self.courses.get(id)
    }

    pub fn section(&self, id: &SectionId) -> Option<&SectionRecord> {
        self.sections.get(id)
    }

    pub fn sequence(&self, id: &SequenceId) -> Option<&SequenceRecord> {
        self.sequences.get(id)
    }

    pub fn unit(&self, id: &UnitId) -> Option<&UnitRecord> {
        self.units.get(id)
    }

    /// Rollback write for the position mutation. Merge semantics cannot
    /// restore a previously-unset field, so optimistic rollbacks write the
    /// captured value directly, including `None`.
    pub fn set_sequence_active_unit_index(&mut self, id: &SequenceId, value: Option<usize>) {
        if let Some(sequence) = self.sequences.get_mut(id) {
            sequence.active_unit_index = value;
        }
    }

    /// Rollback write for the bookmark mutation; see
    /// [`Self::set_sequence_active_unit_index`].
    pub fn set_sequence_bookmarked(&mut self, id: &SequenceId, value: Option<bool>) {
        if let Some(sequence) = self.sequences.get_mut(id) {
            sequence.bookmarked = value;
        }
    }
}

fn merge_into<K, R>(map: &mut HashMap<K, R>, id: K, partial: R)
where
    K: Eq + Hash,
    R: MergeRecord + Default,
{
    map.entry(id).or_default().merge_from(partial);
}
