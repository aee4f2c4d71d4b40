//! Per-entity-type projections from wire payloads to partial store records.
//!
//! A compound payload (the block tree, a sequence with its items) is split
//! into one record per block, keyed by the block's own id, with parent-child
//! links kept as ordered id lists. Later fetches for the same ids then merge
//! additional fields onto records they did not create.

use shared::domain::{BlockKind, CourseId, SectionId, SequenceId, UnitId};
use shared::protocol::{
    BlockPayload, CourseBlocksPayload, CourseMetadataPayload, SequenceMetadataPayload,
};

use crate::store::{
    CourseRecord, EntityStore, GatedContent, SectionRecord, SequenceRecord, UnitRecord,
};

pub fn project_course_metadata(payload: &CourseMetadataPayload) -> CourseRecord {
    CourseRecord {
        name: Some(payload.name.clone()),
        number: payload.number.clone(),
        org: payload.org.clone(),
        start: payload.start,
        end: payload.end,
        has_access: Some(payload.course_access.has_access),
        access_error_code: payload.course_access.error_code,
        enrollment_mode: payload
            .enrollment
            .as_ref()
            .and_then(|enrollment| enrollment.mode.clone()),
        is_enrollment_active: payload
            .enrollment
            .as_ref()
            .map(|enrollment| enrollment.is_active),
        ..Default::default()
    }
}

/// Flattens a block tree into the store. Blocks of unknown type get no
/// record, and parent children lists keep only the ids of the structural
/// kind expected at that level.
pub fn merge_block_tree(
    store: &mut EntityStore,
    course_id: &CourseId,
    payload: &CourseBlocksPayload,
) {
    for block in payload.blocks.values() {
        match block.block_type {
            BlockKind::Course => {
                // The root block merges under the fetched course id, not its
                // own usage key, so structure and metadata land on one
                // record. Display fields come from the metadata endpoint;
                // the root block only contributes structure.
                store.merge_course(
                    course_id.clone(),
                    CourseRecord {
                        section_ids: Some(child_ids(payload, block, BlockKind::Chapter, |id| {
                            SectionId::new(id)
                        })),
                        ..Default::default()
                    },
                );
            }
            BlockKind::Chapter => {
                let sequence_ids =
                    child_ids(payload, block, BlockKind::Sequential, |id| SequenceId::new(id));
                for sequence_id in &sequence_ids {
                    store.merge_sequence(
                        sequence_id.clone(),
                        SequenceRecord {
                            section_id: Some(SectionId::new(&block.id)),
                            ..Default::default()
                        },
                    );
                }
                store.merge_section(
                    SectionId::new(&block.id),
                    SectionRecord {
                        title: Some(block.display_name.clone()),
                        course_id: Some(course_id.clone()),
                        sequence_ids: Some(sequence_ids),
                    },
                );
            }
            BlockKind::Sequential => {
                let unit_ids = child_ids(payload, block, BlockKind::Vertical, |id| UnitId::new(id));
                for unit_id in &unit_ids {
                    store.merge_unit(
                        unit_id.clone(),
                        UnitRecord {
                            sequence_id: Some(SequenceId::new(&block.id)),
                            ..Default::default()
                        },
                    );
                }
                store.merge_sequence(
                    SequenceId::new(&block.id),
                    SequenceRecord {
                        title: Some(block.display_name.clone()),
                        course_id: Some(course_id.clone()),
                        unit_ids: Some(unit_ids),
                        ..Default::default()
                    },
                );
            }
            BlockKind::Vertical => {
                store.merge_unit(
                    UnitId::new(&block.id),
                    UnitRecord {
                        title: Some(block.display_name.clone()),
                        ..Default::default()
                    },
                );
            }
            BlockKind::Other => {}
        }
    }
}

/// Ordered children of `block` that exist in the payload with `kind`.
fn child_ids<T>(
    payload: &CourseBlocksPayload,
    block: &BlockPayload,
    kind: BlockKind,
    make: impl Fn(&str) -> T,
) -> Vec<T> {
    block
        .children
        .iter()
        .filter(|child| {
            payload
                .blocks
                .get(*child)
                .is_some_and(|child_block| child_block.block_type == kind)
        })
        .map(|child| make(child))
        .collect()
}

pub fn project_sequence_metadata(
    payload: &SequenceMetadataPayload,
) -> (SequenceRecord, Vec<(UnitId, UnitRecord)>) {
    let unit_ids: Vec<UnitId> = payload.items.iter().map(|item| item.id.clone()).collect();
    let sequence = SequenceRecord {
        title: Some(payload.display_name.clone()),
        unit_ids: (!unit_ids.is_empty()).then_some(unit_ids),
        gated_content: payload.gated_content.as_ref().map(|gated| GatedContent {
            gated: gated.gated,
            prereq_id: gated.prereq_id.clone(),
            gated_section_name: gated.gated_section_name.clone(),
        }),
        // The wire position is 1-based; the store keeps a 0-based index.
        active_unit_index: payload
            .position
            .map(|position| position.saturating_sub(1) as usize),
        is_time_limited: Some(payload.is_time_limited),
        save_position: Some(payload.save_position),
        complete: payload.complete,
        bookmarked: payload.bookmarked,
        ..Default::default()
    };

    let units = payload
        .items
        .iter()
        .map(|item| {
            (
                item.id.clone(),
                UnitRecord {
                    sequence_id: Some(payload.item_id.clone()),
                    page_title: item.page_title.clone(),
                    complete: item.complete,
                    bookmarked: item.bookmarked,
                    ..Default::default()
                },
            )
        })
        .collect();

    (sequence, units)
}
