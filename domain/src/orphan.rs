//! Detects annotations whose target no longer exists.
//!
//! Annotations deliberately survive conversation deletion, so a sweep is
//! needed to find the ones left behind, plus pending or applied annotations
//! whose segment or memory item disappeared after a reprocess or rollback.

use crate::error::Error;
use entity::annotation::{AnnotationKind, AnnotationState};
use entity::payload::AnnotationPayload;
use entity::Id;
use entity_api::{annotation, conversation, version};
use log::*;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Serialize)]
pub struct OrphanReport {
    pub scanned: usize,
    pub orphaned: u64,
}

/// What an annotation can still attach to in one conversation.
struct ConversationSnapshot {
    exists: bool,
    transcript_len: usize,
    memory_ids: HashSet<Id>,
}

/// Sweeps pending and applied annotations, optionally narrowed to one kind,
/// and marks orphans. An annotation is an orphan when its conversation is
/// gone, or when the segment or memory item it targets is absent from the
/// current active version. Applied annotations go stale the same way, e.g.
/// when the active pointer is rolled back past the version they produced;
/// orphaning them keeps the training exporter from shipping them.
pub async fn check(
    db: &DatabaseConnection,
    kind: Option<AnnotationKind>,
) -> Result<OrphanReport, Error> {
    let candidates = annotation::find_by_states(
        db,
        &[AnnotationState::Pending, AnnotationState::Applied],
        kind,
    )
    .await?;

    let mut snapshots: HashMap<Id, ConversationSnapshot> = HashMap::new();
    let mut orphan_ids = Vec::new();

    for candidate in &candidates {
        if !snapshots.contains_key(&candidate.conversation_id) {
            let snapshot = load_snapshot(db, candidate.conversation_id).await?;
            snapshots.insert(candidate.conversation_id, snapshot);
        }
        let snapshot = &snapshots[&candidate.conversation_id];

        if is_orphan(snapshot, &candidate.payload) {
            orphan_ids.push(candidate.id);
        }
    }

    let orphaned = annotation::mark_orphaned(db, &orphan_ids).await?;
    if orphaned > 0 {
        info!(
            "Orphan sweep marked {} of {} candidate annotations",
            orphaned,
            candidates.len()
        );
    }

    Ok(OrphanReport {
        scanned: candidates.len(),
        orphaned,
    })
}

/// Whether an annotation can no longer attach to anything. The referent
/// checks apply to pending and applied rows alike; an applied row whose
/// segment or memory item left the active version must not stay exportable.
fn is_orphan(snapshot: &ConversationSnapshot, payload: &AnnotationPayload) -> bool {
    if !snapshot.exists {
        return true;
    }
    match payload {
        AnnotationPayload::Diarization { segment_index, .. }
        | AnnotationPayload::TranscriptEdit { segment_index, .. } => {
            *segment_index < 0 || (*segment_index as usize) >= snapshot.transcript_len
        }
        AnnotationPayload::MemoryEdit { memory_id, .. } => !snapshot.memory_ids.contains(memory_id),
        AnnotationPayload::Insert { .. } | AnnotationPayload::TitleEdit { .. } => false,
    }
}

/// Bulk-deletes orphaned annotations. Returns the number removed.
pub async fn purge(db: &DatabaseConnection, kind: Option<AnnotationKind>) -> Result<u64, Error> {
    Ok(annotation::delete_orphaned(db, kind).await?)
}

async fn load_snapshot(
    db: &DatabaseConnection,
    conversation_id: Id,
) -> Result<ConversationSnapshot, Error> {
    let conversation = match conversation::exists(db, conversation_id).await? {
        true => conversation::find_by_id(db, conversation_id).await?,
        false => {
            return Ok(ConversationSnapshot {
                exists: false,
                transcript_len: 0,
                memory_ids: HashSet::new(),
            })
        }
    };

    let transcript_len = match conversation.active_transcript_version_id {
        Some(version_id) => version::find_by_id(db, version_id)
            .await?
            .content
            .segments()
            .len(),
        None => 0,
    };
    let memory_ids = match conversation.active_memory_version_id {
        Some(version_id) => version::find_by_id(db, version_id)
            .await?
            .content
            .memory_items()
            .iter()
            .map(|item| item.id)
            .collect(),
        None => HashSet::new(),
    };

    Ok(ConversationSnapshot {
        exists: true,
        transcript_len,
        memory_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::content::SegmentType;
    use uuid::Uuid;

    fn snapshot(transcript_len: usize, memory_ids: HashSet<Id>) -> ConversationSnapshot {
        ConversationSnapshot {
            exists: true,
            transcript_len,
            memory_ids,
        }
    }

    #[test]
    fn gone_conversation_orphans_every_kind() {
        let gone = ConversationSnapshot {
            exists: false,
            transcript_len: 0,
            memory_ids: HashSet::new(),
        };
        let payloads = [
            AnnotationPayload::TitleEdit {
                original_text: "a".to_string(),
                corrected_text: "b".to_string(),
            },
            AnnotationPayload::Insert {
                insert_after_index: -1,
                text: "hi".to_string(),
                segment_type: SegmentType::Speech,
                speaker: None,
            },
        ];
        for payload in &payloads {
            assert!(is_orphan(&gone, payload));
        }
    }

    #[test]
    fn out_of_range_segment_is_an_orphan_whatever_the_state() {
        // The segment check is state-agnostic: an applied diarization whose
        // segment left the active transcript (e.g. after the pointer was
        // rolled back) must drop out of the exportable set too.
        let payload = AnnotationPayload::Diarization {
            segment_index: 4,
            original_speaker: "Speaker 1".to_string(),
            corrected_speaker: "Ada".to_string(),
            segment_start_time: 40.0,
        };
        assert!(is_orphan(&snapshot(3, HashSet::new()), &payload));
        assert!(!is_orphan(&snapshot(5, HashSet::new()), &payload));
    }

    #[test]
    fn missing_memory_item_is_an_orphan() {
        let live_id = Uuid::new_v4();
        let mut ids = HashSet::new();
        ids.insert(live_id);

        let live = AnnotationPayload::MemoryEdit {
            memory_id: live_id,
            original_text: "fact".to_string(),
            corrected_text: "better fact".to_string(),
        };
        let dead = AnnotationPayload::MemoryEdit {
            memory_id: Uuid::new_v4(),
            original_text: "fact".to_string(),
            corrected_text: "better fact".to_string(),
        };
        assert!(!is_orphan(&snapshot(0, ids.clone()), &live));
        assert!(is_orphan(&snapshot(0, ids), &dead));
    }

    #[test]
    fn inserts_and_title_edits_never_go_stale_while_the_conversation_lives() {
        let payload = AnnotationPayload::Insert {
            insert_after_index: 99,
            text: "late".to_string(),
            segment_type: SegmentType::Note,
            speaker: None,
        };
        assert!(!is_orphan(&snapshot(0, HashSet::new()), &payload));
    }
}
