//! Applies pending annotations as a new immutable version.
//!
//! One apply runs per conversation at a time, guarded by an in-process lock
//! set. All row changes happen in a single database transaction so a failed
//! apply leaves no half-applied state behind.

use crate::error::Error;
use crate::preview;
use entity::annotation::AnnotationKind;
use entity::annotations;
use entity::content::VersionContent;
use entity::payload::AnnotationPayload;
use entity::version::{VersionKind, VersionSource};
use entity::Id;
use entity_api::error::EntityApiErrorKind;
use entity_api::{annotation, conversation, version};
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Conversations with an apply currently in flight. Shared through the
/// application state so every request path sees the same set.
#[derive(Debug, Default)]
pub struct ApplyLocks {
    in_flight: Mutex<HashSet<Id>>,
}

impl ApplyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the conversation for an apply, or returns None when one is
    /// already running. The claim is released when the guard drops.
    fn try_acquire(&self, conversation_id: Id) -> Option<ApplyGuard<'_>> {
        let mut in_flight = self.in_flight.lock().ok()?;
        if in_flight.insert(conversation_id) {
            Some(ApplyGuard {
                locks: self,
                conversation_id,
            })
        } else {
            None
        }
    }
}

struct ApplyGuard<'a> {
    locks: &'a ApplyLocks,
    conversation_id: Id,
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.locks.in_flight.lock() {
            in_flight.remove(&self.conversation_id);
        }
    }
}

/// One annotation skipped by an apply because its target no longer exists.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedAnnotation {
    pub annotation_id: Id,
    pub reason: String,
}

/// Outcome of applying all pending annotations for a conversation.
#[derive(Debug, Default, Serialize)]
pub struct ApplyReport {
    pub new_transcript_version_id: Option<Id>,
    pub new_memory_version_id: Option<Id>,
    pub applied_count: usize,
    pub skipped_count: usize,
    pub skipped: Vec<SkippedAnnotation>,
}

/// Applies every pending annotation on the conversation. Stale annotations
/// are marked orphaned rather than applied; everything else lands in a new
/// transcript version, a title update, or a new memory version, and is
/// marked applied, all in one transaction.
pub async fn apply_all(
    db: &DatabaseConnection,
    locks: &ApplyLocks,
    conversation_id: Id,
) -> Result<ApplyReport, Error> {
    let _guard = locks.try_acquire(conversation_id).ok_or_else(|| {
        info!("Apply already in progress for conversation {}", conversation_id);
        Error::conflict()
    })?;

    // A deleted conversation is a no-op apply, not an error; its leftover
    // annotations are the orphan sweep's business.
    let conversation = match conversation::find_by_id(db, conversation_id).await {
        Ok(conversation) => conversation,
        Err(err) if err.error_kind == EntityApiErrorKind::RecordNotFound => {
            debug!("Conversation {} is gone, nothing to apply", conversation_id);
            return Ok(ApplyReport::default());
        }
        Err(err) => return Err(err.into()),
    };
    let pending = annotation::find_pending_by_conversation_id(db, conversation_id).await?;
    if pending.is_empty() {
        debug!("Nothing pending for conversation {}", conversation_id);
        return Ok(ApplyReport::default());
    }

    let base_segments = match conversation.active_transcript_version_id {
        Some(version_id) => version::find_by_id(db, version_id)
            .await?
            .content
            .segments()
            .to_vec(),
        None => Vec::new(),
    };
    let memory_version = match conversation.active_memory_version_id {
        Some(version_id) => Some(version::find_by_id(db, version_id).await?),
        None => None,
    };
    let memory_ids: HashSet<Id> = memory_version
        .as_ref()
        .map(|version| {
            version
                .content
                .memory_items()
                .iter()
                .map(|item| item.id)
                .collect()
        })
        .unwrap_or_default();

    let (applicable, skipped) = partition_stale(base_segments.len(), &memory_ids, pending);

    let txn = db.begin().await?;

    let stale_ids: Vec<Id> = skipped.iter().map(|s| s.annotation_id).collect();
    annotation::mark_orphaned(&txn, &stale_ids).await?;

    let mut report = ApplyReport {
        skipped_count: skipped.len(),
        skipped,
        ..Default::default()
    };

    let transcript_targets: Vec<annotations::Model> = applicable
        .iter()
        .filter(|a| {
            matches!(
                a.kind,
                AnnotationKind::Diarization | AnnotationKind::TranscriptEdit | AnnotationKind::Insert
            )
        })
        .cloned()
        .collect();
    if !transcript_targets.is_empty() {
        let merged = preview::merge(&base_segments, &transcript_targets);
        let new_version = version::create(
            &txn,
            conversation_id,
            VersionKind::Transcript,
            VersionContent::Transcript(merged),
            VersionSource::AnnotationApply,
            conversation.active_transcript_version_id,
        )
        .await?;
        conversation::set_active_version(&txn, conversation_id, VersionKind::Transcript, new_version.id)
            .await?;
        report.new_transcript_version_id = Some(new_version.id);
    }

    // The newest pending title edit wins when there are several.
    let new_title = applicable
        .iter()
        .rev()
        .find_map(|annotation| match &annotation.payload {
            AnnotationPayload::TitleEdit { corrected_text, .. } => Some(corrected_text.clone()),
            _ => None,
        });
    if let Some(title) = new_title {
        conversation::update_title(&txn, conversation_id, title).await?;
    }

    let memory_edits: HashMap<Id, String> = applicable
        .iter()
        .filter_map(|annotation| match &annotation.payload {
            AnnotationPayload::MemoryEdit {
                memory_id,
                corrected_text,
                ..
            } => Some((*memory_id, corrected_text.clone())),
            _ => None,
        })
        .collect();
    if !memory_edits.is_empty() {
        // partition_stale already orphaned edits whose memory item is gone,
        // so everything left targets an item of the active memory version.
        if let Some(memory_version) = &memory_version {
            let mut items = memory_version.content.memory_items().to_vec();
            for item in items.iter_mut() {
                if let Some(corrected) = memory_edits.get(&item.id) {
                    item.text = corrected.clone();
                }
            }
            let new_version = version::create(
                &txn,
                conversation_id,
                VersionKind::Memory,
                VersionContent::Memory(items),
                VersionSource::AnnotationApply,
                conversation.active_memory_version_id,
            )
            .await?;
            conversation::set_active_version(&txn, conversation_id, VersionKind::Memory, new_version.id)
                .await?;
            report.new_memory_version_id = Some(new_version.id);
        }
    }

    let applied_ids: Vec<Id> = applicable.iter().map(|a| a.id).collect();
    annotation::mark_applied(&txn, &applied_ids).await?;
    report.applied_count = applied_ids.len();

    txn.commit().await?;

    info!(
        "Applied {} annotations for conversation {} ({} skipped)",
        report.applied_count, conversation_id, report.skipped_count
    );
    Ok(report)
}

/// Splits pending annotations into those that can apply against the current
/// active versions and those whose target no longer exists.
fn partition_stale(
    base_len: usize,
    memory_ids: &HashSet<Id>,
    pending: Vec<annotations::Model>,
) -> (Vec<annotations::Model>, Vec<SkippedAnnotation>) {
    let mut applicable = Vec::new();
    let mut skipped = Vec::new();

    for annotation in pending {
        let stale_reason = match &annotation.payload {
            AnnotationPayload::Diarization { segment_index, .. }
            | AnnotationPayload::TranscriptEdit { segment_index, .. } => {
                if (*segment_index as usize) >= base_len || *segment_index < 0 {
                    Some(format!(
                        "segment {} no longer exists in the active transcript",
                        segment_index
                    ))
                } else {
                    None
                }
            }
            AnnotationPayload::MemoryEdit { memory_id, .. } => {
                if memory_ids.contains(memory_id) {
                    None
                } else {
                    Some(format!(
                        "memory item {} no longer exists in the active memory",
                        memory_id
                    ))
                }
            }
            // Inserts clamp to the transcript bounds and title edits always
            // have a target, so neither can go stale here.
            AnnotationPayload::Insert { .. } | AnnotationPayload::TitleEdit { .. } => None,
        };

        match stale_reason {
            Some(reason) => skipped.push(SkippedAnnotation {
                annotation_id: annotation.id,
                reason,
            }),
            None => applicable.push(annotation),
        }
    }

    (applicable, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use entity::annotation::AnnotationState;
    use entity::content::SegmentType;
    use uuid::Uuid;

    fn pending(payload: AnnotationPayload) -> annotations::Model {
        let now = Utc::now();
        annotations::Model {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            kind: payload.kind(),
            state: AnnotationState::Pending,
            payload,
            error_message: None,
            created_at: now.into(),
            updated_at: now.into(),
            applied_at: None,
            trained_at: None,
        }
    }

    #[test]
    fn partition_keeps_in_range_and_skips_out_of_range() {
        let in_range = pending(AnnotationPayload::TranscriptEdit {
            segment_index: 1,
            original_text: "b".to_string(),
            corrected_text: "b fixed".to_string(),
        });
        let out_of_range = pending(AnnotationPayload::Diarization {
            segment_index: 7,
            original_speaker: "Speaker 1".to_string(),
            corrected_speaker: "Alice".to_string(),
            segment_start_time: 70.0,
        });
        let out_of_range_id = out_of_range.id;

        let (applicable, skipped) =
            partition_stale(3, &HashSet::new(), vec![in_range, out_of_range]);

        assert_eq!(applicable.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].annotation_id, out_of_range_id);
    }

    #[test]
    fn partition_never_skips_inserts_or_title_edits() {
        let items = vec![
            pending(AnnotationPayload::Insert {
                insert_after_index: 50,
                text: "late".to_string(),
                segment_type: SegmentType::Note,
                speaker: None,
            }),
            pending(AnnotationPayload::TitleEdit {
                original_text: "Old".to_string(),
                corrected_text: "New".to_string(),
            }),
        ];

        let (applicable, skipped) = partition_stale(0, &HashSet::new(), items);

        assert_eq!(applicable.len(), 2);
        assert!(skipped.is_empty());
    }

    #[test]
    fn partition_skips_memory_edits_for_missing_items() {
        let live_id = Uuid::new_v4();
        let mut memory_ids = HashSet::new();
        memory_ids.insert(live_id);

        let live = pending(AnnotationPayload::MemoryEdit {
            memory_id: live_id,
            original_text: "fact".to_string(),
            corrected_text: "corrected fact".to_string(),
        });
        let dead = pending(AnnotationPayload::MemoryEdit {
            memory_id: Uuid::new_v4(),
            original_text: "gone".to_string(),
            corrected_text: "still gone".to_string(),
        });

        let (applicable, skipped) = partition_stale(0, &memory_ids, vec![live, dead]);

        assert_eq!(applicable.len(), 1);
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn locks_are_exclusive_per_conversation() {
        let locks = ApplyLocks::new();
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let guard = locks.try_acquire(id);
        assert!(guard.is_some());
        assert!(locks.try_acquire(id).is_none());
        assert!(locks.try_acquire(other).is_some());

        drop(guard);
        assert!(locks.try_acquire(id).is_some());
    }
}

#[cfg(test)]
// seaORM's mock feature removes the Clone impl from DatabaseConnection, so
// these stay behind the mock feature gate.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod db_tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    #[tokio::test]
    async fn apply_on_a_deleted_conversation_is_a_no_op() -> Result<(), Error> {
        // The conversation lookup comes back empty; apply reports zero work
        // instead of failing.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<entity::conversations::Model>::new()])
            .into_connection();
        let locks = ApplyLocks::new();

        let report = apply_all(&db, &locks, Uuid::new_v4()).await?;

        assert_eq!(report.applied_count, 0);
        assert_eq!(report.skipped_count, 0);
        assert!(report.new_transcript_version_id.is_none());
        assert!(report.new_memory_version_id.is_none());

        Ok(())
    }
}
