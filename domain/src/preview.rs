//! Non-destructive merge of pending annotations over the active transcript.
//!
//! The merge never touches stored rows; it produces the transcript a client
//! would get if every pending annotation were applied right now. The apply
//! engine reuses the same merge to build the content of the new version, so
//! preview and apply cannot drift apart.

use crate::error::Error;
use entity::annotations;
use entity::content::Segment;
use entity::payload::AnnotationPayload;
use entity::Id;
use entity_api::{annotation, conversation, version};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::BTreeMap;

/// The merged view of a conversation with all pending annotations applied.
#[derive(Debug, Serialize)]
pub struct Preview {
    pub base_version_id: Option<Id>,
    pub title: String,
    pub segments: Vec<Segment>,
    pub pending_count: usize,
}

/// Builds the preview for one conversation from its active transcript
/// version and pending annotations.
pub async fn preview(db: &DatabaseConnection, conversation_id: Id) -> Result<Preview, Error> {
    let conversation = conversation::find_by_id(db, conversation_id).await?;
    let pending = annotation::find_pending_by_conversation_id(db, conversation_id).await?;

    let base = match conversation.active_transcript_version_id {
        Some(version_id) => version::find_by_id(db, version_id)
            .await?
            .content
            .segments()
            .to_vec(),
        None => Vec::new(),
    };

    let title = pending
        .iter()
        .rev()
        .find_map(|annotation| match &annotation.payload {
            AnnotationPayload::TitleEdit { corrected_text, .. } => Some(corrected_text.clone()),
            _ => None,
        })
        .unwrap_or_else(|| conversation.title.clone());

    let pending_count = pending.len();
    let segments = merge(&base, &pending);

    Ok(Preview {
        base_version_id: conversation.active_transcript_version_id,
        title,
        segments,
        pending_count,
    })
}

/// Merges pending annotations over a base transcript. In-place corrections
/// land first, then inserts are spliced in, then the whole list is
/// renumbered. Annotations pointing at segments the base no longer has are
/// silently skipped; the apply engine is the one that orphans them.
///
/// `pending` must be in creation order so that inserts sharing an anchor
/// keep their relative order.
pub fn merge(base: &[Segment], pending: &[annotations::Model]) -> Vec<Segment> {
    let mut segments = base.to_vec();

    for annotation in pending {
        match &annotation.payload {
            AnnotationPayload::Diarization {
                segment_index,
                corrected_speaker,
                ..
            } => {
                if let Some(segment) = segment_at_mut(&mut segments, *segment_index) {
                    segment.speaker = corrected_speaker.clone();
                }
            }
            AnnotationPayload::TranscriptEdit {
                segment_index,
                corrected_text,
                ..
            } => {
                if let Some(segment) = segment_at_mut(&mut segments, *segment_index) {
                    segment.text = corrected_text.clone();
                }
            }
            _ => {}
        }
    }

    // Group inserts by anchor segment index. An anchor of -1 means the very
    // front; anchors past the end fold into the last segment so the insert
    // still lands instead of vanishing.
    let last_index = segments.len() as i32 - 1;
    let mut inserts: BTreeMap<i32, Vec<Segment>> = BTreeMap::new();
    for annotation in pending {
        if let AnnotationPayload::Insert {
            insert_after_index,
            text,
            segment_type,
            speaker,
        } = &annotation.payload
        {
            let anchor = (*insert_after_index).min(last_index).max(-1);
            inserts.entry(anchor).or_default().push(Segment {
                index: 0,
                speaker: speaker.clone().unwrap_or_default(),
                text: text.clone(),
                segment_type: segment_type.clone(),
                start: 0.0,
                end: 0.0,
            });
        }
    }

    // Splice from the highest anchor down so earlier anchors keep their
    // positions. Inserted segments borrow the anchor's end time.
    for (&anchor, group) in inserts.iter().rev() {
        let position = (anchor + 1) as usize;
        let timestamp = if anchor >= 0 {
            segments[anchor as usize].end
        } else {
            0.0
        };
        let spliced = group.iter().cloned().map(|mut segment| {
            segment.start = timestamp;
            segment.end = timestamp;
            segment
        });
        segments.splice(position..position, spliced);
    }

    for (position, segment) in segments.iter_mut().enumerate() {
        segment.index = position as i32;
    }

    segments
}

fn segment_at_mut(segments: &mut [Segment], index: i32) -> Option<&mut Segment> {
    usize::try_from(index)
        .ok()
        .and_then(|index| segments.get_mut(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use entity::annotation::{AnnotationKind, AnnotationState};
    use entity::content::SegmentType;
    use uuid::Uuid;

    fn segment(index: i32, speaker: &str, text: &str) -> Segment {
        Segment {
            index,
            speaker: speaker.to_string(),
            text: text.to_string(),
            segment_type: SegmentType::Speech,
            start: index as f64 * 10.0,
            end: index as f64 * 10.0 + 5.0,
        }
    }

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

    fn insert_after(index: i32, text: &str) -> annotations::Model {
        pending(AnnotationPayload::Insert {
            insert_after_index: index,
            text: text.to_string(),
            segment_type: SegmentType::Speech,
            speaker: None,
        })
    }

    #[test]
    fn merge_applies_speaker_and_text_corrections() {
        let base = vec![segment(0, "Speaker 1", "helo world"), segment(1, "Speaker 2", "hi")];
        let pending = vec![
            pending(AnnotationPayload::Diarization {
                segment_index: 0,
                original_speaker: "Speaker 1".to_string(),
                corrected_speaker: "Alice".to_string(),
                segment_start_time: 0.0,
            }),
            pending(AnnotationPayload::TranscriptEdit {
                segment_index: 0,
                original_text: "helo world".to_string(),
                corrected_text: "hello world".to_string(),
            }),
        ];

        let merged = merge(&base, &pending);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].speaker, "Alice");
        assert_eq!(merged[0].text, "hello world");
        assert_eq!(merged[1].speaker, "Speaker 2");
    }

    #[test]
    fn merge_splices_insert_and_renumbers() {
        let base = vec![
            segment(0, "Alice", "a"),
            segment(1, "Bob", "b"),
            segment(2, "Alice", "c"),
        ];
        let pending = vec![insert_after(0, "x")];

        let merged = merge(&base, &pending);

        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "x", "b", "c"]);
        let indices: Vec<i32> = merged.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn merge_keeps_creation_order_for_inserts_sharing_an_anchor() {
        let base = vec![segment(0, "Alice", "a"), segment(1, "Bob", "b")];
        let pending = vec![insert_after(0, "first"), insert_after(0, "second")];

        let merged = merge(&base, &pending);

        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "first", "second", "b"]);
    }

    #[test]
    fn merge_prepends_for_front_anchor_and_appends_past_the_end() {
        let base = vec![segment(0, "Alice", "a"), segment(1, "Bob", "b")];
        let pending = vec![insert_after(-1, "front"), insert_after(99, "back")];

        let merged = merge(&base, &pending);

        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["front", "a", "b", "back"]);
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[3].start, base[1].end);
    }

    #[test]
    fn merge_corrects_by_original_index_then_splices() {
        // Corrections address base indices even when inserts land earlier in
        // the transcript, so a correction at index 1 still hits "b".
        let base = vec![segment(0, "Alice", "a"), segment(1, "Bob", "b")];
        let pending = vec![
            insert_after(-1, "x"),
            pending(AnnotationPayload::TranscriptEdit {
                segment_index: 1,
                original_text: "b".to_string(),
                corrected_text: "b fixed".to_string(),
            }),
        ];

        let merged = merge(&base, &pending);

        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "a", "b fixed"]);
    }

    #[test]
    fn merge_skips_out_of_range_corrections() {
        let base = vec![segment(0, "Alice", "a")];
        let pending = vec![pending(AnnotationPayload::TranscriptEdit {
            segment_index: 5,
            original_text: "gone".to_string(),
            corrected_text: "never lands".to_string(),
        })];

        let merged = merge(&base, &pending);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "a");
    }

    #[test]
    fn merge_into_empty_base_collects_all_inserts_at_front() {
        let pending = vec![insert_after(-1, "only"), insert_after(3, "also")];

        let merged = merge(&[], &pending);

        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["only", "also"]);
    }
}
