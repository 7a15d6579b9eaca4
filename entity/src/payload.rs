//! JSON-typed annotation payloads.
//!
//! The kind-specific fields of an annotation live in one JSONB column as a
//! closed tagged union so that callers dispatch on kind via exhaustive
//! pattern matching rather than a loose string field.

use crate::annotation::AnnotationKind;
use crate::content::SegmentType;
use crate::Id;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind-specific fields of an annotation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, FromJsonQueryResult, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationPayload {
    /// Speaker correction for one segment
    Diarization {
        segment_index: i32,
        original_speaker: String,
        corrected_speaker: String,
        /// Start offset of the segment in seconds, kept for the trainer
        segment_start_time: f64,
    },
    /// Wording correction for one segment
    TranscriptEdit {
        segment_index: i32,
        original_text: String,
        corrected_text: String,
    },
    /// A missing utterance spliced in after `insert_after_index`
    /// (`-1` means before the first segment)
    Insert {
        insert_after_index: i32,
        text: String,
        segment_type: SegmentType,
        #[serde(default)]
        speaker: Option<String>,
    },
    /// Conversation title correction
    TitleEdit {
        original_text: String,
        corrected_text: String,
    },
    /// Correction of one extracted memory item
    MemoryEdit {
        #[schema(value_type = Uuid)]
        memory_id: Id,
        original_text: String,
        corrected_text: String,
    },
}

/// Uniqueness key within which only one pending annotation of a kind may
/// exist. Inserts share a slot and are ordered by creation time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Segment(i32),
    InsertAfter(i32),
    Title,
    Memory(Id),
}

impl AnnotationPayload {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationPayload::Diarization { .. } => AnnotationKind::Diarization,
            AnnotationPayload::TranscriptEdit { .. } => AnnotationKind::TranscriptEdit,
            AnnotationPayload::Insert { .. } => AnnotationKind::Insert,
            AnnotationPayload::TitleEdit { .. } => AnnotationKind::TitleEdit,
            AnnotationPayload::MemoryEdit { .. } => AnnotationKind::MemoryEdit,
        }
    }

    pub fn slot(&self) -> Slot {
        match self {
            AnnotationPayload::Diarization { segment_index, .. }
            | AnnotationPayload::TranscriptEdit { segment_index, .. } => {
                Slot::Segment(*segment_index)
            }
            AnnotationPayload::Insert {
                insert_after_index, ..
            } => Slot::InsertAfter(*insert_after_index),
            AnnotationPayload::TitleEdit { .. } => Slot::Title,
            AnnotationPayload::MemoryEdit { memory_id, .. } => Slot::Memory(*memory_id),
        }
    }

    /// Segment index for segment-scoped kinds, `None` otherwise.
    pub fn segment_index(&self) -> Option<i32> {
        match self.slot() {
            Slot::Segment(index) => Some(index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_snake_case_type_tag() {
        let payload = AnnotationPayload::TranscriptEdit {
            segment_index: 2,
            original_text: "helo".to_string(),
            corrected_text: "hello".to_string(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "transcript_edit");
        assert_eq!(json["segment_index"], 2);

        let back: AnnotationPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn diarization_and_transcript_edit_share_the_segment_slot() {
        let diarization = AnnotationPayload::Diarization {
            segment_index: 3,
            original_speaker: "SPEAKER_00".to_string(),
            corrected_speaker: "Ada".to_string(),
            segment_start_time: 12.5,
        };
        let edit = AnnotationPayload::TranscriptEdit {
            segment_index: 3,
            original_text: "a".to_string(),
            corrected_text: "b".to_string(),
        };
        assert_eq!(diarization.slot(), Slot::Segment(3));
        assert_eq!(edit.slot(), Slot::Segment(3));
        assert_ne!(diarization.kind(), edit.kind());
    }

    #[test]
    fn title_edit_slot_is_a_fixed_sentinel() {
        let first = AnnotationPayload::TitleEdit {
            original_text: "Untitled".to_string(),
            corrected_text: "Standup".to_string(),
        };
        let second = AnnotationPayload::TitleEdit {
            original_text: "Untitled".to_string(),
            corrected_text: "Retro".to_string(),
        };
        assert_eq!(first.slot(), second.slot());
    }

    #[test]
    fn insert_speaker_defaults_to_none() {
        let payload: AnnotationPayload = serde_json::from_str(
            r#"{"type":"insert","insert_after_index":-1,"text":"hi","segment_type":"speech"}"#,
        )
        .unwrap();
        match payload {
            AnnotationPayload::Insert { speaker, .. } => assert!(speaker.is_none()),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
