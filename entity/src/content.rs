//! JSON-typed content stored inside immutable version rows.

use crate::Id;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Classification of a transcript segment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// A spoken utterance attributed to a speaker
    #[default]
    Speech,
    /// A non-speech event (door, phone ringing, ...)
    Event,
    /// An annotator-supplied note segment
    Note,
}

/// One utterance within a transcript version.
///
/// `index` is positional within its version and is NOT stable across
/// versions that insert or remove segments.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, FromJsonQueryResult, ToSchema)]
pub struct Segment {
    pub index: i32,
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub segment_type: SegmentType,
    /// Start offset in seconds from the beginning of the recording
    pub start: f64,
    /// End offset in seconds from the beginning of the recording
    pub end: f64,
}

/// One extracted memory item within a memory version.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, FromJsonQueryResult, ToSchema)]
pub struct MemoryItem {
    #[schema(value_type = Uuid)]
    pub id: Id,
    pub text: String,
}

/// Immutable content of a version row, tagged by kind.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, FromJsonQueryResult, ToSchema)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum VersionContent {
    Transcript(Vec<Segment>),
    Memory(Vec<MemoryItem>),
}

impl VersionContent {
    /// Segment view of transcript content; empty for memory content.
    pub fn segments(&self) -> &[Segment] {
        match self {
            VersionContent::Transcript(segments) => segments,
            VersionContent::Memory(_) => &[],
        }
    }

    /// Memory-item view of memory content; empty for transcript content.
    pub fn memory_items(&self) -> &[MemoryItem] {
        match self {
            VersionContent::Transcript(_) => &[],
            VersionContent::Memory(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_type_defaults_to_speech() {
        let segment: Segment =
            serde_json::from_str(r#"{"index":0,"speaker":"A","text":"hi","start":0.0,"end":1.5}"#)
                .unwrap();
        assert_eq!(segment.segment_type, SegmentType::Speech);
    }

    #[test]
    fn version_content_round_trips_with_kind_tag() {
        let content = VersionContent::Transcript(vec![Segment {
            index: 0,
            speaker: "SPEAKER_00".to_string(),
            text: "hello".to_string(),
            segment_type: SegmentType::Speech,
            start: 0.0,
            end: 2.1,
        }]);

        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "transcript");

        let back: VersionContent = serde_json::from_value(json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn memory_items_view_is_empty_for_transcripts() {
        let content = VersionContent::Transcript(vec![]);
        assert!(content.memory_items().is_empty());
    }
}
