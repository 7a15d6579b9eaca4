use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of correction an annotation records.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "annotation_kind")]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Speaker label correction on a single segment
    #[sea_orm(string_value = "diarization")]
    Diarization,
    /// Wording correction on a single segment
    #[sea_orm(string_value = "transcript_edit")]
    TranscriptEdit,
    /// A missing utterance inserted after an existing segment
    #[sea_orm(string_value = "insert")]
    Insert,
    /// Conversation title correction
    #[sea_orm(string_value = "title_edit")]
    TitleEdit,
    /// Extracted memory text correction
    #[sea_orm(string_value = "memory_edit")]
    MemoryEdit,
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationKind::Diarization => write!(fmt, "diarization"),
            AnnotationKind::TranscriptEdit => write!(fmt, "transcript_edit"),
            AnnotationKind::Insert => write!(fmt, "insert"),
            AnnotationKind::TitleEdit => write!(fmt, "title_edit"),
            AnnotationKind::MemoryEdit => write!(fmt, "memory_edit"),
        }
    }
}

/// Lifecycle state of an annotation.
///
/// `Applied`, `Trained`, and `Orphaned` are terminal: rows in those states
/// are never mutated again, only read or (for `Orphaned`) purged.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Default, Serialize, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "annotation_state")]
#[serde(rename_all = "snake_case")]
pub enum AnnotationState {
    /// Recorded but not yet merged into a version
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Merged into an immutable version by the apply engine
    #[sea_orm(string_value = "applied")]
    Applied,
    /// Exported to the external trainer
    #[sea_orm(string_value = "trained")]
    Trained,
    /// Target or slot no longer exists
    #[sea_orm(string_value = "orphaned")]
    Orphaned,
}

impl std::fmt::Display for AnnotationState {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationState::Pending => write!(fmt, "pending"),
            AnnotationState::Applied => write!(fmt, "applied"),
            AnnotationState::Trained => write!(fmt, "trained"),
            AnnotationState::Orphaned => write!(fmt, "orphaned"),
        }
    }
}
