use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of content a version snapshots.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "version_kind")]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    #[sea_orm(string_value = "transcript")]
    Transcript,
    #[sea_orm(string_value = "memory")]
    Memory,
}

impl std::fmt::Display for VersionKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionKind::Transcript => write!(fmt, "transcript"),
            VersionKind::Memory => write!(fmt, "memory"),
        }
    }
}

/// What produced a version.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "version_source")]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// First machine output from the transcription pipeline
    #[sea_orm(string_value = "original")]
    Original,
    /// A collaborator-triggered recomputation
    #[sea_orm(string_value = "reprocess")]
    Reprocess,
    /// The apply engine merging user corrections
    #[sea_orm(string_value = "annotation_apply")]
    AnnotationApply,
}

impl std::fmt::Display for VersionSource {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionSource::Original => write!(fmt, "original"),
            VersionSource::Reprocess => write!(fmt, "reprocess"),
            VersionSource::AnnotationApply => write!(fmt, "annotation_apply"),
        }
    }
}
