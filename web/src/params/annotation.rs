use domain::{AnnotationKind, AnnotationPayload, Id};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Body for recording a correction. The payload discriminates on its
/// `type` field.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateParams {
    #[schema(value_type = Uuid)]
    pub(crate) conversation_id: Id,
    pub(crate) payload: AnnotationPayload,
}

/// Body for amending the corrected fields of a pending annotation.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct UpdateParams {
    pub(crate) corrected_text: Option<String>,
    pub(crate) corrected_speaker: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct IndexParams {
    #[param(value_type = Uuid)]
    pub(crate) conversation_id: Id,
    pub(crate) kind: Option<AnnotationKind>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct OrphanParams {
    pub(crate) kind: Option<AnnotationKind>,
}
