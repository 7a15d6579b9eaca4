use domain::{Id, VersionContent, VersionKind};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct IndexParams {
    pub(crate) kind: Option<VersionKind>,
}

/// Body for repointing the conversation's active version.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SetActiveParams {
    #[schema(value_type = Uuid)]
    pub(crate) version_id: Id,
}

/// Body for recording reprocessed content as a new version. The content
/// discriminates on its `kind` field and must match `kind`.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct IngestParams {
    pub(crate) kind: VersionKind,
    pub(crate) content: VersionContent,
}
