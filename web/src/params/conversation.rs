use domain::{MemoryItem, Segment};
use serde::Deserialize;
use utoipa::ToSchema;

/// Body for ingesting a new conversation with its original content.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateParams {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) segments: Vec<Segment>,
    #[serde(default)]
    pub(crate) memory: Option<Vec<MemoryItem>>,
}
