use serde::Deserialize;
use utoipa::ToSchema;

/// Body for updating a cron job. Either field may be set independently.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct UpdateParams {
    pub(crate) enabled: Option<bool>,
    pub(crate) schedule: Option<String>,
}
