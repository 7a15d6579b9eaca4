use crate::controller::ApiResponse;
use crate::params::version::{IndexParams, IngestParams, SetActiveParams};
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::version as VersionApi;
use domain::Id;

use log::*;

/// GET the version history of a conversation.
#[utoipa::path(
    get,
    path = "/conversations/{id}/versions",
    params(
        ("id" = Uuid, Path, description = "Conversation id whose versions to list"),
        IndexParams
    ),
    responses(
        (status = 200, description = "Successfully retrieved the version history", body = [entity::versions::Model]),
        (status = 404, description = "Conversation not found"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET versions for conversation {id} with params: {params:?}");

    let versions = VersionApi::list(app_state.db_conn_ref(), id, params.kind).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), versions)))
}

/// POST record reprocessed transcript or memory content as a new version
/// and make it active.
#[utoipa::path(
    post,
    path = "/conversations/{id}/versions",
    params(
        ("id" = Uuid, Path, description = "Conversation id to add a version to")
    ),
    request_body = IngestParams,
    responses(
        (status = 201, description = "Successfully recorded the new version", body = entity::versions::Model),
        (status = 404, description = "Conversation not found"),
        (status = 422, description = "Unprocessable Entity"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<IngestParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST New {} version for conversation {id}", params.kind);

    let version =
        VersionApi::ingest(app_state.db_conn_ref(), id, params.kind, params.content).await?;

    debug!("Recorded version: {version:?}");

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), version)))
}

/// PUT repoint the conversation's active version, e.g. to roll back an
/// apply. Version rows are never modified; only the pointer moves.
#[utoipa::path(
    put,
    path = "/conversations/{id}/versions/active",
    params(
        ("id" = Uuid, Path, description = "Conversation id whose active version to change")
    ),
    request_body = SetActiveParams,
    responses(
        (status = 200, description = "Successfully repointed the active version", body = String),
        (status = 404, description = "Conversation or version not found"),
        (status = 422, description = "Version belongs to another conversation"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn set_active(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<SetActiveParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "PUT Set active version {} for conversation {id}",
        params.version_id
    );

    let result = VersionApi::set_active(app_state.db_conn_ref(), id, params.version_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), result)))
}
