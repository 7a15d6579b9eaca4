use crate::controller::ApiResponse;
use crate::params::conversation::CreateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::conversation as ConversationApi;
use domain::{apply as ApplyApi, preview as PreviewApi, Id};

use log::*;

/// POST ingest a new conversation with its original transcript and memory.
#[utoipa::path(
    post,
    path = "/conversations",
    request_body = CreateParams,
    responses(
        (status = 201, description = "Successfully ingested a new conversation", body = entity::conversations::Model),
        (status = 422, description = "Unprocessable Entity"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Ingest a new conversation titled {:?}", params.title);

    let conversation = ConversationApi::create(
        app_state.db_conn_ref(),
        params.title,
        params.segments,
        params.memory,
    )
    .await?;

    debug!("Ingested conversation: {conversation:?}");

    Ok(Json(ApiResponse::new(
        StatusCode::CREATED.into(),
        conversation,
    )))
}

/// GET a particular conversation specified by its id.
#[utoipa::path(
    get,
    path = "/conversations/{id}",
    params(
        ("id" = Uuid, Path, description = "Conversation id to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the conversation", body = entity::conversations::Model),
        (status = 404, description = "Conversation not found"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Conversation by id: {id}");

    let conversation = ConversationApi::find_by_id(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), conversation)))
}

/// DELETE a conversation and its versions. Annotations survive for the
/// orphan sweep.
#[utoipa::path(
    delete,
    path = "/conversations/{id}",
    params(
        ("id" = Uuid, Path, description = "Conversation id to delete")
    ),
    responses(
        (status = 204, description = "Successfully deleted the conversation"),
        (status = 404, description = "Conversation not found"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn delete(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("DELETE Conversation with id: {id}");

    ConversationApi::delete(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::<()>::no_content(
        StatusCode::NO_CONTENT.into(),
    )))
}

/// GET the transcript as it would look with all pending annotations applied.
/// Nothing is written; the stored versions are untouched.
#[utoipa::path(
    get,
    path = "/conversations/{id}/preview",
    params(
        ("id" = Uuid, Path, description = "Conversation id to preview")
    ),
    responses(
        (status = 200, description = "Successfully merged pending annotations", body = String),
        (status = 404, description = "Conversation not found"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn preview(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Preview for conversation: {id}");

    let preview = PreviewApi::preview(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), preview)))
}

/// POST apply all pending annotations as a new immutable version.
#[utoipa::path(
    post,
    path = "/conversations/{id}/apply",
    params(
        ("id" = Uuid, Path, description = "Conversation id to apply annotations for")
    ),
    responses(
        (status = 200, description = "Successfully applied pending annotations", body = String),
        (status = 404, description = "Conversation not found"),
        (status = 409, description = "An apply is already running for this conversation"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn apply(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Apply pending annotations for conversation: {id}");

    let report =
        ApplyApi::apply_all(app_state.db_conn_ref(), &app_state.apply_locks, id).await?;

    debug!("Apply finished: {report:?}");

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), report)))
}
