use crate::controller::ApiResponse;
use crate::params::annotation::{CreateParams, IndexParams, OrphanParams, UpdateParams};
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::annotation as AnnotationApi;
use domain::{orphan as OrphanApi, Id};

use log::*;

/// POST record a correction. Corrections targeting an occupied slot replace
/// the pending annotation in that slot; inserts always create a new row.
#[utoipa::path(
    post,
    path = "/annotations",
    request_body = CreateParams,
    responses(
        (status = 201, description = "Successfully recorded the correction", body = entity::annotations::Model),
        (status = 404, description = "Conversation not found"),
        (status = 422, description = "Unprocessable Entity"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Record a correction: {params:?}");

    let annotation = AnnotationApi::upsert(
        app_state.db_conn_ref(),
        params.conversation_id,
        params.payload,
    )
    .await?;

    debug!("Recorded annotation: {annotation:?}");

    Ok(Json(ApiResponse::new(
        StatusCode::CREATED.into(),
        annotation,
    )))
}

/// GET a particular annotation specified by its id.
#[utoipa::path(
    get,
    path = "/annotations/{id}",
    params(
        ("id" = Uuid, Path, description = "Annotation id to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the annotation", body = entity::annotations::Model),
        (status = 404, description = "Annotation not found"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Annotation by id: {id}");

    let annotation = AnnotationApi::find_by_id(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), annotation)))
}

/// PATCH amend the corrected fields of a pending annotation.
#[utoipa::path(
    patch,
    path = "/annotations/{id}",
    params(
        ("id" = Uuid, Path, description = "Annotation id to update")
    ),
    request_body = UpdateParams,
    responses(
        (status = 200, description = "Successfully updated the annotation", body = entity::annotations::Model),
        (status = 404, description = "Annotation not found"),
        (status = 409, description = "Annotation is no longer pending"),
        (status = 422, description = "Unprocessable Entity"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn update(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<UpdateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PATCH Update Annotation with id: {id}");

    let annotation = AnnotationApi::update(
        app_state.db_conn_ref(),
        id,
        AnnotationApi::CorrectionUpdate {
            corrected_text: params.corrected_text,
            corrected_speaker: params.corrected_speaker,
        },
    )
    .await?;

    debug!("Updated annotation: {annotation:?}");

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), annotation)))
}

/// GET all annotations for a conversation.
#[utoipa::path(
    get,
    path = "/annotations",
    params(IndexParams),
    responses(
        (status = 200, description = "Successfully retrieved all annotations for the conversation", body = [entity::annotations::Model]),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET all annotations with params: {params:?}");

    let annotations = AnnotationApi::find_by_conversation_id(
        app_state.db_conn_ref(),
        params.conversation_id,
        params.kind,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), annotations)))
}

/// DELETE a pending annotation.
#[utoipa::path(
    delete,
    path = "/annotations/{id}",
    params(
        ("id" = Uuid, Path, description = "Annotation id to delete")
    ),
    responses(
        (status = 204, description = "Successfully deleted the annotation"),
        (status = 404, description = "Annotation not found"),
        (status = 409, description = "Annotation is no longer pending"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn delete(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("DELETE Annotation with id: {id}");

    AnnotationApi::delete(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::<()>::no_content(
        StatusCode::NO_CONTENT.into(),
    )))
}

/// POST sweep for orphaned annotations and mark them.
#[utoipa::path(
    post,
    path = "/annotations/orphaned/check",
    params(OrphanParams),
    responses(
        (status = 200, description = "Sweep completed", body = String),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn check_orphans(
    State(app_state): State<AppState>,
    Query(params): Query<OrphanParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Check for orphaned annotations, kind: {:?}", params.kind);

    let report = OrphanApi::check(app_state.db_conn_ref(), params.kind).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), report)))
}

/// DELETE all orphaned annotations.
#[utoipa::path(
    delete,
    path = "/annotations/orphaned",
    params(OrphanParams),
    responses(
        (status = 200, description = "Orphaned annotations deleted", body = String),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn delete_orphaned(
    State(app_state): State<AppState>,
    Query(params): Query<OrphanParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "DELETE orphaned annotations, kind: {:?}",
        params.kind
    );

    let deleted = OrphanApi::purge(app_state.db_conn_ref(), params.kind).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), deleted)))
}
