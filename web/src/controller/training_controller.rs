use crate::controller::ApiResponse;
use crate::params::training::ProcessParams;
use crate::{AppState, Error};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::training as TrainingApi;

use log::*;

/// POST export all applied annotations of one kind to the trainer. Failed
/// submissions stay applied and are retried on the next run.
#[utoipa::path(
    post,
    path = "/training/process",
    params(ProcessParams),
    responses(
        (status = 200, description = "Export run completed", body = String),
        (status = 502, description = "Trainer unreachable"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn process(
    State(app_state): State<AppState>,
    Query(params): Query<ProcessParams>,
) -> Result<impl IntoResponse, Error> {
    info!("POST Process {} annotations for training", params.kind);

    let report = TrainingApi::process_annotations(
        app_state.db_conn_ref(),
        &app_state.trainer,
        params.kind,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), report)))
}
