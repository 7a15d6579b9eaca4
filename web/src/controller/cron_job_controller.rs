use crate::controller::ApiResponse;
use crate::params::cron_job::UpdateParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::scheduler as SchedulerApi;

use log::*;

/// GET all scheduled export jobs.
#[utoipa::path(
    get,
    path = "/cron_jobs",
    responses(
        (status = 200, description = "Successfully retrieved all cron jobs", body = [entity::cron_jobs::Model]),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn index(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    debug!("GET all cron jobs");

    let jobs = SchedulerApi::list(app_state.db_conn_ref()).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), jobs)))
}

/// PATCH enable/disable a job or change its schedule.
#[utoipa::path(
    patch,
    path = "/cron_jobs/{id}",
    params(
        ("id" = String, Path, description = "Cron job id to update")
    ),
    request_body = UpdateParams,
    responses(
        (status = 200, description = "Successfully updated the cron job", body = entity::cron_jobs::Model),
        (status = 404, description = "Cron job not found"),
        (status = 422, description = "Invalid cron expression"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn update(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(params): Json<UpdateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PATCH Update cron job {id}: {params:?}");

    let mut job = SchedulerApi::get(app_state.db_conn_ref(), &id).await?;

    if let Some(schedule) = params.schedule {
        job = SchedulerApi::set_schedule(app_state.db_conn_ref(), &id, schedule).await?;
    }
    if let Some(enabled) = params.enabled {
        job = SchedulerApi::toggle(app_state.db_conn_ref(), &id, enabled).await?;
    }

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), job)))
}

/// POST run a job immediately, regardless of its schedule.
#[utoipa::path(
    post,
    path = "/cron_jobs/{id}/run",
    params(
        ("id" = String, Path, description = "Cron job id to run")
    ),
    responses(
        (status = 200, description = "Job run completed", body = String),
        (status = 404, description = "Cron job not found"),
        (status = 409, description = "Job is already running"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    )
)]
pub async fn run(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    info!("POST Run cron job {id} now");

    let report =
        SchedulerApi::run_now(app_state.db_conn_ref(), &app_state.trainer, &id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), report)))
}
