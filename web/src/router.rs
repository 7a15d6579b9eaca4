use crate::{controller::health_check_controller, params, AppState};
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::controller::{
    annotation_controller, conversation_controller, cron_job_controller, training_controller,
    version_controller,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Chronicle Correction Engine API"
        ),
        paths(
            annotation_controller::create,
            annotation_controller::read,
            annotation_controller::update,
            annotation_controller::index,
            annotation_controller::delete,
            annotation_controller::check_orphans,
            annotation_controller::delete_orphaned,
            conversation_controller::create,
            conversation_controller::read,
            conversation_controller::delete,
            conversation_controller::preview,
            conversation_controller::apply,
            version_controller::index,
            version_controller::create,
            version_controller::set_active,
            cron_job_controller::index,
            cron_job_controller::update,
            cron_job_controller::run,
            training_controller::process,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                entity::annotations::Model,
                entity::conversations::Model,
                entity::cron_jobs::Model,
                entity::versions::Model,
                entity::annotation::AnnotationKind,
                entity::annotation::AnnotationState,
                entity::content::MemoryItem,
                entity::content::Segment,
                entity::content::SegmentType,
                entity::content::VersionContent,
                entity::payload::AnnotationPayload,
                entity::version::VersionKind,
                entity::version::VersionSource,
                params::annotation::CreateParams,
                params::annotation::UpdateParams,
                params::conversation::CreateParams,
                params::cron_job::UpdateParams,
                params::version::IngestParams,
                params::version::SetActiveParams,
            )
        ),
        tags(
            (name = "chronicle", description = "Chronicle Correction & Versioning API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(annotation_routes(app_state.clone()))
        .merge(conversation_routes(app_state.clone()))
        .merge(version_routes(app_state.clone()))
        .merge(cron_job_routes(app_state.clone()))
        .merge(training_routes(app_state.clone()))
        .merge(health_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .fallback_service(static_routes())
}

fn annotation_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/annotations", post(annotation_controller::create))
        .route("/annotations", get(annotation_controller::index))
        .route(
            "/annotations/orphaned/check",
            post(annotation_controller::check_orphans),
        )
        .route(
            "/annotations/orphaned",
            delete(annotation_controller::delete_orphaned),
        )
        .route("/annotations/:id", get(annotation_controller::read))
        .route("/annotations/:id", patch(annotation_controller::update))
        .route("/annotations/:id", delete(annotation_controller::delete))
        .with_state(app_state)
}

fn conversation_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/conversations", post(conversation_controller::create))
        .route("/conversations/:id", get(conversation_controller::read))
        .route(
            "/conversations/:id",
            delete(conversation_controller::delete),
        )
        .route(
            "/conversations/:id/preview",
            get(conversation_controller::preview),
        )
        .route(
            "/conversations/:id/apply",
            post(conversation_controller::apply),
        )
        .with_state(app_state)
}

fn version_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/conversations/:id/versions",
            get(version_controller::index),
        )
        .route(
            "/conversations/:id/versions",
            post(version_controller::create),
        )
        .route(
            "/conversations/:id/versions/active",
            put(version_controller::set_active),
        )
        .with_state(app_state)
}

fn cron_job_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/cron_jobs", get(cron_job_controller::index))
        .route("/cron_jobs/:id", patch(cron_job_controller::update))
        .route("/cron_jobs/:id/run", post(cron_job_controller::run))
        .with_state(app_state)
}

fn training_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/training/process", post(training_controller::process))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn static_routes() -> ServeDir {
    ServeDir::new("./public")
}
