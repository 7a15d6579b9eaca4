use axum::http::{header, HeaderValue, Method};
use domain::apply::ApplyLocks;
use domain::gateway::trainer::TrainerClient;
use log::*;
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = Migrator::up(db.as_ref(), None).await {
        error!("Failed to run database migrations: {e}");
        std::process::exit(1);
    }

    let trainer = match TrainerClient::new(
        config.trainer_base_url(),
        config.trainer_api_key().as_deref(),
        Duration::from_secs(config.trainer_timeout_secs),
    ) {
        Ok(trainer) => Arc::new(trainer),
        Err(e) => {
            error!("Failed to build trainer client: {e}");
            std::process::exit(1);
        }
    };

    // The dispatcher owns its clones of the connection and client; it runs
    // for the life of the process.
    tokio::spawn(domain::scheduler::run_dispatcher(
        db.clone(),
        trainer.clone(),
        Duration::from_secs(config.scheduler_tick_secs),
    ));

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        );

    let host = config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_addr = format!("{}:{}", host, config.port);

    let app_state = AppState::new(
        config,
        &db,
        Arc::new(ApplyLocks::new()),
        trainer,
    );
    let router = web::router::define_routes(app_state).layer(cors);

    info!("Server starting... listening for connections on http://{listen_addr}");

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {listen_addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
