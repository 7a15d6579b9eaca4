use domain::apply::ApplyLocks;
use domain::gateway::trainer::TrainerClient;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::Arc;

pub mod controller;
pub mod error;
pub mod params;
pub mod router;

pub use error::{Error, Result};

// Application-wide state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
    pub apply_locks: Arc<ApplyLocks>,
    pub trainer: Arc<TrainerClient>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: &Arc<DatabaseConnection>,
        apply_locks: Arc<ApplyLocks>,
        trainer: Arc<TrainerClient>,
    ) -> Self {
        Self {
            database_connection: Arc::clone(db),
            config,
            apply_locks,
            trainer,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}
