//! SeaORM Entity for the cron_jobs table.
//! One row per named training-export job, keyed by its slug.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::cron_jobs::Model)]
#[sea_orm(schema_name = "chronicle", table_name = "cron_jobs")]
pub struct Model {
    /// Job slug, e.g. "speaker_finetuning"
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub enabled: bool,

    /// Cron expression with a seconds field, e.g. "0 0 3 * * *"
    pub schedule: String,

    /// Guard flag: the dispatcher and run-now share it, so a job never
    /// executes twice concurrently
    pub running: bool,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_run: Option<DateTimeWithTimeZone>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub next_run: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
