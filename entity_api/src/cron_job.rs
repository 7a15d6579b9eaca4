use super::error::Error;
use chrono::Utc;
use entity::cron_jobs::{ActiveModel, Column, Entity, Model};
use log::*;
use sea_orm::{
    entity::prelude::*, sea_query::Expr, ActiveValue::Set, ActiveValue::Unchanged,
    DatabaseConnection, QueryOrder, TryIntoModel, Value,
};

pub async fn find_all(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(Entity::find().order_by_asc(Column::Id).all(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: &str) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| {
        debug!("Cron job {:?} not found", id);
        Error::not_found()
    })
}

pub async fn set_enabled(
    db: &DatabaseConnection,
    id: &str,
    enabled: bool,
    next_run: Option<DateTimeWithTimeZone>,
) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    info!("Setting cron job {:?} enabled = {}", id, enabled);

    let job = ActiveModel {
        id: Unchanged(existing.id),
        enabled: Set(enabled),
        next_run: Set(next_run),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };

    Ok(job.update(db).await?.try_into_model()?)
}

pub async fn set_schedule(
    db: &DatabaseConnection,
    id: &str,
    schedule: String,
    next_run: Option<DateTimeWithTimeZone>,
) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    info!("Setting cron job {:?} schedule to {:?}", id, schedule);

    let job = ActiveModel {
        id: Unchanged(existing.id),
        schedule: Set(schedule),
        next_run: Set(next_run),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };

    Ok(job.update(db).await?.try_into_model()?)
}

/// Flips the running guard on, but only if it is currently off. Returns
/// false when another worker already holds the job; the caller must skip
/// the run instead of doubling up.
pub async fn try_begin_run(db: &DatabaseConnection, id: &str) -> Result<bool, Error> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(Column::Running, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .filter(Column::Running.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Releases the running guard and records the outcome of the run.
pub async fn finish_run(
    db: &DatabaseConnection,
    id: &str,
    last_run: DateTimeWithTimeZone,
    next_run: Option<DateTimeWithTimeZone>,
    last_error: Option<String>,
) -> Result<(), Error> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    Entity::update_many()
        .col_expr(Column::Running, Expr::value(false))
        .col_expr(Column::LastRun, Expr::value(Some(last_run)))
        .col_expr(Column::NextRun, Expr::value(next_run))
        .col_expr(
            Column::LastError,
            match last_error {
                Some(message) => Expr::value(Some(message)),
                None => Expr::value(Value::String(None)),
            },
        )
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}
