use super::error::Error;
use chrono::Utc;
use entity::conversations::{ActiveModel, Column, Entity, Model};
use entity::version::VersionKind;
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, sea_query::Expr, ActiveValue::Set, ConnectionTrait, DatabaseConnection,
    TryIntoModel,
};

pub async fn create<C>(db: &C, title: String) -> Result<Model, Error>
where
    C: ConnectionTrait,
{
    debug!("Creating conversation titled {:?}", title);

    let now = Utc::now();
    let conversation = ActiveModel {
        title: Set(title),
        active_transcript_version_id: Set(None),
        active_memory_version_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(conversation.save(db).await?.try_into_model()?)
}

pub async fn find_by_id<C>(db: &C, id: Id) -> Result<Model, Error>
where
    C: ConnectionTrait,
{
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| {
        debug!("Conversation with id {} not found", id);
        Error::not_found()
    })
}

pub async fn exists<C>(db: &C, id: Id) -> Result<bool, Error>
where
    C: ConnectionTrait,
{
    Ok(Entity::find_by_id(id).one(db).await?.is_some())
}

pub async fn update_title<C>(db: &C, id: Id, title: String) -> Result<(), Error>
where
    C: ConnectionTrait,
{
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(Column::Title, Expr::value(title))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found());
    }
    Ok(())
}

/// Repoints a conversation's active transcript or memory version. The
/// version rows themselves are untouched.
pub async fn set_active_version<C>(
    db: &C,
    id: Id,
    kind: VersionKind,
    version_id: Id,
) -> Result<(), Error>
where
    C: ConnectionTrait,
{
    let column = match kind {
        VersionKind::Transcript => Column::ActiveTranscriptVersionId,
        VersionKind::Memory => Column::ActiveMemoryVersionId,
    };
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(column, Expr::value(Some(version_id)))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found());
    }
    Ok(())
}

/// Deletes a conversation and, through the cascade, its versions.
/// Annotations deliberately survive for the orphan detector to find.
pub async fn delete(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found());
    }
    info!("Deleted conversation {}", id);
    Ok(())
}
