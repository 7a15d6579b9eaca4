use super::error::Error;
use chrono::Utc;
use entity::content::VersionContent;
use entity::version::{VersionKind, VersionSource};
use entity::versions::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, ActiveValue::Set, ConnectionTrait, DatabaseConnection, QueryOrder,
    TryIntoModel,
};

/// Inserts a new version row numbered one past the latest version of the
/// same kind, or 1 if none exists yet. Version rows are append-only;
/// nothing here ever updates one.
pub async fn create<C>(
    db: &C,
    conversation_id: Id,
    kind: VersionKind,
    content: VersionContent,
    created_by: VersionSource,
    parent_version_id: Option<Id>,
) -> Result<Model, Error>
where
    C: ConnectionTrait,
{
    let latest = find_latest(db, conversation_id, kind.clone()).await?;
    let number = latest.map(|version| version.number + 1).unwrap_or(1);

    debug!(
        "Creating {} version {} for conversation {}",
        kind, number, conversation_id
    );

    let version = ActiveModel {
        conversation_id: Set(conversation_id),
        kind: Set(kind),
        number: Set(number),
        content: Set(content),
        parent_version_id: Set(parent_version_id),
        created_by: Set(created_by),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    Ok(version.save(db).await?.try_into_model()?)
}

pub async fn find_by_id<C>(db: &C, id: Id) -> Result<Model, Error>
where
    C: ConnectionTrait,
{
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| {
        debug!("Version with id {} not found", id);
        Error::not_found()
    })
}

/// The highest-numbered version of one kind for a conversation, if any.
pub async fn find_latest<C>(
    db: &C,
    conversation_id: Id,
    kind: VersionKind,
) -> Result<Option<Model>, Error>
where
    C: ConnectionTrait,
{
    Ok(Entity::find()
        .filter(Column::ConversationId.eq(conversation_id))
        .filter(Column::Kind.eq(kind))
        .order_by_desc(Column::Number)
        .one(db)
        .await?)
}

/// Full version history for a conversation in ascending number order,
/// optionally narrowed to one kind.
pub async fn find_by_conversation_id(
    db: &DatabaseConnection,
    conversation_id: Id,
    kind: Option<VersionKind>,
) -> Result<Vec<Model>, Error> {
    let mut query = Entity::find().filter(Column::ConversationId.eq(conversation_id));
    if let Some(kind) = kind {
        query = query.filter(Column::Kind.eq(kind));
    }
    Ok(query.order_by_asc(Column::Number).all(db).await?)
}
