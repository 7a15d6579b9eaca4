use crate::annotations::Model;
use crate::error::Error;
use entity::annotation::AnnotationKind;
use entity::payload::AnnotationPayload;
use entity::Id;
use entity_api::{annotation, conversation};
use sea_orm::DatabaseConnection;

pub use entity_api::annotation::CorrectionUpdate;

/// Records a correction against a conversation. Corrections targeting a slot
/// that already has a pending annotation replace that annotation's payload;
/// inserts always create a new row.
pub async fn upsert(
    db: &DatabaseConnection,
    conversation_id: Id,
    payload: AnnotationPayload,
) -> Result<Model, Error> {
    // New corrections may only attach to a live conversation. Existing
    // annotations outlive their conversation so the orphan detector can
    // find them, but nothing new accumulates against a deleted one.
    conversation::find_by_id(db, conversation_id).await?;

    Ok(annotation::upsert(db, conversation_id, payload).await?)
}

pub async fn update(
    db: &DatabaseConnection,
    id: Id,
    update: CorrectionUpdate,
) -> Result<Model, Error> {
    Ok(annotation::update(db, id, update).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Ok(annotation::find_by_id(db, id).await?)
}

pub async fn find_by_conversation_id(
    db: &DatabaseConnection,
    conversation_id: Id,
    kind: Option<AnnotationKind>,
) -> Result<Vec<Model>, Error> {
    Ok(annotation::find_by_conversation_id(db, conversation_id, kind).await?)
}

pub async fn delete(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    Ok(annotation::delete(db, id).await?)
}
