use crate::conversations::Model;
use crate::error::Error;
use entity::content::{MemoryItem, Segment, VersionContent};
use entity::version::{VersionKind, VersionSource};
use entity::Id;
use entity_api::{conversation, version};
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};

/// Ingests a new conversation with its original transcript and, optionally,
/// its original memory. Creates version 1 of each and points the
/// conversation at them, all in one transaction.
pub async fn create(
    db: &DatabaseConnection,
    title: String,
    segments: Vec<Segment>,
    memory: Option<Vec<MemoryItem>>,
) -> Result<Model, Error> {
    let txn = db.begin().await?;

    let conversation = conversation::create(&txn, title).await?;

    // Stored indices always reflect position, whatever the caller sent.
    let mut segments = segments;
    for (position, segment) in segments.iter_mut().enumerate() {
        segment.index = position as i32;
    }

    let transcript_version = version::create(
        &txn,
        conversation.id,
        VersionKind::Transcript,
        VersionContent::Transcript(segments),
        VersionSource::Original,
        None,
    )
    .await?;
    conversation::set_active_version(
        &txn,
        conversation.id,
        VersionKind::Transcript,
        transcript_version.id,
    )
    .await?;

    if let Some(items) = memory {
        let memory_version = version::create(
            &txn,
            conversation.id,
            VersionKind::Memory,
            VersionContent::Memory(items),
            VersionSource::Original,
            None,
        )
        .await?;
        conversation::set_active_version(
            &txn,
            conversation.id,
            VersionKind::Memory,
            memory_version.id,
        )
        .await?;
    }

    txn.commit().await?;

    info!("Ingested conversation {}", conversation.id);
    // Re-read so the returned model carries the version pointers.
    Ok(conversation::find_by_id(db, conversation.id).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Ok(conversation::find_by_id(db, id).await?)
}

/// Deletes a conversation and its versions. Its annotations are left in
/// place for the orphan detector to sweep.
pub async fn delete(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    Ok(conversation::delete(db, id).await?)
}
