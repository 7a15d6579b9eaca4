use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::versions::Model;
use entity::content::VersionContent;
use entity::version::{VersionKind, VersionSource};
use entity::Id;
use entity_api::{conversation, version};
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;

/// Outcome of repointing a conversation's active version.
#[derive(Debug, Serialize)]
pub struct SetActiveResult {
    pub conversation_id: Id,
    pub active_version_id: Id,
    pub kind: VersionKind,
    /// True when the transcript pointer moved. Memory is derived from the
    /// transcript, so the caller should reprocess it against the newly
    /// active transcript.
    pub memory_reprocess_required: bool,
}

/// Records a reprocessed transcript or memory as a fresh version and makes
/// it active. The previous active version becomes its parent.
pub async fn ingest(
    db: &DatabaseConnection,
    conversation_id: Id,
    kind: VersionKind,
    content: VersionContent,
) -> Result<Model, Error> {
    match (&kind, &content) {
        (VersionKind::Transcript, VersionContent::Transcript(_)) => {}
        (VersionKind::Memory, VersionContent::Memory(_)) => {}
        _ => {
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                    EntityErrorKind::Invalid,
                )),
            });
        }
    }

    let conversation = conversation::find_by_id(db, conversation_id).await?;
    let parent = match kind {
        VersionKind::Transcript => conversation.active_transcript_version_id,
        VersionKind::Memory => conversation.active_memory_version_id,
    };

    let txn = db.begin().await?;
    let new_version = version::create(
        &txn,
        conversation_id,
        kind.clone(),
        content,
        VersionSource::Reprocess,
        parent,
    )
    .await?;
    conversation::set_active_version(&txn, conversation_id, kind, new_version.id).await?;
    txn.commit().await?;

    info!(
        "Ingested reprocessed {} version {} for conversation {}",
        new_version.kind, new_version.number, conversation_id
    );
    Ok(new_version)
}

/// Full version history for a conversation, ascending by number.
pub async fn list(
    db: &DatabaseConnection,
    conversation_id: Id,
    kind: Option<VersionKind>,
) -> Result<Vec<Model>, Error> {
    conversation::find_by_id(db, conversation_id).await?;
    Ok(version::find_by_conversation_id(db, conversation_id, kind).await?)
}

/// Repoints the conversation's active transcript or memory version to an
/// existing version, e.g. to roll back an apply. Version rows are never
/// modified; only the pointer moves.
pub async fn set_active(
    db: &DatabaseConnection,
    conversation_id: Id,
    version_id: Id,
) -> Result<SetActiveResult, Error> {
    let target = version::find_by_id(db, version_id).await?;
    if target.conversation_id != conversation_id {
        warn!(
            "Version {} belongs to conversation {}, not {}",
            version_id, target.conversation_id, conversation_id
        );
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Invalid,
            )),
        });
    }

    conversation::set_active_version(db, conversation_id, target.kind.clone(), version_id).await?;

    Ok(SetActiveResult {
        conversation_id,
        active_version_id: version_id,
        kind: target.kind.clone(),
        memory_reprocess_required: target.kind == VersionKind::Transcript,
    })
}
