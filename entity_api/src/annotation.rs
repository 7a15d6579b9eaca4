use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::annotation::{AnnotationKind, AnnotationState};
use entity::annotations::{ActiveModel, Column, Entity, Model};
use entity::payload::AnnotationPayload;
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    sea_query::Expr,
    ActiveValue::Set,
    ConnectionTrait, DatabaseConnection, QueryOrder, TryIntoModel, Value,
};

/// Fields a client may change on a pending annotation after the fact.
#[derive(Debug, Default, Clone)]
pub struct CorrectionUpdate {
    pub corrected_text: Option<String>,
    pub corrected_speaker: Option<String>,
}

/// Creates a new pending annotation, or replaces the payload of the pending
/// annotation already occupying the same slot. Inserts never replace each
/// other; every insert gets its own row.
pub async fn upsert(
    db: &DatabaseConnection,
    conversation_id: Id,
    payload: AnnotationPayload,
) -> Result<Model, Error> {
    validate(&payload)?;

    let kind = payload.kind();
    if kind != AnnotationKind::Insert {
        let pending = Entity::find()
            .filter(Column::ConversationId.eq(conversation_id))
            .filter(Column::Kind.eq(kind.clone()))
            .filter(Column::State.eq(AnnotationState::Pending))
            .all(db)
            .await?;

        if let Some(existing) = pending
            .into_iter()
            .find(|annotation| annotation.payload.slot() == payload.slot())
        {
            debug!(
                "Replacing payload of pending annotation {} in slot {:?}",
                existing.id,
                payload.slot()
            );
            return replace_payload(db, existing, payload).await;
        }
    }

    debug!(
        "Creating {} annotation for conversation {}",
        kind, conversation_id
    );

    let now = Utc::now();
    let annotation = ActiveModel {
        conversation_id: Set(conversation_id),
        kind: Set(kind),
        state: Set(AnnotationState::Pending),
        payload: Set(payload),
        error_message: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        applied_at: Set(None),
        trained_at: Set(None),
        ..Default::default()
    };

    Ok(annotation.save(db).await?.try_into_model()?)
}

/// Updates the corrected fields of a pending annotation. Annotations that
/// have left the pending state are immutable through this path.
pub async fn update(
    db: &DatabaseConnection,
    id: Id,
    update: CorrectionUpdate,
) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    if existing.state != AnnotationState::Pending {
        warn!(
            "Refusing to update annotation {} in state {}",
            id, existing.state
        );
        return Err(Error::invalid_state());
    }

    let mut payload = existing.payload.clone();
    match &mut payload {
        AnnotationPayload::Diarization {
            corrected_speaker, ..
        } => {
            if let Some(speaker) = update.corrected_speaker {
                *corrected_speaker = speaker;
            }
        }
        AnnotationPayload::TranscriptEdit { corrected_text, .. }
        | AnnotationPayload::TitleEdit { corrected_text, .. }
        | AnnotationPayload::MemoryEdit { corrected_text, .. } => {
            if let Some(text) = update.corrected_text {
                *corrected_text = text;
            }
        }
        AnnotationPayload::Insert { text, .. } => {
            if let Some(new_text) = update.corrected_text {
                *text = new_text;
            }
        }
    }
    validate(&payload)?;

    replace_payload(db, existing, payload).await
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| {
        debug!("Annotation with id {} not found", id);
        Error::not_found()
    })
}

/// All annotations for one conversation, oldest first, optionally narrowed
/// to a single kind.
pub async fn find_by_conversation_id(
    db: &DatabaseConnection,
    conversation_id: Id,
    kind: Option<AnnotationKind>,
) -> Result<Vec<Model>, Error> {
    let mut query = Entity::find().filter(Column::ConversationId.eq(conversation_id));
    if let Some(kind) = kind {
        query = query.filter(Column::Kind.eq(kind));
    }
    Ok(query.order_by_asc(Column::CreatedAt).all(db).await?)
}

/// Pending annotations for one conversation, oldest first. This is the
/// working set the preview and apply engines consume.
pub async fn find_pending_by_conversation_id(
    db: &DatabaseConnection,
    conversation_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ConversationId.eq(conversation_id))
        .filter(Column::State.eq(AnnotationState::Pending))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Annotations across all conversations in any of the given states,
/// optionally narrowed to a single kind. Used by the orphan detector.
pub async fn find_by_states(
    db: &DatabaseConnection,
    states: &[AnnotationState],
    kind: Option<AnnotationKind>,
) -> Result<Vec<Model>, Error> {
    let mut query = Entity::find().filter(Column::State.is_in(states.to_vec()));
    if let Some(kind) = kind {
        query = query.filter(Column::Kind.eq(kind));
    }
    Ok(query.order_by_asc(Column::CreatedAt).all(db).await?)
}

/// Applied annotations of one kind, oldest first. These are the rows the
/// training exporter is allowed to submit.
pub async fn find_exportable(
    db: &DatabaseConnection,
    kind: AnnotationKind,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Kind.eq(kind))
        .filter(Column::State.eq(AnnotationState::Applied))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Deletes a pending annotation. Applied, trained, and orphaned annotations
/// are kept as history and cannot be deleted individually.
pub async fn delete(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    let existing = find_by_id(db, id).await?;
    if existing.state != AnnotationState::Pending {
        warn!(
            "Refusing to delete annotation {} in state {}",
            id, existing.state
        );
        return Err(Error::invalid_state());
    }
    Entity::delete_by_id(existing.id).exec(db).await?;
    Ok(())
}

/// Transitions the given pending annotations to applied. Returns an error if
/// any of them changed state underneath the caller, so a surrounding
/// transaction rolls back instead of recording a partial apply.
pub async fn mark_applied<C>(db: &C, ids: &[Id]) -> Result<u64, Error>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(Column::State, Expr::value(AnnotationState::Applied))
        .col_expr(Column::AppliedAt, Expr::value(Some(now)))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.is_in(ids.to_vec()))
        .filter(Column::State.eq(AnnotationState::Pending))
        .exec(db)
        .await?;

    if result.rows_affected != ids.len() as u64 {
        error!(
            "Expected to mark {} annotations applied, updated {}",
            ids.len(),
            result.rows_affected
        );
        return Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotUpdated,
        });
    }
    Ok(result.rows_affected)
}

/// Transitions pending or applied annotations to orphaned.
pub async fn mark_orphaned<C>(db: &C, ids: &[Id]) -> Result<u64, Error>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(Column::State, Expr::value(AnnotationState::Orphaned))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.is_in(ids.to_vec()))
        .filter(
            Column::State.is_in([AnnotationState::Pending, AnnotationState::Applied].to_vec()),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Transitions one applied annotation to trained after a successful export,
/// clearing any error left by an earlier failed attempt.
pub async fn mark_trained(db: &DatabaseConnection, id: Id) -> Result<(), Error> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(Column::State, Expr::value(AnnotationState::Trained))
        .col_expr(Column::TrainedAt, Expr::value(Some(now)))
        .col_expr(Column::ErrorMessage, Expr::value(Value::String(None)))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .filter(Column::State.eq(AnnotationState::Applied))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotUpdated,
        });
    }
    Ok(())
}

/// Records an export failure on an annotation without changing its state, so
/// the next run picks it up again.
pub async fn set_export_error(
    db: &DatabaseConnection,
    id: Id,
    message: String,
) -> Result<(), Error> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    Entity::update_many()
        .col_expr(Column::ErrorMessage, Expr::value(Some(message)))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Bulk-deletes orphaned annotations, optionally narrowed to one kind.
/// Returns the number of rows removed.
pub async fn delete_orphaned(
    db: &DatabaseConnection,
    kind: Option<AnnotationKind>,
) -> Result<u64, Error> {
    let mut query = Entity::delete_many().filter(Column::State.eq(AnnotationState::Orphaned));
    if let Some(kind) = kind {
        query = query.filter(Column::Kind.eq(kind));
    }
    let result = query.exec(db).await?;
    info!("Deleted {} orphaned annotations", result.rows_affected);
    Ok(result.rows_affected)
}

async fn replace_payload(
    db: &DatabaseConnection,
    existing: Model,
    payload: AnnotationPayload,
) -> Result<Model, Error> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Entity::update_many()
        .col_expr(Column::Payload, Expr::value(payload))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(existing.id))
        .filter(Column::State.eq(AnnotationState::Pending))
        .filter(Column::UpdatedAt.eq(existing.updated_at))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // A concurrent writer updated the same slot first. The caller gets
        // whatever won the race.
        debug!("Lost payload race for annotation {}", existing.id);
    }
    find_by_id(db, existing.id).await
}

fn validate(payload: &AnnotationPayload) -> Result<(), Error> {
    let valid = match payload {
        AnnotationPayload::Diarization {
            segment_index,
            corrected_speaker,
            ..
        } => *segment_index >= 0 && !corrected_speaker.trim().is_empty(),
        AnnotationPayload::TranscriptEdit {
            segment_index,
            corrected_text,
            ..
        } => *segment_index >= 0 && !corrected_text.trim().is_empty(),
        AnnotationPayload::Insert {
            insert_after_index,
            text,
            ..
        } => *insert_after_index >= -1 && !text.trim().is_empty(),
        AnnotationPayload::TitleEdit { corrected_text, .. } => !corrected_text.trim().is_empty(),
        AnnotationPayload::MemoryEdit { corrected_text, .. } => !corrected_text.trim().is_empty(),
    };
    if valid {
        Ok(())
    } else {
        Err(Error::validation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::content::SegmentType;

    #[test]
    fn validate_rejects_negative_segment_index() {
        let payload = AnnotationPayload::TranscriptEdit {
            segment_index: -1,
            original_text: "hi".to_string(),
            corrected_text: "hello".to_string(),
        };
        assert!(validate(&payload).is_err());
    }

    #[test]
    fn validate_rejects_blank_correction() {
        let payload = AnnotationPayload::Diarization {
            segment_index: 0,
            original_speaker: "Speaker 1".to_string(),
            corrected_speaker: "   ".to_string(),
            segment_start_time: 0.0,
        };
        assert!(validate(&payload).is_err());
    }

    #[test]
    fn validate_allows_insert_at_front() {
        let payload = AnnotationPayload::Insert {
            insert_after_index: -1,
            text: "First words".to_string(),
            segment_type: SegmentType::Speech,
            speaker: None,
        };
        assert!(validate(&payload).is_ok());
    }

    #[test]
    fn validate_rejects_insert_before_front() {
        let payload = AnnotationPayload::Insert {
            insert_after_index: -2,
            text: "Nowhere".to_string(),
            segment_type: SegmentType::Speech,
            speaker: None,
        };
        assert!(validate(&payload).is_err());
    }
}

#[cfg(test)]
// seaORM's mock feature removes the Clone impl from DatabaseConnection, so
// these stay behind the mock feature gate.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod db_tests {
    use super::*;
    use entity::content::SegmentType;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn annotation(state: AnnotationState, payload: AnnotationPayload) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            conversation_id: Id::new_v4(),
            kind: payload.kind(),
            state,
            payload,
            error_message: None,
            created_at: now.into(),
            updated_at: now.into(),
            applied_at: None,
            trained_at: None,
        }
    }

    fn transcript_edit(segment_index: i32, corrected_text: &str) -> AnnotationPayload {
        AnnotationPayload::TranscriptEdit {
            segment_index,
            original_text: "helo".to_string(),
            corrected_text: corrected_text.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_the_pending_annotation_in_the_same_slot() -> Result<(), Error> {
        let existing = annotation(AnnotationState::Pending, transcript_edit(2, "hello"));
        let mut replaced = existing.clone();
        replaced.payload = transcript_edit(2, "hello world");

        // One pending row occupies the slot; the upsert updates it in place
        // and re-reads the row, so no second id ever appears.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![existing.clone()], vec![replaced.clone()]])
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = upsert(&db, existing.conversation_id, replaced.payload.clone()).await?;

        assert_eq!(result.id, existing.id);
        assert_eq!(result.payload, replaced.payload);

        Ok(())
    }

    #[tokio::test]
    async fn upsert_always_creates_a_new_row_for_inserts() -> Result<(), Error> {
        let payload = AnnotationPayload::Insert {
            insert_after_index: 0,
            text: "missed this".to_string(),
            segment_type: SegmentType::Speech,
            speaker: None,
        };
        let inserted = annotation(AnnotationState::Pending, payload.clone());

        // No slot lookup happens for inserts; the only statement is the
        // insert itself.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![inserted.clone()]])
            .into_connection();

        let result = upsert(&db, inserted.conversation_id, payload).await?;

        assert_eq!(result.kind, AnnotationKind::Insert);
        assert_eq!(result.id, inserted.id);

        Ok(())
    }

    #[tokio::test]
    async fn mark_applied_fails_when_a_row_changed_state_under_it() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        // Two rows were meant to flip but only one was still pending. The
        // error lets a surrounding transaction roll back instead of
        // recording a partial apply.
        let result = mark_applied(&db, &[Id::new_v4(), Id::new_v4()]).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotUpdated
        );
    }

    #[tokio::test]
    async fn delete_refuses_annotations_that_left_pending() {
        let applied = annotation(AnnotationState::Applied, transcript_edit(0, "hello"));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![applied.clone()]])
            .into_connection();

        let result = delete(&db, applied.id).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordInvalidState
        );
    }

    #[tokio::test]
    async fn delete_removes_a_pending_annotation() -> Result<(), Error> {
        let pending = annotation(AnnotationState::Pending, transcript_edit(0, "hello"));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![pending.clone()]])
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        delete(&db, pending.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn mark_trained_only_moves_applied_rows_forward() {
        // A row that is already trained (or was orphaned meanwhile) matches
        // nothing; a repeat export attempt must not silently succeed.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = mark_trained(&db, Id::new_v4()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotUpdated
        );
    }
}
