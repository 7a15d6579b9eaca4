//! SeaORM Entity for the annotations table.
//! Stores pending and historical corrections against a conversation.

use crate::annotation::{AnnotationKind, AnnotationState};
use crate::payload::AnnotationPayload;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::annotations::Model)]
#[sea_orm(schema_name = "chronicle", table_name = "annotations")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    #[schema(value_type = Uuid)]
    pub id: Id,

    /// Deliberately not a foreign key: annotations must outlive their
    /// conversation so the orphan detector can mark them.
    #[schema(value_type = Uuid)]
    pub conversation_id: Id,

    pub kind: AnnotationKind,

    pub state: AnnotationState,

    /// Kind-specific correction fields
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: AnnotationPayload,

    /// Last per-item export failure, cleared on success
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub applied_at: Option<DateTimeWithTimeZone>,

    #[serde(skip_deserializing)]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub trained_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
