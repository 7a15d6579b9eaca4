//! SeaORM Entity for the versions table.
//! Immutable numbered snapshots of a conversation's transcript or memory set.

use crate::content::VersionContent;
use crate::version::{VersionKind, VersionSource};
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::versions::Model)]
#[sea_orm(schema_name = "chronicle", table_name = "versions")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    #[schema(value_type = Uuid)]
    pub id: Id,

    #[schema(value_type = Uuid)]
    pub conversation_id: Id,

    pub kind: VersionKind,

    /// Monotonic per (conversation, kind), starts at 1, never reused
    pub number: i32,

    /// Immutable once the row is inserted
    #[sea_orm(column_type = "JsonBinary")]
    pub content: VersionContent,

    #[schema(value_type = Option<Uuid>)]
    pub parent_version_id: Option<Id>,

    pub created_by: VersionSource,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversations::Entity",
        from = "Column::ConversationId",
        to = "super::conversations::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Conversations,
}

impl Related<super::conversations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
