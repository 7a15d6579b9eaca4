//! SeaORM Entity for the conversations table.
//! Holds the per-kind active version pointers and the user-facing title.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::conversations::Model)]
#[sea_orm(schema_name = "chronicle", table_name = "conversations")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    #[schema(value_type = Uuid)]
    pub id: Id,

    pub title: String,

    /// Active transcript version; switched by pointer update only
    #[schema(value_type = Option<Uuid>)]
    pub active_transcript_version_id: Option<Id>,

    /// Active memory version; switched by pointer update only
    #[schema(value_type = Option<Uuid>)]
    pub active_memory_version_id: Option<Id>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::versions::Entity")]
    Versions,
}

impl Related<super::versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Versions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
