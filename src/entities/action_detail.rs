//! Action detail entity - Overall status of an action, 1:1 with [`super::action`].
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Action detail database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "action_detail")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub action_id: i64,
    /// Status string as reported (`Open`, `Stopped`, `Expired`, ...)
    pub status: String,
    pub date_issued: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
