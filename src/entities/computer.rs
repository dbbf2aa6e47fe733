//! Computer entity - A managed endpoint.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Computer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "computer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Remote computer id, globally unique on the server
    #[sea_orm(unique)]
    pub computer_id: i64,
    pub computer_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
