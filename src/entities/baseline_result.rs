//! Baseline result entity - Records that a computer is in a baseline's applicable set.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Baseline result database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "baseline_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub baseline_id: i64,
    pub computer_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
