//! Action result entity - Per-computer execution record of an action.
//!
//! `start_time` and `end_time` stay `None` until the computer has started or
//! finished running the action.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Action result database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "action_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub action_id: i64,
    pub computer_id: i64,
    pub status: String,
    /// Times the action was applied on this computer
    pub apply_count: i32,
    /// Times the action was retried on this computer
    pub retry_count: i32,
    /// Script line currently being executed
    pub line_number: i32,
    pub start_time: Option<DateTimeUtc>,
    pub end_time: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
