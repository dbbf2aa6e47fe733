//! Computer group entity - A named set of computers.
//!
//! Manual groups have a static member list; other groups are recomputed by
//! the server. The two kinds are queried differently for their members.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Computer group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "computer_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub group_id: i64,
    pub site_id: i64,
    pub name: String,
    /// Whether membership is manually enumerated
    pub manual: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
