//! Analysis entity - A named set of reportable properties.
//!
//! The remote analysis id is only unique within a site: two sites can both
//! have an analysis 12. Every lookup must therefore use `(site_id, analysis_id)`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analysis database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analysis")]
pub struct Model {
    /// Store-assigned surrogate key, referenced by analysis properties
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Remote id, unique per site only
    pub analysis_id: i64,
    pub site_id: i64,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
    #[sea_orm(has_many = "super::analysis_property::Entity")]
    Properties,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::analysis_property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Properties.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
