//! Analysis property entity - One reportable field of an analysis.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analysis property database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analysis_property")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Store id of the parent analysis (not the remote analysis id)
    pub analysis_id: i64,
    /// Ordinal of the property within its analysis, used to build relevance queries
    pub sequence_no: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::analysis::Entity",
        from = "Column::AnalysisId",
        to = "super::analysis::Column::Id"
    )]
    Analysis,
    #[sea_orm(has_many = "super::analysis_property_result::Entity")]
    Results,
}

impl Related<super::analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analysis.def()
    }
}

impl Related<super::analysis_property_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Results.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
