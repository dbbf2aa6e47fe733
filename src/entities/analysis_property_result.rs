//! Analysis property result entity - A value reported by one computer for one property.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analysis property result database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analysis_property_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub analysis_property_id: i64,
    pub computer_id: i64,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::analysis_property::Entity",
        from = "Column::AnalysisPropertyId",
        to = "super::analysis_property::Column::Id"
    )]
    Property,
}

impl Related<super::analysis_property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Property.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
