//! Site entity - A content namespace on the remote server.
//!
//! The remote API has no numeric site id, so the store assigns one. Sites are
//! addressed remotely by `(site_type, name)`, which is also their natural key
//! in the store; the master action site is addressed by its type alone.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of site, as used in REST resource paths.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SiteType {
    /// The distinguished master action site
    #[sea_orm(string_value = "master")]
    Master,
    #[sea_orm(string_value = "custom")]
    Custom,
    #[sea_orm(string_value = "external")]
    External,
    #[sea_orm(string_value = "operator")]
    Operator,
}

impl SiteType {
    /// Path segment used by the REST API for this kind of site.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Custom => "custom",
            Self::External => "external",
            Self::Operator => "operator",
        }
    }

    /// Maps an element name from the `sites` listing (`ActionSite`, `CustomSite`, ...)
    /// to its site kind.
    #[must_use]
    pub fn from_element(element: &str) -> Option<Self> {
        match element {
            "ActionSite" => Some(Self::Master),
            "CustomSite" => Some(Self::Custom),
            "ExternalSite" => Some(Self::External),
            "OperatorSite" => Some(Self::Operator),
            _ => None,
        }
    }
}

/// Site database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site")]
pub struct Model {
    /// Store-assigned surrogate key
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Site name as reported by the remote server
    pub name: String,
    /// Kind of site; two sites of different kinds may share a name
    pub site_type: SiteType,
}

/// Defines relationships between Site and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::action::Entity")]
    Actions,
    #[sea_orm(has_many = "super::analysis::Entity")]
    Analyses,
    #[sea_orm(has_many = "super::baseline::Entity")]
    Baselines,
    #[sea_orm(has_many = "super::computer_group::Entity")]
    ComputerGroups,
}

impl Related<super::action::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actions.def()
    }
}

impl Related<super::analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analyses.def()
    }
}

impl Related<super::baseline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Baselines.def()
    }
}

impl Related<super::computer_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ComputerGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
