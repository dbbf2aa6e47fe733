//! Database configuration module.
//!
//! Handles the store connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite natural keys get
//! their unique indexes here; the conditional inserts in [`crate::core`] rely
//! on them as conflict targets.

use crate::config::settings::AppConfig;
use crate::entities::{
    Action, ActionDetail, ActionResult, Analysis, AnalysisProperty, AnalysisPropertyResult,
    Baseline, BaselineResult, Computer, ComputerGroup, ComputerGroupMember, Site, action_result,
    analysis, analysis_property, analysis_property_result, baseline_result,
    computer_group_member, site,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/bes_scraper.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, then the
/// config file, then a default local `SQLite` file.
#[must_use]
pub fn get_database_url(config: &AppConfig) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| config.database_url.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the directory of a file-backed `SQLite` URL, since `mode=rwc`
/// creates the file but not its parent.
pub fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Establishes a connection to the store.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and natural-key indexes that do not exist yet.
///
/// Safe to call on every run: existing tables and indexes are left untouched.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    // Parents before children so foreign keys always point at existing tables
    create_table(db, &schema, Site).await?;
    create_table(db, &schema, Computer).await?;
    create_table(db, &schema, Action).await?;
    create_table(db, &schema, ActionDetail).await?;
    create_table(db, &schema, ActionResult).await?;
    create_table(db, &schema, Analysis).await?;
    create_table(db, &schema, AnalysisProperty).await?;
    create_table(db, &schema, AnalysisPropertyResult).await?;
    create_table(db, &schema, Baseline).await?;
    create_table(db, &schema, BaselineResult).await?;
    create_table(db, &schema, ComputerGroup).await?;
    create_table(db, &schema, ComputerGroupMember).await?;

    for index in natural_key_indexes() {
        db.execute(db.get_database_backend().build(&index)).await?;
    }

    info!("Database tables ensured.");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(db.get_database_backend().build(&statement))
        .await?;
    Ok(())
}

fn natural_key_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .if_not_exists()
            .name("ux_site_name_type")
            .table(Site)
            .col(site::Column::Name)
            .col(site::Column::SiteType)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("ux_action_result_action_computer")
            .table(ActionResult)
            .col(action_result::Column::ActionId)
            .col(action_result::Column::ComputerId)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("ux_analysis_site_analysis")
            .table(Analysis)
            .col(analysis::Column::SiteId)
            .col(analysis::Column::AnalysisId)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("ux_analysis_property_analysis_sequence")
            .table(AnalysisProperty)
            .col(analysis_property::Column::AnalysisId)
            .col(analysis_property::Column::SequenceNo)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("ux_analysis_property_result_property_computer")
            .table(AnalysisPropertyResult)
            .col(analysis_property_result::Column::AnalysisPropertyId)
            .col(analysis_property_result::Column::ComputerId)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("ux_baseline_result_baseline_computer")
            .table(BaselineResult)
            .col(baseline_result::Column::BaselineId)
            .col(baseline_result::Column::ComputerId)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("ux_computer_group_member_group_computer")
            .table(ComputerGroupMember)
            .col(computer_group_member::Column::GroupId)
            .col(computer_group_member::Column::ComputerId)
            .unique()
            .to_owned(),
    ]
}
