//! Site store operations.
//!
//! Sites are keyed by `(name, site_type)` in the store; the remote server
//! reports no numeric site id, so the surrogate id assigned here is what every
//! other table uses.

use crate::{
    core::gateway::{
        BulkMode, BulkOutcome, InsertOutcome, insert_each, insert_if_absent, keyed, settle,
    },
    entities::{Site, SiteType, site},
    errors::{Error, Result},
    models,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Finds a site by its natural key.
pub async fn find_site<C: ConnectionTrait>(
    db: &C,
    name: &str,
    site_type: SiteType,
) -> Result<Option<site::Model>> {
    Site::find()
        .filter(site::Column::Name.eq(name))
        .filter(site::Column::SiteType.eq(site_type))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds every site with the given name, whatever its kind.
///
/// Actions name their site without its kind, so this is how they are matched
/// back to a stored site. More than one row means the name alone is ambiguous.
pub async fn find_sites_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Vec<site::Model>> {
    Site::find()
        .filter(site::Column::Name.eq(name))
        .order_by_asc(site::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a site with this name and kind is stored.
pub async fn site_exists<C: ConnectionTrait>(
    db: &C,
    name: &str,
    site_type: SiteType,
) -> Result<bool> {
    Ok(find_site(db, name, site_type).await?.is_some())
}

/// Retrieves every stored site, ordered by id.
pub async fn get_all_sites<C: ConnectionTrait>(db: &C) -> Result<Vec<site::Model>> {
    Site::find()
        .order_by_asc(site::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a site unless one with the same name and kind exists.
///
/// A custom site and an operator site may share a name; both are stored.
pub async fn insert_site<C: ConnectionTrait>(
    db: &C,
    record: &models::Site,
) -> Result<InsertOutcome> {
    let key = format!("{} ({})", record.name, record.site_type.as_str());
    let existing = find_site(db, &record.name, record.site_type)
        .await
        .map_err(keyed("site", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = site::ActiveModel {
        name: Set(record.name.clone()),
        site_type: Set(record.site_type),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([site::Column::Name, site::Column::SiteType])
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("site", &key, e))?;

    let stored = find_site(db, &record.name, record.site_type)
        .await
        .map_err(keyed("site", &key))?;
    settle("site", key, written, stored.map(|s| s.id))
}

/// Stores sites in order, applying `mode` to failures.
pub async fn insert_sites<C: ConnectionTrait>(
    db: &C,
    records: &[models::Site],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_site(db, record)).await
}
