//! Computer store operations.

use crate::{
    core::gateway::{
        BulkMode, BulkOutcome, InsertOutcome, insert_each, insert_if_absent, keyed, settle,
    },
    entities::{Computer, computer},
    errors::{Error, Result},
    models,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{Set, prelude::*};

/// Finds a computer by its remote id.
pub async fn find_computer<C: ConnectionTrait>(
    db: &C,
    computer_id: i64,
) -> Result<Option<computer::Model>> {
    Computer::find()
        .filter(computer::Column::ComputerId.eq(computer_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a computer by host name. Names are not unique; the first match is returned.
pub async fn find_computer_by_name<C: ConnectionTrait>(
    db: &C,
    computer_name: &str,
) -> Result<Option<computer::Model>> {
    Computer::find()
        .filter(computer::Column::ComputerName.eq(computer_name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a computer is stored.
pub async fn computer_exists<C: ConnectionTrait>(db: &C, computer_id: i64) -> Result<bool> {
    Ok(find_computer(db, computer_id).await?.is_some())
}

/// Stores a computer unless one with the same id exists.
///
/// A renamed computer keeps the name it was first stored with.
pub async fn insert_computer<C: ConnectionTrait>(
    db: &C,
    record: &models::Computer,
) -> Result<InsertOutcome> {
    let existing = find_computer(db, record.computer_id)
        .await
        .map_err(keyed("computer", record.computer_id))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = computer::ActiveModel {
        computer_id: Set(record.computer_id),
        computer_name: Set(record.computer_name.clone()),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::column(computer::Column::ComputerId)
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("computer", record.computer_id, e))?;

    let stored = find_computer(db, record.computer_id)
        .await
        .map_err(keyed("computer", record.computer_id))?;
    settle("computer", record.computer_id, written, stored.map(|c| c.id))
}

/// Stores computers in order, applying `mode` to failures.
pub async fn insert_computers<C: ConnectionTrait>(
    db: &C,
    records: &[models::Computer],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_computer(db, record)).await
}
