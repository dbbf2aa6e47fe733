//! Baseline store operations - baselines and their applicable computers.

use crate::{
    core::gateway::{
        BulkMode, BulkOutcome, InsertOutcome, insert_each, insert_if_absent, keyed, settle,
    },
    entities::{Baseline, BaselineResult, baseline, baseline_result},
    errors::{Error, Result},
    models,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Finds a baseline by its remote id.
pub async fn find_baseline<C: ConnectionTrait>(
    db: &C,
    baseline_id: i64,
) -> Result<Option<baseline::Model>> {
    Baseline::find()
        .filter(baseline::Column::BaselineId.eq(baseline_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a baseline is stored.
pub async fn baseline_exists<C: ConnectionTrait>(db: &C, baseline_id: i64) -> Result<bool> {
    Ok(find_baseline(db, baseline_id).await?.is_some())
}

/// Retrieves the baselines stored for a site.
pub async fn get_baselines_for_site<C: ConnectionTrait>(
    db: &C,
    site_id: i64,
) -> Result<Vec<baseline::Model>> {
    Baseline::find()
        .filter(baseline::Column::SiteId.eq(site_id))
        .order_by_asc(baseline::Column::BaselineId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a baseline unless one with the same id exists.
pub async fn insert_baseline<C: ConnectionTrait>(
    db: &C,
    record: &models::Baseline,
) -> Result<InsertOutcome> {
    let existing = find_baseline(db, record.baseline_id)
        .await
        .map_err(keyed("baseline", record.baseline_id))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = baseline::ActiveModel {
        baseline_id: Set(record.baseline_id),
        site_id: Set(record.site_id),
        name: Set(record.name.clone()),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::column(baseline::Column::BaselineId)
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("baseline", record.baseline_id, e))?;

    let stored = find_baseline(db, record.baseline_id)
        .await
        .map_err(keyed("baseline", record.baseline_id))?;
    settle("baseline", record.baseline_id, written, stored.map(|b| b.id))
}

/// Stores baselines in order, applying `mode` to failures.
pub async fn insert_baselines<C: ConnectionTrait>(
    db: &C,
    records: &[models::Baseline],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_baseline(db, record)).await
}

/// Finds the record that a baseline is relevant on a computer.
pub async fn find_baseline_result<C: ConnectionTrait>(
    db: &C,
    baseline_id: i64,
    computer_id: i64,
) -> Result<Option<baseline_result::Model>> {
    BaselineResult::find()
        .filter(baseline_result::Column::BaselineId.eq(baseline_id))
        .filter(baseline_result::Column::ComputerId.eq(computer_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a baseline is recorded as relevant on a computer.
pub async fn baseline_result_exists<C: ConnectionTrait>(
    db: &C,
    baseline_id: i64,
    computer_id: i64,
) -> Result<bool> {
    Ok(find_baseline_result(db, baseline_id, computer_id)
        .await?
        .is_some())
}

/// Records that a baseline is relevant on a computer, once per pair.
pub async fn insert_baseline_result<C: ConnectionTrait>(
    db: &C,
    record: &models::BaselineResult,
) -> Result<InsertOutcome> {
    let key = format!("({}, {})", record.baseline_id, record.computer_id);
    let existing = find_baseline_result(db, record.baseline_id, record.computer_id)
        .await
        .map_err(keyed("baseline result", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = baseline_result::ActiveModel {
        baseline_id: Set(record.baseline_id),
        computer_id: Set(record.computer_id),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([
            baseline_result::Column::BaselineId,
            baseline_result::Column::ComputerId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .await
    .map_err(|e| Error::store("baseline result", &key, e))?;

    let stored = find_baseline_result(db, record.baseline_id, record.computer_id)
        .await
        .map_err(keyed("baseline result", &key))?;
    settle("baseline result", key, written, stored.map(|r| r.id))
}

/// Stores baseline results in order, applying `mode` to failures.
pub async fn insert_baseline_results<C: ConnectionTrait>(
    db: &C,
    records: &[models::BaselineResult],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_baseline_result(db, record)).await
}
