//! Action store operations - actions, their details and per-computer results.

use crate::{
    core::gateway::{
        BulkMode, BulkOutcome, InsertOutcome, insert_each, insert_if_absent, keyed, settle,
    },
    entities::{Action, ActionDetail, ActionResult, action, action_detail, action_result},
    errors::{Error, Result},
    models,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{Set, prelude::*};

/// Finds an action by its remote id.
///
/// Action ids are global on the server, so the id alone is the natural key.
pub async fn find_action<C: ConnectionTrait>(
    db: &C,
    action_id: i64,
) -> Result<Option<action::Model>> {
    Action::find()
        .filter(action::Column::ActionId.eq(action_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether an action with this remote id is stored.
pub async fn action_exists<C: ConnectionTrait>(db: &C, action_id: i64) -> Result<bool> {
    Ok(find_action(db, action_id).await?.is_some())
}

/// Stores an action unless one with the same id exists.
///
/// The record's `site_id` must already point at a stored site; the
/// orchestrator resolves it from the site name the relevance query reports.
pub async fn insert_action<C: ConnectionTrait>(
    db: &C,
    record: &models::Action,
) -> Result<InsertOutcome> {
    let existing = find_action(db, record.action_id)
        .await
        .map_err(keyed("action", record.action_id))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = action::ActiveModel {
        action_id: Set(record.action_id),
        site_id: Set(record.site_id),
        name: Set(record.name.clone()),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::column(action::Column::ActionId)
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("action", record.action_id, e))?;

    let stored = find_action(db, record.action_id)
        .await
        .map_err(keyed("action", record.action_id))?;
    settle("action", record.action_id, written, stored.map(|a| a.id))
}

/// Stores actions in order, applying `mode` to failures.
pub async fn insert_actions<C: ConnectionTrait>(
    db: &C,
    records: &[models::Action],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_action(db, record)).await
}

/// Finds the status header stored for an action.
pub async fn find_action_detail<C: ConnectionTrait>(
    db: &C,
    action_id: i64,
) -> Result<Option<action_detail::Model>> {
    ActionDetail::find()
        .filter(action_detail::Column::ActionId.eq(action_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether an action's status header is stored.
pub async fn action_detail_exists<C: ConnectionTrait>(db: &C, action_id: i64) -> Result<bool> {
    Ok(find_action_detail(db, action_id).await?.is_some())
}

/// Stores an action's status header unless one is already stored.
///
/// The header is written once per action; a later run that sees a different
/// status keeps the first one.
pub async fn insert_action_detail<C: ConnectionTrait>(
    db: &C,
    record: &models::ActionDetail,
) -> Result<InsertOutcome> {
    let existing = find_action_detail(db, record.action_id)
        .await
        .map_err(keyed("action detail", record.action_id))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = action_detail::ActiveModel {
        action_id: Set(record.action_id),
        status: Set(record.status.clone()),
        date_issued: Set(record.date_issued),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::column(action_detail::Column::ActionId)
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("action detail", record.action_id, e))?;

    let stored = find_action_detail(db, record.action_id)
        .await
        .map_err(keyed("action detail", record.action_id))?;
    settle("action detail", record.action_id, written, stored.map(|d| d.id))
}

/// Stores action status headers in order, applying `mode` to failures.
pub async fn insert_action_details<C: ConnectionTrait>(
    db: &C,
    records: &[models::ActionDetail],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_action_detail(db, record)).await
}

/// Finds one computer's result for an action.
pub async fn find_action_result<C: ConnectionTrait>(
    db: &C,
    action_id: i64,
    computer_id: i64,
) -> Result<Option<action_result::Model>> {
    ActionResult::find()
        .filter(action_result::Column::ActionId.eq(action_id))
        .filter(action_result::Column::ComputerId.eq(computer_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a computer's result for an action is stored.
pub async fn action_result_exists<C: ConnectionTrait>(
    db: &C,
    action_id: i64,
    computer_id: i64,
) -> Result<bool> {
    Ok(find_action_result(db, action_id, computer_id).await?.is_some())
}

/// Stores one computer's result for an action, keyed by `(action_id, computer_id)`.
///
/// Start and end times are optional: a computer that has not started or
/// finished the action has none.
pub async fn insert_action_result<C: ConnectionTrait>(
    db: &C,
    record: &models::ActionResult,
) -> Result<InsertOutcome> {
    let key = format!("({}, {})", record.action_id, record.computer_id);
    let existing = find_action_result(db, record.action_id, record.computer_id)
        .await
        .map_err(keyed("action result", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = action_result::ActiveModel {
        action_id: Set(record.action_id),
        computer_id: Set(record.computer_id),
        status: Set(record.status.clone()),
        apply_count: Set(record.apply_count),
        retry_count: Set(record.retry_count),
        line_number: Set(record.line_number),
        start_time: Set(record.start_time),
        end_time: Set(record.end_time),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([
            action_result::Column::ActionId,
            action_result::Column::ComputerId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .await
    .map_err(|e| Error::store("action result", &key, e))?;

    let stored = find_action_result(db, record.action_id, record.computer_id)
        .await
        .map_err(keyed("action result", &key))?;
    settle("action result", key, written, stored.map(|r| r.id))
}

/// Stores action results in order, applying `mode` to failures.
pub async fn insert_action_results<C: ConnectionTrait>(
    db: &C,
    records: &[models::ActionResult],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_action_result(db, record)).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::SiteType;
    use crate::test_utils::*;
    use chrono::{TimeZone, Utc};

    fn result_for(action_id: i64, computer_id: i64) -> models::ActionResult {
        models::ActionResult {
            action_id,
            computer_id,
            status: "Fixed".to_string(),
            apply_count: 1,
            retry_count: 1,
            line_number: 4,
            start_time: Some(Utc.with_ymd_and_hms(2014, 1, 14, 14, 45, 2).unwrap()),
            end_time: None,
        }
    }

    #[tokio::test]
    async fn test_insert_action_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let site = create_test_site(&db, "ActionSite", SiteType::Master).await?;
        let record = models::Action {
            action_id: 101,
            site_id: site.id,
            name: "Install Patch".to_string(),
        };

        assert!(insert_action(&db, &record).await?.is_inserted());
        assert!(!insert_action(&db, &record).await?.is_inserted());
        assert!(action_exists(&db, 101).await?);
        assert!(!action_exists(&db, 102).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_action_with_unknown_site_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let record = models::Action {
            action_id: 101,
            site_id: 999,
            name: "Dangling".to_string(),
        };

        let result = insert_action(&db, &record).await;
        assert!(matches!(result, Err(Error::Store { entity: "action", .. })));
        assert!(!action_exists(&db, 101).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_action_result_composite_key() -> Result<()> {
        let db = setup_test_db().await?;

        let first = insert_action_result(&db, &result_for(101, 1)).await?;
        let other_computer = insert_action_result(&db, &result_for(101, 2)).await?;
        let other_action = insert_action_result(&db, &result_for(102, 1)).await?;
        let repeat = insert_action_result(&db, &result_for(101, 1)).await?;

        assert!(first.is_inserted());
        assert!(other_computer.is_inserted());
        assert!(other_action.is_inserted());
        assert_eq!(repeat, InsertOutcome::Skipped(first.id()));
        assert!(action_result_exists(&db, 101, 2).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_action_result_keeps_absent_end_time() -> Result<()> {
        let db = setup_test_db().await?;
        insert_action_result(&db, &result_for(101, 1)).await?;

        let stored = find_action_result(&db, 101, 1).await?.unwrap();
        assert!(stored.end_time.is_none());
        assert_eq!(
            stored.start_time,
            Some(Utc.with_ymd_and_hms(2014, 1, 14, 14, 45, 2).unwrap())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_action_detail_skip() -> Result<()> {
        let db = setup_test_db().await?;
        let detail = models::ActionDetail {
            action_id: 101,
            status: "Open".to_string(),
            date_issued: Utc.with_ymd_and_hms(2014, 1, 14, 14, 42, 52).unwrap(),
        };

        let bulk = insert_action_details(&db, &[detail.clone(), detail], BulkMode::FailFast).await?;
        assert_eq!(bulk.inserted(), 1);
        assert_eq!(bulk.skipped(), 1);
        assert!(action_detail_exists(&db, 101).await?);
        Ok(())
    }
}
