//! Insert-if-absent primitives shared by every entity module.
//!
//! Each insert first looks the record up by its natural key and skips the
//! write when a row exists. The write itself is a single conditional insert
//! (`ON CONFLICT (natural key) DO NOTHING`), so a row that appears between the
//! lookup and the write is also reported as a skip instead of producing a
//! duplicate or a constraint error.

use crate::errors::{Error, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel};
use std::future::Future;
use tracing::warn;

/// What an insert call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written; carries its surrogate id.
    Inserted(i64),
    /// A row with the same natural key already existed; carries its id.
    Skipped(i64),
}

impl InsertOutcome {
    /// Surrogate id of the row, whether it was just written or already present.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Skipped(id) => id,
        }
    }

    /// Whether a new row was written.
    #[must_use]
    pub const fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// How a bulk insert reacts to a record that fails to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkMode {
    /// Stop at the first failure and return its error.
    #[default]
    FailFast,
    /// Record the failure and carry on with the next record.
    Isolate,
}

/// Result of a bulk insert.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    /// Outcomes of the records that stored, in input order
    pub outcomes: Vec<InsertOutcome>,
    /// Failures collected in [`BulkMode::Isolate`]
    pub failures: Vec<Error>,
}

impl BulkOutcome {
    /// Number of records that produced a new row.
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_inserted()).count()
    }

    /// Number of records that were already stored.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.inserted()
    }

    /// Surrogate ids of every stored record, in input order.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.outcomes.iter().map(|o| o.id()).collect()
    }
}

/// Writes `model` unless a row with the same natural key already exists.
///
/// Returns the number of rows written (0 or 1).
pub(crate) async fn insert_if_absent<A, C>(
    db: &C,
    model: A,
    conflict: OnConflict,
) -> std::result::Result<u64, DbErr>
where
    A: ActiveModelTrait,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    <A::Entity as EntityTrait>::insert(model)
        .on_conflict(conflict)
        .exec_without_returning(db)
        .await
}

/// Builds the outcome of a conditional insert from the rows it wrote and the
/// row found by natural key afterwards.
pub(crate) fn settle(
    entity: &'static str,
    key: impl ToString,
    written: u64,
    stored_id: Option<i64>,
) -> Result<InsertOutcome> {
    let id = stored_id.ok_or_else(|| {
        Error::store(
            entity,
            key,
            DbErr::RecordNotFound("row missing after insert".to_string()),
        )
    })?;
    Ok(if written == 0 {
        InsertOutcome::Skipped(id)
    } else {
        InsertOutcome::Inserted(id)
    })
}

/// Names the record being stored on a failed natural-key lookup.
///
/// Lookups return [`Error::Database`]; inside an insert they become
/// [`Error::Store`] so a bulk insert reports which record it stopped at.
pub(crate) fn keyed(entity: &'static str, key: impl ToString) -> impl FnOnce(Error) -> Error {
    let key = key.to_string();
    move |e| match e {
        Error::Database(source) => Error::store(entity, key, source),
        other => other,
    }
}

/// Runs `insert` over `records` in order, applying `mode` to failures.
pub async fn insert_each<'a, R, F, Fut>(
    records: &'a [R],
    mode: BulkMode,
    mut insert: F,
) -> Result<BulkOutcome>
where
    F: FnMut(&'a R) -> Fut,
    Fut: Future<Output = Result<InsertOutcome>>,
{
    let mut bulk = BulkOutcome {
        outcomes: Vec::with_capacity(records.len()),
        failures: Vec::new(),
    };

    for record in records {
        match insert(record).await {
            Ok(outcome) => bulk.outcomes.push(outcome),
            Err(e) if mode == BulkMode::Isolate => {
                warn!("Insert failed, continuing: {}", e);
                bulk.failures.push(e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(bulk)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    async fn fake_insert(value: &i64) -> Result<InsertOutcome> {
        match *value {
            v if v < 0 => Err(Error::store("computer", v, DbErr::Custom("boom".to_string()))),
            v if v % 2 == 0 => Ok(InsertOutcome::Skipped(v)),
            v => Ok(InsertOutcome::Inserted(v)),
        }
    }

    #[tokio::test]
    async fn test_insert_each_preserves_order() -> Result<()> {
        let records = vec![3, 2, 5];
        let bulk = insert_each(&records, BulkMode::FailFast, fake_insert).await?;
        assert_eq!(bulk.ids(), vec![3, 2, 5]);
        assert_eq!(bulk.inserted(), 2);
        assert_eq!(bulk.skipped(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fail_fast_reports_failing_record() {
        let records = vec![1, -7, 3];
        let err = insert_each(&records, BulkMode::FailFast, fake_insert)
            .await
            .unwrap_err();
        match err {
            Error::Store { entity, key, .. } => {
                assert_eq!(entity, "computer");
                assert_eq!(key, "-7");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_isolate_continues_past_failure() -> Result<()> {
        let records = vec![1, -7, 3];
        let bulk = insert_each(&records, BulkMode::Isolate, fake_insert).await?;
        assert_eq!(bulk.ids(), vec![1, 3]);
        assert_eq!(bulk.failures.len(), 1);
        Ok(())
    }

    #[test]
    fn test_keyed_names_record_on_lookup_failure() {
        let err = keyed("site", "Patches (custom)")(Error::Database(DbErr::Custom(
            "connection closed".to_string(),
        )));
        match err {
            Error::Store { entity, key, .. } => {
                assert_eq!(entity, "site");
                assert_eq!(key, "Patches (custom)");
            }
            other => panic!("unexpected error: {other}"),
        }

        let untouched = keyed("site", "Patches")(Error::unresolved("site", "Patches"));
        assert!(matches!(untouched, Error::Unresolved { .. }));
    }

    #[test]
    fn test_settle_zero_rows_is_skip() {
        let outcome = settle("site", "BES Support", 0, Some(4)).unwrap();
        assert_eq!(outcome, InsertOutcome::Skipped(4));
        let outcome = settle("site", "BES Support", 1, Some(4)).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(4));
        assert!(settle("site", "BES Support", 1, None).is_err());
    }
}
