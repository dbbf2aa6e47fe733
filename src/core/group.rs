//! Computer group store operations - groups and their members.

use crate::{
    core::gateway::{
        BulkMode, BulkOutcome, InsertOutcome, insert_each, insert_if_absent, keyed, settle,
    },
    entities::{ComputerGroup, ComputerGroupMember, computer_group, computer_group_member},
    errors::{Error, Result},
    models,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Finds a computer group by its remote id.
pub async fn find_computer_group<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
) -> Result<Option<computer_group::Model>> {
    ComputerGroup::find()
        .filter(computer_group::Column::GroupId.eq(group_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a computer group is stored.
pub async fn computer_group_exists<C: ConnectionTrait>(db: &C, group_id: i64) -> Result<bool> {
    Ok(find_computer_group(db, group_id).await?.is_some())
}

/// Retrieves the groups stored for a site.
pub async fn get_groups_for_site<C: ConnectionTrait>(
    db: &C,
    site_id: i64,
) -> Result<Vec<computer_group::Model>> {
    ComputerGroup::find()
        .filter(computer_group::Column::SiteId.eq(site_id))
        .order_by_asc(computer_group::Column::GroupId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a computer group unless one with the same id exists.
pub async fn insert_computer_group<C: ConnectionTrait>(
    db: &C,
    record: &models::ComputerGroup,
) -> Result<InsertOutcome> {
    let existing = find_computer_group(db, record.group_id)
        .await
        .map_err(keyed("computer group", record.group_id))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = computer_group::ActiveModel {
        group_id: Set(record.group_id),
        site_id: Set(record.site_id),
        name: Set(record.name.clone()),
        manual: Set(record.manual),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::column(computer_group::Column::GroupId)
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("computer group", record.group_id, e))?;

    let stored = find_computer_group(db, record.group_id)
        .await
        .map_err(keyed("computer group", record.group_id))?;
    settle("computer group", record.group_id, written, stored.map(|g| g.id))
}

/// Stores computer groups in order, applying `mode` to failures.
pub async fn insert_computer_groups<C: ConnectionTrait>(
    db: &C,
    records: &[models::ComputerGroup],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_computer_group(db, record)).await
}

/// Finds a computer's membership in a group.
pub async fn find_group_member<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    computer_id: i64,
) -> Result<Option<computer_group_member::Model>> {
    ComputerGroupMember::find()
        .filter(computer_group_member::Column::GroupId.eq(group_id))
        .filter(computer_group_member::Column::ComputerId.eq(computer_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a computer is stored as a member of a group.
pub async fn group_member_exists<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    computer_id: i64,
) -> Result<bool> {
    Ok(find_group_member(db, group_id, computer_id).await?.is_some())
}

/// Retrieves the members of a group, ordered by computer id.
pub async fn get_group_members<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
) -> Result<Vec<computer_group_member::Model>> {
    ComputerGroupMember::find()
        .filter(computer_group_member::Column::GroupId.eq(group_id))
        .order_by_asc(computer_group_member::Column::ComputerId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a group membership, once per `(group_id, computer_id)`.
pub async fn insert_group_member<C: ConnectionTrait>(
    db: &C,
    record: &models::ComputerGroupMember,
) -> Result<InsertOutcome> {
    let key = format!("({}, {})", record.group_id, record.computer_id);
    let existing = find_group_member(db, record.group_id, record.computer_id)
        .await
        .map_err(keyed("computer group member", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = computer_group_member::ActiveModel {
        group_id: Set(record.group_id),
        computer_id: Set(record.computer_id),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([
            computer_group_member::Column::GroupId,
            computer_group_member::Column::ComputerId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .await
    .map_err(|e| Error::store("computer group member", &key, e))?;

    let stored = find_group_member(db, record.group_id, record.computer_id)
        .await
        .map_err(keyed("computer group member", &key))?;
    settle("computer group member", key, written, stored.map(|m| m.id))
}

/// Stores group memberships in order, applying `mode` to failures.
pub async fn insert_group_members<C: ConnectionTrait>(
    db: &C,
    records: &[models::ComputerGroupMember],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_group_member(db, record)).await
}
