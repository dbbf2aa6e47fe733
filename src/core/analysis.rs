//! Analysis store operations - analyses, their properties and property results.
//!
//! Remote analysis ids repeat across sites, so analyses are always looked up
//! by `(site_id, analysis_id)`. Properties and results hang off store ids.

use crate::{
    core::gateway::{
        BulkMode, BulkOutcome, InsertOutcome, insert_each, insert_if_absent, keyed, settle,
    },
    entities::{
        Analysis, AnalysisProperty, AnalysisPropertyResult, analysis, analysis_property,
        analysis_property_result,
    },
    errors::{Error, Result},
    models,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Finds an analysis by site and remote id.
///
/// Remote analysis ids repeat across sites, so both parts are needed.
pub async fn find_analysis<C: ConnectionTrait>(
    db: &C,
    site_id: i64,
    analysis_id: i64,
) -> Result<Option<analysis::Model>> {
    Analysis::find()
        .filter(analysis::Column::SiteId.eq(site_id))
        .filter(analysis::Column::AnalysisId.eq(analysis_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether an analysis is stored under a site.
pub async fn analysis_exists<C: ConnectionTrait>(
    db: &C,
    site_id: i64,
    analysis_id: i64,
) -> Result<bool> {
    Ok(find_analysis(db, site_id, analysis_id).await?.is_some())
}

/// Retrieves every analysis stored for a site.
pub async fn get_analyses_for_site<C: ConnectionTrait>(
    db: &C,
    site_id: i64,
) -> Result<Vec<analysis::Model>> {
    Analysis::find()
        .filter(analysis::Column::SiteId.eq(site_id))
        .order_by_asc(analysis::Column::AnalysisId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores an analysis unless the site already has one with that remote id.
pub async fn insert_analysis<C: ConnectionTrait>(
    db: &C,
    record: &models::Analysis,
) -> Result<InsertOutcome> {
    let key = format!("(site {}, analysis {})", record.site_id, record.analysis_id);
    let existing = find_analysis(db, record.site_id, record.analysis_id)
        .await
        .map_err(keyed("analysis", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = analysis::ActiveModel {
        analysis_id: Set(record.analysis_id),
        site_id: Set(record.site_id),
        name: Set(record.name.clone()),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([analysis::Column::SiteId, analysis::Column::AnalysisId])
            .do_nothing()
            .to_owned(),
    )
    .await
    .map_err(|e| Error::store("analysis", &key, e))?;

    let stored = find_analysis(db, record.site_id, record.analysis_id)
        .await
        .map_err(keyed("analysis", &key))?;
    settle("analysis", key, written, stored.map(|a| a.id))
}

/// Stores analyses in order, applying `mode` to failures.
pub async fn insert_analyses<C: ConnectionTrait>(
    db: &C,
    records: &[models::Analysis],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_analysis(db, record)).await
}

/// Finds a property by its analysis store id and sequence number.
pub async fn find_analysis_property<C: ConnectionTrait>(
    db: &C,
    analysis_id: i64,
    sequence_no: i32,
) -> Result<Option<analysis_property::Model>> {
    AnalysisProperty::find()
        .filter(analysis_property::Column::AnalysisId.eq(analysis_id))
        .filter(analysis_property::Column::SequenceNo.eq(sequence_no))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a property is stored for an analysis.
pub async fn analysis_property_exists<C: ConnectionTrait>(
    db: &C,
    analysis_id: i64,
    sequence_no: i32,
) -> Result<bool> {
    Ok(find_analysis_property(db, analysis_id, sequence_no)
        .await?
        .is_some())
}

/// Loads a property by its surrogate id.
pub async fn get_analysis_property_by_id<C: ConnectionTrait>(
    db: &C,
    property_id: i64,
) -> Result<Option<analysis_property::Model>> {
    AnalysisProperty::find_by_id(property_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the properties of an analysis, ordered by sequence number.
pub async fn get_properties_for_analysis<C: ConnectionTrait>(
    db: &C,
    analysis_store_id: i64,
) -> Result<Vec<analysis_property::Model>> {
    AnalysisProperty::find()
        .filter(analysis_property::Column::AnalysisId.eq(analysis_store_id))
        .order_by_asc(analysis_property::Column::SequenceNo)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores an analysis property unless that sequence number is already stored.
pub async fn insert_analysis_property<C: ConnectionTrait>(
    db: &C,
    record: &models::AnalysisProperty,
) -> Result<InsertOutcome> {
    let key = format!("(analysis {}, sequence {})", record.analysis_id, record.sequence_no);
    let existing = find_analysis_property(db, record.analysis_id, record.sequence_no)
        .await
        .map_err(keyed("analysis property", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = analysis_property::ActiveModel {
        analysis_id: Set(record.analysis_id),
        sequence_no: Set(record.sequence_no),
        name: Set(record.name.clone()),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([
            analysis_property::Column::AnalysisId,
            analysis_property::Column::SequenceNo,
        ])
        .do_nothing()
        .to_owned(),
    )
    .await
    .map_err(|e| Error::store("analysis property", &key, e))?;

    let stored = find_analysis_property(db, record.analysis_id, record.sequence_no)
        .await
        .map_err(keyed("analysis property", &key))?;
    settle("analysis property", key, written, stored.map(|p| p.id))
}

/// Stores analysis properties in order, applying `mode` to failures.
pub async fn insert_analysis_properties<C: ConnectionTrait>(
    db: &C,
    records: &[models::AnalysisProperty],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| insert_analysis_property(db, record)).await
}

/// Finds a computer's stored value for a property.
pub async fn find_analysis_property_result<C: ConnectionTrait>(
    db: &C,
    analysis_property_id: i64,
    computer_id: i64,
) -> Result<Option<analysis_property_result::Model>> {
    AnalysisPropertyResult::find()
        .filter(analysis_property_result::Column::AnalysisPropertyId.eq(analysis_property_id))
        .filter(analysis_property_result::Column::ComputerId.eq(computer_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a computer's value for a property is stored.
pub async fn analysis_property_result_exists<C: ConnectionTrait>(
    db: &C,
    analysis_property_id: i64,
    computer_id: i64,
) -> Result<bool> {
    Ok(
        find_analysis_property_result(db, analysis_property_id, computer_id)
            .await?
            .is_some(),
    )
}

/// Stores one computer's value for a property.
///
/// A computer reporting several values for the same property keeps the first
/// one stored; later values are skipped.
pub async fn insert_analysis_property_result<C: ConnectionTrait>(
    db: &C,
    record: &models::AnalysisPropertyResult,
) -> Result<InsertOutcome> {
    let key = format!(
        "(property {}, computer {})",
        record.analysis_property_id, record.computer_id
    );
    let existing = find_analysis_property_result(
        db,
        record.analysis_property_id,
        record.computer_id,
    )
    .await
    .map_err(keyed("analysis property result", &key))?;
    if let Some(existing) = existing {
        return Ok(InsertOutcome::Skipped(existing.id));
    }

    let model = analysis_property_result::ActiveModel {
        analysis_property_id: Set(record.analysis_property_id),
        computer_id: Set(record.computer_id),
        value: Set(record.value.clone()),
        ..Default::default()
    };
    let written = insert_if_absent(
        db,
        model,
        OnConflict::columns([
            analysis_property_result::Column::AnalysisPropertyId,
            analysis_property_result::Column::ComputerId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .await
    .map_err(|e| Error::store("analysis property result", &key, e))?;

    let stored = find_analysis_property_result(db, record.analysis_property_id, record.computer_id)
        .await
        .map_err(keyed("analysis property result", &key))?;
    settle("analysis property result", key, written, stored.map(|r| r.id))
}

/// Stores property values in order, applying `mode` to failures.
pub async fn insert_analysis_property_results<C: ConnectionTrait>(
    db: &C,
    records: &[models::AnalysisPropertyResult],
    mode: BulkMode,
) -> Result<BulkOutcome> {
    insert_each(records, mode, |record| {
        insert_analysis_property_result(db, record)
    })
    .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::SiteType;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_same_remote_id_in_two_sites_does_not_collide() -> Result<()> {
        let db = setup_test_db().await?;
        let master = create_test_site(&db, "ActionSite", SiteType::Master).await?;
        let custom = create_test_site(&db, "Patches", SiteType::Custom).await?;

        let in_master = insert_analysis(
            &db,
            &models::Analysis {
                analysis_id: 12,
                site_id: master.id,
                name: "Disk Space".to_string(),
            },
        )
        .await?;
        let in_custom = insert_analysis(
            &db,
            &models::Analysis {
                analysis_id: 12,
                site_id: custom.id,
                name: "Installed Software".to_string(),
            },
        )
        .await?;

        assert!(in_master.is_inserted());
        assert!(in_custom.is_inserted());
        assert_ne!(in_master.id(), in_custom.id());

        let stored = find_analysis(&db, custom.id, 12).await?.unwrap();
        assert_eq!(stored.name, "Installed Software");
        assert_eq!(get_analyses_for_site(&db, master.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_analysis_property_skip() -> Result<()> {
        let db = setup_test_db().await?;
        let site = create_test_site(&db, "Patches", SiteType::Custom).await?;
        let analysis = create_test_analysis(&db, site.id, 12, "Disk Space").await?;
        let record = models::AnalysisProperty {
            analysis_id: analysis.id,
            sequence_no: 1,
            name: "Free Space".to_string(),
        };

        let first = insert_analysis_property(&db, &record).await?;
        let second = insert_analysis_property(&db, &record).await?;
        assert!(first.is_inserted());
        assert_eq!(second, InsertOutcome::Skipped(first.id()));
        assert!(analysis_property_exists(&db, analysis.id, 1).await?);
        assert!(!analysis_property_exists(&db, analysis.id, 2).await?);

        let by_id = get_analysis_property_by_id(&db, first.id()).await?.unwrap();
        assert_eq!(by_id.name, "Free Space");
        Ok(())
    }

    #[tokio::test]
    async fn test_property_result_first_value_wins() -> Result<()> {
        let db = setup_test_db().await?;
        let site = create_test_site(&db, "Patches", SiteType::Custom).await?;
        let analysis = create_test_analysis(&db, site.id, 12, "Disk Space").await?;
        let property = insert_analysis_property(
            &db,
            &models::AnalysisProperty {
                analysis_id: analysis.id,
                sequence_no: 1,
                name: "Free Space".to_string(),
            },
        )
        .await?;

        let records = vec![
            models::AnalysisPropertyResult {
                analysis_property_id: property.id(),
                computer_id: 7,
                value: "10 GB".to_string(),
            },
            models::AnalysisPropertyResult {
                analysis_property_id: property.id(),
                computer_id: 7,
                value: "11 GB".to_string(),
            },
        ];
        let bulk = insert_analysis_property_results(&db, &records, BulkMode::FailFast).await?;
        assert_eq!(bulk.inserted(), 1);
        assert_eq!(bulk.skipped(), 1);

        let stored = find_analysis_property_result(&db, property.id(), 7)
            .await?
            .unwrap();
        assert_eq!(stored.value, "10 GB");
        assert!(analysis_property_result_exists(&db, property.id(), 7).await?);
        Ok(())
    }
}
