//! Identity resolution between remote addressing and store surrogate keys.
//!
//! The remote server names sites instead of numbering them and reuses
//! analysis ids across sites. These lookups turn what the remote client
//! returns into the store ids that child rows reference. A miss means a
//! prerequisite was never stored, so it is an error rather than `None`.

use crate::{
    core::{analysis::find_analysis, site::find_sites_by_name},
    entities::{Analysis, Site, analysis, site},
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use tracing::{instrument, warn};

/// Resolves a site name to its store id.
///
/// Sites are keyed by name and kind, so a name shared by sites of different
/// kinds cannot be resolved from the name alone and is reported as
/// [`Error::Unresolved`] rather than guessed.
#[instrument(skip(db))]
pub async fn resolve_site_id_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<i64> {
    match find_sites_by_name(db, name).await?.as_slice() {
        [site] => Ok(site.id),
        [] => {
            warn!("Site not found in store");
            Err(Error::unresolved("site", name))
        }
        matches => {
            warn!("{} sites share this name", matches.len());
            Err(Error::unresolved(
                "site",
                format!("{name} (ambiguous across {} sites)", matches.len()),
            ))
        }
    }
}

/// Loads a stored site by its surrogate id.
#[instrument(skip(db))]
pub async fn resolve_site_by_id<C: ConnectionTrait>(db: &C, site_id: i64) -> Result<site::Model> {
    Site::find_by_id(site_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::unresolved("site", format!("id {site_id}")))
}

/// Resolves a remote analysis id, which is only unique within its site.
#[instrument(skip(db))]
pub async fn resolve_analysis_by_site_and_remote_id<C: ConnectionTrait>(
    db: &C,
    site_id: i64,
    analysis_id: i64,
) -> Result<analysis::Model> {
    find_analysis(db, site_id, analysis_id).await?.ok_or_else(|| {
        Error::unresolved(
            "analysis",
            format!("(site {site_id}, analysis {analysis_id})"),
        )
    })
}

/// Loads a stored analysis by its surrogate id.
///
/// Used where only the analysis row id is at hand, e.g. when walking
/// properties back to the analysis and site they belong to.
#[instrument(skip(db))]
pub async fn resolve_analysis_by_id<C: ConnectionTrait>(
    db: &C,
    analysis_store_id: i64,
) -> Result<analysis::Model> {
    Analysis::find_by_id(analysis_store_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::unresolved("analysis", format!("id {analysis_store_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SiteType;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_resolve_site_both_ways() -> Result<()> {
        let db = setup_test_db().await?;
        let stored = create_test_site(&db, "BES Support", SiteType::External).await?;

        let id = resolve_site_id_by_name(&db, "BES Support").await?;
        assert_eq!(id, stored.id);

        let site = resolve_site_by_id(&db, id).await?;
        assert_eq!(site, stored);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_site_is_unresolved() -> Result<()> {
        let db = setup_test_db().await?;

        let by_name = resolve_site_id_by_name(&db, "Nowhere").await;
        assert!(matches!(by_name, Err(Error::Unresolved { entity: "site", .. })));

        let by_id = resolve_site_by_id(&db, 42).await;
        assert!(matches!(by_id, Err(Error::Unresolved { entity: "site", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_shared_site_name_is_ambiguous() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_site(&db, "Patches", SiteType::Custom).await?;
        create_test_site(&db, "Patches", SiteType::Operator).await?;

        let result = resolve_site_id_by_name(&db, "Patches").await;
        match result {
            Err(Error::Unresolved { entity, key }) => {
                assert_eq!(entity, "site");
                assert!(key.contains("ambiguous"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_analysis_identity_round_trips_per_site() -> Result<()> {
        let db = setup_test_db().await?;
        let master = create_test_site(&db, "ActionSite", SiteType::Master).await?;
        let custom = create_test_site(&db, "Patches", SiteType::Custom).await?;
        let a = create_test_analysis(&db, master.id, 12, "Disk Space").await?;
        let b = create_test_analysis(&db, custom.id, 12, "Installed Software").await?;

        let resolved_a = resolve_analysis_by_site_and_remote_id(&db, master.id, 12).await?;
        let resolved_b = resolve_analysis_by_site_and_remote_id(&db, custom.id, 12).await?;
        assert_eq!(resolved_a, a);
        assert_eq!(resolved_b, b);

        assert_eq!(resolve_analysis_by_id(&db, a.id).await?, a);
        assert_eq!(resolve_analysis_by_id(&db, b.id).await?, b);
        Ok(())
    }

    #[tokio::test]
    async fn test_analysis_in_wrong_site_is_unresolved() -> Result<()> {
        let db = setup_test_db().await?;
        let master = create_test_site(&db, "ActionSite", SiteType::Master).await?;
        let custom = create_test_site(&db, "Patches", SiteType::Custom).await?;
        create_test_analysis(&db, master.id, 12, "Disk Space").await?;

        let result = resolve_analysis_by_site_and_remote_id(&db, custom.id, 12).await;
        assert!(matches!(
            result,
            Err(Error::Unresolved {
                entity: "analysis",
                ..
            })
        ));
        Ok(())
    }
}
