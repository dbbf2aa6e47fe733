//! Extraction orchestrator.
//!
//! [`Extractor::run`] walks the remote inventory in dependency order and
//! stores everything it finds: sites, computers, per-site analyses,
//! baselines and groups, actions with their status, analysis properties and
//! their results, baseline results, and group members.
//!
//! Requests for leaf entities fan out with the client's concurrency limit.
//! Responses are collected first and written afterwards from this task, so
//! the store only ever sees one writer.
//!
//! A failed fetch is logged and counted against its entity kind, and the
//! run moves on; only the site listing is required. Store failures follow
//! the configured [`BulkMode`].

/// Per-entity run counts
pub mod summary;

use crate::{
    api::{BesApi, Transport},
    config::AppConfig,
    core::{
        BulkMode, action, analysis, baseline, computer, group, resolver,
        site::{get_all_sites, insert_sites},
    },
    entities::{analysis as analysis_entity, analysis_property, site},
    errors::{Error, FailureClass, Result},
    models,
};
use futures::stream::{self, StreamExt};
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use std::future::Future;
use tracing::{info, instrument, warn};

pub use summary::{EntityKind, EntityTally, ExtractionSummary};

/// One extraction run over a client and a store.
///
/// Borrow the client and connection, pick a [`BulkMode`], then call
/// [`Extractor::run`]. An extractor holds no state between runs, so running it
/// again only adds what changed on the server.
pub struct Extractor<'a, T> {
    api: &'a BesApi<T>,
    db: &'a DatabaseConnection,
    mode: BulkMode,
}

/// Turns a non-fatal failure into a counted, logged skip.
fn isolate<V>(
    summary: &mut ExtractionSummary,
    kind: EntityKind,
    context: &str,
    result: Result<V>,
) -> Result<Option<V>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.class() == FailureClass::Fatal => Err(e),
        Err(e) => {
            warn!("Skipping {} for {}: {}", kind.label(), context, e);
            summary.record_failure(kind);
            Ok(None)
        }
    }
}

impl<'a, T: Transport> Extractor<'a, T> {
    /// Extractor that stops at the first store failure.
    pub const fn new(api: &'a BesApi<T>, db: &'a DatabaseConnection) -> Self {
        Self {
            api,
            db,
            mode: BulkMode::FailFast,
        }
    }

    /// Extractor whose bulk mode follows `extraction.isolate_failures`.
    pub const fn from_config(
        api: &'a BesApi<T>,
        db: &'a DatabaseConnection,
        config: &AppConfig,
    ) -> Self {
        Self::new(api, db).with_mode(if config.extraction.isolate_failures {
            BulkMode::Isolate
        } else {
            BulkMode::FailFast
        })
    }

    /// Sets how store failures inside a batch are handled.
    #[must_use]
    pub const fn with_mode(mut self, mode: BulkMode) -> Self {
        self.mode = mode;
        self
    }

    /// Runs `fetch` over `jobs` with bounded concurrency, keeping input order.
    async fn fan_out<'j, J, V, F, Fut>(&self, jobs: &'j [J], fetch: F) -> Vec<Result<V>>
    where
        F: FnMut(&'j J) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        stream::iter(jobs)
            .map(fetch)
            .buffered(self.api.concurrency())
            .collect()
            .await
    }

    /// Runs every stage and returns what was stored.
    ///
    /// Fails only if the site listing cannot be fetched, or on a store error
    /// in [`BulkMode::FailFast`].
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ExtractionSummary> {
        let mut summary = ExtractionSummary::default();

        self.extract_sites(&mut summary).await?;
        self.extract_computers(&mut summary).await?;

        let sites = get_all_sites(self.db).await?;
        for site in &sites {
            self.extract_site_contents(site, &mut summary).await?;
        }

        self.extract_actions(&mut summary).await?;
        self.extract_analysis_properties(&sites, &mut summary).await?;
        self.extract_property_results(&sites, &mut summary).await?;
        self.extract_baseline_results(&sites, &mut summary).await?;
        self.extract_group_members(&sites, &mut summary).await?;

        info!("{}", summary);
        Ok(summary)
    }

    async fn extract_sites(&self, summary: &mut ExtractionSummary) -> Result<()> {
        let sites = self
            .api
            .fetch_sites()
            .await
            .inspect_err(|e| warn!("Cannot list sites, nothing to extract: {}", e))?;
        let bulk = insert_sites(self.db, &sites, self.mode).await?;
        summary.record_bulk(EntityKind::Site, &bulk);
        Ok(())
    }

    async fn extract_computers(&self, summary: &mut ExtractionSummary) -> Result<()> {
        let Some(fetched) = isolate(
            summary,
            EntityKind::Computer,
            "computer listing",
            self.api.fetch_computers().await,
        )?
        else {
            return Ok(());
        };

        let mut computers = Vec::with_capacity(fetched.len());
        for result in fetched {
            if let Some(computer) = isolate(summary, EntityKind::Computer, "computer", result)? {
                computers.push(computer);
            }
        }

        let bulk = computer::insert_computers(self.db, &computers, self.mode).await?;
        summary.record_bulk(EntityKind::Computer, &bulk);
        Ok(())
    }

    /// Analyses, baselines and groups of one site.
    #[instrument(skip(self, site, summary), fields(site = %site.name))]
    async fn extract_site_contents(
        &self,
        site: &site::Model,
        summary: &mut ExtractionSummary,
    ) -> Result<()> {
        let context = format!("site {}", site.name);

        if let Some(analyses) = isolate(
            summary,
            EntityKind::Analysis,
            &context,
            self.api.fetch_analyses(site).await,
        )? {
            let bulk = analysis::insert_analyses(self.db, &analyses, self.mode).await?;
            summary.record_bulk(EntityKind::Analysis, &bulk);
        }

        if let Some(baselines) = isolate(
            summary,
            EntityKind::Baseline,
            &context,
            self.api.fetch_baselines(site).await,
        )? {
            let bulk = baseline::insert_baselines(self.db, &baselines, self.mode).await?;
            summary.record_bulk(EntityKind::Baseline, &bulk);
        }

        if let Some(fetched) = isolate(
            summary,
            EntityKind::ComputerGroup,
            &context,
            self.api.fetch_computer_groups(site).await,
        )? {
            let mut groups = Vec::with_capacity(fetched.len());
            for result in fetched {
                if let Some(group) =
                    isolate(summary, EntityKind::ComputerGroup, &context, result)?
                {
                    groups.push(group);
                }
            }
            let bulk = group::insert_computer_groups(self.db, &groups, self.mode).await?;
            summary.record_bulk(EntityKind::ComputerGroup, &bulk);
        }
        Ok(())
    }

    /// Actions, then one status document per action for details and results.
    async fn extract_actions(&self, summary: &mut ExtractionSummary) -> Result<()> {
        let Some(mut remote) = isolate(
            summary,
            EntityKind::Action,
            "action listing",
            self.api.fetch_actions().await,
        )?
        else {
            return Ok(());
        };

        // one tuple per source fixlet; the first one names the action
        let mut seen = HashSet::new();
        remote.retain(|action| seen.insert(action.action_id));

        let mut actions = Vec::with_capacity(remote.len());
        for action in remote {
            match resolver::resolve_site_id_by_name(self.db, &action.site_name).await {
                Ok(site_id) => actions.push(models::Action {
                    action_id: action.action_id,
                    site_id,
                    name: action.name,
                }),
                Err(e @ Error::Unresolved { .. }) => {
                    warn!("Skipping action {}: {}", action.action_id, e);
                    summary.record_failure(EntityKind::Action);
                }
                Err(e) => return Err(e),
            }
        }

        let bulk = action::insert_actions(self.db, &actions, self.mode).await?;
        summary.record_bulk(EntityKind::Action, &bulk);

        let statuses = self
            .fan_out(&actions, |a| self.api.fetch_action_status(a.action_id))
            .await;

        let mut details = Vec::with_capacity(actions.len());
        let mut results = Vec::new();
        for (action, status) in actions.iter().zip(statuses) {
            let context = format!("action {}", action.action_id);
            if let Some(status) = isolate(summary, EntityKind::ActionDetail, &context, status)? {
                details.push(status.detail);
                results.extend(status.results);
            }
        }

        let bulk = action::insert_action_details(self.db, &details, self.mode).await?;
        summary.record_bulk(EntityKind::ActionDetail, &bulk);
        let bulk = action::insert_action_results(self.db, &results, self.mode).await?;
        summary.record_bulk(EntityKind::ActionResult, &bulk);
        Ok(())
    }

    async fn extract_analysis_properties(
        &self,
        sites: &[site::Model],
        summary: &mut ExtractionSummary,
    ) -> Result<()> {
        let mut jobs: Vec<(&site::Model, analysis_entity::Model)> = Vec::new();
        for site in sites {
            for analysis in analysis::get_analyses_for_site(self.db, site.id).await? {
                jobs.push((site, analysis));
            }
        }

        let fetched = self
            .fan_out(&jobs, |(site, analysis)| {
                self.api.fetch_analysis_properties(site, analysis)
            })
            .await;

        let mut properties = Vec::new();
        for ((site, analysis), result) in jobs.iter().zip(fetched) {
            let context = format!("analysis {} in {}", analysis.analysis_id, site.name);
            if let Some(found) = isolate(summary, EntityKind::AnalysisProperty, &context, result)? {
                properties.extend(found);
            }
        }

        let bulk = analysis::insert_analysis_properties(self.db, &properties, self.mode).await?;
        summary.record_bulk(EntityKind::AnalysisProperty, &bulk);
        Ok(())
    }

    /// Property values, with each property's analysis and site resolved by store id.
    async fn extract_property_results(
        &self,
        sites: &[site::Model],
        summary: &mut ExtractionSummary,
    ) -> Result<()> {
        let mut jobs: Vec<(site::Model, analysis_entity::Model, analysis_property::Model)> =
            Vec::new();
        for site in sites {
            for parent in analysis::get_analyses_for_site(self.db, site.id).await? {
                for property in analysis::get_properties_for_analysis(self.db, parent.id).await? {
                    let analysis =
                        resolver::resolve_analysis_by_id(self.db, property.analysis_id).await?;
                    let site = resolver::resolve_site_by_id(self.db, analysis.site_id).await?;
                    jobs.push((site, analysis, property));
                }
            }
        }

        let fetched = self
            .fan_out(&jobs, |(site, analysis, property)| {
                self.api.fetch_property_results(site, analysis, property)
            })
            .await;

        let mut values = Vec::new();
        for ((_, analysis, property), result) in jobs.iter().zip(fetched) {
            let context = format!("property {} of {}", property.name, analysis.name);
            if let Some(found) =
                isolate(summary, EntityKind::AnalysisPropertyResult, &context, result)?
            {
                values.extend(found);
            }
        }

        let bulk = analysis::insert_analysis_property_results(self.db, &values, self.mode).await?;
        summary.record_bulk(EntityKind::AnalysisPropertyResult, &bulk);
        Ok(())
    }

    async fn extract_baseline_results(
        &self,
        sites: &[site::Model],
        summary: &mut ExtractionSummary,
    ) -> Result<()> {
        let mut jobs = Vec::new();
        for site in sites {
            for baseline in baseline::get_baselines_for_site(self.db, site.id).await? {
                jobs.push((site, baseline));
            }
        }

        let fetched = self
            .fan_out(&jobs, |(site, baseline)| {
                self.api.fetch_baseline_results(site, baseline)
            })
            .await;

        let mut results = Vec::new();
        for ((_, baseline), result) in jobs.iter().zip(fetched) {
            let context = format!("baseline {}", baseline.baseline_id);
            if let Some(found) = isolate(summary, EntityKind::BaselineResult, &context, result)? {
                results.extend(found);
            }
        }

        let bulk = baseline::insert_baseline_results(self.db, &results, self.mode).await?;
        summary.record_bulk(EntityKind::BaselineResult, &bulk);
        Ok(())
    }

    async fn extract_group_members(
        &self,
        sites: &[site::Model],
        summary: &mut ExtractionSummary,
    ) -> Result<()> {
        let mut jobs = Vec::new();
        for site in sites {
            for group in group::get_groups_for_site(self.db, site.id).await? {
                jobs.push((site, group));
            }
        }

        let fetched = self
            .fan_out(&jobs, |(site, group)| self.api.fetch_group_members(site, group))
            .await;

        let mut members = Vec::new();
        for ((_, group), result) in jobs.iter().zip(fetched) {
            let context = format!("group {}", group.group_id);
            if let Some(found) =
                isolate(summary, EntityKind::ComputerGroupMember, &context, result)?
            {
                members.extend(found);
            }
        }

        let bulk = group::insert_group_members(self.db, &members, self.mode).await?;
        summary.record_bulk(EntityKind::ComputerGroupMember, &bulk);
        Ok(())
    }
}
