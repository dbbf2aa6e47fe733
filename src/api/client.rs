//! Remote inventory client.
//!
//! [`BesApi`] knows which request shape each entity needs (REST resource or
//! relevance query), decodes the response into value records, and retries
//! transient failures. It never touches the store: everything site- or
//! analysis-scoped is passed in as an already-stored row, so the caller
//! decides how remote names map to store ids.

use crate::api::parse::{self, Listed};
use crate::api::relevance::{
    self, ActionRow, GroupMemberRow, PropertyValueRow, RelevanceQuery, TupleRow,
};
use crate::api::request::ApiRequest;
use crate::api::transport::Transport;
use crate::config::AppConfig;
use crate::entities::{analysis, analysis_property, baseline, computer_group, site};
use crate::errors::{Error, Result};
use crate::models;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Attempts per request and the linear backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; each later attempt waits one more multiple
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Typed client for the remote inventory API.
///
/// Each `fetch_*` method sends one request, or one listing plus a bounded
/// fan-out, and decodes the response into [`models`] records. Transient
/// failures are retried according to the [`RetryPolicy`]. The client never
/// touches the store; parent rows are passed in by the caller.
pub struct BesApi<T> {
    transport: T,
    retry: RetryPolicy,
    concurrency: usize,
}

impl<T: Transport> BesApi<T> {
    /// Client with the default retry policy and a concurrency of 8.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            concurrency: 8,
        }
    }

    /// Client tuned from the `[server]` and `[extraction]` sections.
    pub fn from_config(transport: T, config: &AppConfig) -> Self {
        Self::new(transport)
            .with_retry(RetryPolicy {
                max_attempts: config.server.max_attempts,
                backoff: config.server.retry_backoff(),
            })
            .with_concurrency(config.extraction.concurrency)
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Caps the number of leaf requests in flight during a fan-out.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Maximum number of requests a fan-out keeps in flight.
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Sends `request`, retrying transient failures.
    async fn execute(&self, request: &ApiRequest) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.transport.get(request).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff * attempt;
                    warn!(
                        "Attempt {} of {} for {} failed: {}. Retrying in {:?}",
                        attempt, self.retry.max_attempts, request, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn query<R: TupleRow>(&self, query: RelevanceQuery) -> Result<Vec<R>> {
        let body = self.execute(&ApiRequest::relevance(query.clone())).await?;
        let rows = relevance::parse_query_result(&body, &query)?;
        relevance::project(&rows)
            .map_err(|reason| Error::malformed("relevance query", &query, reason))
    }

    /// Every site the server knows, with its kind.
    #[instrument(skip(self))]
    pub async fn fetch_sites(&self) -> Result<Vec<models::Site>> {
        let body = self.execute(&ApiRequest::sites()).await?;
        let sites = parse::parse_sites(&body)?;
        info!("Fetched {} sites", sites.len());
        Ok(sites)
    }

    /// Every action, with the name of the site its source fixlet lives in.
    #[instrument(skip(self))]
    pub async fn fetch_actions(&self) -> Result<Vec<models::RemoteAction>> {
        let rows: Vec<ActionRow> = self.query(RelevanceQuery::actions()).await?;
        info!("Fetched {} actions", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| models::RemoteAction {
                site_name: row.site_name,
                action_id: row.action_id,
                name: row.action_name,
            })
            .collect())
    }

    /// Detail and per-computer results of one action, from a single status document.
    #[instrument(skip(self))]
    pub async fn fetch_action_status(&self, action_id: i64) -> Result<models::ActionStatus> {
        let body = self.execute(&ApiRequest::action_status(action_id)).await?;
        parse::parse_action_status(&body, action_id)
    }

    /// Analyses listed under a site.
    #[instrument(skip(self, site), fields(site = %site.name))]
    pub async fn fetch_analyses(&self, site: &site::Model) -> Result<Vec<models::Analysis>> {
        let request = ApiRequest::analyses(site.site_type, &site.name);
        let body = self.execute(&request).await?;
        parse::parse_analyses(&body, site.id, &request.describe())
    }

    /// Properties defined by an analysis, read from its definition document.
    #[instrument(
        skip(self, site, analysis),
        fields(site = %site.name, analysis = analysis.analysis_id)
    )]
    pub async fn fetch_analysis_properties(
        &self,
        site: &site::Model,
        analysis: &analysis::Model,
    ) -> Result<Vec<models::AnalysisProperty>> {
        let request = ApiRequest::analysis(site.site_type, &site.name, analysis.analysis_id);
        let body = self.execute(&request).await?;
        parse::parse_analysis_properties(&body, analysis.id, &request.describe())
    }

    /// Values reported for one property, one per computer.
    ///
    /// A computer reporting several values keeps the first.
    #[instrument(skip_all, fields(analysis = %analysis.name, property = property.sequence_no))]
    pub async fn fetch_property_results(
        &self,
        site: &site::Model,
        analysis: &analysis::Model,
        property: &analysis_property::Model,
    ) -> Result<Vec<models::AnalysisPropertyResult>> {
        let query =
            RelevanceQuery::property_results(property.sequence_no, &analysis.name, &site.name);
        let rows: Vec<PropertyValueRow> = self.query(query).await?;

        let mut seen = HashSet::with_capacity(rows.len());
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(row.computer_id) {
                debug!("Ignoring extra value for computer {}", row.computer_id);
                continue;
            }
            results.push(models::AnalysisPropertyResult {
                analysis_property_id: property.id,
                computer_id: row.computer_id,
                value: row.value,
            });
        }
        Ok(results)
    }

    /// Baselines listed in a site's content.
    #[instrument(skip(self, site), fields(site = %site.name))]
    pub async fn fetch_baselines(&self, site: &site::Model) -> Result<Vec<models::Baseline>> {
        let request = ApiRequest::site_content(site.site_type, &site.name);
        let body = self.execute(&request).await?;
        parse::parse_site_baselines(&body, site.id, &request.describe())
    }

    /// Computers a baseline is relevant on.
    #[instrument(
        skip(self, site, baseline),
        fields(site = %site.name, baseline = baseline.baseline_id)
    )]
    pub async fn fetch_baseline_results(
        &self,
        site: &site::Model,
        baseline: &baseline::Model,
    ) -> Result<Vec<models::BaselineResult>> {
        let request =
            ApiRequest::baseline_computers(site.site_type, &site.name, baseline.baseline_id);
        let body = self.execute(&request).await?;
        let ids =
            parse::parse_computer_references(&body, "baseline computers", &request.describe())?;
        Ok(ids
            .into_iter()
            .map(|computer_id| models::BaselineResult {
                baseline_id: baseline.baseline_id,
                computer_id,
            })
            .collect())
    }

    /// Ids from the `computers` listing.
    pub async fn fetch_computer_ids(&self) -> Result<Vec<i64>> {
        let body = self.execute(&ApiRequest::computers()).await?;
        parse::parse_computer_list(&body)
    }

    /// Host name of one computer, from its `Computer Name` property.
    pub async fn fetch_computer_name(&self, computer_id: i64) -> Result<String> {
        let body = self.execute(&ApiRequest::computer(computer_id)).await?;
        parse::parse_computer_name(&body, computer_id)
    }

    /// Every computer with its name.
    ///
    /// The listing is one request; names are fetched per computer with
    /// bounded concurrency. The outer error is the listing failing, the inner
    /// ones are per computer, in listing order.
    #[instrument(skip(self))]
    pub async fn fetch_computers(&self) -> Result<Vec<Result<models::Computer>>> {
        let ids = self.fetch_computer_ids().await?;
        info!("Fetching names for {} computers", ids.len());

        Ok(stream::iter(ids)
            .map(|computer_id| async move {
                let computer_name = self.fetch_computer_name(computer_id).await?;
                Ok::<_, Error>(models::Computer {
                    computer_id,
                    computer_name,
                })
            })
            .buffered(self.concurrency)
            .collect()
            .await)
    }

    /// Whether a group's membership is maintained by hand.
    ///
    /// An empty answer means the server does not know the group; it is
    /// treated as not manual.
    pub async fn fetch_is_manual_group(&self, group_id: i64) -> Result<bool> {
        let query = RelevanceQuery::manual_flag(group_id);
        let body = self.execute(&ApiRequest::relevance(query.clone())).await?;
        let rows = relevance::parse_query_result(&body, &query)?;
        match rows.first().and_then(|row| row.first()) {
            Some(answer) => relevance::parse_boolean(answer)
                .map_err(|reason| Error::malformed("relevance query", &query, reason)),
            None => Ok(false),
        }
    }

    /// A site's groups, each with its manual flag.
    ///
    /// The outer error is the listing failing; a flag lookup failure only
    /// fails that group.
    #[instrument(skip(self, site), fields(site = %site.name))]
    pub async fn fetch_computer_groups(
        &self,
        site: &site::Model,
    ) -> Result<Vec<Result<models::ComputerGroup>>> {
        let request = ApiRequest::computer_groups(site.site_type, &site.name);
        let body = self.execute(&request).await?;
        let listed = parse::parse_computer_groups(&body, &request.describe())?;

        Ok(stream::iter(listed)
            .map(|Listed { id, name }| async move {
                let manual = self.fetch_is_manual_group(id).await?;
                Ok::<_, Error>(models::ComputerGroup {
                    group_id: id,
                    site_id: site.id,
                    name,
                    manual,
                })
            })
            .buffered(self.concurrency)
            .collect()
            .await)
    }

    /// Members of a group. Manual groups are only listable through
    /// relevance; dynamic groups through their `computers` resource.
    #[instrument(
        skip(self, site, group),
        fields(group = group.group_id, manual = group.manual)
    )]
    pub async fn fetch_group_members(
        &self,
        site: &site::Model,
        group: &computer_group::Model,
    ) -> Result<Vec<models::ComputerGroupMember>> {
        let computer_ids: Vec<i64> = if group.manual {
            let rows: Vec<GroupMemberRow> = self
                .query(RelevanceQuery::group_members(group.group_id))
                .await?;
            rows.into_iter().map(|row| row.computer_id).collect()
        } else {
            let request = ApiRequest::group_computers(site.site_type, &site.name, group.group_id);
            let body = self.execute(&request).await?;
            parse::parse_computer_references(&body, "group computers", &request.describe())?
        };

        Ok(computer_ids
            .into_iter()
            .map(|computer_id| models::ComputerGroupMember {
                group_id: group.group_id,
                computer_id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::SiteType;
    use crate::test_utils::*;

    fn site(id: i64, name: &str, site_type: SiteType) -> site::Model {
        site::Model {
            id,
            name: name.to_string(),
            site_type,
        }
    }

    fn group(group_id: i64, site_id: i64, manual: bool) -> computer_group::Model {
        computer_group::Model {
            id: 1,
            group_id,
            site_id,
            name: "Servers".to_string(),
            manual,
        }
    }

    fn api(mock: MockTransport) -> BesApi<MockTransport> {
        BesApi::new(mock).with_retry(RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn test_master_site_uses_short_paths() -> Result<()> {
        let master = site(1, "ActionSite", SiteType::Master);
        let mut mock = MockTransport::default();
        mock.respond(
            &ApiRequest::analyses(SiteType::Master, "ActionSite"),
            analyses_xml(&[(12, "Disk Space")]),
        );
        mock.respond(
            &ApiRequest::site_content(SiteType::Master, "ActionSite"),
            site_content_xml(&[(40, "Monthly Patches")]),
        );
        mock.respond(
            &ApiRequest::computer_groups(SiteType::Master, "ActionSite"),
            computer_groups_xml(&[]),
        );
        let api = api(mock);

        let analyses = api.fetch_analyses(&master).await?;
        let baselines = api.fetch_baselines(&master).await?;
        let groups = api.fetch_computer_groups(&master).await?;

        assert_eq!(analyses[0].analysis_id, 12);
        assert_eq!(analyses[0].site_id, 1);
        assert_eq!(baselines[0].baseline_id, 40);
        assert!(groups.is_empty());
        assert_eq!(
            api.transport().requests(),
            vec!["analyses/master", "site/master/content", "computergroups/master"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_and_dynamic_groups_yield_same_members() -> Result<()> {
        let custom = site(2, "Patches", SiteType::Custom);
        let mut mock = MockTransport::default();
        mock.respond(
            &ApiRequest::relevance(RelevanceQuery::group_members(77)),
            relevance_tuples(&[&["1611", "WKS-001"], &["1612", "WKS-002"]]),
        );
        mock.respond(
            &ApiRequest::group_computers(SiteType::Custom, "Patches", 77),
            computer_refs_xml(&[1611, 1612]),
        );
        let api = api(mock);

        let manual = api.fetch_group_members(&custom, &group(77, 2, true)).await?;
        let dynamic = api.fetch_group_members(&custom, &group(77, 2, false)).await?;

        assert_eq!(manual, dynamic);
        assert_eq!(
            manual,
            vec![
                models::ComputerGroupMember {
                    group_id: 77,
                    computer_id: 1611
                },
                models::ComputerGroupMember {
                    group_id: 77,
                    computer_id: 1612
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_groups_carry_manual_flag() -> Result<()> {
        let custom = site(2, "Patches", SiteType::Custom);
        let mut mock = MockTransport::default();
        mock.respond(
            &ApiRequest::computer_groups(SiteType::Custom, "Patches"),
            computer_groups_xml(&[(77, "Servers"), (78, "Laptops"), (79, "Gone")]),
        );
        mock.respond(
            &ApiRequest::relevance(RelevanceQuery::manual_flag(77)),
            relevance_answers(&["True"]),
        );
        mock.respond(
            &ApiRequest::relevance(RelevanceQuery::manual_flag(78)),
            relevance_answers(&["False"]),
        );
        mock.respond(
            &ApiRequest::relevance(RelevanceQuery::manual_flag(79)),
            relevance_answers(&[]),
        );
        let api = api(mock);

        let groups: Vec<models::ComputerGroup> = api
            .fetch_computer_groups(&custom)
            .await?
            .into_iter()
            .collect::<Result<_>>()?;
        let flags: Vec<(i64, bool)> = groups.iter().map(|g| (g.group_id, g.manual)).collect();
        assert_eq!(flags, vec![(77, true), (78, false), (79, false)]);
        assert!(groups.iter().all(|g| g.site_id == 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() -> Result<()> {
        let mut mock = MockTransport::default();
        mock.respond(&ApiRequest::sites(), sites_xml(&[("ActionSite", "ActionSite")]));
        mock.fail_next(&ApiRequest::sites(), 503);
        let api = api(mock);

        let sites = api.fetch_sites().await?;
        assert_eq!(sites.len(), 1);
        assert_eq!(api.transport().requests(), vec!["sites", "sites"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_stop_at_max_attempts() {
        let mut mock = MockTransport::default();
        mock.respond(&ApiRequest::sites(), sites_xml(&[]));
        for _ in 0..3 {
            mock.fail_next(&ApiRequest::sites(), 502);
        }
        let api = api(mock);

        let result = api.fetch_sites().await;
        assert!(matches!(result, Err(Error::Status { status: 502, .. })));
        assert_eq!(api.transport().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_retried() -> Result<()> {
        let request = ApiRequest::action_status(43);
        let mut mock = MockTransport::default();
        mock.respond(&request, action_status_xml(43, &[]));
        mock.fail_next_with(&request, timeout_error(&request));
        mock.fail_next_with(&request, timeout_error(&request));
        let api = api(mock);

        let status = api.fetch_action_status(43).await?;
        assert_eq!(status.detail.action_id, 43);
        assert_eq!(api.transport().count(&request), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_surfaces_after_max_attempts() {
        let request = ApiRequest::action_status(43);
        let mut mock = MockTransport::default();
        mock.respond(&request, action_status_xml(43, &[]));
        for _ in 0..3 {
            mock.fail_next_with(&request, timeout_error(&request));
        }
        let api = api(mock);

        let result = api.fetch_action_status(43).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(api.transport().count(&request), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let api = api(MockTransport::default());

        let result = api.fetch_action_status(43).await;
        assert!(matches!(result, Err(Error::Status { status: 404, .. })));
        assert_eq!(api.transport().requests(), vec!["action/43/status"]);
    }

    #[tokio::test]
    async fn test_computers_fan_out_keeps_order_and_isolates_failures() -> Result<()> {
        let mut mock = MockTransport::default();
        mock.respond(&ApiRequest::computers(), computers_xml(&[7, 8, 9]));
        mock.respond(&ApiRequest::computer(7), computer_xml(7, "WKS-007"));
        mock.respond(&ApiRequest::computer(9), computer_xml(9, "WKS-009"));
        let api = api(mock).with_concurrency(2);

        let computers = api.fetch_computers().await?;
        assert_eq!(computers.len(), 3);
        assert_eq!(computers[0].as_ref().unwrap().computer_name, "WKS-007");
        assert!(matches!(computers[1], Err(Error::Status { status: 404, .. })));
        assert_eq!(computers[2].as_ref().unwrap().computer_id, 9);
        Ok(())
    }

    #[tokio::test]
    async fn test_property_results_keep_first_value_per_computer() -> Result<()> {
        let custom = site(2, "Patches", SiteType::Custom);
        let analysis = analysis::Model {
            id: 5,
            analysis_id: 12,
            site_id: 2,
            name: "Disk Space".to_string(),
        };
        let property = analysis_property::Model {
            id: 9,
            analysis_id: 5,
            sequence_no: 1,
            name: "Free Space on C".to_string(),
        };
        let mut mock = MockTransport::default();
        mock.respond(
            &ApiRequest::relevance(RelevanceQuery::property_results(1, "Disk Space", "Patches")),
            relevance_tuples(&[&["1611", "10 GB"], &["1611", "11 GB"], &["1612", "4 GB"]]),
        );
        let api = api(mock);

        let results = api.fetch_property_results(&custom, &analysis, &property).await?;
        let values: Vec<(i64, &str)> = results
            .iter()
            .map(|r| (r.computer_id, r.value.as_str()))
            .collect();
        assert_eq!(values, vec![(1611, "10 GB"), (1612, "4 GB")]);
        assert!(results.iter().all(|r| r.analysis_property_id == 9));
        Ok(())
    }

    #[tokio::test]
    async fn test_actions_come_from_relevance_tuples() -> Result<()> {
        let mut mock = MockTransport::default();
        mock.respond(
            &ApiRequest::relevance(RelevanceQuery::actions()),
            relevance_tuples(&[&["SiteA", "101", "Install Patch"]]),
        );
        let api = api(mock);

        let actions = api.fetch_actions().await?;
        assert_eq!(
            actions,
            vec![models::RemoteAction {
                site_name: "SiteA".to_string(),
                action_id: 101,
                name: "Install Patch".to_string(),
            }]
        );
        Ok(())
    }
}
