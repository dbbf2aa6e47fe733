//! Request shapes for the remote API.
//!
//! Resource requests are REST paths written as templates with `{param}`
//! placeholders. Site-scoped resources exist in two shapes: one with a
//! `{site}` segment, and one without it for the master action site. Every
//! site-scoped constructor goes through one private builder so the two
//! shapes are chosen in one place.

use crate::api::relevance::RelevanceQuery;
use crate::entities::SiteType;
use crate::errors::{Error, Result};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Resource {
        template: &'static str,
        params: Vec<(&'static str, String)>,
    },
    Relevance(RelevanceQuery),
}

/// One GET against the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    kind: Kind,
}

impl ApiRequest {
    fn resource(template: &'static str, params: Vec<(&'static str, String)>) -> Self {
        Self {
            kind: Kind::Resource { template, params },
        }
    }

    fn for_site(
        with_site: &'static str,
        master: &'static str,
        site_type: SiteType,
        site_name: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Self {
        params.push(("sitetype", site_type.as_str().to_string()));
        if site_type == SiteType::Master {
            Self::resource(master, params)
        } else {
            params.push(("site", site_name.to_string()));
            Self::resource(with_site, params)
        }
    }

    /// The `sites` listing.
    #[must_use]
    pub fn sites() -> Self {
        Self::resource("sites", Vec::new())
    }

    /// The `computers` listing.
    #[must_use]
    pub fn computers() -> Self {
        Self::resource("computers", Vec::new())
    }

    /// One computer's properties.
    #[must_use]
    pub fn computer(computer_id: i64) -> Self {
        Self::resource("computer/{id}", vec![("id", computer_id.to_string())])
    }

    /// One action's status document.
    #[must_use]
    pub fn action_status(action_id: i64) -> Self {
        Self::resource("action/{id}/status", vec![("id", action_id.to_string())])
    }

    /// Analyses of a site.
    #[must_use]
    pub fn analyses(site_type: SiteType, site_name: &str) -> Self {
        Self::for_site(
            "analyses/{sitetype}/{site}",
            "analyses/{sitetype}",
            site_type,
            site_name,
            Vec::new(),
        )
    }

    /// One analysis definition.
    #[must_use]
    pub fn analysis(site_type: SiteType, site_name: &str, analysis_id: i64) -> Self {
        Self::for_site(
            "analysis/{sitetype}/{site}/{analysisid}",
            "analysis/{sitetype}/{analysisid}",
            site_type,
            site_name,
            vec![("analysisid", analysis_id.to_string())],
        )
    }

    /// Site content listing; baselines are read from it.
    #[must_use]
    pub fn site_content(site_type: SiteType, site_name: &str) -> Self {
        Self::for_site(
            "site/{sitetype}/{site}/content",
            "site/{sitetype}/content",
            site_type,
            site_name,
            Vec::new(),
        )
    }

    /// Computers a baseline is relevant on.
    #[must_use]
    pub fn baseline_computers(site_type: SiteType, site_name: &str, baseline_id: i64) -> Self {
        Self::for_site(
            "fixlet/{sitetype}/{site}/{baselineid}/computers",
            "fixlet/{sitetype}/{baselineid}/computers",
            site_type,
            site_name,
            vec![("baselineid", baseline_id.to_string())],
        )
    }

    /// Groups of a site.
    #[must_use]
    pub fn computer_groups(site_type: SiteType, site_name: &str) -> Self {
        Self::for_site(
            "computergroups/{sitetype}/{site}",
            "computergroups/{sitetype}",
            site_type,
            site_name,
            Vec::new(),
        )
    }

    /// Members of a dynamic group.
    #[must_use]
    pub fn group_computers(site_type: SiteType, site_name: &str, group_id: i64) -> Self {
        Self::for_site(
            "computergroup/{sitetype}/{site}/{id}/computers",
            "computergroup/{sitetype}/{id}/computers",
            site_type,
            site_name,
            vec![("id", group_id.to_string())],
        )
    }

    /// A relevance query sent to `query`.
    #[must_use]
    pub const fn relevance(query: RelevanceQuery) -> Self {
        Self {
            kind: Kind::Relevance(query),
        }
    }

    /// Unencoded path segments, with placeholders substituted.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        match &self.kind {
            Kind::Resource { template, params } => template
                .split('/')
                .map(|segment| {
                    segment
                        .strip_prefix('{')
                        .and_then(|s| s.strip_suffix('}'))
                        .and_then(|name| {
                            params
                                .iter()
                                .find(|(key, _)| *key == name)
                                .map(|(_, value)| value.as_str())
                        })
                        .unwrap_or(segment)
                })
                .collect(),
            Kind::Relevance(_) => vec!["query"],
        }
    }

    /// Full URL under `base`, with every path segment percent-encoded.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config {
                message: format!("{base} cannot be used as an API base URL"),
            })?
            .pop_if_empty()
            .extend(self.path_segments());

        if let Kind::Relevance(query) = &self.kind {
            url.query_pairs_mut()
                .append_pair("relevance", query.as_str());
        }
        Ok(url)
    }

    /// Human-readable form used in logs and as the test double's lookup key.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.kind {
            Kind::Resource { .. } => self.path_segments().join("/"),
            Kind::Relevance(query) => format!("query?relevance={query}"),
        }
    }
}

impl std::fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
