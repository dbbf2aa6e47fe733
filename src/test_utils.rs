//! Shared test utilities for the scraper.
//!
//! Database helpers set up an in-memory `SQLite` store and seed parent rows.
//! [`MockTransport`] stands in for the remote server, answering canned XML
//! keyed by [`ApiRequest::describe`], and the `*_xml` builders produce those
//! documents in the shapes the server uses.

use crate::{
    api::{ApiRequest, Transport},
    core::{analysis, site},
    entities::{self, SiteType},
    errors::{Error, Result},
    models,
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write;
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all store tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Stores a site and returns its row.
pub async fn create_test_site(
    db: &DatabaseConnection,
    name: &str,
    site_type: SiteType,
) -> Result<entities::site::Model> {
    site::insert_site(
        db,
        &models::Site {
            name: name.to_string(),
            site_type,
        },
    )
    .await?;
    site::find_site(db, name, site_type)
        .await?
        .ok_or_else(|| Error::unresolved("site", name))
}

/// Stores an analysis under `site_id` and returns its row.
pub async fn create_test_analysis(
    db: &DatabaseConnection,
    site_id: i64,
    analysis_id: i64,
    name: &str,
) -> Result<entities::analysis::Model> {
    analysis::insert_analysis(
        db,
        &models::Analysis {
            analysis_id,
            site_id,
            name: name.to_string(),
        },
    )
    .await?;
    analysis::find_analysis(db, site_id, analysis_id)
        .await?
        .ok_or_else(|| Error::unresolved("analysis", analysis_id))
}

/// In-memory stand-in for the remote server.
///
/// Unknown requests answer 404. Queued failures are served before the canned
/// response for the same request.
#[derive(Default)]
pub struct MockTransport {
    responses: HashMap<String, String>,
    failures: Mutex<HashMap<String, VecDeque<Error>>>,
    log: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Answers `request` with `body` from now on.
    pub fn respond(&mut self, request: &ApiRequest, body: impl Into<String>) {
        self.responses.insert(request.describe(), body.into());
    }

    /// Makes the next call for `request` fail with `status`.
    pub fn fail_next(&mut self, request: &ApiRequest, status: u16) {
        let error = Error::Status {
            url: request.describe(),
            status,
            body: String::new(),
        };
        self.fail_next_with(request, error);
    }

    /// Makes the next call for `request` fail with `error`.
    pub fn fail_next_with(&mut self, request: &ApiRequest, error: Error) {
        self.failures
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(request.describe())
            .or_default()
            .push_back(error);
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// How many times `request` was sent.
    pub fn count(&self, request: &ApiRequest) -> usize {
        let key = request.describe();
        self.requests().iter().filter(|r| **r == key).count()
    }
}

/// A timeout as the HTTP transport reports it.
pub fn timeout_error(request: &ApiRequest) -> Error {
    Error::Timeout {
        url: request.describe(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &ApiRequest) -> Result<String> {
        let key = request.describe();
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(key.clone());

        let queued = self
            .failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(error) = queued {
            return Err(error);
        }

        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Status {
                url: key,
                status: 404,
                body: "Not Found".to_string(),
            })
    }
}

fn besapi(inner: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><BESAPI>{inner}</BESAPI>"#)
}

/// Escapes text for an XML element or attribute.
fn esc(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// `sites` listing from `(element, name)` pairs, e.g. `("CustomSite", "Patches")`.
pub fn sites_xml(sites: &[(&str, &str)]) -> String {
    let mut inner = String::new();
    for (element, name) in sites {
        let _ = write!(
            inner,
            r#"<{element} Resource="https://bes:52311/api/site/x"><Name>{}</Name></{element}>"#,
            esc(name)
        );
    }
    besapi(&inner)
}

pub fn analyses_xml(analyses: &[(i64, &str)]) -> String {
    let mut inner = String::new();
    for (id, name) in analyses {
        let _ = write!(
            inner,
            r#"<Analysis Resource="https://bes:52311/api/analysis/x/{id}"><Name>{}</Name><ID>{id}</ID></Analysis>"#,
            esc(name)
        );
    }
    besapi(&inner)
}

/// `analysis/...` definition with `(sequence no, name)` properties.
pub fn analysis_xml(title: &str, properties: &[(i32, &str)]) -> String {
    let mut inner = String::new();
    for (id, name) in properties {
        let _ = write!(
            inner,
            r#"<Property Name="{}" ID="{id}">true</Property>"#,
            esc(name)
        );
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><BES><Analysis><Title>{}</Title>{inner}</Analysis></BES>"#,
        esc(title)
    )
}

pub fn site_content_xml(baselines: &[(i64, &str)]) -> String {
    let mut inner = String::from(r#"<Fixlet Resource="x"><Name>Unrelated</Name><ID>1</ID></Fixlet>"#);
    for (id, name) in baselines {
        let _ = write!(
            inner,
            r#"<Baseline Resource="https://bes:52311/api/fixlet/x/{id}"><Name>{}</Name><ID>{id}</ID></Baseline>"#,
            esc(name)
        );
    }
    besapi(&inner)
}

pub fn computer_groups_xml(groups: &[(i64, &str)]) -> String {
    let mut inner = String::new();
    for (id, name) in groups {
        let _ = write!(
            inner,
            r#"<ComputerGroup Resource="https://bes:52311/api/computergroup/x/{id}"><Name>{}</Name><ID>{id}</ID></ComputerGroup>"#,
            esc(name)
        );
    }
    besapi(&inner)
}

/// `computers` listing.
pub fn computers_xml(ids: &[i64]) -> String {
    let mut inner = String::new();
    for id in ids {
        let _ = write!(
            inner,
            r#"<Computer Resource="https://bes:52311/api/computer/{id}"><LastReportTime>Tue, 14 Jan 2014 14:42:52 +0000</LastReportTime><ID>{id}</ID></Computer>"#
        );
    }
    besapi(&inner)
}

/// `computer/{id}` document carrying a `Computer Name` property.
pub fn computer_xml(id: i64, name: &str) -> String {
    besapi(&format!(
        r#"<Computer Resource="https://bes:52311/api/computer/{id}"><Property Name="OS">Win10</Property><Property Name="Computer Name">{}</Property></Computer>"#,
        esc(name)
    ))
}

/// List of `<Computer Resource="...">` references.
pub fn computer_refs_xml(ids: &[i64]) -> String {
    let mut inner = String::new();
    for id in ids {
        let _ = write!(
            inner,
            r#"<Computer Resource="https://bes:52311/api/computer/{id}"/>"#
        );
    }
    besapi(&inner)
}

/// One computer's entry in an action status document.
pub struct StatusEntry<'a> {
    pub computer_id: i64,
    pub status: &'a str,
    pub start_time: Option<&'a str>,
    pub end_time: Option<&'a str>,
}

pub fn action_status_xml(action_id: i64, entries: &[StatusEntry<'_>]) -> String {
    let mut inner = format!(
        "<ActionID>{action_id}</ActionID><Status>Open</Status><DateIssued>Tue, 14 Jan 2014 14:42:52 +0000</DateIssued>"
    );
    for entry in entries {
        let _ = write!(
            inner,
            r#"<Computer ID="{}"><Status>{}</Status><ApplyCount>1</ApplyCount><RetryCount>0</RetryCount><LineNumber>1</LineNumber>"#,
            entry.computer_id,
            esc(entry.status)
        );
        if let Some(start) = entry.start_time {
            let _ = write!(inner, "<StartTime>{start}</StartTime>");
        }
        if let Some(end) = entry.end_time {
            let _ = write!(inner, "<EndTime>{end}</EndTime>");
        }
        inner.push_str("</Computer>");
    }
    besapi(&format!(
        r#"<ActionResults Resource="https://bes:52311/api/action/{action_id}/status">{inner}</ActionResults>"#
    ))
}

/// Relevance response made of tuples.
pub fn relevance_tuples(rows: &[&[&str]]) -> String {
    let mut inner = String::new();
    for row in rows {
        inner.push_str("<Tuple>");
        for answer in *row {
            let _ = write!(inner, r#"<Answer type="string">{}</Answer>"#, esc(answer));
        }
        inner.push_str("</Tuple>");
    }
    besapi(&format!(
        "<Query Resource=\"x\"><Result>{inner}</Result><Evaluation><Time>1ms</Time></Evaluation></Query>"
    ))
}

/// Relevance response made of bare answers.
pub fn relevance_answers(answers: &[&str]) -> String {
    let mut inner = String::new();
    for answer in answers {
        let _ = write!(inner, r#"<Answer type="boolean">{}</Answer>"#, esc(answer));
    }
    besapi(&format!(
        "<Query Resource=\"x\"><Result>{inner}</Result></Query>"
    ))
}
