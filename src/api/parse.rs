//! Response decoding.
//!
//! List responses with a fixed shape (`analyses`, `computers`,
//! `computergroups`) decode straight into serde structs. Everything else is
//! read into an [`XmlNode`] tree and destructured by hand, because those
//! documents mix attributes with elements and carry optional subtrees.

use crate::api::xml::XmlNode;
use crate::entities::SiteType;
use crate::errors::{Error, Result};
use crate::models;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use tracing::warn;
use url::Url;

/// `<ID>` and `<Name>` of an entry in a list response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Listed {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisList {
    #[serde(rename = "Analysis", default)]
    items: Vec<Listed>,
}

#[derive(Debug, Deserialize)]
struct ComputerGroupList {
    #[serde(rename = "ComputerGroup", default)]
    items: Vec<Listed>,
}

#[derive(Debug, Deserialize)]
struct ComputerEntry {
    #[serde(rename = "ID")]
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ComputerList {
    #[serde(rename = "Computer", default)]
    items: Vec<ComputerEntry>,
}

fn tree(body: &str, entity: &'static str, key: &str) -> Result<XmlNode> {
    XmlNode::parse(body).map_err(|reason| Error::malformed(entity, key, reason))
}

fn number<T>(text: &str, what: &str, entity: &'static str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e| Error::malformed(entity, key, format!("{what} {text:?}: {e}")))
}

fn required_text<'a>(
    node: &'a XmlNode,
    child: &str,
    entity: &'static str,
    key: &str,
) -> Result<&'a str> {
    node.child_text(child)
        .ok_or_else(|| Error::malformed(entity, key, format!("missing {child} in <{}>", node.name)))
}

/// Parses an RFC 2822 timestamp, the format every API date uses.
pub fn parse_date(text: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc2822(text.trim())
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("date {text:?}: {e}"))
}

/// `sites`: one element per site, named after the site kind.
pub fn parse_sites(body: &str) -> Result<Vec<models::Site>> {
    let root = tree(body, "site list", "sites")?;
    let mut sites = Vec::with_capacity(root.children.len());
    for node in &root.children {
        let Some(site_type) = SiteType::from_element(&node.name) else {
            warn!("Skipping site of unknown kind <{}>", node.name);
            continue;
        };
        let name = required_text(node, "Name", "site list", "sites")?;
        sites.push(models::Site {
            name: name.to_string(),
            site_type,
        });
    }
    Ok(sites)
}

/// `analyses/...`: ids and names of a site's analyses.
pub fn parse_analyses(body: &str, site_id: i64, key: &str) -> Result<Vec<models::Analysis>> {
    let list: AnalysisList = quick_xml::de::from_str(body)
        .map_err(|e| Error::malformed("analysis list", key, e))?;
    Ok(list
        .items
        .into_iter()
        .map(|item| models::Analysis {
            analysis_id: item.id,
            site_id,
            name: item.name,
        })
        .collect())
}

/// `analysis/...`: the properties of one analysis, from `BES/Analysis/Property`.
pub fn parse_analysis_properties(
    body: &str,
    analysis_store_id: i64,
    key: &str,
) -> Result<Vec<models::AnalysisProperty>> {
    const ENTITY: &str = "analysis";
    let root = tree(body, ENTITY, key)?;
    let analysis = root
        .child("Analysis")
        .ok_or_else(|| Error::malformed(ENTITY, key, "missing Analysis element"))?;

    analysis
        .children_named("Property")
        .map(|property| {
            let id = property
                .attr("ID")
                .ok_or_else(|| Error::malformed(ENTITY, key, "Property without ID"))?;
            let name = property
                .attr("Name")
                .ok_or_else(|| Error::malformed(ENTITY, key, "Property without Name"))?;
            Ok(models::AnalysisProperty {
                analysis_id: analysis_store_id,
                sequence_no: number(id, "property ID", ENTITY, key)?,
                name: name.to_string(),
            })
        })
        .collect()
}

/// `site/.../content`: only the `Baseline` entries are kept.
pub fn parse_site_baselines(body: &str, site_id: i64, key: &str) -> Result<Vec<models::Baseline>> {
    const ENTITY: &str = "site content";
    let root = tree(body, ENTITY, key)?;
    root.children_named("Baseline")
        .map(|baseline| {
            let id = required_text(baseline, "ID", ENTITY, key)?;
            Ok(models::Baseline {
                baseline_id: number(id, "baseline ID", ENTITY, key)?,
                site_id,
                name: baseline.child_text("Name").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Ids of the `<Computer Resource="...">` references in a document.
///
/// The id is the last segment of the resource URI.
pub fn parse_computer_references(body: &str, entity: &'static str, key: &str) -> Result<Vec<i64>> {
    let root = tree(body, entity, key)?;
    root.children_named("Computer")
        .map(|computer| {
            let resource = computer
                .attr("Resource")
                .ok_or_else(|| Error::malformed(entity, key, "Computer without Resource"))?;
            resource_id(resource).map_err(|reason| Error::malformed(entity, key, reason))
        })
        .collect()
}

/// Last path segment of a resource URI, as a number.
pub fn resource_id(resource: &str) -> std::result::Result<i64, String> {
    let url = Url::parse(resource).map_err(|e| format!("resource {resource:?}: {e}"))?;
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or_else(|| format!("resource {resource:?} has no path"))?
        .parse()
        .map_err(|e| format!("resource {resource:?}: {e}"))
}

/// `computers`: ids of every computer.
pub fn parse_computer_list(body: &str) -> Result<Vec<i64>> {
    let list: ComputerList = quick_xml::de::from_str(body)
        .map_err(|e| Error::malformed("computer list", "computers", e))?;
    Ok(list.items.into_iter().map(|c| c.id).collect())
}

/// `computer/{id}`: the value of the `Computer Name` property.
pub fn parse_computer_name(body: &str, computer_id: i64) -> Result<String> {
    let key = computer_id.to_string();
    let root = tree(body, "computer", &key)?;
    root.child("Computer")
        .into_iter()
        .flat_map(|computer| computer.children_named("Property"))
        .find(|property| property.attr("Name") == Some("Computer Name"))
        .map(|property| property.text.clone())
        .ok_or_else(|| Error::malformed("computer", key, "missing Computer Name property"))
}

/// `computergroups/...`: ids and names of a site's groups.
pub fn parse_computer_groups(body: &str, key: &str) -> Result<Vec<Listed>> {
    let list: ComputerGroupList = quick_xml::de::from_str(body)
        .map_err(|e| Error::malformed("computer group list", key, e))?;
    Ok(list.items)
}

/// `action/{id}/status`: the action's detail plus one result per computer.
pub fn parse_action_status(body: &str, action_id: i64) -> Result<models::ActionStatus> {
    const ENTITY: &str = "action status";
    let key = action_id.to_string();
    let key = key.as_str();
    let root = tree(body, ENTITY, key)?;
    let results = root
        .child("ActionResults")
        .ok_or_else(|| Error::malformed(ENTITY, key, "missing ActionResults element"))?;

    let date =
        |text: &str| parse_date(text).map_err(|reason| Error::malformed(ENTITY, key, reason));
    let optional_date = |node: &XmlNode, child: &str| node.child_text(child).map(date).transpose();

    let reported_id: i64 = number(
        required_text(results, "ActionID", ENTITY, key)?,
        "ActionID",
        ENTITY,
        key,
    )?;
    let detail = models::ActionDetail {
        action_id: reported_id,
        status: required_text(results, "Status", ENTITY, key)?.to_string(),
        date_issued: date(required_text(results, "DateIssued", ENTITY, key)?)?,
    };

    let computers = results
        .children_named("Computer")
        .map(|computer| {
            let computer_id = computer
                .attr("ID")
                .ok_or_else(|| Error::malformed(ENTITY, key, "Computer without ID"))?;
            let count = |child: &str| -> Result<i32> {
                number(required_text(computer, child, ENTITY, key)?, child, ENTITY, key)
            };
            Ok(models::ActionResult {
                action_id: reported_id,
                computer_id: number(computer_id, "computer ID", ENTITY, key)?,
                status: computer.child_text("Status").unwrap_or_default().to_string(),
                apply_count: count("ApplyCount")?,
                retry_count: count("RetryCount")?,
                line_number: count("LineNumber")?,
                start_time: optional_date(computer, "StartTime")?,
                end_time: optional_date(computer, "EndTime")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(models::ActionStatus {
        detail,
        results: computers,
    })
}
