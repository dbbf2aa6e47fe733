//! Value records produced by the remote client and consumed by the store gateway.
//!
//! These mirror the store tables minus the surrogate `id`. Parent references
//! (`site_id`, `analysis_id` on properties, `analysis_property_id`) are already
//! store ids by the time a record is built.

use crate::entities::SiteType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A site from the `sites` listing; `(name, site_type)` identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub site_type: SiteType,
}

/// An action as reported by the relevance query, before its site name is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAction {
    /// Name of the site the action's source fixlet lives in
    pub site_name: String,
    pub action_id: i64,
    pub name: String,
}

/// An action whose site has been resolved to a store id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub action_id: i64,
    /// Store id of the owning site
    pub site_id: i64,
    pub name: String,
}

/// Action-level fields of a status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDetail {
    pub action_id: i64,
    pub status: String,
    pub date_issued: DateTime<Utc>,
}

/// One computer's progress on an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: i64,
    pub computer_id: i64,
    pub status: String,
    pub apply_count: i32,
    pub retry_count: i32,
    pub line_number: i32,
    pub start_time: Option<DateTime<Utc>>, // None until the computer starts the action
    pub end_time: Option<DateTime<Utc>>,
}

/// Everything one `action/{id}/status` document describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStatus {
    pub detail: ActionDetail,
    pub results: Vec<ActionResult>,
}

/// An analysis listed under a site. `analysis_id` is only unique within that site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub analysis_id: i64,
    pub site_id: i64,
    pub name: String,
}

/// A property defined by an analysis, numbered by its position in the definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisProperty {
    /// Store id of the parent analysis
    pub analysis_id: i64,
    pub sequence_no: i32,
    pub name: String,
}

/// The value one computer reports for a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPropertyResult {
    /// Store id of the property
    pub analysis_property_id: i64,
    pub computer_id: i64,
    pub value: String,
}

/// A baseline from a site's content listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub baseline_id: i64,
    pub site_id: i64,
    pub name: String,
}

/// A computer a baseline is relevant on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaselineResult {
    pub baseline_id: i64,
    pub computer_id: i64,
}

/// A managed computer and its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Computer {
    pub computer_id: i64,
    pub computer_name: String,
}

/// A computer group with how its membership is maintained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerGroup {
    pub group_id: i64,
    pub site_id: i64,
    pub name: String,
    /// Membership is edited by hand rather than computed from relevance
    pub manual: bool,
}

/// A computer's membership in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputerGroupMember {
    pub group_id: i64,
    pub computer_id: i64,
}
