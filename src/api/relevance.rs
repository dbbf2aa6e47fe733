//! Relevance queries and positional projection of their answers.
//!
//! A relevance response is a list of tuples of string answers with no field
//! names. Each query here has a matching [`TupleRow`] type that lists its
//! fields in answer order, so the position of every field is written down
//! exactly once, next to the query text that produces it.

use crate::api::xml::XmlNode;
use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A relevance expression ready to be sent to the `query` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelevanceQuery(String);

impl RelevanceQuery {
    /// The query text as sent to the server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(site name, action id, action name)` for every action.
    #[must_use]
    pub fn actions() -> Self {
        Self(
            "(((name of it) of site of it) of source fixlets of it, id of it, name of it) of BES Actions"
                .to_string(),
        )
    }

    /// `(computer id, value)` for every computer reporting the property.
    ///
    /// The analysis is matched by name and site name, since analysis ids and
    /// names are only unique within a site.
    #[must_use]
    pub fn property_results(sequence_no: i32, analysis_name: &str, site_name: &str) -> Self {
        Self(format!(
            "((id of it) of computer of it, values of it) of results from (BES Computers) of BES Properties \
             whose ((source id of it = {sequence_no}) and (name of source analysis of it = {}) \
             and (name of site of source analysis of it = {}))",
            string_literal(analysis_name),
            string_literal(site_name),
        ))
    }

    /// `(computer id, computer name)` for every member of a manual group.
    #[must_use]
    pub fn group_members(group_id: i64) -> Self {
        Self(format!(
            "((id of it, name of it) of members of it) of BES Computer Group whose (id of it = {group_id})"
        ))
    }

    /// Single boolean answer: whether the group's membership is manual.
    #[must_use]
    pub fn manual_flag(group_id: i64) -> Self {
        Self(format!(
            "(manual flag of it) of BES computer groups whose (id of it = {group_id})"
        ))
    }
}

impl fmt::Display for RelevanceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quotes `value` as a relevance string literal.
///
/// Relevance strings have no backslash escapes; `%` introduces a two-digit hex
/// escape, so `%` and `"` are written as `%25` and `%22`. Parentheses and
/// other punctuation are inert inside quotes.
#[must_use]
pub fn string_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '%' => quoted.push_str("%25"),
            '"' => quoted.push_str("%22"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Answers of one tuple, addressed by the field names of a [`TupleRow`].
pub struct Answers<'a> {
    fields: &'static [&'static str],
    values: &'a [String],
}

impl<'a> Answers<'a> {
    pub fn text(&self, field: &str) -> std::result::Result<&'a str, String> {
        let position = self
            .fields
            .iter()
            .position(|f| *f == field)
            .ok_or_else(|| format!("no field named {field}"))?;
        self.values
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| format!("missing answer for {field}"))
    }

    pub fn parse<T>(&self, field: &str) -> std::result::Result<T, String>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text = self.text(field)?;
        text.trim()
            .parse()
            .map_err(|e| format!("{field} {text:?} is not valid: {e}"))
    }
}

/// A typed view of one relevance tuple.
pub trait TupleRow: Sized {
    /// Field names, in the order the query returns them.
    const FIELDS: &'static [&'static str];

    fn from_answers(answers: &Answers<'_>) -> std::result::Result<Self, String>;
}

/// Maps raw tuples onto `R`, checking that every tuple has exactly `R::FIELDS` answers.
pub fn project<R: TupleRow>(rows: &[Vec<String>]) -> std::result::Result<Vec<R>, String> {
    rows.iter()
        .map(|values| {
            if values.len() != R::FIELDS.len() {
                return Err(format!(
                    "expected {} answers ({}), got {}",
                    R::FIELDS.len(),
                    R::FIELDS.join(", "),
                    values.len()
                ));
            }
            R::from_answers(&Answers {
                fields: R::FIELDS,
                values,
            })
        })
        .collect()
}

/// Row of the actions query: `(site name, action id, action name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRow {
    pub site_name: String,
    pub action_id: i64,
    pub action_name: String,
}

impl TupleRow for ActionRow {
    const FIELDS: &'static [&'static str] = &["site_name", "action_id", "action_name"];

    fn from_answers(answers: &Answers<'_>) -> std::result::Result<Self, String> {
        Ok(Self {
            site_name: answers.text("site_name")?.to_string(),
            action_id: answers.parse("action_id")?,
            action_name: answers.text("action_name")?.to_string(),
        })
    }
}

/// Row of a property-results query: `(computer id, value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValueRow {
    pub computer_id: i64,
    pub value: String,
}

impl TupleRow for PropertyValueRow {
    const FIELDS: &'static [&'static str] = &["computer_id", "value"];

    fn from_answers(answers: &Answers<'_>) -> std::result::Result<Self, String> {
        Ok(Self {
            computer_id: answers.parse("computer_id")?,
            value: answers.text("value")?.to_string(),
        })
    }
}

/// Row of a group-members query: `(computer id, computer name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMemberRow {
    pub computer_id: i64,
    pub computer_name: String,
}

impl TupleRow for GroupMemberRow {
    const FIELDS: &'static [&'static str] = &["computer_id", "computer_name"];

    fn from_answers(answers: &Answers<'_>) -> std::result::Result<Self, String> {
        Ok(Self {
            computer_id: answers.parse("computer_id")?,
            computer_name: answers.text("computer_name")?.to_string(),
        })
    }
}

/// Reads the answers out of a `query` response.
///
/// Multi-column queries answer with `<Tuple>` elements; single-column queries
/// answer with bare `<Answer>` elements, which become one-element rows. An
/// `<Error>` element means the server rejected the expression.
pub fn parse_query_result(body: &str, query: &RelevanceQuery) -> Result<Vec<Vec<String>>> {
    let malformed = |reason: String| Error::malformed("relevance query", query, reason);

    let root = XmlNode::parse(body).map_err(malformed)?;
    let query_node = root
        .child("Query")
        .ok_or_else(|| malformed("missing Query element".to_string()))?;

    if let Some(error) = query_node.child("Error") {
        return Err(Error::Relevance {
            query: query.to_string(),
            message: error.text.clone(),
        });
    }

    let Some(result) = query_node.child("Result") else {
        return Ok(Vec::new());
    };

    let rows = result
        .children
        .iter()
        .filter_map(|node| match node.name.as_str() {
            "Tuple" => Some(
                node.children_named("Answer")
                    .map(|answer| answer.text.clone())
                    .collect(),
            ),
            "Answer" => Some(vec![node.text.clone()]),
            _ => None,
        })
        .collect();
    Ok(rows)
}

/// Reads a relevance boolean (`True` / `False`).
pub fn parse_boolean(answer: &str) -> std::result::Result<bool, String> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("{other:?} is not a boolean")),
    }
}
