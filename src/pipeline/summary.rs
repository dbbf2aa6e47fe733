//! Per-entity counts for one extraction run.

use crate::core::BulkOutcome;
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of record the extraction writes, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// Sites from the `sites` listing
    Site,
    /// Computers and their names
    Computer,
    /// Analyses per site
    Analysis,
    /// Properties per analysis
    AnalysisProperty,
    /// Property values per computer
    AnalysisPropertyResult,
    /// Baselines per site
    Baseline,
    /// Computers each baseline is relevant on
    BaselineResult,
    /// Computer groups per site
    ComputerGroup,
    /// Group memberships
    ComputerGroupMember,
    /// Actions
    Action,
    /// Action status headers
    ActionDetail,
    /// Per-computer action results
    ActionResult,
}

impl EntityKind {
    /// Plural name used in logs and the summary table.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Site => "sites",
            Self::Computer => "computers",
            Self::Analysis => "analyses",
            Self::AnalysisProperty => "analysis properties",
            Self::AnalysisPropertyResult => "analysis property results",
            Self::Baseline => "baselines",
            Self::BaselineResult => "baseline results",
            Self::ComputerGroup => "computer groups",
            Self::ComputerGroupMember => "computer group members",
            Self::Action => "actions",
            Self::ActionDetail => "action details",
            Self::ActionResult => "action results",
        }
    }
}

/// Counts for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityTally {
    /// New rows written
    pub inserted: usize,
    /// Records whose natural key was already stored
    pub skipped: usize,
    /// Fetches, resolutions or writes that failed; one per failed record or
    /// per failed request, whichever the failure was scoped to
    pub failed: usize,
}

/// Result of [`super::Extractor::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    tallies: BTreeMap<EntityKind, EntityTally>,
}

impl ExtractionSummary {
    /// Counts for `kind`; zero if nothing of that kind was seen.
    #[must_use]
    pub fn tally(&self, kind: EntityKind) -> EntityTally {
        self.tallies.get(&kind).copied().unwrap_or_default()
    }

    /// Adds the inserts, skips and isolated failures of a bulk insert.
    pub fn record_bulk(&mut self, kind: EntityKind, bulk: &BulkOutcome) {
        let tally = self.tallies.entry(kind).or_default();
        tally.inserted += bulk.inserted();
        tally.skipped += bulk.skipped();
        tally.failed += bulk.failures.len();
    }

    /// Counts one failed fetch or resolution.
    pub fn record_failure(&mut self, kind: EntityKind) {
        self.tallies.entry(kind).or_default().failed += 1;
    }

    /// New rows written across every kind.
    #[must_use]
    pub fn total_inserted(&self) -> usize {
        self.tallies.values().map(|t| t.inserted).sum()
    }

    /// Failures across every kind.
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.tallies.values().map(|t| t.failed).sum()
    }
}

impl fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Extraction summary:")?;
        for (kind, tally) in &self.tallies {
            writeln!(
                f,
                "  {:<26} {:>6} inserted {:>6} skipped {:>4} failed",
                kind.label(),
                tally.inserted,
                tally.skipped,
                tally.failed
            )?;
        }
        write!(
            f,
            "  total: {} inserted, {} failed",
            self.total_inserted(),
            self.total_failed()
        )
    }
}
