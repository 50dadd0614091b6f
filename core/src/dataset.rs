use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::loader::TableKind;
use crate::models::{DayTotals, FoodEntry, RawTable, SubjectFilter, SupplementEntry};

/// Per-file record of what a load read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedFile {
    pub table: TableKind,
    pub file_name: String,
    pub rows: usize,
}

/// Recall days of one subject, keyed by `RecallNo`, with the intake start
/// when the Totals file reports it.
pub type RecallDays = BTreeMap<u32, Option<NaiveDateTime>>;

/// The immutable, in-memory tables of one ASA24 data directory.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    directory: PathBuf,
    files: Vec<LoadedFile>,
    totals: Vec<DayTotals>,
    items: Vec<FoodEntry>,
    supplements: Vec<SupplementEntry>,
    auxiliary: BTreeMap<TableKind, RawTable>,
    subjects: BTreeSet<String>,
    days: BTreeMap<String, RecallDays>,
}

impl Dataset {
    /// Build a dataset from already-typed records.
    #[must_use]
    pub fn from_records(
        totals: Vec<DayTotals>,
        items: Vec<FoodEntry>,
        supplements: Vec<SupplementEntry>,
    ) -> Self {
        let mut dataset = Self {
            totals,
            items,
            supplements,
            ..Self::default()
        };
        dataset.reindex();
        dataset
    }

    pub(crate) fn with_source(
        mut self,
        directory: &Path,
        files: Vec<LoadedFile>,
        auxiliary: BTreeMap<TableKind, RawTable>,
    ) -> Self {
        self.directory = directory.to_path_buf();
        self.files = files;
        self.auxiliary = auxiliary;
        self.reindex();
        self
    }

    fn reindex(&mut self) {
        let mut subjects = BTreeSet::new();
        let mut days: BTreeMap<String, RecallDays> = BTreeMap::new();

        for t in &self.totals {
            subjects.insert(t.subject.clone());
            let slot = days
                .entry(t.subject.clone())
                .or_default()
                .entry(t.recall_no)
                .or_default();
            if slot.is_none() {
                *slot = t.intake_start;
            }
        }
        for e in &self.items {
            subjects.insert(e.subject.clone());
            days.entry(e.subject.clone())
                .or_default()
                .entry(e.recall_no)
                .or_default();
        }
        for s in &self.supplements {
            subjects.insert(s.subject.clone());
        }
        for table in self.auxiliary.values() {
            if let Some(idx) = table
                .headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case("UserName"))
            {
                subjects.extend(
                    table
                        .rows
                        .iter()
                        .filter_map(|row| row.get(idx))
                        .filter(|s| !s.is_empty())
                        .cloned(),
                );
            }
        }

        self.subjects = subjects;
        self.days = days;
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn files(&self) -> &[LoadedFile] {
        &self.files
    }

    #[must_use]
    pub fn totals(&self) -> &[DayTotals] {
        &self.totals
    }

    #[must_use]
    pub fn items(&self) -> &[FoodEntry] {
        &self.items
    }

    #[must_use]
    pub fn supplements(&self) -> &[SupplementEntry] {
        &self.supplements
    }

    #[must_use]
    pub fn raw(&self, table: TableKind) -> Option<&RawTable> {
        self.auxiliary.get(&table)
    }

    /// Every subject identifier found in any loaded file.
    #[must_use]
    pub fn subjects(&self) -> &BTreeSet<String> {
        &self.subjects
    }

    /// Subjects covered by `filter`, sorted. Unknown identifiers are dropped.
    #[must_use]
    pub fn resolve(&self, filter: &SubjectFilter) -> Vec<&str> {
        match filter {
            SubjectFilter::All => self.subjects.iter().map(String::as_str).collect(),
            SubjectFilter::Only(wanted) => self
                .subjects
                .iter()
                .filter(|s| wanted.contains(*s))
                .map(String::as_str)
                .collect(),
        }
    }

    /// Recall days with dietary data (Totals or Items) for `subject`.
    #[must_use]
    pub fn recall_days(&self, subject: &str) -> Option<&RecallDays> {
        self.days.get(subject)
    }

    #[must_use]
    pub fn day_count(&self, subject: &str) -> usize {
        self.days.get(subject).map_or(0, BTreeMap::len)
    }
}
