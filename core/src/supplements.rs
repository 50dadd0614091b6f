use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::{DATE_COLUMN, SUBJECT_COLUMN, VISIT_COLUMN, format_date};
use crate::dataset::Dataset;
use crate::error::Notice;
use crate::models::{SubjectFilter, SupplementEntry, visit_label};
use crate::table::{Cell, Table};

/// Reported intake of one supplement in one unit by one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementTotal {
    pub subject: String,
    pub description: String,
    pub unit: String,
    pub total: f64,
    pub entries: usize,
    pub days: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplementSummary {
    pub rows: Vec<SupplementTotal>,
    pub notices: Vec<Notice>,
}

impl SupplementSummary {
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new([
            SUBJECT_COLUMN,
            "Supplement",
            "Unit",
            "Total Amount",
            "Entries",
            "Days Reported",
        ]);
        for row in &self.rows {
            table.push_row(vec![
                row.subject.as_str().into(),
                row.description.as_str().into(),
                row.unit.as_str().into(),
                row.total.into(),
                row.entries.into(),
                row.days.into(),
            ]);
        }
        table
    }
}

/// Selected subjects and their supplement rows, or the notice explaining
/// why there are none.
fn selected<'a>(
    ds: &'a Dataset,
    filter: &SubjectFilter,
    notices: &mut Vec<Notice>,
) -> Vec<&'a SupplementEntry> {
    let subjects = ds.resolve(filter);
    if subjects.is_empty() {
        notices.push(Notice::no_subjects());
        return Vec::new();
    }
    let rows: Vec<&SupplementEntry> = ds
        .supplements()
        .iter()
        .filter(|s| subjects.binary_search(&s.subject.as_str()).is_ok())
        .collect();
    if rows.is_empty() {
        notices.push(Notice::no_rows("supplements"));
    }
    rows
}

/// Sum supplement amounts per subject, description and unit. Entries in
/// different units stay on separate rows; nothing is converted.
#[must_use]
pub fn supplement_summary(ds: &Dataset, filter: &SubjectFilter) -> SupplementSummary {
    let mut summary = SupplementSummary::default();
    let entries = selected(ds, filter, &mut summary.notices);

    let mut groups: BTreeMap<(&str, &str, &str), (f64, usize, BTreeSet<u32>)> = BTreeMap::new();
    for e in entries {
        let slot = groups
            .entry((e.subject.as_str(), e.description.as_str(), e.unit.as_str()))
            .or_default();
        slot.0 += e.amount;
        slot.1 += 1;
        slot.2.insert(e.recall_no);
    }

    summary.rows = groups
        .into_iter()
        .map(|((subject, description, unit), (total, entries, days))| SupplementTotal {
            subject: subject.to_string(),
            description: description.to_string(),
            unit: unit.to_string(),
            total,
            entries,
            days: days.len(),
        })
        .collect();
    summary
}

/// Every supplement row of the selected subjects, ordered by subject and visit.
#[must_use]
pub fn supplement_intake(ds: &Dataset, filter: &SubjectFilter) -> (Table, Vec<Notice>) {
    let mut notices = Vec::new();
    let mut entries = selected(ds, filter, &mut notices);
    entries.sort_by(|a, b| {
        (&a.subject, a.recall_no, a.intake_start).cmp(&(&b.subject, b.recall_no, b.intake_start))
    });

    let mut table = Table::new([
        SUBJECT_COLUMN,
        VISIT_COLUMN,
        DATE_COLUMN,
        "Supplement",
        "Amount",
        "Unit",
    ]);
    for e in entries {
        table.push_row(vec![
            e.subject.as_str().into(),
            visit_label(e.recall_no).into(),
            e.intake_start.map(|d| format_date(&d)).into(),
            e.description.as_str().into(),
            Cell::from(e.amount),
            e.unit.as_str().into(),
        ]);
    }
    (table, notices)
}
