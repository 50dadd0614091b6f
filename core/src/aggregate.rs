//! Nutrient and food group summaries.
//!
//! Both follow the same rule: values are summed within a recall day and
//! averaged over the subject's recall days, where a day without a reported
//! value contributes zero. Reading from Totals by default, or from Items when
//! the summary is restricted to one meal occasion.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::dataset::Dataset;
use crate::error::Notice;
use crate::models::{Amounts, FoodGroup, Grouping, Measure, Nutrient, SubjectFilter, visit_label};
use crate::table::{Cell, Table};

pub const SUBJECT_COLUMN: &str = "UserName";
pub const DAYS_COLUMN: &str = "Recall Days";
pub const VISIT_COLUMN: &str = "Visit";
pub const DATE_COLUMN: &str = "Intake Date";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SummaryOptions {
    pub grouping: Grouping,
    /// Restrict to entries of this meal occasion label.
    pub occasion: Option<String>,
}

/// One summary row: a subject's mean day, or one of their recall days.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountRow<M> {
    pub subject: String,
    /// Set in per-day mode; `None` for per-subject rows and for subjects
    /// without any recall day.
    pub recall_no: Option<u32>,
    pub intake_start: Option<NaiveDateTime>,
    /// Recall days behind the row.
    pub days: usize,
    pub amounts: Amounts<M>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmountSummary<M> {
    pub grouping: Grouping,
    pub occasion: Option<String>,
    pub rows: Vec<AmountRow<M>>,
    pub notices: Vec<Notice>,
}

impl<M: Measure> AmountSummary<M> {
    #[must_use]
    pub fn row(&self, subject: &str) -> Option<&AmountRow<M>> {
        self.rows.iter().find(|r| r.subject == subject)
    }

    #[must_use]
    pub fn to_table(&self) -> Table {
        let keys: &[&str] = match self.grouping {
            Grouping::PerSubject => &[SUBJECT_COLUMN, DAYS_COLUMN],
            Grouping::PerDay => &[SUBJECT_COLUMN, VISIT_COLUMN, DATE_COLUMN],
        };
        let mut table = Table::new(
            keys.iter()
                .copied()
                .chain(M::ALL.iter().map(|m| m.label())),
        );
        for row in &self.rows {
            let mut cells = vec![Cell::from(row.subject.as_str())];
            match self.grouping {
                Grouping::PerSubject => cells.push(row.days.into()),
                Grouping::PerDay => {
                    cells.push(row.recall_no.map(visit_label).into());
                    cells.push(row.intake_start.map(|d| format_date(&d)).into());
                }
            }
            cells.extend(row.amounts.iter().map(|(_, v)| Cell::from(v)));
            table.push_row(cells);
        }
        table
    }
}

#[must_use]
pub fn format_date(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Nutrient intake per subject (mean of recall days) or per recall day.
#[must_use]
pub fn nutrient_summary(
    ds: &Dataset,
    filter: &SubjectFilter,
    options: &SummaryOptions,
) -> AmountSummary<Nutrient> {
    match &options.occasion {
        None => summarize(
            ds,
            filter,
            options,
            ds.totals()
                .iter()
                .map(|t| (t.subject.as_str(), t.recall_no, &t.nutrients)),
            "nutrient data",
        ),
        Some(occasion) => summarize(
            ds,
            filter,
            options,
            ds.items()
                .iter()
                .filter(|e| &e.occasion == occasion)
                .map(|e| (e.subject.as_str(), e.recall_no, &e.nutrients)),
            &format!("{occasion} entries"),
        ),
    }
}

/// Food pattern equivalents per subject or per recall day, always in the
/// canonical food group order.
#[must_use]
pub fn food_group_summary(
    ds: &Dataset,
    filter: &SubjectFilter,
    options: &SummaryOptions,
) -> AmountSummary<FoodGroup> {
    match &options.occasion {
        None => summarize(
            ds,
            filter,
            options,
            ds.totals()
                .iter()
                .map(|t| (t.subject.as_str(), t.recall_no, &t.food_groups)),
            "food group data",
        ),
        Some(occasion) => summarize(
            ds,
            filter,
            options,
            ds.items()
                .iter()
                .filter(|e| &e.occasion == occasion)
                .map(|e| (e.subject.as_str(), e.recall_no, &e.food_groups)),
            &format!("{occasion} entries"),
        ),
    }
}

/// Sum `records` per (subject, recall day) for the selected subjects.
pub(crate) fn day_sums<'a, M: Measure>(
    subjects: &[&'a str],
    records: impl Iterator<Item = (&'a str, u32, &'a Amounts<M>)>,
) -> BTreeMap<(&'a str, u32), Amounts<M>> {
    let mut sums: BTreeMap<(&str, u32), Amounts<M>> = BTreeMap::new();
    for (subject, recall_no, amounts) in records {
        if subjects.binary_search(&subject).is_ok() {
            sums.entry((subject, recall_no)).or_default().add(amounts);
        }
    }
    sums
}

fn summarize<'a, M: Measure>(
    ds: &'a Dataset,
    filter: &SubjectFilter,
    options: &SummaryOptions,
    records: impl Iterator<Item = (&'a str, u32, &'a Amounts<M>)>,
    what: &str,
) -> AmountSummary<M> {
    let mut summary = AmountSummary {
        grouping: options.grouping,
        occasion: options.occasion.clone(),
        rows: Vec::new(),
        notices: Vec::new(),
    };
    let subjects = ds.resolve(filter);
    if subjects.is_empty() {
        summary.notices.push(Notice::no_subjects());
        return summary;
    }

    let sums = day_sums(&subjects, records);
    if sums.is_empty() {
        summary.notices.push(Notice::no_rows(what));
    }

    for subject in subjects {
        let days = ds.recall_days(subject).cloned().unwrap_or_default();
        match options.grouping {
            Grouping::PerSubject => {
                let mut total = Amounts::zero();
                for ((_, _), amounts) in sums.range((subject, 0)..=(subject, u32::MAX)) {
                    total.add(amounts);
                }
                summary.rows.push(AmountRow {
                    subject: subject.to_string(),
                    recall_no: None,
                    intake_start: None,
                    days: days.len(),
                    amounts: mean(&total, days.len()),
                });
            }
            Grouping::PerDay if days.is_empty() => summary.rows.push(AmountRow {
                subject: subject.to_string(),
                recall_no: None,
                intake_start: None,
                days: 0,
                amounts: Amounts::zero(),
            }),
            Grouping::PerDay => {
                for (recall_no, intake_start) in days {
                    summary.rows.push(AmountRow {
                        subject: subject.to_string(),
                        recall_no: Some(recall_no),
                        intake_start,
                        days: 1,
                        amounts: sums
                            .get(&(subject, recall_no))
                            .cloned()
                            .unwrap_or_default(),
                    });
                }
            }
        }
    }
    summary
}

/// Divide a subject's summed amounts by their recall-day count.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean<M: Measure>(total: &Amounts<M>, days: usize) -> Amounts<M> {
    if days == 0 {
        return Amounts::zero();
    }
    total.scaled(1.0 / days as f64)
}
