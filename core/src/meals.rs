//! Meal occasion views over the Items file.

use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::{SUBJECT_COLUMN, VISIT_COLUMN, mean};
use crate::dataset::Dataset;
use crate::error::Notice;
use crate::models::{
    Amounts, FoodEntry, Grouping, Measure, Nutrient, SubjectFilter, occasion_rank, visit_label,
};
use crate::table::{Cell, Table};

pub const MEAL_COLUMN: &str = "Meal";
pub const ITEMS_COLUMN: &str = "Number of Items";
pub const CALORIES_COLUMN: &str = "Calories";

/// Entries of one meal occasion label, for a subject or one of their days.
#[derive(Debug, Clone, PartialEq)]
pub struct MealRow {
    pub subject: String,
    pub recall_no: Option<u32>,
    pub occasion: String,
    pub entries: usize,
    /// Summed nutrients; in per-subject mode the mean over recall days.
    pub nutrients: Amounts<Nutrient>,
}

impl MealRow {
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.nutrients[Nutrient::Energy]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealSummary {
    pub grouping: Grouping,
    pub rows: Vec<MealRow>,
    pub notices: Vec<Notice>,
}

impl MealSummary {
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut columns = vec![SUBJECT_COLUMN];
        if self.grouping == Grouping::PerDay {
            columns.push(VISIT_COLUMN);
        }
        columns.extend([MEAL_COLUMN, ITEMS_COLUMN, CALORIES_COLUMN]);
        columns.extend(
            Nutrient::ALL
                .iter()
                .filter(|n| **n != Nutrient::Energy)
                .map(|n| n.label()),
        );

        let mut table = Table::new(columns);
        for row in &self.rows {
            let mut cells = vec![Cell::from(row.subject.as_str())];
            if self.grouping == Grouping::PerDay {
                cells.push(row.recall_no.map(visit_label).into());
            }
            cells.push(row.occasion.as_str().into());
            cells.push(row.entries.into());
            cells.push(row.energy().into());
            cells.extend(
                row.nutrients
                    .iter()
                    .filter(|(n, _)| *n != Nutrient::Energy)
                    .map(|(_, v)| Cell::from(v)),
            );
            table.push_row(cells);
        }
        table
    }
}

fn selected_items<'a>(
    ds: &'a Dataset,
    filter: &SubjectFilter,
    notices: &mut Vec<Notice>,
) -> Vec<&'a FoodEntry> {
    let subjects = ds.resolve(filter);
    if subjects.is_empty() {
        notices.push(Notice::no_subjects());
        return Vec::new();
    }
    let items: Vec<&FoodEntry> = ds
        .items()
        .iter()
        .filter(|e| subjects.binary_search(&e.subject.as_str()).is_ok())
        .collect();
    if items.is_empty() {
        notices.push(Notice::no_rows("food entries"));
    }
    items
}

/// Entry count, energy and nutrients per meal occasion label.
///
/// Labels are grouped exactly as reported. Per-day mode keeps one row per
/// subject, recall day and label; per-subject mode averages the nutrients
/// over the subject's recall days and counts all entries.
#[must_use]
pub fn meal_summary(ds: &Dataset, filter: &SubjectFilter, grouping: Grouping) -> MealSummary {
    let mut summary = MealSummary {
        grouping,
        rows: Vec::new(),
        notices: Vec::new(),
    };
    let items = selected_items(ds, filter, &mut summary.notices);

    let mut groups: BTreeMap<(&str, Option<u32>, (usize, &str)), (usize, Amounts<Nutrient>)> =
        BTreeMap::new();
    for e in items {
        let recall_no = match grouping {
            Grouping::PerSubject => None,
            Grouping::PerDay => Some(e.recall_no),
        };
        let slot = groups
            .entry((e.subject.as_str(), recall_no, occasion_rank(&e.occasion)))
            .or_default();
        slot.0 += 1;
        slot.1.add(&e.nutrients);
    }

    summary.rows = groups
        .into_iter()
        .map(|((subject, recall_no, (_, occasion)), (entries, total))| {
            let nutrients = match grouping {
                Grouping::PerSubject => mean(&total, ds.day_count(subject)),
                Grouping::PerDay => total,
            };
            MealRow {
                subject: subject.to_string(),
                recall_no,
                occasion: occasion.to_string(),
                entries,
                nutrients,
            }
        })
        .collect();
    summary
}

/// How often each meal occasion label was reported by a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct OccasionCount {
    pub subject: String,
    pub occasion: String,
    /// Distinct eating occasions (`RecallNo`, `Occ_No`) carrying the label.
    pub occasions: usize,
    /// Recall days on which the label was reported.
    pub days: usize,
    /// Share of the subject's eating occasions, in percent.
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccasionPattern {
    pub rows: Vec<OccasionCount>,
    pub notices: Vec<Notice>,
}

impl OccasionPattern {
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut table = Table::new([
            SUBJECT_COLUMN,
            MEAL_COLUMN,
            "Occasions",
            "Days Reported",
            "Share (%)",
        ]);
        for row in &self.rows {
            table.push_row(vec![
                row.subject.as_str().into(),
                row.occasion.as_str().into(),
                row.occasions.into(),
                row.days.into(),
                row.share.into(),
            ]);
        }
        table
    }
}

/// Distribution of eating occasions over meal labels, per subject.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn occasion_pattern(ds: &Dataset, filter: &SubjectFilter) -> OccasionPattern {
    let mut pattern = OccasionPattern::default();
    let items = selected_items(ds, filter, &mut pattern.notices);

    let mut occasions: BTreeMap<(&str, (usize, &str)), BTreeSet<(u32, u32)>> = BTreeMap::new();
    for e in items {
        occasions
            .entry((e.subject.as_str(), occasion_rank(&e.occasion)))
            .or_default()
            .insert((e.recall_no, e.occasion_no));
    }

    let mut per_subject: BTreeMap<&str, usize> = BTreeMap::new();
    for ((subject, _), set) in &occasions {
        *per_subject.entry(*subject).or_default() += set.len();
    }

    pattern.rows = occasions
        .iter()
        .map(|((subject, (_, occasion)), set)| {
            let total = per_subject.get(subject).copied().unwrap_or(0).max(1);
            let days: BTreeSet<u32> = set.iter().map(|(recall_no, _)| *recall_no).collect();
            OccasionCount {
                subject: (*subject).to_string(),
                occasion: (*occasion).to_string(),
                occasions: set.len(),
                days: days.len(),
                share: set.len() as f64 * 100.0 / total as f64,
            }
        })
        .collect();
    pattern
}

/// Every food entry of the selected subjects with its key nutrients.
#[must_use]
pub fn food_items(ds: &Dataset, filter: &SubjectFilter) -> (Table, Vec<Notice>) {
    let mut notices = Vec::new();
    let mut items = selected_items(ds, filter, &mut notices);
    items.sort_by(|a, b| {
        (&a.subject, a.recall_no, a.occasion_no).cmp(&(&b.subject, b.recall_no, b.occasion_no))
    });

    let shown = [
        Nutrient::Energy,
        Nutrient::Protein,
        Nutrient::TotalFat,
        Nutrient::Carbohydrate,
    ];
    let mut table = Table::new(
        [
            SUBJECT_COLUMN,
            VISIT_COLUMN,
            MEAL_COLUMN,
            "Food Code",
            "Description",
            "Amount (g)",
        ]
        .into_iter()
        .chain(shown.iter().map(|n| n.label())),
    );
    for e in items {
        let mut cells = vec![
            Cell::from(e.subject.as_str()),
            visit_label(e.recall_no).into(),
            e.occasion.as_str().into(),
            e.food_code.as_str().into(),
            e.description.as_str().into(),
            e.grams.into(),
        ];
        cells.extend(shown.iter().map(|n| Cell::from(e.nutrients[*n])));
        table.push_row(cells);
    }
    (table, notices)
}
