//! Chart series derived from report tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{DATE_COLUMN, DAYS_COLUMN, SUBJECT_COLUMN, VISIT_COLUMN};
use crate::meals::MEAL_COLUMN;
use crate::models::occasion_rank;
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// X axis categories in display order.
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

const KEY_COLUMNS: &[&str] = &[
    SUBJECT_COLUMN,
    VISIT_COLUMN,
    DATE_COLUMN,
    DAYS_COLUMN,
    MEAL_COLUMN,
];

/// Columns that can be plotted: every non-key column holding only numbers.
#[must_use]
pub fn numeric_columns(table: &Table) -> Vec<&str> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| !KEY_COLUMNS.contains(&name.as_str()))
        .filter(|(idx, _)| {
            table
                .column(*idx)
                .all(|cell| matches!(cell, Cell::Integer(_) | Cell::Number(_) | Cell::Empty))
        })
        .map(|(_, name)| name.as_str())
        .collect()
}

/// Plot `measure` from `table`.
///
/// Tables with a meal column become grouped bars by meal, tables with a
/// visit column become one line per subject across visits, anything else a
/// bar per subject. Returns `None` when `measure` is not a numeric column.
#[must_use]
pub fn build_chart(table: &Table, measure: &str) -> Option<Chart> {
    if !numeric_columns(table).contains(&measure) {
        return None;
    }
    let y = table.column_index(measure)?;
    let subject = table.column_index(SUBJECT_COLUMN)?;
    let visit = table.column_index(VISIT_COLUMN);
    let meal = table.column_index(MEAL_COLUMN);

    let (kind, x, title) = match (meal, visit) {
        (Some(m), _) => (ChartKind::Bar, m, format!("{measure} by Meal")),
        (None, Some(v)) => (ChartKind::Line, v, format!("{measure} over Visits")),
        (None, None) => (ChartKind::Bar, subject, format!("{measure} by Subject")),
    };

    let mut series: BTreeMap<String, Vec<Point>> = BTreeMap::new();
    let mut categories: Vec<String> = Vec::new();
    for row in table.rows() {
        let Some(Cell::Text(x_value)) = row.get(x) else {
            continue;
        };
        let name = match (kind, meal, visit) {
            (ChartKind::Bar, Some(_), Some(v)) => format!("{} · {}", row[subject], row[v]),
            (ChartKind::Bar, None, _) => measure.to_string(),
            _ => row[subject].to_string(),
        };
        if !categories.contains(x_value) {
            categories.push(x_value.clone());
        }
        series.entry(name).or_default().push(Point {
            x: x_value.clone(),
            y: row[y].as_f64().unwrap_or(0.0),
        });
    }

    if meal.is_some() {
        categories.sort_by(|a, b| occasion_rank(a).cmp(&occasion_rank(b)));
    } else if visit.is_some() {
        categories.sort_by_key(|c| visit_number(c));
    }

    Some(Chart {
        kind,
        title,
        x_label: table.columns()[x].clone(),
        y_label: measure.to_string(),
        categories,
        series: series
            .into_iter()
            .map(|(name, points)| Series { name, points })
            .collect(),
    })
}

fn visit_number(label: &str) -> u32 {
    label
        .rsplit(' ')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}
