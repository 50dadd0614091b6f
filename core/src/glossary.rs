use serde::Serialize;

use crate::hei::{Component, Curve};
use crate::models::{FoodGroup, MEAL_OCCASIONS, Measure, Nutrient};
use crate::report::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub term: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub entries: Vec<Entry>,
}

impl Section {
    fn new<T, M>(title: &str, entries: impl IntoIterator<Item = (T, M)>) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Self {
            title: title.to_string(),
            entries: entries
                .into_iter()
                .map(|(term, meaning)| Entry {
                    term: term.into(),
                    meaning: meaning.into(),
                })
                .collect(),
        }
    }
}

const MEAL_DESCRIPTIONS: [&str; 8] = [
    "First meal of the day",
    "Mid-morning snack",
    "Midday meal",
    "Mid-afternoon snack",
    "Evening meal",
    "After dinner snack",
    "Late night snack",
    "Meals at other times",
];

const GENERAL_TERMS: &[(&str, &str)] = &[
    (
        "ASA24",
        "Automated Self-Administered 24-Hour Dietary Assessment Tool",
    ),
    ("Visit", "The dietary recall visit number (RecallNo)"),
    ("UserName", "Unique identifier for each participant"),
    (
        "IntakeStartDateTime",
        "Start date and time of the dietary recall period",
    ),
    (
        "Recall Days",
        "Number of recall days a subject's means are taken over",
    ),
];

/// Abbreviations and terms shown with a report page.
#[must_use]
pub fn glossary(page: Page) -> Vec<Section> {
    let mut sections = match page {
        Page::Nutrients => vec![
            measure_section::<Nutrient>("Nutrient Abbreviations"),
            Section::new(
                "Units",
                [
                    ("g", "grams"),
                    ("mg", "milligrams"),
                    ("mcg", "micrograms"),
                    ("kcal", "kilocalories"),
                ],
            ),
        ],
        Page::FoodGroups => vec![
            measure_section::<FoodGroup>("Food Group Abbreviations"),
            Section::new(
                "Units",
                [
                    ("cup eq", "Cup Equivalent"),
                    ("oz eq", "Ounce Equivalent"),
                    ("tsp eq", "Teaspoon Equivalent"),
                    ("g", "grams"),
                ],
            ),
        ],
        Page::Meals | Page::MealPattern | Page::FoodItems => vec![
            Section::new(
                "Meal Occasions",
                MEAL_OCCASIONS.iter().copied().zip(MEAL_DESCRIPTIONS),
            ),
            Section::new(
                "Meal Metrics",
                [
                    Nutrient::Energy,
                    Nutrient::Protein,
                    Nutrient::TotalFat,
                    Nutrient::Carbohydrate,
                ]
                .map(|n| (n.column(), n.label())),
            ),
        ],
        Page::Hei => vec![Section::new(
            "HEI-2015 Components",
            Component::ALL
                .iter()
                .map(|c| (c.label(), describe_component(*c))),
        )],
        Page::Supplements | Page::SupplementIntake => Vec::new(),
    };
    sections.push(Section::new("General Terms", GENERAL_TERMS.iter().copied()));
    sections
}

fn measure_section<M: Measure>(title: &str) -> Section {
    Section::new(title, M::ALL.iter().map(|m| (m.column(), m.label())))
}

fn describe_component(c: Component) -> String {
    let max = c.max_points();
    let unit = c.unit();
    match c.curve() {
        Curve::Adequacy { zero_at, full_at } if zero_at > 0.0 => format!(
            "{max} points at {full_at} {unit} or more, 0 points at {zero_at} or less"
        ),
        Curve::Adequacy { full_at, .. } => format!("{max} points at {full_at} {unit} or more"),
        Curve::Moderation { full_at, zero_at } => format!(
            "{max} points at {full_at} {unit} or less, 0 points at {zero_at} or more"
        ),
    }
}
