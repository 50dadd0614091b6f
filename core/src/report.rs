use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{SummaryOptions, food_group_summary, nutrient_summary};
use crate::dataset::Dataset;
use crate::error::Notice;
use crate::hei::hei_report;
use crate::meals::{food_items, meal_summary, occasion_pattern};
use crate::models::{Grouping, SubjectFilter};
use crate::supplements::{supplement_intake, supplement_summary};
use crate::table::Table;

/// The dashboard's report pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Nutrients,
    FoodGroups,
    Supplements,
    SupplementIntake,
    Meals,
    MealPattern,
    FoodItems,
    Hei,
}

impl Page {
    pub const ALL: [Self; 8] = [
        Self::Nutrients,
        Self::FoodGroups,
        Self::Supplements,
        Self::SupplementIntake,
        Self::Meals,
        Self::MealPattern,
        Self::FoodItems,
        Self::Hei,
    ];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Nutrients => "nutrients",
            Self::FoodGroups => "food-groups",
            Self::Supplements => "supplements",
            Self::SupplementIntake => "supplement-intake",
            Self::Meals => "meals",
            Self::MealPattern => "meal-pattern",
            Self::FoodItems => "food-items",
            Self::Hei => "hei",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Nutrients => "Nutrient Summary",
            Self::FoodGroups => "Food Groups Summary",
            Self::Supplements => "Supplement Summary",
            Self::SupplementIntake => "Supplement Intake",
            Self::Meals => "Meal Summary",
            Self::MealPattern => "Meal Pattern",
            Self::FoodItems => "Detailed Food Items",
            Self::Hei => "Healthy Eating Index 2015",
        }
    }

    /// Worksheet name used on export; always a valid sheet name.
    #[must_use]
    pub fn sheet_name(self) -> &'static str {
        match self {
            Self::Hei => "HEI-2015",
            other => other.title(),
        }
    }

    /// Download file name without extension.
    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Nutrients => "nutrient_summary",
            Self::FoodGroups => "food_groups_summary",
            Self::Supplements => "supplement_summary",
            Self::SupplementIntake => "supplement_intake",
            Self::Meals => "meal_summary",
            Self::MealPattern => "meal_pattern",
            Self::FoodItems => "food_items",
            Self::Hei => "hei_2015",
        }
    }

    /// Whether per-day grouping changes this page.
    #[must_use]
    pub fn supports_grouping(self) -> bool {
        matches!(
            self,
            Self::Nutrients | Self::FoodGroups | Self::Meals | Self::Hei
        )
    }

    /// Whether the page can be restricted to one meal occasion.
    #[must_use]
    pub fn supports_occasion(self) -> bool {
        matches!(self, Self::Nutrients | Self::FoodGroups)
    }

    /// Whether the page offers a chart.
    #[must_use]
    pub fn chartable(self) -> bool {
        matches!(
            self,
            Self::Nutrients | Self::FoodGroups | Self::Meals | Self::MealPattern | Self::Hei
        )
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown report page '{0}'")]
pub struct UnknownPage(pub String);

impl FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPage(s.to_string()))
    }
}

/// Everything that determines a report's content besides the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportRequest {
    pub page: Page,
    pub filter: SubjectFilter,
    pub grouping: Grouping,
    pub occasion: Option<String>,
}

impl ReportRequest {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            page,
            filter: SubjectFilter::All,
            grouping: Grouping::default(),
            occasion: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: SubjectFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    #[must_use]
    pub fn with_occasion(mut self, occasion: Option<String>) -> Self {
        self.occasion = occasion;
        self
    }

    /// Drop parameters the page ignores, so equivalent requests compare
    /// equal.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.page.supports_grouping() {
            self.grouping = Grouping::default();
        }
        self.occasion = self
            .occasion
            .filter(|o| self.page.supports_occasion() && !o.trim().is_empty())
            .map(|o| o.trim().to_string());
        self
    }

    /// Drop selected subjects that are not in `subjects`; they never
    /// contribute rows.
    #[must_use]
    pub fn restricted_to(mut self, subjects: &BTreeSet<String>) -> Self {
        if let SubjectFilter::Only(wanted) = &mut self.filter {
            wanted.retain(|s| subjects.contains(s));
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub page: Page,
    pub title: String,
    pub grouping: Grouping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    pub table: Table,
    pub notices: Vec<Notice>,
}

/// Compute the report `request` describes.
#[must_use]
pub fn build_report(ds: &Dataset, request: &ReportRequest) -> Report {
    let request = request.clone().normalized();
    let filter = &request.filter;
    let options = SummaryOptions {
        grouping: request.grouping,
        occasion: request.occasion.clone(),
    };

    let (table, notices) = match request.page {
        Page::Nutrients => {
            let s = nutrient_summary(ds, filter, &options);
            (s.to_table(), s.notices)
        }
        Page::FoodGroups => {
            let s = food_group_summary(ds, filter, &options);
            (s.to_table(), s.notices)
        }
        Page::Supplements => {
            let s = supplement_summary(ds, filter);
            (s.to_table(), s.notices)
        }
        Page::SupplementIntake => supplement_intake(ds, filter),
        Page::Meals => {
            let s = meal_summary(ds, filter, request.grouping);
            (s.to_table(), s.notices)
        }
        Page::MealPattern => {
            let s = occasion_pattern(ds, filter);
            (s.to_table(), s.notices)
        }
        Page::FoodItems => food_items(ds, filter),
        Page::Hei => {
            let r = hei_report(ds, filter, request.grouping);
            (r.to_table(), r.notices)
        }
    };

    let title = match &request.occasion {
        Some(occasion) => format!("{} ({occasion})", request.page.title()),
        None => request.page.title().to_string(),
    };
    Report {
        page: request.page,
        title,
        grouping: request.grouping,
        occasion: request.occasion,
        table,
        notices,
    }
}
