//! Healthy Eating Index 2015.
//!
//! Each component maps an energy-adjusted density onto a linear curve between
//! the intake that scores zero and the standard for the maximum score, clamped
//! at both ends. Adequacy components reward higher intake, moderation
//! components lower intake. The thirteen maxima sum to 100.

use serde::Serialize;
use tracing::warn;

use crate::aggregate::{
    DATE_COLUMN, SUBJECT_COLUMN, SummaryOptions, VISIT_COLUMN, food_group_summary, format_date,
    nutrient_summary,
};
use crate::dataset::Dataset;
use crate::error::Notice;
use crate::models::{Amounts, FoodGroup, Grouping, Nutrient, SubjectFilter, visit_label};
use crate::table::{Cell, Table};

pub const ENERGY_COLUMN: &str = "Energy (kcal)";
pub const TOTAL_COLUMN: &str = "Total HEI-2015";

/// Shape of a component's scoring curve, in the component's density unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Curve {
    /// Zero points at or below `zero_at`, full points at or above `full_at`.
    Adequacy { zero_at: f64, full_at: f64 },
    /// Full points at or below `full_at`, zero points at or above `zero_at`.
    Moderation { full_at: f64, zero_at: f64 },
}

impl Curve {
    /// Fraction of the maximum earned at `density`, in `[0, 1]`.
    #[must_use]
    pub fn fraction(self, density: f64) -> f64 {
        let (zero_at, full_at) = match self {
            Self::Adequacy { zero_at, full_at } | Self::Moderation { full_at, zero_at } => {
                (zero_at, full_at)
            }
        };
        let fraction = (density - zero_at) / (full_at - zero_at);
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Component {
    TotalFruits,
    WholeFruits,
    TotalVegetables,
    GreensAndBeans,
    WholeGrains,
    Dairy,
    TotalProteinFoods,
    SeafoodPlantProteins,
    FattyAcids,
    RefinedGrains,
    Sodium,
    AddedSugars,
    SaturatedFats,
}

impl Component {
    pub const ALL: [Self; 13] = [
        Self::TotalFruits,
        Self::WholeFruits,
        Self::TotalVegetables,
        Self::GreensAndBeans,
        Self::WholeGrains,
        Self::Dairy,
        Self::TotalProteinFoods,
        Self::SeafoodPlantProteins,
        Self::FattyAcids,
        Self::RefinedGrains,
        Self::Sodium,
        Self::AddedSugars,
        Self::SaturatedFats,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TotalFruits => "Total Fruits",
            Self::WholeFruits => "Whole Fruits",
            Self::TotalVegetables => "Total Vegetables",
            Self::GreensAndBeans => "Greens and Beans",
            Self::WholeGrains => "Whole Grains",
            Self::Dairy => "Dairy",
            Self::TotalProteinFoods => "Total Protein Foods",
            Self::SeafoodPlantProteins => "Seafood and Plant Proteins",
            Self::FattyAcids => "Fatty Acids",
            Self::RefinedGrains => "Refined Grains",
            Self::Sodium => "Sodium",
            Self::AddedSugars => "Added Sugars",
            Self::SaturatedFats => "Saturated Fats",
        }
    }

    #[must_use]
    pub fn max_points(self) -> f64 {
        match self {
            Self::TotalFruits
            | Self::WholeFruits
            | Self::TotalVegetables
            | Self::GreensAndBeans
            | Self::TotalProteinFoods
            | Self::SeafoodPlantProteins => 5.0,
            Self::WholeGrains
            | Self::Dairy
            | Self::FattyAcids
            | Self::RefinedGrains
            | Self::Sodium
            | Self::AddedSugars
            | Self::SaturatedFats => 10.0,
        }
    }

    #[must_use]
    pub fn curve(self) -> Curve {
        let adequacy = |full_at| Curve::Adequacy {
            zero_at: 0.0,
            full_at,
        };
        match self {
            Self::TotalFruits | Self::SeafoodPlantProteins => adequacy(0.8),
            Self::WholeFruits => adequacy(0.4),
            Self::TotalVegetables => adequacy(1.1),
            Self::GreensAndBeans => adequacy(0.2),
            Self::WholeGrains => adequacy(1.5),
            Self::Dairy => adequacy(1.3),
            Self::TotalProteinFoods => adequacy(2.5),
            Self::FattyAcids => Curve::Adequacy {
                zero_at: 1.2,
                full_at: 2.5,
            },
            Self::RefinedGrains => Curve::Moderation {
                full_at: 1.8,
                zero_at: 4.3,
            },
            Self::Sodium => Curve::Moderation {
                full_at: 1.1,
                zero_at: 2.0,
            },
            Self::AddedSugars => Curve::Moderation {
                full_at: 6.5,
                zero_at: 26.0,
            },
            Self::SaturatedFats => Curve::Moderation {
                full_at: 8.0,
                zero_at: 16.0,
            },
        }
    }

    /// Unit the density is expressed in.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::TotalFruits
            | Self::WholeFruits
            | Self::TotalVegetables
            | Self::GreensAndBeans
            | Self::Dairy => "cup eq per 1,000 kcal",
            Self::WholeGrains
            | Self::RefinedGrains
            | Self::TotalProteinFoods
            | Self::SeafoodPlantProteins => "oz eq per 1,000 kcal",
            Self::FattyAcids => "(MUFA + PUFA) / SFA",
            Self::Sodium => "g per 1,000 kcal",
            Self::AddedSugars | Self::SaturatedFats => "% of energy",
        }
    }

    fn density(self, n: &Amounts<Nutrient>, g: &Amounts<FoodGroup>) -> f64 {
        let per_1000 = |amount: f64| amount / n[Nutrient::Energy] * 1000.0;
        let percent_energy = |kcal: f64| kcal / n[Nutrient::Energy] * 100.0;
        match self {
            Self::TotalFruits => per_1000(g[FoodGroup::TotalFruits]),
            Self::WholeFruits => {
                per_1000(g[FoodGroup::CitrusMelonsBerries] + g[FoodGroup::OtherFruits])
            }
            Self::TotalVegetables => {
                per_1000(g[FoodGroup::TotalVegetables] + g[FoodGroup::LegumesAsVegetables])
            }
            Self::GreensAndBeans => {
                per_1000(g[FoodGroup::DarkGreenVegetables] + g[FoodGroup::LegumesAsVegetables])
            }
            Self::WholeGrains => per_1000(g[FoodGroup::WholeGrains]),
            Self::Dairy => per_1000(g[FoodGroup::TotalDairy]),
            Self::TotalProteinFoods => {
                per_1000(g[FoodGroup::TotalProteinFoods] + g[FoodGroup::LegumesAsProtein])
            }
            Self::SeafoodPlantProteins => per_1000(
                g[FoodGroup::SeafoodHighOmega3]
                    + g[FoodGroup::SeafoodLowOmega3]
                    + g[FoodGroup::NutsSeeds]
                    + g[FoodGroup::Soy]
                    + g[FoodGroup::LegumesAsProtein],
            ),
            Self::FattyAcids => {
                let unsaturated =
                    n[Nutrient::MonounsaturatedFat] + n[Nutrient::PolyunsaturatedFat];
                let saturated = n[Nutrient::SaturatedFat];
                // no saturated fat earns full points, whatever the unsaturated intake
                if saturated > 0.0 {
                    unsaturated / saturated
                } else {
                    f64::INFINITY
                }
            }
            Self::RefinedGrains => per_1000(g[FoodGroup::RefinedGrains]),
            Self::Sodium => per_1000(n[Nutrient::Sodium] / 1000.0),
            // 1 tsp eq of added sugars is 4 g at 4 kcal/g
            Self::AddedSugars => percent_energy(g[FoodGroup::AddedSugars] * 16.0),
            Self::SaturatedFats => percent_energy(n[Nutrient::SaturatedFat] * 9.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScore {
    pub component: Component,
    pub density: f64,
    pub score: f64,
}

/// Scores for one unit: a subject's mean day, or one recall day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeiScore {
    pub subject: String,
    pub recall_no: Option<u32>,
    pub energy_kcal: f64,
    pub components: Vec<ComponentScore>,
    pub total: f64,
}

/// Score one unit of intake. Returns `None` when there is no energy to
/// adjust against.
#[must_use]
pub fn score(
    nutrients: &Amounts<Nutrient>,
    groups: &Amounts<FoodGroup>,
) -> Option<Vec<ComponentScore>> {
    let energy = nutrients[Nutrient::Energy];
    if !energy.is_finite() || energy <= 0.0 {
        return None;
    }
    Some(
        Component::ALL
            .iter()
            .map(|&component| {
                let density = component.density(nutrients, groups);
                ComponentScore {
                    component,
                    density,
                    score: component.max_points() * component.curve().fraction(density),
                }
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeiReport {
    pub grouping: Grouping,
    pub scores: Vec<HeiScore>,
    /// Intake dates of per-day units, parallel to `scores`.
    dates: Vec<Option<String>>,
    pub notices: Vec<Notice>,
}

impl HeiReport {
    #[must_use]
    pub fn to_table(&self) -> Table {
        let mut columns = vec![SUBJECT_COLUMN];
        if self.grouping == Grouping::PerDay {
            columns.extend([VISIT_COLUMN, DATE_COLUMN]);
        }
        columns.push(ENERGY_COLUMN);
        columns.extend(Component::ALL.iter().map(|c| c.label()));
        columns.push(TOTAL_COLUMN);

        let mut table = Table::new(columns);
        for (s, date) in self.scores.iter().zip(&self.dates) {
            let mut cells = vec![Cell::from(s.subject.as_str())];
            if self.grouping == Grouping::PerDay {
                cells.push(s.recall_no.map(visit_label).into());
                cells.push(date.clone().into());
            }
            cells.push(s.energy_kcal.into());
            cells.extend(s.components.iter().map(|c| Cell::from(c.score)));
            cells.push(s.total.into());
            table.push_row(cells);
        }
        table
    }
}

/// HEI-2015 per subject (scored on the mean of their recall days) or per
/// recall day. Units without energy are skipped with a notice.
#[must_use]
pub fn hei_report(ds: &Dataset, filter: &SubjectFilter, grouping: Grouping) -> HeiReport {
    let options = SummaryOptions {
        grouping,
        occasion: None,
    };
    let nutrients = nutrient_summary(ds, filter, &options);
    let groups = food_group_summary(ds, filter, &options);

    let mut report = HeiReport {
        grouping,
        scores: Vec::new(),
        dates: Vec::new(),
        notices: nutrients.notices.clone(),
    };
    for (n, g) in nutrients.rows.iter().zip(&groups.rows) {
        debug_assert_eq!((&n.subject, n.recall_no), (&g.subject, g.recall_no));
        let Some(components) = score(&n.amounts, &g.amounts) else {
            warn!(subject = %n.subject, recall_no = ?n.recall_no, "Skipping HEI-2015: no energy");
            report
                .notices
                .push(Notice::scoring_skipped(&n.subject, n.recall_no));
            continue;
        };
        let total = components.iter().map(|c| c.score).sum();
        report.scores.push(HeiScore {
            subject: n.subject.clone(),
            recall_no: n.recall_no,
            energy_kcal: n.amounts[Nutrient::Energy],
            components,
            total,
        });
        report.dates.push(n.intake_start.as_ref().map(format_date));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoticeKind;
    use crate::testing;

    fn amounts<M: crate::models::Measure>(values: &[(M, f64)]) -> Amounts<M> {
        values.iter().copied().collect()
    }

    fn points(scores: &[ComponentScore], component: Component) -> f64 {
        scores
            .iter()
            .find(|c| c.component == component)
            .unwrap()
            .score
    }

    #[test]
    fn test_maxima_sum_to_100() {
        let max: f64 = Component::ALL.iter().map(|c| c.max_points()).sum();
        assert!((max - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_curve_clamps_and_interpolates() {
        let fruit = Component::TotalFruits.curve();
        assert!(fruit.fraction(-1.0).abs() < f64::EPSILON);
        assert!((fruit.fraction(0.4) - 0.5).abs() < 1e-12);
        assert!((fruit.fraction(3.0) - 1.0).abs() < f64::EPSILON);

        let sodium = Component::Sodium.curve();
        assert!((sodium.fraction(1.0) - 1.0).abs() < f64::EPSILON);
        assert!((sodium.fraction(1.55) - 0.5).abs() < 1e-12);
        assert!(sodium.fraction(2.5).abs() < f64::EPSILON);
        assert!(sodium.fraction(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ideal_day_scores_100() {
        let n = amounts(&[
            (Nutrient::Energy, 1000.0),
            (Nutrient::MonounsaturatedFat, 15.0),
            (Nutrient::PolyunsaturatedFat, 10.0),
            (Nutrient::SaturatedFat, 8.0),
        ]);
        let g = amounts(&[
            (FoodGroup::TotalFruits, 0.8),
            (FoodGroup::CitrusMelonsBerries, 0.4),
            (FoodGroup::TotalVegetables, 1.1),
            (FoodGroup::DarkGreenVegetables, 0.2),
            (FoodGroup::WholeGrains, 1.5),
            (FoodGroup::TotalDairy, 1.3),
            (FoodGroup::TotalProteinFoods, 2.5),
            (FoodGroup::SeafoodHighOmega3, 0.8),
        ]);
        let scores = score(&n, &g).unwrap();
        let total: f64 = scores.iter().map(|c| c.score).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_day_earns_moderation_and_fatty_acid_points() {
        let n = amounts(&[(Nutrient::Energy, 1000.0)]);
        let scores = score(&n, &Amounts::zero()).unwrap();
        let total: f64 = scores.iter().map(|c| c.score).sum();
        // four moderation components plus fatty acids with no saturated fat
        assert!((total - 50.0).abs() < 1e-9);
        assert!((points(&scores, Component::FattyAcids) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_saturated_fat_scores_full_fatty_acids() {
        let n = amounts(&[
            (Nutrient::Energy, 2000.0),
            (Nutrient::MonounsaturatedFat, 15.0),
        ]);
        let scores = score(&n, &Amounts::zero()).unwrap();
        assert!((points(&scores, Component::FattyAcids) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_densities_and_partial_scores() {
        let n = amounts(&[
            (Nutrient::Energy, 2000.0),
            (Nutrient::Sodium, 3100.0),
            (Nutrient::SaturatedFat, 26.666_666_666_666_668),
            (Nutrient::MonounsaturatedFat, 20.0),
            (Nutrient::PolyunsaturatedFat, 0.0),
        ]);
        let g = amounts(&[
            (FoodGroup::TotalFruits, 0.8),
            (FoodGroup::LegumesAsVegetables, 0.2),
            (FoodGroup::AddedSugars, 20.3125),
        ]);
        let scores = score(&n, &g).unwrap();
        // 0.4 cup eq per 1,000 kcal is half the standard
        assert!((points(&scores, Component::TotalFruits) - 2.5).abs() < 1e-9);
        // legumes count towards vegetables and greens and beans
        assert!((points(&scores, Component::GreensAndBeans) - 2.5).abs() < 1e-9);
        assert!((points(&scores, Component::TotalVegetables) - 5.0 / 11.0).abs() < 1e-9);
        // 1.55 g sodium per 1,000 kcal
        assert!((points(&scores, Component::Sodium) - 5.0).abs() < 1e-9);
        // 12 % of energy from saturated fat
        assert!((points(&scores, Component::SaturatedFats) - 5.0).abs() < 1e-9);
        // 16.25 % of energy from added sugars
        assert!((points(&scores, Component::AddedSugars) - 5.0).abs() < 1e-9);
        // ratio 0.75 is below the zero point
        assert!(points(&scores, Component::FattyAcids).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_energy_is_not_scored() {
        assert!(score(&Amounts::zero(), &Amounts::zero()).is_none());
    }

    #[test]
    fn test_report_totals_match_component_sums() {
        let ds = testing::standard_dataset();
        for grouping in [Grouping::PerSubject, Grouping::PerDay] {
            let report = hei_report(&ds, &SubjectFilter::All, grouping);
            assert!(!report.scores.is_empty());
            for s in &report.scores {
                assert!((0.0..=100.0).contains(&s.total));
                assert_eq!(s.components.len(), 13);
                let sum: f64 = s.components.iter().map(|c| c.score).sum();
                assert_eq!(sum.to_bits(), s.total.to_bits());
            }
        }
    }

    #[test]
    fn test_subject_without_energy_is_skipped() {
        let ds = testing::standard_dataset();
        let report = hei_report(&ds, &SubjectFilter::All, Grouping::PerSubject);
        let subjects: Vec<&str> = report.scores.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["test_user1", "test_user2"]);

        let skipped: Vec<&Notice> = report
            .notices
            .iter()
            .filter(|n| n.kind == NoticeKind::ScoringSkipped)
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].subject.as_deref(), Some("test_user3"));
    }

    #[test]
    fn test_zero_energy_day_skips_only_that_day() {
        let ds = Dataset::from_records(
            vec![testing::day("u1", 1, 1800.0), testing::day("u1", 2, 0.0)],
            vec![],
            vec![],
        );
        let report = hei_report(&ds, &SubjectFilter::All, Grouping::PerDay);
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].recall_no, Some(1));
        assert_eq!(report.notices, vec![Notice::scoring_skipped("u1", Some(2))]);
    }

    #[test]
    fn test_table_layout() {
        let ds = testing::standard_dataset();
        let table = hei_report(&ds, &SubjectFilter::only(["test_user1"]), Grouping::PerDay)
            .to_table();
        assert_eq!(table.columns().len(), 3 + 1 + 13 + 1);
        assert_eq!(table.columns().last().map(String::as_str), Some(TOTAL_COLUMN));
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][2], Cell::from("2024-01-15"));
        assert!(table.validate().is_ok());
    }
}
