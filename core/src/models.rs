use std::collections::BTreeSet;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Index;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A fixed, enumerated set of numeric columns read from the ASA24 files.
///
/// Every implementor lists its members in canonical display order; row values
/// are stored positionally in that order (see [`Amounts`]).
pub trait Measure: Copy + Eq + Debug + 'static {
    const ALL: &'static [Self];

    /// Column name in the ASA24 export.
    fn column(self) -> &'static str;

    /// Human-readable label with unit, used as the displayed column name.
    fn label(self) -> &'static str;

    fn index(self) -> usize;
}

macro_rules! measures {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($column:literal, $label:literal),)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $($variant,)+
        }

        impl Measure for $name {
            const ALL: &'static [Self] = &[$(Self::$variant,)+];

            fn column(self) -> &'static str {
                match self {
                    $(Self::$variant => $column,)+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            fn index(self) -> usize {
                self as usize
            }
        }
    };
}

measures! {
    /// Nutrients carried by the Totals and Items files.
    Nutrient {
        Energy => ("KCAL", "Energy (kcal)"),
        Protein => ("PROT", "Protein (g)"),
        TotalFat => ("TFAT", "Total Fat (g)"),
        Carbohydrate => ("CARB", "Carbohydrate (g)"),
        Fiber => ("FIBE", "Fiber (g)"),
        Sugar => ("SUGR", "Sugar (g)"),
        Calcium => ("CALC", "Calcium (mg)"),
        Iron => ("IRON", "Iron (mg)"),
        VitaminC => ("VC", "Vitamin C (mg)"),
        VitaminD => ("VITD", "Vitamin D (mcg)"),
        VitaminA => ("VARA", "Vitamin A (mcg)"),
        VitaminB12 => ("VB12", "Vitamin B12 (mcg)"),
        Folate => ("FOLA", "Folate (mcg)"),
        Sodium => ("SODI", "Sodium (mg)"),
        Potassium => ("POTA", "Potassium (mg)"),
        SaturatedFat => ("SFAT", "Saturated Fat (g)"),
        MonounsaturatedFat => ("MFAT", "Monounsaturated Fat (g)"),
        PolyunsaturatedFat => ("PFAT", "Polyunsaturated Fat (g)"),
    }
}

measures! {
    /// Food pattern equivalents, in canonical display order.
    FoodGroup {
        TotalFruits => ("F_TOTAL", "Total Fruits (cup eq)"),
        CitrusMelonsBerries => ("F_CITMLB", "Citrus/Melons/Berries (cup eq)"),
        OtherFruits => ("F_OTHER", "Other Fruits (cup eq)"),
        FruitJuice => ("F_JUICE", "Fruit Juice (cup eq)"),
        TotalVegetables => ("V_TOTAL", "Total Vegetables (cup eq)"),
        DarkGreenVegetables => ("V_DRKGR", "Dark Green Vegetables (cup eq)"),
        RedOrangeVegetables => ("V_REDOR_TOTAL", "Red/Orange Vegetables (cup eq)"),
        LegumesAsVegetables => ("V_LEGUMES", "Legumes as Vegetables (cup eq)"),
        TotalGrains => ("G_TOTAL", "Total Grains (oz eq)"),
        WholeGrains => ("G_WHOLE", "Whole Grains (oz eq)"),
        RefinedGrains => ("G_REFINED", "Refined Grains (oz eq)"),
        TotalProteinFoods => ("PF_TOTAL", "Total Protein Foods (oz eq)"),
        Meat => ("PF_MEAT", "Meat (oz eq)"),
        Poultry => ("PF_POULT", "Poultry (oz eq)"),
        SeafoodHighOmega3 => ("PF_SEAFD_HI", "Seafood, High n-3 (oz eq)"),
        SeafoodLowOmega3 => ("PF_SEAFD_LOW", "Seafood, Low n-3 (oz eq)"),
        Eggs => ("PF_EGGS", "Eggs (oz eq)"),
        NutsSeeds => ("PF_NUTSDS", "Nuts/Seeds (oz eq)"),
        Soy => ("PF_SOY", "Soy (oz eq)"),
        LegumesAsProtein => ("PF_LEGUMES", "Legumes as Protein (oz eq)"),
        TotalDairy => ("D_TOTAL", "Total Dairy (cup eq)"),
        Milk => ("D_MILK", "Milk (cup eq)"),
        Cheese => ("D_CHEESE", "Cheese (cup eq)"),
        AddedSugars => ("ADD_SUGARS", "Added Sugars (tsp eq)"),
        Oils => ("OILS", "Oils (g)"),
    }
}

/// One value per member of `M`, stored in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Amounts<M> {
    values: Vec<f64>,
    measure: PhantomData<M>,
}

impl<M: Measure> Amounts<M> {
    #[must_use]
    pub fn zero() -> Self {
        Self {
            values: vec![0.0; M::ALL.len()],
            measure: PhantomData,
        }
    }

    #[must_use]
    pub fn get(&self, measure: M) -> f64 {
        self.values[measure.index()]
    }

    pub fn set(&mut self, measure: M, value: f64) {
        self.values[measure.index()] = value;
    }

    pub fn add(&mut self, other: &Self) {
        for (acc, v) in self.values.iter_mut().zip(&other.values) {
            *acc += v;
        }
    }

    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            values: self.values.iter().map(|v| v * factor).collect(),
            measure: PhantomData,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (M, f64)> + '_ {
        M::ALL.iter().map(move |&m| (m, self.get(m)))
    }
}

impl<M: Measure> Default for Amounts<M> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<M: Measure> Index<M> for Amounts<M> {
    type Output = f64;

    fn index(&self, measure: M) -> &f64 {
        &self.values[measure.index()]
    }
}

impl<M: Measure> FromIterator<(M, f64)> for Amounts<M> {
    fn from_iter<I: IntoIterator<Item = (M, f64)>>(iter: I) -> Self {
        let mut amounts = Self::zero();
        for (m, v) in iter {
            amounts.set(m, v);
        }
        amounts
    }
}

/// One row of the Totals file: a subject's whole recall day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayTotals {
    pub subject: String,
    pub recall_no: u32,
    pub intake_start: Option<NaiveDateTime>,
    pub nutrients: Amounts<Nutrient>,
    pub food_groups: Amounts<FoodGroup>,
}

/// One reported food or beverage (Items file).
#[derive(Debug, Clone, PartialEq)]
pub struct FoodEntry {
    pub subject: String,
    pub recall_no: u32,
    pub occasion_no: u32,
    /// Meal occasion label; instrument codes are resolved, anything else is kept verbatim.
    pub occasion: String,
    pub food_code: String,
    pub description: String,
    pub grams: f64,
    pub nutrients: Amounts<Nutrient>,
    pub food_groups: Amounts<FoodGroup>,
}

/// One reported supplement (INS file).
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementEntry {
    pub subject: String,
    pub recall_no: u32,
    pub intake_start: Option<NaiveDateTime>,
    pub description: String,
    pub amount: f64,
    pub unit: String,
}

/// A file kept as plain text cells (Responses, TNS, TS).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTable {
    pub file_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// ASA24 meal occasion names in the order the instrument lists them.
pub const MEAL_OCCASIONS: &[&str] = &[
    "Breakfast",
    "Morning Snack",
    "Lunch",
    "Afternoon Snack",
    "Dinner",
    "Evening Snack",
    "Late Evening Snack",
    "Other Time",
];

/// Resolve an `Occ_Name` cell: numeric codes 1-8 become the instrument's
/// label, any other text is returned unchanged.
#[must_use]
pub fn occasion_label(raw: &str) -> String {
    let raw = raw.trim();
    raw.parse::<usize>()
        .ok()
        .and_then(|code| code.checked_sub(1))
        .and_then(|idx| MEAL_OCCASIONS.get(idx))
        .map_or_else(|| raw.to_string(), |label| (*label).to_string())
}

/// Sort key that puts known occasions in instrument order and anything
/// else after them, alphabetically.
#[must_use]
pub fn occasion_rank(label: &str) -> (usize, &str) {
    let idx = MEAL_OCCASIONS
        .iter()
        .position(|m| *m == label)
        .unwrap_or(MEAL_OCCASIONS.len());
    (idx, label)
}

#[must_use]
pub fn visit_label(recall_no: u32) -> String {
    format!("Visit {recall_no}")
}

/// Which subjects an aggregation covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SubjectFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl SubjectFilter {
    pub fn only<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(subjects.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn matches(&self, subject: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(subject),
        }
    }
}

/// Whether summaries collapse a subject's recall days into a mean or keep
/// one row per day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    #[default]
    PerSubject,
    PerDay,
}
