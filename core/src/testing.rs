//! Fixture builders shared by the unit tests.

use std::fmt::Write as _;

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::dataset::Dataset;
use crate::loader::load_dir;
use crate::models::{Amounts, DayTotals, FoodGroup, Measure, Nutrient};

const TOTALS_KEYS: &str = "UserName,RecallNo,IntakeStartDateTime";
const ITEMS_KEYS: &str = "UserName,RecallNo,Occ_No,Occ_Name,FoodCode,Food_Description,FoodAmt";
const INS_HEADER: &str =
    "UserName,RecallNo,IntakeStartDateTime,Suppl_Description,SupplAmount,SupplUnit";

/// Every nutrient then every food group column, comma separated.
pub fn measure_header() -> String {
    Nutrient::ALL
        .iter()
        .map(|m| m.column())
        .chain(FoodGroup::ALL.iter().map(|g| g.column()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Cells for [`measure_header`]; columns not named in `values` are zero.
pub fn measure_cells(values: &[(&str, f64)]) -> String {
    let lookup = |column: &str| {
        values
            .iter()
            .find(|(c, _)| *c == column)
            .map_or(0.0, |(_, v)| *v)
    };
    Nutrient::ALL
        .iter()
        .map(|m| m.column())
        .chain(FoodGroup::ALL.iter().map(|g| g.column()))
        .map(|c| format!("{}", lookup(c)))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn totals_line(subject: &str, recall_no: u32, start: &str, values: &[(&str, f64)]) -> String {
    format!("{subject},{recall_no},{start},{}", measure_cells(values))
}

pub fn totals_csv<S: AsRef<str>>(lines: &[S]) -> String {
    csv_text(&format!("{TOTALS_KEYS},{}", measure_header()), lines)
}

#[allow(clippy::too_many_arguments)]
pub fn items_line(
    subject: &str,
    recall_no: u32,
    occasion_no: u32,
    occasion: &str,
    food_code: &str,
    description: &str,
    grams: f64,
    values: &[(&str, f64)],
) -> String {
    format!(
        "{subject},{recall_no},{occasion_no},{occasion},{food_code},{description},{grams},{}",
        measure_cells(values)
    )
}

pub fn items_csv<S: AsRef<str>>(lines: &[S]) -> String {
    csv_text(&format!("{ITEMS_KEYS},{}", measure_header()), lines)
}

pub fn ins_csv<S: AsRef<str>>(lines: &[S]) -> String {
    csv_text(INS_HEADER, lines)
}

fn csv_text<S: AsRef<str>>(header: &str, lines: &[S]) -> String {
    let mut out = String::from(header);
    out.push('\n');
    for line in lines {
        let _ = writeln!(out, "{}", line.as_ref());
    }
    out
}

/// Write `files` into a fresh temporary directory.
pub fn write_dir(files: &[(&str, String)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

fn standard_totals() -> String {
    totals_csv(&[
        totals_line(
            "test_user1",
            1,
            "2024-01-15 08:00:00",
            &[
                ("KCAL", 2000.0),
                ("PROT", 75.0),
                ("TFAT", 65.0),
                ("CARB", 250.0),
                ("FIBE", 25.0),
                ("SUGR", 90.0),
                ("CALC", 1000.0),
                ("IRON", 14.0),
                ("VC", 90.0),
                ("SODI", 2300.0),
                ("SFAT", 20.0),
                ("MFAT", 25.0),
                ("PFAT", 15.0),
                ("F_TOTAL", 2.0),
                ("F_CITMLB", 1.0),
                ("F_OTHER", 0.5),
                ("F_JUICE", 0.5),
                ("V_TOTAL", 2.5),
                ("V_DRKGR", 0.4),
                ("V_REDOR_TOTAL", 1.0),
                ("V_LEGUMES", 0.2),
                ("G_TOTAL", 6.0),
                ("G_WHOLE", 3.0),
                ("G_REFINED", 3.0),
                ("PF_TOTAL", 6.0),
                ("PF_MEAT", 2.0),
                ("PF_SEAFD_HI", 2.0),
                ("PF_NUTSDS", 1.0),
                ("PF_EGGS", 1.0),
                ("D_TOTAL", 2.5),
                ("D_MILK", 2.0),
                ("D_CHEESE", 0.5),
                ("ADD_SUGARS", 8.0),
                ("OILS", 20.0),
            ],
        ),
        totals_line(
            "test_user1",
            2,
            "2024-01-22 12:00:00",
            &[
                ("KCAL", 1800.0),
                ("PROT", 60.0),
                ("TFAT", 70.0),
                ("CARB", 220.0),
                ("FIBE", 12.0),
                ("SODI", 3600.0),
                ("SFAT", 28.0),
                ("MFAT", 22.0),
                ("PFAT", 10.0),
                ("F_TOTAL", 0.5),
                ("F_JUICE", 0.5),
                ("V_TOTAL", 1.0),
                ("G_TOTAL", 7.0),
                ("G_WHOLE", 0.5),
                ("G_REFINED", 6.5),
                ("PF_TOTAL", 5.0),
                ("PF_MEAT", 4.0),
                ("PF_EGGS", 1.0),
                ("D_TOTAL", 1.0),
                ("D_CHEESE", 1.0),
                ("ADD_SUGARS", 18.0),
                ("OILS", 10.0),
            ],
        ),
        totals_line(
            "test_user2",
            1,
            "2024-01-16 07:30:00",
            &[
                ("KCAL", 2200.0),
                ("PROT", 90.0),
                ("TFAT", 80.0),
                ("CARB", 260.0),
                ("FIBE", 20.0),
                ("SODI", 3000.0),
                ("SFAT", 25.0),
                ("MFAT", 30.0),
                ("PFAT", 18.0),
                ("F_TOTAL", 1.5),
                ("F_OTHER", 1.5),
                ("V_TOTAL", 2.0),
                ("V_REDOR_TOTAL", 1.2),
                ("G_TOTAL", 6.0),
                ("G_WHOLE", 1.0),
                ("G_REFINED", 5.0),
                ("PF_TOTAL", 8.0),
                ("PF_MEAT", 8.0),
                ("D_TOTAL", 1.5),
                ("D_MILK", 1.5),
                ("ADD_SUGARS", 12.0),
                ("OILS", 25.0),
            ],
        ),
    ])
}

fn standard_items() -> String {
    items_csv(&[
        items_line("test_user1", 1, 1, "1", "56205000", "Oatmeal", 240.0, &[("KCAL", 150.0), ("PROT", 5.0), ("CARB", 27.0), ("G_WHOLE", 1.5), ("G_TOTAL", 1.5)]),
        items_line("test_user1", 1, 1, "1", "11111000", "Milk", 244.0, &[("KCAL", 105.0), ("PROT", 8.0), ("TFAT", 2.5), ("D_TOTAL", 1.0), ("D_MILK", 1.0)]),
        items_line("test_user1", 1, 2, "3", "27520300", "Sandwich", 200.0, &[("KCAL", 450.0), ("PROT", 25.0), ("TFAT", 18.0), ("CARB", 45.0), ("G_REFINED", 2.0), ("G_TOTAL", 2.0)]),
        items_line("test_user1", 1, 2, "3", "63101000", "Apple", 180.0, &[("KCAL", 95.0), ("CARB", 25.0), ("F_TOTAL", 1.0), ("F_OTHER", 1.0)]),
        items_line("test_user1", 1, 3, "5", "26137100", "Salmon", 170.0, &[("KCAL", 400.0), ("PROT", 35.0), ("TFAT", 22.0), ("PF_TOTAL", 6.0), ("PF_SEAFD_HI", 6.0)]),
        items_line("test_user1", 1, 3, "5", "56205110", "Rice", 158.0, &[("KCAL", 200.0), ("PROT", 4.0), ("CARB", 45.0), ("G_REFINED", 2.0), ("G_TOTAL", 2.0)]),
        items_line("test_user1", 2, 1, "1", "31105000", "Eggs", 100.0, &[("KCAL", 180.0), ("PROT", 12.0), ("TFAT", 14.0), ("PF_EGGS", 2.0), ("PF_TOTAL", 2.0)]),
        items_line("test_user1", 2, 2, "3", "75145000", "Salad", 250.0, &[("KCAL", 300.0), ("PROT", 6.0), ("TFAT", 20.0), ("V_TOTAL", 1.0), ("V_DRKGR", 0.5)]),
        items_line("test_user1", 2, 3, "5", "58146110", "Pasta", 350.0, &[("KCAL", 600.0), ("PROT", 20.0), ("TFAT", 15.0), ("CARB", 90.0), ("G_REFINED", 4.0), ("G_TOTAL", 4.0)]),
        items_line("test_user1", 2, 3, "5", "51101000", "Bread", 56.0, &[("KCAL", 150.0), ("PROT", 5.0), ("CARB", 28.0), ("G_REFINED", 2.0), ("G_TOTAL", 2.0)]),
        items_line("test_user2", 1, 1, "1", "57123000", "Cereal", 60.0, &[("KCAL", 200.0), ("PROT", 4.0), ("CARB", 44.0), ("G_WHOLE", 1.0), ("G_TOTAL", 1.0)]),
        items_line("test_user2", 1, 1, "1", "63107010", "Banana", 118.0, &[("KCAL", 105.0), ("CARB", 27.0), ("F_TOTAL", 1.0), ("F_OTHER", 1.0)]),
        items_line("test_user2", 1, 2, "3", "75649110", "Soup", 245.0, &[("KCAL", 250.0), ("PROT", 10.0), ("TFAT", 8.0), ("V_TOTAL", 1.0), ("V_REDOR_TOTAL", 0.7)]),
        items_line("test_user2", 1, 3, "5", "21001000", "Steak", 200.0, &[("KCAL", 500.0), ("PROT", 50.0), ("TFAT", 30.0), ("PF_MEAT", 7.0), ("PF_TOTAL", 7.0)]),
        items_line("test_user2", 1, 3, "5", "71000100", "Potato", 173.0, &[("KCAL", 160.0), ("PROT", 4.0), ("CARB", 37.0), ("V_TOTAL", 1.0)]),
    ])
}

fn standard_ins() -> String {
    ins_csv(&[
        "test_user1,1,2024-01-15 08:00:00,Vitamin D,1000,IU",
        "test_user1,1,2024-01-15 08:00:00,Fish Oil,1000,mg",
        "test_user1,2,2024-01-22 12:00:00,Vitamin D,25,mcg",
        "test_user1,2,2024-01-22 12:00:00,Vitamin D,1000,IU",
        "test_user2,1,2024-01-16 07:30:00,Multivitamin,1,tablet",
        "test_user2,1,2024-01-16 07:30:00,Vitamin C,500,mg",
    ])
}

/// A complete six-file ASA24 directory: two subjects with dietary data and
/// a third who only answered the questionnaire.
pub fn standard_dir() -> TempDir {
    write_dir(&[
        ("Study_2024_Totals.csv", standard_totals()),
        ("Study_2024_Items.csv", standard_items()),
        ("Study_2024_INS.csv", standard_ins()),
        (
            "Study_2024_Responses.csv",
            "UserName,RecallNo,Question,Answer\n\
             test_user1,1,Usual intake,Yes\n\
             test_user2,1,Usual intake,No\n\
             test_user3,1,Usual intake,Yes\n"
                .to_string(),
        ),
        (
            "Study_2024_TNS.csv",
            "UserName,RecallNo,KCAL\ntest_user1,1,0\ntest_user2,1,0\n".to_string(),
        ),
        (
            "Study_2024_TS.csv",
            "UserName,RecallNo,KCAL\ntest_user1,1,2000\ntest_user1,2,1800\ntest_user2,1,2200\n"
                .to_string(),
        ),
    ])
}

pub fn standard_dataset() -> Dataset {
    let dir = standard_dir();
    load_dir(dir.path()).unwrap()
}

/// A Totals row with only energy set.
pub fn day(subject: &str, recall_no: u32, kcal: f64) -> DayTotals {
    DayTotals {
        subject: subject.to_string(),
        recall_no,
        intake_start: NaiveDate::from_ymd_opt(2024, 1, 14 + recall_no)
            .and_then(|d| d.and_hms_opt(8, 0, 0)),
        nutrients: [(Nutrient::Energy, kcal)].into_iter().collect(),
        food_groups: Amounts::zero(),
    }
}
