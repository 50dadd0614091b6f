//! A small ASA24 export on disk for command and router tests.

use asa24_core::models::{FoodGroup, Measure, Nutrient};
use asa24_core::service::Session;
use tempfile::TempDir;

fn measure_header() -> String {
    Nutrient::ALL
        .iter()
        .map(|m| m.column())
        .chain(FoodGroup::ALL.iter().map(|g| g.column()))
        .collect::<Vec<_>>()
        .join(",")
}

/// `kcal` in the first measure column, zero everywhere else.
fn measure_cells(kcal: f64) -> String {
    let zeros = Nutrient::ALL.len() + FoodGroup::ALL.len() - 1;
    format!("{kcal}{}", ",0".repeat(zeros))
}

/// Two subjects: u1 with two recalls (2000 and 1800 kcal), u2 with one
/// (2200 kcal) and no supplements.
pub fn write_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let header = measure_header();
    let totals = format!(
        "UserName,RecallNo,IntakeStartDateTime,{header}\n\
         u1,1,2024-01-15 08:00:00,{}\n\
         u1,2,2024-01-22 08:00:00,{}\n\
         u2,1,2024-01-16 08:00:00,{}\n",
        measure_cells(2000.0),
        measure_cells(1800.0),
        measure_cells(2200.0),
    );
    let items = format!(
        "UserName,RecallNo,Occ_No,Occ_Name,FoodCode,Food_Description,FoodAmt,{header}\n\
         u1,1,1,1,11,Oatmeal,240,{}\n\
         u1,1,5,5,12,Pasta,300,{}\n\
         u1,2,3,3,13,Salad,150,{}\n\
         u2,1,5,5,14,Steak,200,{}\n",
        measure_cells(500.0),
        measure_cells(1500.0),
        measure_cells(1800.0),
        measure_cells(2200.0),
    );
    let ins = "UserName,RecallNo,IntakeStartDateTime,Suppl_Description,SupplAmount,SupplUnit\n\
               u1,1,2024-01-15 08:00:00,Vitamin D,1000,IU\n";
    std::fs::write(dir.path().join("Study_Totals.csv"), totals).unwrap();
    std::fs::write(dir.path().join("Study_Items.csv"), items).unwrap();
    std::fs::write(dir.path().join("Study_INS.csv"), ins).unwrap();
    for table in ["Responses", "TNS", "TS"] {
        std::fs::write(
            dir.path().join(format!("Study_{table}.csv")),
            "UserName,RecallNo\nu1,1\nu2,1\n",
        )
        .unwrap();
    }
    dir
}

/// A session with [`write_fixture`] loaded. Keep the directory alive for as
/// long as the session is used.
pub fn loaded_session() -> (Session, TempDir) {
    let dir = write_fixture();
    let mut session = Session::new();
    session.load(dir.path()).unwrap();
    (session, dir)
}
