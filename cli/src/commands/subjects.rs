use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use asa24_core::service::Session;

#[derive(Serialize, Tabled)]
struct SubjectRow {
    #[tabled(rename = "UserName")]
    subject: String,
    #[tabled(rename = "Recall Days")]
    recall_days: usize,
    #[tabled(rename = "Food Items")]
    food_items: usize,
    #[tabled(rename = "Supplements")]
    supplements: usize,
}

fn subject_rows(session: &Session) -> Result<Vec<SubjectRow>> {
    let ds = session.dataset()?;
    Ok(ds
        .subjects()
        .iter()
        .map(|subject| SubjectRow {
            subject: subject.clone(),
            recall_days: ds.day_count(subject),
            food_items: ds.items().iter().filter(|e| &e.subject == subject).count(),
            supplements: ds
                .supplements()
                .iter()
                .filter(|e| &e.subject == subject)
                .count(),
        })
        .collect())
}

pub(crate) fn cmd_subjects(session: &Session, json: bool) -> Result<()> {
    let rows = subject_rows(session)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let ds = session.dataset()?;
    println!("{} subjects in {}\n", rows.len(), ds.directory().display());
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
