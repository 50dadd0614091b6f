use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use asa24_core::glossary::glossary;
use asa24_core::report::Page;

#[derive(Tabled)]
struct EntryRow<'a> {
    #[tabled(rename = "Term")]
    term: &'a str,
    #[tabled(rename = "Meaning")]
    meaning: &'a str,
}

pub(crate) fn cmd_glossary(page: Page, json: bool) -> Result<()> {
    let sections = glossary(page);

    if json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
        return Ok(());
    }

    for section in &sections {
        println!("=== {} ===", section.title);
        let rows: Vec<EntryRow> = section
            .entries
            .iter()
            .map(|e| EntryRow {
                term: &e.term,
                meaning: &e.meaning,
            })
            .collect();
        println!("{}\n", Table::new(rows).with(Style::rounded()));
    }
    Ok(())
}
