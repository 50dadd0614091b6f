use anyhow::Result;

use asa24_core::report::Page;
use asa24_core::service::Session;

use super::helpers::{Selection, print_notices, render_table};

pub(crate) fn cmd_report(
    session: &mut Session,
    page: Page,
    selection: Selection,
    json: bool,
) -> Result<()> {
    let request = selection.request(page)?;
    let report = session.report(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*report)?);
        return Ok(());
    }

    println!("=== {} ===\n", report.title);
    if report.table.is_empty() {
        println!("  (no rows)");
    } else {
        println!("{}", render_table(&report.table));
    }
    print_notices(&report.notices);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::loaded_session;

    fn selection(subjects: &[&str], per_day: bool) -> Selection {
        Selection {
            subjects: subjects.iter().map(ToString::to_string).collect(),
            per_day,
            meal: None,
        }
    }

    #[test]
    fn test_every_page_prints() {
        let (mut session, _dir) = loaded_session();
        for page in Page::ALL {
            cmd_report(&mut session, page, selection(&[], false), false).unwrap();
            cmd_report(&mut session, page, selection(&["u1"], false), true).unwrap();
        }
    }

    #[test]
    fn test_rejected_flag_is_an_error() {
        let (mut session, _dir) = loaded_session();
        let err = cmd_report(&mut session, Page::FoodItems, selection(&[], true), false)
            .unwrap_err();
        assert!(err.to_string().contains("--per-day"));
    }

    #[test]
    fn test_reports_are_shared_through_the_session() {
        let (mut session, _dir) = loaded_session();
        cmd_report(&mut session, Page::Hei, selection(&[], true), false).unwrap();
        cmd_report(&mut session, Page::Hei, selection(&[], true), true).unwrap();
        assert_eq!(session.cached_reports(), 1);
    }
}
