use anyhow::{Result, bail};
use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Columns},
};

use asa24_core::error::Notice;
use asa24_core::models::{Grouping, SubjectFilter};
use asa24_core::report::{Page, ReportRequest};
use asa24_core::table::{Cell, Table};

/// Selection flags shared by every report command.
pub(crate) struct Selection {
    pub subjects: Vec<String>,
    pub per_day: bool,
    pub meal: Option<String>,
}

impl Selection {
    /// Build the request for `page`, rejecting flags the page does not take.
    pub(crate) fn request(self, page: Page) -> Result<ReportRequest> {
        if self.per_day && !page.supports_grouping() {
            bail!("--per-day is not available for {page}");
        }
        if self.meal.is_some() && !page.supports_occasion() {
            bail!("--meal is only available for nutrients and food-groups");
        }
        let filter = if self.subjects.is_empty() {
            SubjectFilter::All
        } else {
            SubjectFilter::only(self.subjects)
        };
        let grouping = if self.per_day {
            Grouping::PerDay
        } else {
            Grouping::PerSubject
        };
        Ok(ReportRequest::new(page)
            .with_filter(filter)
            .with_grouping(grouping)
            .with_occasion(self.meal))
    }
}

/// Render a report table for the terminal, numbers right-aligned.
pub(crate) fn render_table(table: &Table) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());
    for row in table.rows() {
        builder.push_record(row.iter().map(ToString::to_string));
    }
    let mut rendered = builder.build();
    rendered.with(Style::rounded());
    for idx in 0..table.columns().len() {
        if table
            .column(idx)
            .any(|c| matches!(c, Cell::Integer(_) | Cell::Number(_)))
        {
            rendered.with(Modify::new(Columns::single(idx)).with(Alignment::right()));
        }
    }
    rendered.to_string()
}

pub(crate) fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("Note: {notice}");
    }
}
