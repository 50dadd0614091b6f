use std::fmt;
use std::str::FromStr;

use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ExportError;
use crate::table::{Cell, Table};

const SHEET_NAME_MAX: usize = 31;
const SHEET_NAME_FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
#[error("unknown export format '{0}' (expected xlsx or csv)")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Serialize `table` in `format`.
pub fn export(table: &Table, sheet: &str, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Xlsx => to_xlsx(table, sheet),
        ExportFormat::Csv => to_csv(table),
    }
}

/// Write `table` as a single-sheet workbook. The header row is the table's
/// column names verbatim, in order.
#[allow(clippy::cast_precision_loss)]
pub fn to_xlsx(table: &Table, sheet: &str) -> Result<Vec<u8>, ExportError> {
    table.validate()?;
    if sheet.is_empty()
        || sheet.chars().count() > SHEET_NAME_MAX
        || sheet.contains(SHEET_NAME_FORBIDDEN)
    {
        return Err(ExportError::SheetName(sheet.to_string()));
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col_num(col), name, &header)?;
    }
    for (i, row) in table.rows().iter().enumerate() {
        let r = RowNum::try_from(i + 1).unwrap_or(RowNum::MAX);
        for (col, cell) in row.iter().enumerate() {
            let c = col_num(col);
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                Cell::Integer(n) => {
                    worksheet.write_number(r, c, *n as f64)?;
                }
                Cell::Number(v) => {
                    worksheet.write_number(r, c, *v)?;
                }
                Cell::Empty => {}
            }
        }
    }
    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

fn col_num(col: usize) -> ColNum {
    ColNum::try_from(col).unwrap_or(ColNum::MAX)
}

/// Write `table` as CSV with a header row. Numbers keep full precision.
pub fn to_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    table.validate()?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| match cell {
            Cell::Text(s) => s.clone(),
            Cell::Integer(n) => n.to_string(),
            Cell::Number(v) => v.to_string(),
            Cell::Empty => String::new(),
        }))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};

    use super::*;
    use crate::models::Grouping;
    use crate::report::{Page, ReportRequest, build_report};
    use crate::testing;

    fn sample() -> Table {
        let mut table = Table::new(["UserName", "Recall Days", "Energy (kcal)", "Visit"]);
        table.push_row(vec!["u1".into(), 2_usize.into(), 2000.0.into(), Cell::Empty]);
        table.push_row(vec!["u2".into(), 1_usize.into(), 2200.5.into(), "Visit 1".into()]);
        table
    }

    #[test]
    fn test_xlsx_keeps_header_and_values() {
        let table = sample();
        let bytes = to_xlsx(&table, "Nutrient Summary").unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Nutrient Summary".to_string()]);
        let range = workbook.worksheet_range("Nutrient Summary").unwrap();

        let header: Vec<String> = (0..4)
            .map(|c| range.get((0, c)).unwrap().to_string())
            .collect();
        assert_eq!(header, table.columns());
        assert_eq!(range.get((1, 0)), Some(&Data::String("u1".to_string())));
        assert_eq!(range.get((2, 2)), Some(&Data::Float(2200.5)));
        assert_eq!(range.get((1, 1)), Some(&Data::Float(2.0)));
        assert_eq!(range.get((2, 3)), Some(&Data::String("Visit 1".to_string())));

        // exporting never touches the table
        assert_eq!(table, sample());
    }

    #[test]
    fn test_report_table_round_trips_through_xlsx() {
        let ds = testing::standard_dataset();
        let report = build_report(
            &ds,
            &ReportRequest::new(Page::Nutrients).with_grouping(Grouping::PerDay),
        );
        let table = &report.table;
        let bytes = export(table, Page::Nutrients.sheet_name(), ExportFormat::Xlsx).unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook
            .worksheet_range(Page::Nutrients.sheet_name())
            .unwrap();
        assert_eq!(range.height(), table.len() + 1);
        assert_eq!(range.width(), table.columns().len());

        let header: Vec<String> = (0..table.columns().len())
            .map(|c| range.get((0, c)).unwrap().to_string())
            .collect();
        assert_eq!(header, table.columns());

        for (r, row) in table.rows().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let read = range.get((r + 1, c));
                match cell {
                    Cell::Text(text) => assert_eq!(read, Some(&Data::String(text.clone()))),
                    Cell::Empty => assert!(matches!(read, None | Some(Data::Empty))),
                    number => assert_eq!(read, Some(&Data::Float(number.as_f64().unwrap()))),
                }
            }
        }
    }

    #[test]
    fn test_xlsx_with_no_rows() {
        let table = Table::new(["UserName", "Supplement"]);
        let bytes = to_xlsx(&table, "Supplements").unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Supplements").unwrap();
        assert_eq!(range.height(), 1);
    }

    #[test]
    fn test_invalid_sheet_name() {
        let err = to_xlsx(&sample(), "a/b").unwrap_err();
        assert!(matches!(err, ExportError::SheetName(_)));
        let long = "x".repeat(32);
        assert!(to_xlsx(&sample(), &long).is_err());
    }

    #[test]
    fn test_ragged_table_fails() {
        let mut table = sample();
        table.push_unchecked(vec!["u3".into()]);
        assert!(matches!(
            to_xlsx(&table, "Sheet1"),
            Err(ExportError::RaggedRow { row: 2, .. })
        ));
        assert!(to_csv(&table).is_err());
    }

    #[test]
    fn test_csv_output() {
        let bytes = to_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "UserName,Recall Days,Energy (kcal),Visit");
        assert_eq!(lines[1], "u1,2,2000,");
        assert_eq!(lines[2], "u2,1,2200.5,Visit 1");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert!(ExportFormat::Xlsx.mime().contains("spreadsheetml"));
    }
}
