use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::{Dataset, LoadedFile};
use crate::error::DataLoadError;
use crate::models::{
    Amounts, DayTotals, FoodEntry, FoodGroup, Measure, Nutrient, RawTable, SupplementEntry,
    occasion_label,
};

/// The six files of an ASA24 export, identified by file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TableKind {
    Totals,
    Items,
    #[serde(rename = "INS")]
    Ins,
    Responses,
    #[serde(rename = "TNS")]
    Tns,
    #[serde(rename = "TS")]
    Ts,
}

impl TableKind {
    pub const ALL: [Self; 6] = [
        Self::Totals,
        Self::Items,
        Self::Ins,
        Self::Responses,
        Self::Tns,
        Self::Ts,
    ];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Totals => "Totals",
            Self::Items => "Items",
            Self::Ins => "INS",
            Self::Responses => "Responses",
            Self::Tns => "TNS",
            Self::Ts => "TS",
        }
    }

    /// Case-insensitive match on the `_<suffix>.csv` tail of a file name.
    #[must_use]
    pub fn matches(self, file_name: &str) -> bool {
        let tail = format!("_{}.csv", self.suffix()).to_ascii_lowercase();
        file_name.to_ascii_lowercase().ends_with(&tail)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

const SUBJECT: &str = "UserName";
const RECALL_NO: &str = "RecallNo";
const INTAKE_START: &str = "IntakeStartDateTime";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Load all six ASA24 files from `dir`.
///
/// Every file must be present exactly once and pass schema validation; the
/// first problem aborts the whole load.
pub fn load_dir(dir: &Path) -> Result<Dataset, DataLoadError> {
    if !dir.is_dir() {
        return Err(DataLoadError::DirectoryNotFound(dir.to_path_buf()));
    }
    let paths = locate_files(dir)?;
    let path = |kind: TableKind| -> &Path { &paths[&kind] };

    let totals = parse_totals(path(TableKind::Totals))?;
    let items = parse_items(path(TableKind::Items))?;
    let supplements = parse_supplements(path(TableKind::Ins))?;

    let mut auxiliary = BTreeMap::new();
    for kind in [TableKind::Responses, TableKind::Tns, TableKind::Ts] {
        auxiliary.insert(kind, parse_raw(path(kind))?);
    }

    let mut files = vec![
        loaded(TableKind::Totals, path(TableKind::Totals), totals.len()),
        loaded(TableKind::Items, path(TableKind::Items), items.len()),
        loaded(TableKind::Ins, path(TableKind::Ins), supplements.len()),
    ];
    for (kind, table) in &auxiliary {
        files.push(loaded(*kind, path(*kind), table.rows.len()));
    }
    for f in &files {
        info!(table = %f.table, file = %f.file_name, rows = f.rows, "Loaded ASA24 file");
    }

    Ok(Dataset::from_records(totals, items, supplements).with_source(dir, files, auxiliary))
}

fn loaded(table: TableKind, path: &Path, rows: usize) -> LoadedFile {
    LoadedFile {
        table,
        file_name: file_name(path),
        rows,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Find exactly one CSV file per table kind.
fn locate_files(dir: &Path) -> Result<BTreeMap<TableKind, PathBuf>, DataLoadError> {
    let read_err = |source| DataLoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut names: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if path.is_file() {
            names.push((file_name(&path), path));
        }
    }
    names.sort();

    let mut found = BTreeMap::new();
    for kind in TableKind::ALL {
        let matches: Vec<&(String, PathBuf)> =
            names.iter().filter(|(name, _)| kind.matches(name)).collect();
        match matches.as_slice() {
            [] => {
                return Err(DataLoadError::MissingFile {
                    table: kind,
                    dir: dir.to_path_buf(),
                });
            }
            [(name, path)] => {
                debug!(table = %kind, file = %name, "Located ASA24 file");
                found.insert(kind, path.clone());
            }
            many => {
                return Err(DataLoadError::AmbiguousFile {
                    table: kind,
                    files: many.iter().map(|(name, _)| name.clone()).collect(),
                });
            }
        }
    }
    Ok(found)
}

/// An open CSV file with its header row.
struct Sheet {
    file: String,
    headers: StringRecord,
    reader: csv::Reader<File>,
}

impl Sheet {
    fn open(path: &Path) -> Result<Self, DataLoadError> {
        let file = file_name(path);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| DataLoadError::Csv {
                file: file.clone(),
                source,
            })?;
        let headers = reader
            .headers()
            .map_err(|source| DataLoadError::Csv {
                file: file.clone(),
                source,
            })?
            .clone();
        Ok(Self {
            file,
            headers,
            reader,
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &'static str) -> Result<usize, DataLoadError> {
        self.position(name).ok_or_else(|| DataLoadError::MissingColumn {
            file: self.file.clone(),
            column: name,
        })
    }

    fn measures<M: Measure>(&self) -> Result<Vec<usize>, DataLoadError> {
        M::ALL.iter().map(|m| self.require(m.column())).collect()
    }

    /// Visit every non-blank data row.
    fn for_each_row(
        mut self,
        mut f: impl FnMut(&Row<'_>) -> Result<(), DataLoadError>,
    ) -> Result<(), DataLoadError> {
        for (n, result) in self.reader.records().enumerate() {
            let record = result.map_err(|source| DataLoadError::Csv {
                file: self.file.clone(),
                source,
            })?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            f(&Row {
                file: &self.file,
                headers: &self.headers,
                line: n + 2,
                record: &record,
            })?;
        }
        Ok(())
    }
}

struct Row<'a> {
    file: &'a str,
    headers: &'a StringRecord,
    line: usize,
    record: &'a StringRecord,
}

impl Row<'_> {
    fn text(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("")
    }

    fn column_name(&self, idx: usize) -> String {
        self.headers.get(idx).unwrap_or("?").to_string()
    }

    fn subject(&self, idx: usize) -> Result<String, DataLoadError> {
        let subject = self.text(idx);
        if subject.is_empty() {
            return Err(DataLoadError::MissingSubject {
                file: self.file.to_string(),
                line: self.line,
            });
        }
        Ok(subject.to_string())
    }

    fn invalid_number(&self, idx: usize) -> DataLoadError {
        DataLoadError::InvalidNumber {
            file: self.file.to_string(),
            line: self.line,
            column: self.column_name(idx),
            value: self.text(idx).to_string(),
        }
    }

    /// Non-negative number; an empty cell is an unreported value and reads as zero.
    fn amount(&self, idx: usize) -> Result<f64, DataLoadError> {
        let raw = self.text(idx);
        if raw.is_empty() {
            return Ok(0.0);
        }
        let value: f64 = raw.parse().map_err(|_| self.invalid_number(idx))?;
        if !value.is_finite() {
            return Err(self.invalid_number(idx));
        }
        if value < 0.0 {
            return Err(DataLoadError::NegativeValue {
                file: self.file.to_string(),
                line: self.line,
                column: self.column_name(idx),
                value,
            });
        }
        Ok(value)
    }

    /// Whole, non-negative number such as `RecallNo`. Accepts `2.0`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn whole(&self, idx: usize) -> Result<u32, DataLoadError> {
        let raw = self.text(idx);
        if let Ok(n) = raw.parse::<u32>() {
            return Ok(n);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&v) => Ok(v as u32),
            _ => Err(self.invalid_number(idx)),
        }
    }

    fn datetime(&self, idx: usize) -> Result<Option<NaiveDateTime>, DataLoadError> {
        let raw = self.text(idx);
        if raw.is_empty() {
            return Ok(None);
        }
        parse_datetime(raw)
            .map(Some)
            .ok_or_else(|| DataLoadError::InvalidDate {
                file: self.file.to_string(),
                line: self.line,
                column: self.column_name(idx),
                value: raw.to_string(),
            })
    }

    fn measures<M: Measure>(&self, columns: &[usize]) -> Result<Amounts<M>, DataLoadError> {
        let mut amounts = Amounts::zero();
        for (&m, &idx) in M::ALL.iter().zip(columns) {
            amounts.set(m, self.amount(idx)?);
        }
        Ok(amounts)
    }
}

/// Parse the date/time layouts ASA24 exports use; a bare date means midnight.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_totals(path: &Path) -> Result<Vec<DayTotals>, DataLoadError> {
    let sheet = Sheet::open(path)?;
    let subject = sheet.require(SUBJECT)?;
    let recall = sheet.require(RECALL_NO)?;
    let start = sheet.require(INTAKE_START)?;
    let nutrients = sheet.measures::<Nutrient>()?;
    let groups = sheet.measures::<FoodGroup>()?;

    let mut rows = Vec::new();
    sheet.for_each_row(|row| {
        rows.push(DayTotals {
            subject: row.subject(subject)?,
            recall_no: row.whole(recall)?,
            intake_start: row.datetime(start)?,
            nutrients: row.measures(&nutrients)?,
            food_groups: row.measures(&groups)?,
        });
        Ok(())
    })?;
    Ok(rows)
}

fn parse_items(path: &Path) -> Result<Vec<FoodEntry>, DataLoadError> {
    let sheet = Sheet::open(path)?;
    let subject = sheet.require(SUBJECT)?;
    let recall = sheet.require(RECALL_NO)?;
    let occ_no = sheet.require("Occ_No")?;
    let occ_name = sheet.require("Occ_Name")?;
    let code = sheet.require("FoodCode")?;
    let description = sheet.require("Food_Description")?;
    let grams = sheet.require("FoodAmt")?;
    let nutrients = sheet.measures::<Nutrient>()?;
    let groups = sheet.measures::<FoodGroup>()?;

    let mut rows = Vec::new();
    sheet.for_each_row(|row| {
        rows.push(FoodEntry {
            subject: row.subject(subject)?,
            recall_no: row.whole(recall)?,
            occasion_no: row.whole(occ_no)?,
            occasion: occasion_label(row.text(occ_name)),
            food_code: row.text(code).to_string(),
            description: row.text(description).to_string(),
            grams: row.amount(grams)?,
            nutrients: row.measures(&nutrients)?,
            food_groups: row.measures(&groups)?,
        });
        Ok(())
    })?;
    Ok(rows)
}

fn parse_supplements(path: &Path) -> Result<Vec<SupplementEntry>, DataLoadError> {
    let sheet = Sheet::open(path)?;
    let subject = sheet.require(SUBJECT)?;
    let recall = sheet.require(RECALL_NO)?;
    let start = sheet.require(INTAKE_START)?;
    let description = sheet.require("Suppl_Description")?;
    let amount = sheet.require("SupplAmount")?;
    let unit = sheet.require("SupplUnit")?;

    let mut rows = Vec::new();
    sheet.for_each_row(|row| {
        rows.push(SupplementEntry {
            subject: row.subject(subject)?,
            recall_no: row.whole(recall)?,
            intake_start: row.datetime(start)?,
            description: row.text(description).to_string(),
            amount: row.amount(amount)?,
            unit: row.text(unit).to_string(),
        });
        Ok(())
    })?;
    Ok(rows)
}

fn parse_raw(path: &Path) -> Result<RawTable, DataLoadError> {
    let sheet = Sheet::open(path)?;
    let subject = sheet.require(SUBJECT)?;
    let mut table = RawTable {
        file_name: sheet.file.clone(),
        headers: sheet.headers.iter().map(str::to_string).collect(),
        rows: Vec::new(),
    };
    sheet.for_each_row(|row| {
        row.subject(subject)?;
        table
            .rows
            .push(row.record.iter().map(str::to_string).collect());
        Ok(())
    })?;
    Ok(table)
}
