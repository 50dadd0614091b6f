use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart::{Chart, build_chart};
use crate::dataset::{Dataset, LoadedFile};
use crate::error::SessionError;
use crate::export::{ExportFormat, export};
use crate::loader::load_dir;
use crate::models::Grouping;
use crate::report::{Report, ReportRequest, build_report};

/// Outcome of a successful load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub directory: String,
    pub generation: u64,
    pub subjects: usize,
    pub files: Vec<LoadedFile>,
}

/// A report serialized for download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Most reports the memo holds before evicting the least recently used.
pub const MEMO_CAPACITY: usize = 32;

/// The dashboard's state: the loaded dataset and the reports derived from it.
///
/// Reports are memoized per request and dataset generation, keeping at most
/// [`MEMO_CAPACITY`] of them. Every successful load starts a new generation
/// and drops the memo; a failed load leaves the session exactly as it was.
#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<Arc<Dataset>>,
    generation: u64,
    cache: HashMap<(u64, ReportRequest), Arc<Report>>,
    /// Memo keys, least recently used first.
    recent: VecDeque<(u64, ReportRequest)>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session over an already-built dataset.
    #[must_use]
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: Some(Arc::new(dataset)),
            generation: 1,
            cache: HashMap::new(),
            recent: VecDeque::new(),
        }
    }

    /// (Re)load an ASA24 data directory, replacing the current dataset.
    pub fn load(&mut self, dir: &Path) -> Result<LoadSummary, SessionError> {
        let dataset = match load_dir(dir) {
            Ok(ds) => ds,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Load failed; keeping previous data");
                return Err(e.into());
            }
        };
        self.generation += 1;
        self.cache.clear();
        self.recent.clear();
        let summary = LoadSummary {
            directory: dir.display().to_string(),
            generation: self.generation,
            subjects: dataset.subjects().len(),
            files: dataset.files().to_vec(),
        };
        info!(
            dir = %dir.display(),
            subjects = summary.subjects,
            generation = self.generation,
            "Loaded ASA24 data"
        );
        self.dataset = Some(Arc::new(dataset));
        Ok(summary)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dataset(&self) -> Result<&Arc<Dataset>, SessionError> {
        self.dataset.as_ref().ok_or(SessionError::NotLoaded)
    }

    pub fn subjects(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.dataset()?.subjects().iter().cloned().collect())
    }

    /// Build (or fetch from the memo) the report for `request`.
    pub fn report(&mut self, request: &ReportRequest) -> Result<Arc<Report>, SessionError> {
        let dataset = Arc::clone(self.dataset()?);
        let request = request
            .clone()
            .normalized()
            .restricted_to(dataset.subjects());
        let key = (self.generation, request);
        if let Some(report) = self.cache.get(&key) {
            debug!(page = %key.1.page, "Report cache hit");
            let report = Arc::clone(report);
            self.touch(&key);
            return Ok(report);
        }
        debug!(page = %key.1.page, "Report cache miss");
        let report = Arc::new(build_report(&dataset, &key.1));
        if self.cache.len() >= MEMO_CAPACITY {
            if let Some(oldest) = self.recent.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.recent.push_back(key.clone());
        self.cache.insert(key, Arc::clone(&report));
        Ok(report)
    }

    fn touch(&mut self, key: &(u64, ReportRequest)) {
        if let Some(pos) = self.recent.iter().position(|k| k == key) {
            if let Some(k) = self.recent.remove(pos) {
                self.recent.push_back(k);
            }
        }
    }

    /// Chart `measure` of the report for `request`; `None` when the page or
    /// the measure cannot be plotted.
    pub fn chart(
        &mut self,
        request: &ReportRequest,
        measure: &str,
    ) -> Result<Option<Chart>, SessionError> {
        if !request.page.chartable() {
            return Ok(None);
        }
        let report = self.report(request)?;
        Ok(build_chart(&report.table, measure).map(|mut chart| {
            chart.title = format!("{} ({})", chart.title, report.title);
            chart
        }))
    }

    pub fn export(
        &mut self,
        request: &ReportRequest,
        format: ExportFormat,
    ) -> Result<ExportFile, SessionError> {
        let report = self.report(request)?;
        let bytes = export(&report.table, report.page.sheet_name(), format)?;
        let suffix = if report.page.supports_grouping() && report.grouping == Grouping::PerDay {
            "_per_day"
        } else {
            ""
        };
        Ok(ExportFile {
            file_name: format!("{}{suffix}.{}", report.page.file_stem(), format.extension()),
            mime: format.mime(),
            bytes,
        })
    }

    /// Number of memoized reports.
    #[must_use]
    pub fn cached_reports(&self) -> usize {
        self.cache.len()
    }
}
