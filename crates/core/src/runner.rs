//! Report invocation: normalize parameters, load, compute, export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CoreError;
use crate::params::{RawParams, ReportParams};
use crate::registry::ReportRegistry;
use crate::report::ReportType;
use crate::source::SalesSource;
use crate::table::Sheet;
use crate::types::LocalTime;

/// Everything an exporter needs to render one report run.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub title: String,
    /// Column name to display label.
    pub labels: Vec<(String, String)>,
    pub sheets: Vec<Sheet>,
}

impl ExportDocument {
    pub fn label<'a>(&'a self, column: &'a str) -> &'a str {
        self.labels
            .iter()
            .find(|(c, _)| c == column)
            .map_or(column, |(_, l)| l.as_str())
    }
}

/// Renders a document to a file. Implementations may block.
pub trait ReportExporter: Send + Sync {
    fn export(&self, doc: &ExportDocument, path: &Path) -> Result<PathBuf, CoreError>;

    fn extension(&self) -> &'static str {
        "xlsx"
    }
}

/// Outcome of a computed (not yet exported) run.
pub struct ComputedReport {
    pub report: Arc<dyn ReportType>,
    pub params: ReportParams,
    pub sheets: Vec<Sheet>,
}

impl ComputedReport {
    pub fn document(&self) -> ExportDocument {
        ExportDocument {
            title: self.report.title().to_string(),
            labels: self
                .report
                .labels()
                .iter()
                .map(|(c, l)| (c.to_string(), l.to_string()))
                .collect(),
            sheets: self.sheets.clone(),
        }
    }
}

/// Ties the registry, a data source and an exporter together.
///
/// Every run reloads from the source; nothing is cached between runs.
#[derive(Clone)]
pub struct ReportRunner {
    registry: Arc<ReportRegistry>,
    source: Arc<dyn SalesSource>,
    exporter: Arc<dyn ReportExporter>,
    out_dir: PathBuf,
}

impl ReportRunner {
    pub fn new(
        registry: Arc<ReportRegistry>,
        source: Arc<dyn SalesSource>,
        exporter: Arc<dyn ReportExporter>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            source,
            exporter,
            out_dir: out_dir.into(),
        }
    }

    pub fn registry(&self) -> &ReportRegistry {
        &self.registry
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Normalize, load and compute without exporting.
    pub async fn compute(
        &self,
        slug: &str,
        raw: &RawParams,
        now: LocalTime,
    ) -> Result<ComputedReport, CoreError> {
        let report = self.registry.get(slug)?;
        let params = report.normalize_params(raw, now.date())?;
        let request = report.load_request(&params, now);
        let data = self.source.load(&request).await?;

        tracing::debug!(
            slug,
            orders = data.orders.len(),
            items = data.items.len(),
            since = ?request.since,
            "Computing report"
        );
        let sheets = report.compute_sheets(&data, &params, now)?;
        Ok(ComputedReport {
            report,
            params,
            sheets,
        })
    }

    /// `<out_dir>/<slug>/<slug>_<YYYYmmdd_HHMM>.<ext>`.
    pub fn output_path(&self, slug: &str, now: LocalTime) -> PathBuf {
        self.out_dir.join(slug).join(format!(
            "{slug}_{}.{}",
            now.format("%Y%m%d_%H%M"),
            self.exporter.extension()
        ))
    }

    /// Compute and export using the local clock.
    pub async fn run(&self, slug: &str, raw: &RawParams) -> Result<PathBuf, CoreError> {
        self.run_at(slug, raw, chrono::Local::now().naive_local()).await
    }

    pub async fn run_at(
        &self,
        slug: &str,
        raw: &RawParams,
        now: LocalTime,
    ) -> Result<PathBuf, CoreError> {
        let computed = self.compute(slug, raw, now).await?;
        let path = self.output_path(slug, now);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let doc = computed.document();
        let exporter = Arc::clone(&self.exporter);
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || exporter.export(&doc, &target))
            .await
            .map_err(|e| CoreError::Internal(format!("export task failed: {e}")))??;

        tracing::info!(slug, path = %written.display(), "Report exported");
        Ok(written)
    }
}
