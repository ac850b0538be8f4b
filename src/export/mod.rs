//! # Export Orchestration
//!
//! Ties the ports together: capture the document surface once, run the pure
//! pagination algorithm, and hand the plan to a file writer. The spreadsheet
//! path skips capture entirely and walks the model.
//!
//! Exports are serialized per document: the [`Exporter`] holds an in-flight
//! flag and rejects a second export while one is running. The flag resets on
//! every outcome, so a failed export can be retried. A failure at any step
//! aborts the whole export with a single terminal error — there is no
//! partial-file or partial-page output.

pub mod pdf;
pub mod xlsx;

use std::cell::Cell;

use chrono::NaiveDate;

use crate::error::{RapportError, Result};
use crate::model::Document;
use crate::paginate::{paginate, PageGeometry};
use crate::raster::{CaptureOptions, Raster, SurfaceCapture};

/// The artifact families an export can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Paged PDF built from the captured raster.
    PagedDocument,
    /// Multi-sheet XLSX workbook built from the model.
    Spreadsheet,
    /// The captured raster as a single PNG.
    RasterImage,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::PagedDocument => "pdf",
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::RasterImage => "png",
        }
    }
}

/// One export request. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub format: ExportFormat,
    /// Page geometry for the paged-document path; ignored by the others.
    pub geometry: PageGeometry,
    pub include_cover_page: bool,
    pub include_table_of_contents: bool,
    /// Accepted for forward compatibility; artifacts are currently written
    /// unprotected and a warning is logged when this is set.
    pub password: Option<String>,
}

impl ExportJob {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            geometry: PageGeometry::a4_portrait(),
            include_cover_page: true,
            include_table_of_contents: false,
            password: None,
        }
    }
}

/// A finished export: suggested file name plus the artifact bytes.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Runs export jobs for one document instance, one at a time.
#[derive(Debug, Default)]
pub struct Exporter {
    in_flight: Cell<bool>,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` against `document`, capturing the surface when the format
    /// needs one. Fails fast with [`RapportError::ExportInProgress`] if an
    /// export is already running.
    pub fn export(
        &self,
        document: &Document,
        job: &ExportJob,
        surface: &dyn SurfaceCapture,
    ) -> Result<Artifact> {
        if self.in_flight.replace(true) {
            return Err(RapportError::ExportInProgress);
        }
        let outcome = self.run(document, job, surface);
        self.in_flight.set(false);
        if let Err(e) = &outcome {
            log::warn!("export aborted: {e}");
        }
        outcome
    }

    fn run(
        &self,
        document: &Document,
        job: &ExportJob,
        surface: &dyn SurfaceCapture,
    ) -> Result<Artifact> {
        if job.password.is_some() {
            log::warn!("password-protected export is not supported; writing unprotected artifact");
        }

        let bytes = match job.format {
            ExportFormat::Spreadsheet => xlsx::write_workbook(document)?,
            ExportFormat::RasterImage => self.capture(job, surface)?.encode_png()?,
            ExportFormat::PagedDocument => {
                let raster = self.capture(job, surface)?;
                let plan = paginate(raster.width(), raster.height(), &job.geometry);
                log::debug!(
                    "paginated {}x{} raster into {} page(s)",
                    raster.width(),
                    raster.height(),
                    plan.total_pages
                );
                pdf::PdfWriter::new().write(document, &raster, &plan, &job.geometry)
            }
        };

        let file_name = artifact_name(
            &document.title,
            chrono::Utc::now().date_naive(),
            job.format.extension(),
        );
        Ok(Artifact { file_name, bytes })
    }

    fn capture(&self, job: &ExportJob, surface: &dyn SurfaceCapture) -> Result<Raster> {
        let options = CaptureOptions {
            include_cover_page: job.include_cover_page,
            include_table_of_contents: job.include_table_of_contents,
        };
        surface.capture(&options)
    }
}

/// Artifact file name: the title with every non-alphanumeric character
/// replaced by an underscore, lowercased, stamped with the ISO date.
pub fn artifact_name(title: &str, date: NaiveDate, extension: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = if sanitized.is_empty() {
        "report".to_string()
    } else {
        sanitized
    };
    format!("{}_{}.{}", sanitized, date.format("%Y-%m-%d"), extension)
}
