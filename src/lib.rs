//! # Rapport
//!
//! A report composition and export engine.
//!
//! Dashboard operators assemble ad-hoc reports from live tabular datasets:
//! metric tiles, charts, tables, free text. Rapport is the core behind that
//! editor — the document model, the aggregation engine that turns raw rows
//! into chart-ready data, and the pagination/export engine that slices a
//! rendered surface into correctly bordered pages and file artifacts.
//!
//! Rendering itself is somebody else's job. The visual surface arrives as
//! one raster buffer through the [`raster::SurfaceCapture`] port, and
//! dataset rows arrive through [`aggregate::DatasetSource`]; everything in
//! between is a pure function of values.
//!
//! ## Architecture
//!
//! ```text
//!  edits                    rows
//!    ↓                        ↓
//!  [model]     ←──────  [aggregate]   — sections, bindings, derived data
//!    ↓
//!  capture (external)  →  [paginate]  — raster → page partition
//!                             ↓
//!                          [export]   — PDF / XLSX / PNG artifacts
//! ```

pub mod aggregate;
pub mod error;
pub mod export;
pub mod model;
pub mod paginate;
pub mod raster;
pub mod theme;

pub use aggregate::{aggregate, Aggregation, DataBinding};
pub use error::{RapportError, Result};
pub use export::{Artifact, ExportFormat, ExportJob, Exporter};
pub use model::{Document, Section, SectionKind};
pub use paginate::{paginate, PageGeometry, PagePlan};
pub use raster::{Raster, SurfaceCapture};
pub use theme::{Color, Theme, ThemePreset};

/// Run one export job. This is the primary entry point; it captures the
/// surface when the format needs one and returns the finished artifact.
///
/// Callers that need per-document serialization of concurrent triggers
/// should hold an [`Exporter`] instead and reuse it across jobs.
pub fn export(
    document: &Document,
    job: &ExportJob,
    surface: &dyn SurfaceCapture,
) -> Result<Artifact> {
    Exporter::new().export(document, job, surface)
}

/// Parse a document described as JSON.
pub fn document_from_json(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}
