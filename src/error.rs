//! Structured error types for the Rapport export pipeline.
//!
//! Model transitions and aggregation are total functions and never fail;
//! errors only arise at the export boundary (capture, file writers) and
//! when validating external input (rasters, logo data URIs).

use thiserror::Error;

/// The unified error type returned by all fallible Rapport API functions.
#[derive(Debug, Error)]
pub enum RapportError {
    /// No render surface was available when an export started.
    /// Nothing is written.
    #[error("render surface not found: {0}")]
    SurfaceUnavailable(String),

    /// The capture collaborator failed while rendering the document.
    #[error("surface capture failed: {0}")]
    CaptureFailed(String),

    /// An export was triggered while another one was still running on the
    /// same document. Exports are serialized per document.
    #[error("an export is already in progress")]
    ExportInProgress,

    /// The dataset collaborator could not deliver rows for a binding.
    #[error("dataset fetch failed: {0}")]
    DatasetFetch(String),

    /// A raster buffer had zero dimensions or a length that does not match
    /// its declared width and height.
    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    /// A logo value was not a decodable base64 image data URI.
    #[error("invalid logo data URI: {0}")]
    InvalidLogo(String),

    /// Workbook construction or serialization failed.
    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// PNG encoding of the raster artifact failed.
    #[error("image encode error: {0}")]
    ImageEncode(#[from] image::ImageError),

    /// JSON input failed to parse as a Rapport document or dataset row.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RapportError>;
