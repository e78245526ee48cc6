//! OCR collaborator interface.
//! Engines live outside this crate; they hand back `RawReading`s for a plate
//! region, one per configuration variant. Backends are capability-gated: the
//! recognizer consumes whatever the available ones return.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::candidate::RawReading;

/// Characters an engine should be restricted to for plate text.
pub const PLATE_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Plate crop supplied by the detector collaborator. Pixels are opaque here.
#[derive(Debug, Clone)]
pub struct PlateRegion {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bbox: (u32, u32, u32, u32), // x, y, w, h in the source frame
    pub detector_confidence: f32,
}

/// One engine configuration variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrVariant {
    /// Page segmentation mode.
    pub psm: u32,
    /// Engine mode.
    pub oem: u32,
    /// Run on the crop padded with a white border.
    pub bordered: bool,
}

impl OcrVariant {
    pub const fn new(psm: u32, bordered: bool) -> Self {
        Self {
            psm,
            oem: 3,
            bordered,
        }
    }

    /// Command-line style configuration for Tesseract-like engines.
    pub fn engine_args(&self) -> String {
        format!(
            "--oem {} --psm {} -c tessedit_char_whitelist={PLATE_CHARSET}",
            self.oem, self.psm
        )
    }
}

/// The six reference variants: sparse text, single line, single word,
/// uniform block, raw line, and single word on a bordered crop.
pub fn reference_variants() -> [OcrVariant; 6] {
    [
        OcrVariant::new(11, false),
        OcrVariant::new(7, false),
        OcrVariant::new(8, false),
        OcrVariant::new(6, false),
        OcrVariant::new(13, false),
        OcrVariant::new(8, true),
    ]
}

/// An OCR engine adapter.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the engine can run at all (installed, model loaded, ...).
    fn is_available(&self) -> bool {
        true
    }

    /// Read the region under every variant the engine supports.
    fn read(&self, region: &PlateRegion) -> Result<Vec<RawReading>, OcrError>;
}

#[derive(Debug)]
pub enum OcrError {
    Unavailable(String),
    EngineFailed(String),
    Timeout,
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Unavailable(name) => write!(f, "OCR backend unavailable: {name}"),
            OcrError::EngineFailed(msg) => write!(f, "OCR engine failed: {msg}"),
            OcrError::Timeout => write!(f, "OCR timeout"),
        }
    }
}

impl std::error::Error for OcrError {}

/// Collect readings from every available backend, in backend order.
/// Failing backends are logged and skipped.
pub fn collect_readings(backends: &[Box<dyn OcrBackend>], region: &PlateRegion) -> Vec<RawReading> {
    let mut readings = Vec::new();
    for backend in backends {
        if !backend.is_available() {
            debug!(backend = backend.name(), "ocr_backend_skipped");
            continue;
        }
        match backend.read(region) {
            Ok(batch) => {
                debug!(backend = backend.name(), count = batch.len(), "ocr_readings");
                readings.extend(batch);
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "ocr_backend_failed");
            }
        }
    }
    readings
}
