//! plate-ocr: Indian licence plate text recovery from noisy OCR output.
//! Takes every reading an OCR collaborator produced for one plate crop and
//! returns the most probable canonical plate (`SS DD CCC NNNN`) with a
//! confidence.

pub mod candidate;
pub mod correct;
pub mod metrics;
pub mod normalize;
pub mod ocr;
pub mod plate;
pub mod ranker;
pub mod recognizer;
pub mod tables;

pub use candidate::{Candidate, RawReading, WordBox};
pub use normalize::{NormalizationResult, Tier};
pub use plate::{is_valid, PlateComponents};
pub use recognizer::PlateRecognizer;
pub use tables::{PlateTables, TableError};

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("plate_ocr=info"))
}

/// Install a fmt subscriber filtered by `RUST_LOG` (default `plate_ocr=info`).
/// Does nothing when a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

/// Same as [`init_tracing`], but one JSON object per event for log shippers.
pub fn init_json_tracing() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_current_span(false)
        .try_init();
}
