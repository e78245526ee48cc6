//! OCR orchestration: readings → candidates → ranking → state-code
//! correction → normalization cascade.

use std::sync::Arc;

use tracing::{debug, info};

use crate::candidate::{build_pool, RawReading};
use crate::correct::correct_state_code;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::normalize::{normalize, NormalizationResult};
use crate::ocr::{collect_readings, OcrBackend, PlateRegion};
use crate::ranker::best_candidate;
use crate::tables::PlateTables;

/// Stateless recognizer over shared, read-only jurisdiction tables.
/// Safe to call from many threads at once.
#[derive(Clone)]
pub struct PlateRecognizer {
    tables: Arc<PlateTables>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl PlateRecognizer {
    pub fn new(tables: Arc<PlateTables>) -> Self {
        Self {
            tables,
            metrics: None,
        }
    }

    /// Recognizer over the builtin Indian tables.
    pub fn builtin() -> Self {
        Self::new(Arc::new(PlateTables::builtin()))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn tables(&self) -> &PlateTables {
        &self.tables
    }

    /// Turn one region's readings into a plate.
    ///
    /// No usable reading yields `plate_text: None` with zero confidence.
    /// Otherwise the confidence is the larger of the winning candidate's OCR
    /// confidence and the cascade tier's confidence.
    pub fn recognize(&self, readings: &[RawReading]) -> NormalizationResult {
        let span = self.metrics.as_ref().map(|m| m.span(metric_names::RECOGNIZE));
        let result = self.recognize_inner(readings);
        if let Some(span) = span {
            span.finish();
        }
        result
    }

    fn recognize_inner(&self, readings: &[RawReading]) -> NormalizationResult {
        let pool = build_pool(readings, &self.tables);
        let Some(best) = best_candidate(&pool) else {
            debug!(readings = readings.len(), "no_candidates");
            if let Some(m) = &self.metrics {
                m.increment(metric_names::EMPTY_INPUT);
            }
            return NormalizationResult::empty();
        };
        debug!(
            text = %best.text,
            confidence = best.confidence,
            likelihood = best.likelihood,
            pool = pool.len(),
            "best_candidate"
        );

        let corrected = correct_state_code(&best.text, &self.tables);

        let span = self.metrics.as_ref().map(|m| m.span(metric_names::NORMALIZE));
        let mut result = normalize(&corrected, &pool, &self.tables);
        if let Some(span) = span {
            span.finish();
        }
        if let (Some(m), Some(tier)) = (&self.metrics, result.tier) {
            m.increment(tier.name());
        }

        result.confidence = result.confidence.max(best.confidence);
        info!(
            plate = result.plate_text.as_deref().unwrap_or(""),
            confidence = result.confidence,
            tier = result.tier.map_or("", |t| t.name()),
            "plate_recognized"
        );
        result
    }

    /// Read `region` with every available backend, then recognize.
    pub fn recognize_region(
        &self,
        backends: &[Box<dyn OcrBackend>],
        region: &PlateRegion,
    ) -> NormalizationResult {
        let readings = collect_readings(backends, region);
        self.recognize(&readings)
    }
}
