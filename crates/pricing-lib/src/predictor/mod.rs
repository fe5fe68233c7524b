//! Price prediction engine

mod encoding;
mod features;
mod inference;
mod output;

pub use encoding::{ColumnEncoding, FeatureEncoding};
pub use features::{
    is_luxury_brand, FeatureBuilder, LookupTables, UnseenCategory, LUXURY_BRANDS, REFERENCE_YEAR,
};
pub use inference::OnnxPipeline;
pub use output::{PriceFormatter, LAKH, PRICE_DECIMALS};

#[cfg(test)]
pub(crate) use encoding::tests::test_encoding_json as encoding_fixture;

use crate::models::{FeatureRecord, PricePrediction, VehicleAttributes};
use crate::observability::{ServiceMetrics, StructuredLogger};
use anyhow::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Trait for the opaque pre-trained pipeline
pub trait PricePipeline: Send + Sync {
    /// Predict the price of one vehicle, in lakhs
    fn predict(&self, record: &FeatureRecord) -> Result<f64>;

    /// Get current model version
    fn version(&self) -> &str;
}

/// Builds features, runs the pipeline and formats the response
pub struct PredictionService {
    builder: FeatureBuilder,
    pipeline: Arc<dyn PricePipeline>,
    formatter: PriceFormatter,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
    failure_streak: AtomicU32,
}

impl PredictionService {
    pub fn new(
        builder: FeatureBuilder,
        pipeline: Arc<dyn PricePipeline>,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            builder,
            pipeline,
            formatter: PriceFormatter::new(),
            metrics,
            logger,
            failure_streak: AtomicU32::new(0),
        }
    }

    pub fn model_version(&self) -> &str {
        self.pipeline.version()
    }

    /// Consecutive failed predictions since the last success
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak.load(Ordering::Relaxed)
    }

    pub fn predict(&self, attrs: &VehicleAttributes) -> Result<PricePrediction> {
        let start = Instant::now();

        let (record, unseen) = self.builder.build_with_report(attrs);
        for category in &unseen {
            self.metrics.inc_unseen_category(category.kind());
            self.logger.log_unseen_category(category.kind(), &category.value());
        }

        let prediction = match self.run_pipeline(&record) {
            Ok(prediction) => prediction,
            Err(e) => {
                self.failure_streak.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_prediction_errors();
                self.logger.log_prediction_failed(&attrs.brand, &attrs.model, &e);
                return Err(e);
            }
        };
        self.failure_streak.store(0, Ordering::Relaxed);

        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        self.metrics.inc_predictions();
        self.logger.log_prediction(
            &attrs.brand,
            &attrs.model,
            attrs.yom,
            prediction.predicted_price,
            self.pipeline.version(),
        );

        Ok(prediction)
    }

    /// A price that is not a finite number cannot be returned as JSON.
    fn run_pipeline(&self, record: &FeatureRecord) -> Result<PricePrediction> {
        let raw = self.pipeline.predict(record)?;
        let prediction = self.formatter.format(raw);
        if !prediction.predicted_price.is_finite() {
            anyhow::bail!("pipeline produced a non-finite price ({})", raw);
        }
        Ok(prediction)
    }
}
