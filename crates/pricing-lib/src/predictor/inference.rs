//! ONNX inference using tract
//!
//! Runs the exported regression graph over one encoded feature row.

use super::encoding::FeatureEncoding;
use super::PricePipeline;
use crate::models::FeatureRecord;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Pre-trained price pipeline backed by an ONNX graph
pub struct OnnxPipeline {
    model: TractModel,
    encoding: FeatureEncoding,
    version: String,
}

impl OnnxPipeline {
    /// Build the pipeline from model bytes and a validated column encoding
    pub fn new(
        model_bytes: &[u8],
        encoding: FeatureEncoding,
        version: impl Into<String>,
    ) -> Result<Self> {
        let model = Self::load_model(model_bytes, encoding.width())?;
        Ok(Self {
            model,
            encoding,
            version: version.into(),
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], width: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn record_to_tensor(&self, record: &FeatureRecord) -> Result<Tensor> {
        let row = self.encoding.encode(record);
        let array = tract_ndarray::Array2::from_shape_vec((1, row.len()), row)
            .context("Failed to shape feature row")?;
        Ok(array.into())
    }
}

impl PricePipeline for OnnxPipeline {
    fn predict(&self, record: &FeatureRecord) -> Result<f64> {
        let start = Instant::now();

        let input = self.record_to_tensor(record)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;

        // Regressors exported from float64 training data may emit f64.
        let values = output.cast_to::<f64>()?;
        let prediction = values
            .as_slice::<f64>()?
            .first()
            .copied()
            .context("Model produced an empty output tensor")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(prediction)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::encoding::tests::test_encoding_json;

    /// Minimal protobuf writer for hand-built ONNX graphs
    mod onnx {
        fn varint(mut value: u64, out: &mut Vec<u8>) {
            while value >= 0x80 {
                out.push((value as u8) | 0x80);
                value >>= 7;
            }
            out.push(value as u8);
        }

        fn int_field(field: u32, value: u64, out: &mut Vec<u8>) {
            varint(u64::from(field) << 3, out);
            varint(value, out);
        }

        fn bytes_field(field: u32, bytes: &[u8], out: &mut Vec<u8>) {
            varint((u64::from(field) << 3) | 2, out);
            varint(bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }

        const FLOAT: u64 = 1;

        fn tensor(name: &str, dims: &[u64], values: &[f32]) -> Vec<u8> {
            let mut out = Vec::new();
            for dim in dims {
                int_field(1, *dim, &mut out);
            }
            int_field(2, FLOAT, &mut out);
            bytes_field(8, name.as_bytes(), &mut out);
            let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            bytes_field(9, &raw, &mut out);
            out
        }

        fn value_info(name: &str, dims: &[u64]) -> Vec<u8> {
            let mut shape = Vec::new();
            for dim in dims {
                let mut dimension = Vec::new();
                int_field(1, *dim, &mut dimension);
                bytes_field(1, &dimension, &mut shape);
            }
            let mut tensor_type = Vec::new();
            int_field(1, FLOAT, &mut tensor_type);
            bytes_field(2, &shape, &mut tensor_type);
            let mut type_proto = Vec::new();
            bytes_field(1, &tensor_type, &mut type_proto);

            let mut out = Vec::new();
            bytes_field(1, name.as_bytes(), &mut out);
            bytes_field(2, &type_proto, &mut out);
            out
        }

        fn node(op_type: &str, inputs: &[&str], output: &str) -> Vec<u8> {
            let mut out = Vec::new();
            for input in inputs {
                bytes_field(1, input.as_bytes(), &mut out);
            }
            bytes_field(2, output.as_bytes(), &mut out);
            bytes_field(3, op_type.to_lowercase().as_bytes(), &mut out);
            bytes_field(4, op_type.as_bytes(), &mut out);
            out
        }

        /// `price = features . weights + bias` over a `[1, width]` input
        pub fn linear_regressor(weights: &[f32], bias: f32) -> Vec<u8> {
            let width = weights.len() as u64;
            let mut graph = Vec::new();
            bytes_field(1, &node("MatMul", &["features", "weights"], "scores"), &mut graph);
            bytes_field(1, &node("Add", &["scores", "bias"], "price"), &mut graph);
            bytes_field(2, b"price_regressor", &mut graph);
            bytes_field(5, &tensor("weights", &[width, 1], weights), &mut graph);
            bytes_field(5, &tensor("bias", &[1], &[bias]), &mut graph);
            bytes_field(11, &value_info("features", &[1, width]), &mut graph);
            bytes_field(12, &value_info("price", &[1, 1]), &mut graph);

            let mut opset = Vec::new();
            int_field(2, 13, &mut opset);

            let mut model = Vec::new();
            int_field(1, 7, &mut model);
            bytes_field(7, &graph, &mut model);
            bytes_field(8, &opset, &mut model);
            model
        }
    }

    fn test_encoding() -> FeatureEncoding {
        serde_json::from_str(&test_encoding_json()).unwrap()
    }

    fn corolla() -> FeatureRecord {
        FeatureRecord {
            yom: 2012,
            mileage: 120000.0,
            gear: "Auto".to_string(),
            fuel: "Petrol".to_string(),
            town: "Kandy".to_string(),
            condition: "Used".to_string(),
            brand: "TOYOTA".to_string(),
            ..FeatureRecord::schema_sample()
        }
    }

    /// Weights on YOM, standardized mileage and the Gear=Auto one-hot
    fn regressor_weights(width: usize) -> Vec<f32> {
        let mut weights = vec![0.0; width];
        weights[0] = 1.0;
        weights[1] = 100.0;
        weights[3] = 7.0;
        weights
    }

    #[test]
    fn test_invalid_model_bytes_rejected() {
        let result = OnnxPipeline::new(b"definitely not protobuf", test_encoding(), "v1");
        assert!(result.is_err());
    }

    #[test]
    fn test_predict_runs_graph_over_encoded_row() {
        let encoding = test_encoding();
        let model = onnx::linear_regressor(&regressor_weights(encoding.width()), 0.5);
        let pipeline = OnnxPipeline::new(&model, encoding, "linear-v1").unwrap();

        // 2012 * 1 + ((120000 - 100000) / 50000) * 100 + 1 * 7 + 0.5
        let price = pipeline.predict(&corolla()).unwrap();
        assert!((price - 2059.5).abs() < 1e-3, "got {}", price);
        assert_eq!(pipeline.version(), "linear-v1");
    }

    #[test]
    fn test_predict_follows_categorical_columns() {
        let encoding = test_encoding();
        let model = onnx::linear_regressor(&regressor_weights(encoding.width()), 0.0);
        let pipeline = OnnxPipeline::new(&model, encoding, "linear-v1").unwrap();

        let manual = FeatureRecord {
            gear: "Manual".to_string(),
            ..corolla()
        };
        let price = pipeline.predict(&manual).unwrap();
        assert!((price - 2052.0).abs() < 1e-3, "got {}", price);
    }

    #[test]
    fn test_graph_width_must_match_encoding() {
        let encoding = test_encoding();
        let model = onnx::linear_regressor(&vec![1.0; encoding.width() + 1], 0.0);
        assert!(OnnxPipeline::new(&model, encoding, "v1").is_err());
    }
}
