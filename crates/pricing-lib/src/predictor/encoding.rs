//! Column encoding for the ONNX regression graph
//!
//! The training pipeline's column transformer is persisted as JSON so the
//! exported graph only needs the numeric regressor. Numeric columns are
//! standardized and categorical columns are one-hot encoded, unknown values
//! encoding as all zeros.

use crate::models::{FeatureRecord, FeatureValue};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    Numeric {
        name: String,
        #[serde(default)]
        center: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    Categorical {
        name: String,
        categories: Vec<String>,
    },
}

fn default_scale() -> f64 {
    1.0
}

impl ColumnEncoding {
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. } | Self::Categorical { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// Encoding of every feature record column, in pipeline order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureEncoding {
    pub columns: Vec<ColumnEncoding>,
}

impl FeatureEncoding {
    /// Check the encoding against the feature record schema.
    ///
    /// Returns a description of the first mismatch.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.len() != FeatureRecord::COLUMNS.len() {
            return Err(format!(
                "expected {} columns, found {}",
                FeatureRecord::COLUMNS.len(),
                self.columns.len()
            ));
        }

        // Kinds are taken from a sample record; the value kind of a column never
        // depends on the data.
        let sample = FeatureRecord::schema_sample();
        for ((expected, value), column) in sample.values().into_iter().zip(&self.columns) {
            if column.name() != expected {
                return Err(format!(
                    "column {:?} found where {:?} was expected",
                    column.name(),
                    expected
                ));
            }
            match (column, value) {
                (ColumnEncoding::Numeric { scale, center, .. }, FeatureValue::Number(_)) => {
                    if !scale.is_finite() || *scale == 0.0 || !center.is_finite() {
                        return Err(format!("column {:?} has an invalid scale", expected));
                    }
                }
                (ColumnEncoding::Categorical { categories, .. }, FeatureValue::Category(_)) => {
                    if categories.is_empty() {
                        return Err(format!("column {:?} has no categories", expected));
                    }
                }
                (ColumnEncoding::Numeric { .. }, FeatureValue::Category(_)) => {
                    return Err(format!("column {:?} must be categorical", expected));
                }
                (ColumnEncoding::Categorical { .. }, FeatureValue::Number(_)) => {
                    return Err(format!("column {:?} must be numeric", expected));
                }
            }
        }
        Ok(())
    }

    /// Width of the encoded input row
    pub fn width(&self) -> usize {
        self.columns.iter().map(ColumnEncoding::width).sum()
    }

    pub fn encode(&self, record: &FeatureRecord) -> Vec<f32> {
        let mut row = Vec::with_capacity(self.width());
        for ((_, value), column) in record.values().into_iter().zip(&self.columns) {
            match (column, value) {
                (ColumnEncoding::Numeric { center, scale, .. }, FeatureValue::Number(v)) => {
                    row.push(((v - center) / scale) as f32);
                }
                (ColumnEncoding::Categorical { categories, .. }, FeatureValue::Category(v)) => {
                    row.extend(
                        categories
                            .iter()
                            .map(|c| if Some(c.as_str()) == v { 1.0 } else { 0.0 }),
                    );
                }
                // Rejected by validate(); keep the row width stable regardless.
                (column, _) => row.extend(std::iter::repeat(0.0).take(column.width())),
            }
        }
        row
    }
}

impl FeatureRecord {
    pub(crate) fn schema_sample() -> Self {
        Self {
            yom: 0,
            mileage: 0.0,
            engine: 0.0,
            gear: String::new(),
            fuel: String::new(),
            town: String::new(),
            condition: String::new(),
            aircon: 0,
            ps: 0,
            pm: 0,
            pw: 0,
            leasing: 0,
            brand: String::new(),
            car_age: 0,
            mileage_per_year: 0.0,
            engine_category: None,
            year_listed: 0,
            month_listed: 0,
            brand_frequency: 0.0,
            model_frequency: 0.0,
            brand_avg_price: 0.0,
            model_avg_price: 0.0,
            is_luxury_brand: false,
        }
    }
}
