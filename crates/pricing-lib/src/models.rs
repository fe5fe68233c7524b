//! Core data models for the price predictor

use serde::{Deserialize, Serialize};

/// Raw vehicle description as submitted to `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAttributes {
    pub yom: i32,
    pub mileage: f64,
    pub engine: f64,
    pub brand: String,
    pub model: String,
    pub gear: String,
    pub fuel: String,
    pub condition: String,
    #[serde(default = "default_town")]
    pub town: String,
    #[serde(default = "default_flag_on")]
    pub aircon: i32,
    #[serde(default = "default_flag_on")]
    pub ps: i32,
    #[serde(default = "default_flag_on")]
    pub pm: i32,
    #[serde(default = "default_flag_on")]
    pub pw: i32,
    #[serde(default)]
    pub leasing: i32,
    #[serde(default = "default_year_listed")]
    pub year_listed: i32,
    #[serde(default = "default_month_listed")]
    pub month_listed: i32,
}

fn default_town() -> String {
    "Colombo".to_string()
}

fn default_flag_on() -> i32 {
    1
}

fn default_year_listed() -> i32 {
    2025
}

fn default_month_listed() -> i32 {
    1
}

impl VehicleAttributes {
    /// Build attributes from the required fields, leaving every optional
    /// field at its request default.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        yom: i32,
        mileage: f64,
        engine: f64,
        brand: impl Into<String>,
        model: impl Into<String>,
        gear: impl Into<String>,
        fuel: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            yom,
            mileage,
            engine,
            brand: brand.into(),
            model: model.into(),
            gear: gear.into(),
            fuel: fuel.into(),
            condition: condition.into(),
            town: default_town(),
            aircon: default_flag_on(),
            ps: default_flag_on(),
            pm: default_flag_on(),
            pw: default_flag_on(),
            leasing: 0,
            year_listed: default_year_listed(),
            month_listed: default_month_listed(),
        }
    }
}

/// Ordinal bucket of engine displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCategory {
    Small,
    Medium,
    Large,
    #[serde(rename = "Very Large")]
    VeryLarge,
}

impl EngineCategory {
    /// Bucket engine cc into (0,1000], (1000,2000], (2000,4000], (4000,inf].
    ///
    /// Zero, negative and NaN displacements fall outside every bin.
    pub fn from_engine_cc(cc: f64) -> Option<Self> {
        if cc > 0.0 && cc <= 1000.0 {
            Some(Self::Small)
        } else if cc > 1000.0 && cc <= 2000.0 {
            Some(Self::Medium)
        } else if cc > 2000.0 && cc <= 4000.0 {
            Some(Self::Large)
        } else if cc > 4000.0 {
            Some(Self::VeryLarge)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::VeryLarge => "Very Large",
        }
    }
}

/// Single-row input for the trained pipeline.
///
/// Field order and serialized names are the column schema the pipeline was
/// fit on. Reordering or renaming a field silently corrupts predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    #[serde(rename = "YOM")]
    pub yom: i32,
    #[serde(rename = "Millage(KM)")]
    pub mileage: f64,
    #[serde(rename = "Engine (cc)")]
    pub engine: f64,
    #[serde(rename = "Gear")]
    pub gear: String,
    #[serde(rename = "Fuel Type")]
    pub fuel: String,
    #[serde(rename = "Town")]
    pub town: String,
    #[serde(rename = "Condition")]
    pub condition: String,
    #[serde(rename = "AIR CONDITION")]
    pub aircon: i32,
    #[serde(rename = "POWER STEERING")]
    pub ps: i32,
    #[serde(rename = "POWER MIRROR")]
    pub pm: i32,
    #[serde(rename = "POWER WINDOW")]
    pub pw: i32,
    #[serde(rename = "Leasing")]
    pub leasing: i32,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Car_Age")]
    pub car_age: i64,
    #[serde(rename = "Mileage_per_Year")]
    pub mileage_per_year: f64,
    #[serde(rename = "Engine_Category")]
    pub engine_category: Option<EngineCategory>,
    #[serde(rename = "Year_Listed")]
    pub year_listed: i32,
    #[serde(rename = "Month_Listed")]
    pub month_listed: i32,
    #[serde(rename = "Brand_Freq")]
    pub brand_frequency: f64,
    #[serde(rename = "Model_Freq")]
    pub model_frequency: f64,
    #[serde(rename = "Brand_AvgPrice")]
    pub brand_avg_price: f64,
    #[serde(rename = "Model_AvgPrice")]
    pub model_avg_price: f64,
    #[serde(rename = "Luxury_Brand", serialize_with = "serialize_flag")]
    pub is_luxury_brand: bool,
}

fn serialize_flag<S: serde::Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

/// A single cell of the feature record as seen by the column encoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Number(f64),
    Category(Option<&'a str>),
}

impl FeatureRecord {
    /// Column names in pipeline order
    pub const COLUMNS: [&'static str; 23] = [
        "YOM",
        "Millage(KM)",
        "Engine (cc)",
        "Gear",
        "Fuel Type",
        "Town",
        "Condition",
        "AIR CONDITION",
        "POWER STEERING",
        "POWER MIRROR",
        "POWER WINDOW",
        "Leasing",
        "Brand",
        "Car_Age",
        "Mileage_per_Year",
        "Engine_Category",
        "Year_Listed",
        "Month_Listed",
        "Brand_Freq",
        "Model_Freq",
        "Brand_AvgPrice",
        "Model_AvgPrice",
        "Luxury_Brand",
    ];

    /// Cells in pipeline order, paired with their column names
    pub fn values(&self) -> Vec<(&'static str, FeatureValue<'_>)> {
        use FeatureValue::{Category, Number};

        let cells = [
            Number(self.yom as f64),
            Number(self.mileage),
            Number(self.engine),
            Category(Some(self.gear.as_str())),
            Category(Some(self.fuel.as_str())),
            Category(Some(self.town.as_str())),
            Category(Some(self.condition.as_str())),
            Number(self.aircon as f64),
            Number(self.ps as f64),
            Number(self.pm as f64),
            Number(self.pw as f64),
            Number(self.leasing as f64),
            Category(Some(self.brand.as_str())),
            Number(self.car_age as f64),
            Number(self.mileage_per_year),
            Category(self.engine_category.map(|c| c.label())),
            Number(self.year_listed as f64),
            Number(self.month_listed as f64),
            Number(self.brand_frequency),
            Number(self.model_frequency),
            Number(self.brand_avg_price),
            Number(self.model_avg_price),
            Number(if self.is_luxury_brand { 1.0 } else { 0.0 }),
        ];

        Self::COLUMNS.into_iter().zip(cells).collect()
    }
}

/// Response body of `POST /predict`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    #[serde(rename = "Predicted Price")]
    pub predicted_price: f64,
}

/// Error body returned for rejected or failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_take_defaults() {
        let json = r#"{
            "yom": 2012, "mileage": 120000, "engine": 1500,
            "brand": "TOYOTA", "model": "AQUA", "gear": "Auto",
            "fuel": "Petrol", "condition": "Used"
        }"#;
        let attrs: VehicleAttributes = serde_json::from_str(json).unwrap();

        assert_eq!(attrs.town, "Colombo");
        assert_eq!((attrs.aircon, attrs.ps, attrs.pm, attrs.pw), (1, 1, 1, 1));
        assert_eq!(attrs.leasing, 0);
        assert_eq!(attrs.year_listed, 2025);
        assert_eq!(attrs.month_listed, 1);
        let explicit = VehicleAttributes::new(
            2012, 120000.0, 1500.0, "TOYOTA", "AQUA", "Auto", "Petrol", "Used",
        );
        assert_eq!(attrs, explicit);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let json = r#"{"yom": 2012, "mileage": 120000, "engine": 1500, "brand": "TOYOTA"}"#;
        assert!(serde_json::from_str::<VehicleAttributes>(json).is_err());
    }

    #[test]
    fn test_fractional_year_rejected() {
        let json = r#"{
            "yom": 2012.5, "mileage": 1, "engine": 1, "brand": "A", "model": "B",
            "gear": "Auto", "fuel": "Petrol", "condition": "Used"
        }"#;
        assert!(serde_json::from_str::<VehicleAttributes>(json).is_err());
    }

    #[test]
    fn test_engine_category_boundaries() {
        assert_eq!(EngineCategory::from_engine_cc(0.0), None);
        assert_eq!(EngineCategory::from_engine_cc(-5.0), None);
        assert_eq!(EngineCategory::from_engine_cc(f64::NAN), None);
        assert_eq!(EngineCategory::from_engine_cc(0.5), Some(EngineCategory::Small));
        assert_eq!(EngineCategory::from_engine_cc(1000.0), Some(EngineCategory::Small));
        assert_eq!(EngineCategory::from_engine_cc(1000.0001), Some(EngineCategory::Medium));
        assert_eq!(EngineCategory::from_engine_cc(2000.0), Some(EngineCategory::Medium));
        assert_eq!(EngineCategory::from_engine_cc(4000.0), Some(EngineCategory::Large));
        assert_eq!(
            EngineCategory::from_engine_cc(4000.0001),
            Some(EngineCategory::VeryLarge)
        );
        assert_eq!(
            EngineCategory::from_engine_cc(f64::INFINITY),
            Some(EngineCategory::VeryLarge)
        );
    }

    #[test]
    fn test_engine_category_serializes_label() {
        let json = serde_json::to_string(&EngineCategory::VeryLarge).unwrap();
        assert_eq!(json, "\"Very Large\"");
    }

    #[test]
    fn test_prediction_response_field_name() {
        let body = serde_json::to_value(PricePrediction { predicted_price: 4_250_000.5 }).unwrap();
        assert_eq!(body["Predicted Price"], 4_250_000.5);
    }
}
