//! Feature construction for the price pipeline
//!
//! Maps a raw vehicle description onto the exact feature record the trained
//! pipeline expects: derived age and usage features, engine bucketing,
//! training-time frequency and average-price lookups, and the luxury flag.

use crate::models::{EngineCategory, FeatureRecord, VehicleAttributes};
use std::collections::HashMap;
use std::sync::Arc;

/// Year the training data was anchored to
pub const REFERENCE_YEAR: i32 = 2025;

/// Brands treated as luxury, compared after upper-casing
pub const LUXURY_BRANDS: [&str; 8] = [
    "AUDI",
    "BMW",
    "MERCEDES",
    "LEXUS",
    "JAGUAR",
    "LAND ROVER",
    "PORSCHE",
    "VOLVO",
];

pub fn is_luxury_brand(brand: &str) -> bool {
    let upper = brand.to_uppercase();
    LUXURY_BRANDS.contains(&upper.as_str())
}

/// Training-time lookup tables, read-only for the life of the process
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    brand_frequency: HashMap<String, f64>,
    model_frequency: HashMap<String, f64>,
    brand_avg_price: HashMap<String, f64>,
    model_avg_price: HashMap<String, f64>,
    global_avg_price: f64,
}

impl LookupTables {
    pub fn new(
        brand_frequency: HashMap<String, f64>,
        model_frequency: HashMap<String, f64>,
        brand_avg_price: HashMap<String, f64>,
        model_avg_price: HashMap<String, f64>,
        global_avg_price: f64,
    ) -> Self {
        Self {
            brand_frequency,
            model_frequency,
            brand_avg_price,
            model_avg_price,
            global_avg_price,
        }
    }

    pub fn brand_frequency(&self, brand: &str) -> Option<f64> {
        self.brand_frequency.get(brand).copied()
    }

    pub fn model_frequency(&self, model: &str) -> Option<f64> {
        self.model_frequency.get(model).copied()
    }

    pub fn brand_avg_price(&self, brand: &str) -> Option<f64> {
        self.brand_avg_price.get(brand).copied()
    }

    pub fn model_avg_price(&self, model: &str) -> Option<f64> {
        self.model_avg_price.get(model).copied()
    }

    pub fn global_avg_price(&self) -> f64 {
        self.global_avg_price
    }

    /// Entry counts per table, for the lookup size gauge
    pub fn sizes(&self) -> [(&'static str, usize); 4] {
        [
            ("brand_freq", self.brand_frequency.len()),
            ("model_freq", self.model_frequency.len()),
            ("brand_avg", self.brand_avg_price.len()),
            ("model_avg", self.model_avg_price.len()),
        ]
    }
}

/// A value that fell back to a default policy while building features
#[derive(Debug, Clone, PartialEq)]
pub enum UnseenCategory {
    Brand(String),
    Model(String),
    EngineOutOfRange(f64),
}

impl UnseenCategory {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Brand(_) => "brand",
            Self::Model(_) => "model",
            Self::EngineOutOfRange(_) => "engine_category",
        }
    }

    pub fn value(&self) -> String {
        match self {
            Self::Brand(v) | Self::Model(v) => v.clone(),
            Self::EngineOutOfRange(cc) => cc.to_string(),
        }
    }
}

/// Builds feature records from raw vehicle attributes
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    tables: Arc<LookupTables>,
    reference_year: i32,
}

impl FeatureBuilder {
    pub fn new(tables: Arc<LookupTables>, reference_year: i32) -> Self {
        Self {
            tables,
            reference_year,
        }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn build(&self, attrs: &VehicleAttributes) -> FeatureRecord {
        self.build_with_report(attrs).0
    }

    /// Build the record and report every default substitution made on the way
    pub fn build_with_report(
        &self,
        attrs: &VehicleAttributes,
    ) -> (FeatureRecord, Vec<UnseenCategory>) {
        let mut unseen = Vec::new();

        // Not clamped: a future year of manufacture yields a negative age.
        // Widened so any i32 year is representable.
        let car_age = i64::from(self.reference_year) - i64::from(attrs.yom);
        let years_in_use = if car_age > 0 { car_age as f64 } else { 1.0 };
        let mileage_per_year = attrs.mileage / years_in_use;

        let engine_category = EngineCategory::from_engine_cc(attrs.engine);
        if engine_category.is_none() {
            unseen.push(UnseenCategory::EngineOutOfRange(attrs.engine));
        }

        let global = self.tables.global_avg_price();

        let brand_frequency = self.tables.brand_frequency(&attrs.brand);
        let brand_avg_price = self.tables.brand_avg_price(&attrs.brand);
        if brand_frequency.is_none() || brand_avg_price.is_none() {
            unseen.push(UnseenCategory::Brand(attrs.brand.clone()));
        }

        let model_frequency = self.tables.model_frequency(&attrs.model);
        let model_avg_price = self.tables.model_avg_price(&attrs.model);
        if model_frequency.is_none() || model_avg_price.is_none() {
            unseen.push(UnseenCategory::Model(attrs.model.clone()));
        }

        let record = FeatureRecord {
            yom: attrs.yom,
            mileage: attrs.mileage,
            engine: attrs.engine,
            gear: attrs.gear.clone(),
            fuel: attrs.fuel.clone(),
            town: attrs.town.clone(),
            condition: attrs.condition.clone(),
            aircon: attrs.aircon,
            ps: attrs.ps,
            pm: attrs.pm,
            pw: attrs.pw,
            leasing: attrs.leasing,
            brand: attrs.brand.clone(),
            car_age,
            mileage_per_year,
            engine_category,
            year_listed: attrs.year_listed,
            month_listed: attrs.month_listed,
            brand_frequency: brand_frequency.unwrap_or(0.0),
            model_frequency: model_frequency.unwrap_or(0.0),
            brand_avg_price: brand_avg_price.unwrap_or(global),
            model_avg_price: model_avg_price.unwrap_or(global),
            is_luxury_brand: is_luxury_brand(&attrs.brand),
        };

        (record, unseen)
    }
}
