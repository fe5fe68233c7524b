//! Library for used-vehicle price prediction
//!
//! This crate provides the core functionality for:
//! - Turning a raw vehicle description into the trained pipeline's feature record
//! - Loading the persisted model and lookup-table artifacts
//! - Running ONNX inference and scaling the output to currency units
//! - Health checks and observability

pub mod artifacts;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{load_artifacts, ArtifactError, ArtifactPaths, LoadedArtifacts};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{FeatureBuilder, LookupTables, PredictionService, PricePipeline};
