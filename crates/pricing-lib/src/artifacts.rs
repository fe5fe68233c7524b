//! Loading of persisted model artifacts
//!
//! The training side writes a fixed set of files into one directory: the
//! exported ONNX graph, its column encoding, four lookup tables and the
//! global average price. An optional manifest pins a model version and the
//! SHA-256 of each file. Any failure here is fatal at startup.

use crate::predictor::{FeatureEncoding, LookupTables, OnnxPipeline};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const MODEL_FILE: &str = "car_price_model.onnx";
pub const ENCODING_FILE: &str = "feature_encoding.json";
pub const BRAND_FREQ_FILE: &str = "brand_freq_map.json";
pub const MODEL_FREQ_FILE: &str = "model_freq_map.json";
pub const BRAND_AVG_FILE: &str = "brand_avg_map.json";
pub const MODEL_AVG_FILE: &str = "model_avg_map.json";
pub const GLOBAL_AVG_FILE: &str = "global_avg_price.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Version reported when no manifest is present
pub const UNVERSIONED: &str = "unversioned";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checksum mismatch for {file}: manifest has {expected}, file hashes to {actual}")]
    Checksum {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("global average price in {} must be finite, found {value}", path.display())]
    InvalidGlobalAverage { path: PathBuf, value: f64 },

    #[error("feature encoding {} does not match the feature record: {reason}", path.display())]
    Schema { path: PathBuf, reason: String },

    #[error("failed to load model {}: {message}", path.display())]
    Model { path: PathBuf, message: String },
}

/// Locations of every artifact inside the artifacts directory
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub encoding: PathBuf,
    pub brand_freq: PathBuf,
    pub model_freq: PathBuf,
    pub brand_avg: PathBuf,
    pub model_avg: PathBuf,
    pub global_avg: PathBuf,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            model: dir.join(MODEL_FILE),
            encoding: dir.join(ENCODING_FILE),
            brand_freq: dir.join(BRAND_FREQ_FILE),
            model_freq: dir.join(MODEL_FREQ_FILE),
            brand_avg: dir.join(BRAND_AVG_FILE),
            model_avg: dir.join(MODEL_AVG_FILE),
            global_avg: dir.join(GLOBAL_AVG_FILE),
            manifest: dir.join(MANIFEST_FILE),
            dir,
        }
    }
}

/// Version and checksums published alongside the artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactManifest {
    pub model_version: String,
    #[serde(default)]
    pub sha256: HashMap<String, String>,
}

impl ArtifactManifest {
    /// Verify `bytes` against the manifest entry for the file at `path`.
    ///
    /// Files without an entry are accepted.
    pub fn verify(&self, path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(expected) = self.sha256.get(&file) else {
            return Ok(());
        };

        let actual = hex::encode(Sha256::digest(bytes));
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(ArtifactError::Checksum {
                file,
                expected: expected.clone(),
                actual,
            });
        }

        debug!(file = %file, "Artifact checksum verified");
        Ok(())
    }
}

/// Everything the prediction service needs, loaded once at startup
pub struct LoadedArtifacts {
    pub pipeline: OnnxPipeline,
    pub tables: LookupTables,
    pub model_version: String,
}

/// Load and validate every artifact in `dir`
pub fn load_artifacts(dir: impl AsRef<Path>) -> Result<LoadedArtifacts, ArtifactError> {
    let paths = ArtifactPaths::in_dir(dir);

    let manifest = load_manifest(&paths)?;
    let model_version = manifest
        .as_ref()
        .map(|m| m.model_version.clone())
        .unwrap_or_else(|| UNVERSIONED.to_string());

    let tables = load_lookup_tables(&paths, manifest.as_ref())?;
    let encoding = load_encoding(&paths, manifest.as_ref())?;

    let model_bytes = read_artifact(&paths.model, manifest.as_ref())?;
    let pipeline = OnnxPipeline::new(&model_bytes, encoding, model_version.clone()).map_err(|e| {
        ArtifactError::Model {
            path: paths.model.clone(),
            message: format!("{:#}", e),
        }
    })?;

    info!(
        dir = %paths.dir.display(),
        model_version = %model_version,
        "Loaded price pipeline artifacts"
    );

    Ok(LoadedArtifacts {
        pipeline,
        tables,
        model_version,
    })
}

/// Read the manifest if one was published
pub fn load_manifest(paths: &ArtifactPaths) -> Result<Option<ArtifactManifest>, ArtifactError> {
    if !paths.manifest.exists() {
        debug!(
            path = %paths.manifest.display(),
            "No artifact manifest, skipping checksum validation"
        );
        return Ok(None);
    }
    let bytes = read_artifact(&paths.manifest, None)?;
    parse_json(&paths.manifest, &bytes).map(Some)
}

pub fn load_lookup_tables(
    paths: &ArtifactPaths,
    manifest: Option<&ArtifactManifest>,
) -> Result<LookupTables, ArtifactError> {
    let brand_freq: HashMap<String, f64> = read_json(&paths.brand_freq, manifest)?;
    let model_freq: HashMap<String, f64> = read_json(&paths.model_freq, manifest)?;
    let brand_avg: HashMap<String, f64> = read_json(&paths.brand_avg, manifest)?;
    let model_avg: HashMap<String, f64> = read_json(&paths.model_avg, manifest)?;
    let global_avg: f64 = read_json(&paths.global_avg, manifest)?;
    if !global_avg.is_finite() {
        return Err(ArtifactError::InvalidGlobalAverage {
            path: paths.global_avg.clone(),
            value: global_avg,
        });
    }

    Ok(LookupTables::new(
        brand_freq, model_freq, brand_avg, model_avg, global_avg,
    ))
}

pub fn load_encoding(
    paths: &ArtifactPaths,
    manifest: Option<&ArtifactManifest>,
) -> Result<FeatureEncoding, ArtifactError> {
    let encoding: FeatureEncoding = read_json(&paths.encoding, manifest)?;
    encoding
        .validate()
        .map_err(|reason| ArtifactError::Schema {
            path: paths.encoding.clone(),
            reason,
        })?;
    Ok(encoding)
}

fn read_artifact(
    path: &Path,
    manifest: Option<&ArtifactManifest>,
) -> Result<Vec<u8>, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(manifest) = manifest {
        manifest.verify(path, &bytes)?;
    }
    Ok(bytes)
}

fn read_json<T: DeserializeOwned>(
    path: &Path,
    manifest: Option<&ArtifactManifest>,
) -> Result<T, ArtifactError> {
    let bytes = read_artifact(path, manifest)?;
    parse_json(path, &bytes)
}

fn parse_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::encoding_fixture;
    use tempfile::TempDir;

    fn write_tables(dir: &Path) {
        fs::write(dir.join(BRAND_FREQ_FILE), r#"{"TOYOTA": 5400, "SUZUKI": 3100}"#).unwrap();
        fs::write(dir.join(MODEL_FREQ_FILE), r#"{"AQUA": 900, "WAGON R": 700}"#).unwrap();
        fs::write(dir.join(BRAND_AVG_FILE), r#"{"TOYOTA": 72.4, "SUZUKI": 31.5}"#).unwrap();
        fs::write(dir.join(MODEL_AVG_FILE), r#"{"AQUA": 58.0}"#).unwrap();
        fs::write(dir.join(GLOBAL_AVG_FILE), "61.25").unwrap();
        fs::write(dir.join(ENCODING_FILE), encoding_fixture()).unwrap();
    }

    fn sha256_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    #[test]
    fn test_paths_use_fixed_names() {
        let paths = ArtifactPaths::in_dir("/srv/artifacts");
        assert_eq!(paths.model, PathBuf::from("/srv/artifacts/car_price_model.onnx"));
        assert_eq!(paths.global_avg, PathBuf::from("/srv/artifacts/global_avg_price.json"));
    }

    #[test]
    fn test_load_lookup_tables() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        let paths = ArtifactPaths::in_dir(dir.path());

        let tables = load_lookup_tables(&paths, None).unwrap();
        assert_eq!(tables.brand_frequency("TOYOTA"), Some(5400.0));
        assert_eq!(tables.model_frequency("WAGON R"), Some(700.0));
        assert_eq!(tables.brand_avg_price("SUZUKI"), Some(31.5));
        assert_eq!(tables.model_avg_price("ALTO"), None);
        assert_eq!(tables.global_avg_price(), 61.25);
    }

    #[test]
    fn test_missing_table_is_read_error() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        fs::remove_file(dir.path().join(MODEL_AVG_FILE)).unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let err = load_lookup_tables(&paths, None).unwrap_err();
        assert!(matches!(err, ArtifactError::Read { .. }));
        assert!(err.to_string().contains(MODEL_AVG_FILE));
    }

    #[test]
    fn test_corrupt_table_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        fs::write(dir.path().join(BRAND_FREQ_FILE), "{not json").unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let err = load_lookup_tables(&paths, None).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_non_numeric_global_average_rejected() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        fs::write(dir.path().join(GLOBAL_AVG_FILE), r#"{"mean": 61.25}"#).unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let err = load_lookup_tables(&paths, None).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_overflowing_global_average_rejected() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        fs::write(dir.path().join(GLOBAL_AVG_FILE), "1e400").unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        // serde_json refuses out-of-range floats; either way nothing infinite gets through
        assert!(load_lookup_tables(&paths, None).is_err());
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        let manifest = format!(
            r#"{{"model_version": "2025.01", "sha256": {{"{}": "{}"}}}}"#,
            BRAND_FREQ_FILE,
            sha256_hex(b"something else")
        );
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let manifest = load_manifest(&paths).unwrap().unwrap();
        let err = load_lookup_tables(&paths, Some(&manifest)).unwrap_err();
        assert!(matches!(err, ArtifactError::Checksum { ref file, .. } if file == BRAND_FREQ_FILE));
    }

    #[test]
    fn test_checksum_match_accepted() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        let contents = fs::read(dir.path().join(GLOBAL_AVG_FILE)).unwrap();
        let manifest = format!(
            r#"{{"model_version": "2025.01", "sha256": {{"{}": "{}"}}}}"#,
            GLOBAL_AVG_FILE,
            sha256_hex(&contents).to_uppercase()
        );
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let manifest = load_manifest(&paths).unwrap().unwrap();
        assert_eq!(manifest.model_version, "2025.01");
        assert!(load_lookup_tables(&paths, Some(&manifest)).is_ok());
    }

    #[test]
    fn test_manifest_is_optional() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        assert!(load_manifest(&paths).unwrap().is_none());
    }

    #[test]
    fn test_encoding_schema_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        fs::write(
            dir.path().join(ENCODING_FILE),
            r#"{"columns": [{"name": "YOM", "kind": "numeric"}]}"#,
        )
        .unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let err = load_encoding(&paths, None).unwrap_err();
        assert!(matches!(err, ArtifactError::Schema { .. }));
    }

    #[test]
    fn test_load_encoding() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        let paths = ArtifactPaths::in_dir(dir.path());

        let encoding = load_encoding(&paths, None).unwrap();
        assert_eq!(encoding.columns.len(), 23);
    }

    #[test]
    fn test_missing_model_fails_startup() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());

        let err = load_artifacts(dir.path()).err().unwrap();
        assert!(matches!(err, ArtifactError::Read { ref path, .. } if path.ends_with(MODEL_FILE)));
    }

    #[test]
    fn test_corrupt_model_fails_startup() {
        let dir = TempDir::new().unwrap();
        write_tables(dir.path());
        fs::write(dir.path().join(MODEL_FILE), b"definitely not protobuf").unwrap();

        let err = load_artifacts(dir.path()).err().unwrap();
        assert!(matches!(err, ArtifactError::Model { .. }));
    }
}
