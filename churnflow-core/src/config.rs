//! Configuration system for churnflow.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! The workspace file is `churnflow.toml`; environment variables are prefixed
//! with `CHURNFLOW_` and nest with `__` (e.g. `CHURNFLOW_STORAGE__REMOTE__BUCKET`).
//!
//! The loaded [`PipelineConfig`] is passed explicitly into every component.
//! Nothing below the binary reads the process environment.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the workspace-level configuration.
pub const CONFIG_FILE_NAME: &str = "churnflow.toml";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Local root and remote object store for artifacts.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Where the training dataset comes from.
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Feature encoding artifacts and special columns.
    #[serde(default)]
    pub preprocessing: PreprocessConfig,
    /// Classifier artifact and hyperparameters.
    #[serde(default)]
    pub model: ModelConfig,
    /// Train/validation split.
    #[serde(default)]
    pub split: SplitConfig,
    /// Prediction output.
    #[serde(default)]
    pub prediction: PredictionConfig,
}

/// Artifact storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that logical paths resolve against on the local tier.
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    /// Remote object store. Absent means local-only.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_root: default_local_root(),
            remote: None,
        }
    }
}

impl StorageConfig {
    /// Local-only storage rooted at `local_root`.
    pub fn local(local_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            remote: None,
        }
    }

    /// The remote section, if it names a bucket.
    pub fn remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref().filter(|r| !r.bucket.trim().is_empty())
    }
}

fn default_local_root() -> PathBuf {
    PathBuf::from(".")
}

/// AWS S3 or S3-compatible remote object store.
///
/// Requests are SigV4-signed when `access_key_id` and `secret_access_key`
/// are both set; otherwise `token` is sent as a bearer token, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the object store (path-style addressing).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name. Empty means "not configured".
    #[serde(default)]
    pub bucket: String,
    /// Optional key prefix prepended to every logical path.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Temporary-credential session token, sent as `x-amz-security-token`.
    #[serde(default)]
    pub session_token: Option<String>,
    /// Bearer token for gateways that do not speak SigV4.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout (seconds).
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: default_region(),
            bucket: bucket.into(),
            prefix: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            token: None,
            timeout_secs: default_remote_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://s3.amazonaws.com".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_remote_timeout() -> u64 {
    60
}

/// Training dataset location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// CSV file name.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Local directory checked first.
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// Remote directory (key prefix) used when the local file is absent.
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            local_dir: default_local_dir(),
            remote_dir: default_remote_dir(),
        }
    }
}

fn default_filename() -> String {
    "churn.csv".to_string()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_remote_dir() -> String {
    "data".to_string()
}

/// Feature encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Logical path of the one-hot/label encoder artifact.
    #[serde(default = "default_encoder_path")]
    pub encoder_path: String,
    /// Logical path of the min/max scaler artifact.
    #[serde(default = "default_scaler_path")]
    pub scaler_path: String,
    /// Also upload encoder/scaler remotely, and allow remote fallback on load.
    #[serde(default)]
    pub save_remote: bool,
    /// Identifier column, excluded from features.
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Label column, excluded from features and encoded at fit time.
    #[serde(default = "default_label_column")]
    pub label_column: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            encoder_path: default_encoder_path(),
            scaler_path: default_scaler_path(),
            save_remote: false,
            id_column: default_id_column(),
            label_column: default_label_column(),
        }
    }
}

fn default_encoder_path() -> String {
    "artifacts/encoder.json".to_string()
}

fn default_scaler_path() -> String {
    "artifacts/scaler.json".to_string()
}

fn default_id_column() -> String {
    "cust_id".to_string()
}

fn default_label_column() -> String {
    "churn".to_string()
}

/// Classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Logical path of the trained model artifact.
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Also upload the model remotely.
    #[serde(default)]
    pub save_remote: bool,
    #[serde(default)]
    pub params: ClassifierParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            save_remote: false,
            params: ClassifierParams::default(),
        }
    }
}

fn default_model_path() -> String {
    "artifacts/model.json".to_string()
}

/// Hyperparameters of the softmax regression classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Stop when the loss improves by less than this between iterations.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// L2 penalty on the weights (0 disables it).
    #[serde(default)]
    pub l2: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
            l2: 0.0,
        }
    }
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_max_iter() -> usize {
    500
}

fn default_tolerance() -> f64 {
    1e-6
}

/// Train/validation split configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for validation, in `[0, 1)`.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Seed for the row shuffle.
    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            random_state: default_random_state(),
        }
    }
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

/// Prediction output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// CSV file receiving per-class probabilities.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("results").join("results.csv")
}

impl PipelineConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if !(0.0..1.0).contains(&self.split.test_size) {
            return invalid(format!(
                "split.test_size must be in [0, 1), got {}",
                self.split.test_size
            ));
        }
        let params = &self.model.params;
        if !(params.learning_rate > 0.0) {
            return invalid(format!(
                "model.params.learning_rate must be positive, got {}",
                params.learning_rate
            ));
        }
        if params.max_iter == 0 {
            return invalid("model.params.max_iter must be at least 1".into());
        }
        if params.l2 < 0.0 {
            return invalid(format!("model.params.l2 must be >= 0, got {}", params.l2));
        }
        for (field, value) in [
            ("preprocessing.encoder_path", &self.preprocessing.encoder_path),
            ("preprocessing.scaler_path", &self.preprocessing.scaler_path),
            ("model.model_path", &self.model.model_path),
        ] {
            if value.trim().is_empty() {
                return invalid(format!("{field} must not be empty"));
            }
        }
        if self.preprocessing.id_column == self.preprocessing.label_column {
            return invalid(format!(
                "preprocessing.id_column and label_column are both '{}'",
                self.preprocessing.id_column
            ));
        }
        Ok(())
    }

    /// Resolve relative filesystem locations against `workspace`.
    pub fn with_workspace(mut self, workspace: &Path) -> Self {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = workspace.join(&*p);
            }
        };
        anchor(&mut self.storage.local_root);
        anchor(&mut self.ingestion.local_dir);
        anchor(&mut self.prediction.output_path);
        self
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `CHURNFLOW_`)
/// 2. Explicit config file (`config_file`), which must exist
/// 3. Workspace config (`<workspace>/churnflow.toml`)
/// 4. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<PipelineConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    if let Some(ws) = workspace {
        let ws_config = ws.join(CONFIG_FILE_NAME);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(file) = config_file {
        if !file.exists() {
            return Err(ConfigError::FileNotFound {
                path: file.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(file));
    }

    figment = figment.merge(Env::prefixed("CHURNFLOW_").split("__"));

    let config: PipelineConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}
