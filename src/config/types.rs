use std::path::PathBuf;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;

/// Default location of the server configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// Prefix for environment overrides, e.g. `AUTOSALON_JWT__SECRET`.
pub const ENV_PREFIX: &str = "AUTOSALON_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    pub store: StoreConfig,
    pub jwt: JWTConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load config from a YAML file, then apply `AUTOSALON_` environment overrides.
pub fn load_config(path: &str) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
    // handle configuration migration between versions here when necessary
}

/// The JSON schema for the configuration, pretty-printed.
pub fn config_schema() -> String {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Signing parameters for the bearer tokens handed out at login.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct JWTConfig {
    pub iss: String,
    /// Token lifetime in seconds.
    pub exp: i64,
    pub secret: String,
}

/// Where uploaded car photos go and how large they may be.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> usize {
    5 * 1024 * 1024
}

fn default_max_files() -> usize {
    10
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            dir: default_upload_dir(),
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
        }
    }
}

/// Browser origins allowed to call the API with credentials.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8080".to_string(),
    ]
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            origins: default_origins(),
        }
    }
}
