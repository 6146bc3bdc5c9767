//! Engine configuration
//!
//! Loaded from YAML or JSON (by file extension). A missing file is created
//! with the defaults, the same way agency profiles bootstrap themselves.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::ConfigError;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "KIT_READINESS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "kit_readiness.yaml";

/// Classifier and readiness rule tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Equipment model names that mark a telemetry kit
    pub telemetry_markers: Vec<String>,
    /// Equipment model names that mark a tracking kit
    pub tracking_markers: Vec<String>,
    /// Usage-type tags that require telemetry kits
    pub telemetry_usage_types: Vec<String>,
    /// Usage-type tags that require tracking kits
    pub tracking_usage_types: Vec<String>,
    /// Product names excluded from the readiness gate
    pub module_names: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            telemetry_markers: strings(&["FMC650", "FMC 650"]),
            tracking_markers: strings(&["ST310", "ST 310"]),
            telemetry_usage_types: strings(&["telemetria_gps", "telemetria_can"]),
            tracking_usage_types: strings(&["comercial", "rastreamento", "copiloto"]),
            module_names: strings(&["MODULO CAN", "MODULO SATELITAL", "MODULO DE EXPANSAO", "MODULO BLUETOOTH"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    pub catalog_path: PathBuf,
    pub vehicles_path: PathBuf,
    pub homologation_path: PathBuf,
    pub rules: RulesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_filter: "kit_readiness=info".to_string(),
            catalog_path: PathBuf::from("kits.json"),
            vehicles_path: PathBuf::from("vehicles.json"),
            homologation_path: PathBuf::from("homologation.json"),
            rules: RulesConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse config text; `.json` files are JSON, everything else YAML
    pub fn parse(path: &Path, content: &str) -> std::result::Result<Self, ConfigError> {
        if is_json(path) {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(serde_yaml::from_str(content)?)
        }
    }

    pub fn render(&self, path: &Path) -> Result<String> {
        if is_json(path) {
            Ok(serde_json::to_string_pretty(self)?)
        } else {
            Ok(serde_yaml::to_string(self)?)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `KIT_READINESS_CONFIG`, else the default file name
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            info!("Config {} not found, writing defaults", self.path.display());
            let default = EngineConfig::default();
            self.save(&default).await?;
            return Ok(default);
        }
        let content = fs::read_to_string(&self.path).await.map_err(|source| ConfigError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        let config = EngineConfig::parse(&self.path, &content)?;
        Ok(config)
    }

    pub async fn save(&self, config: &EngineConfig) -> Result<()> {
        let content = config.render(&self.path)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}
