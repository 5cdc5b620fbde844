use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DEFAULT_GENE_PREFIX, is_placeholder};
use crate::error::WormbaitError;
use crate::wormbase::{DEFAULT_SERVICE_BASE, DEFAULT_TIMEOUT_SECS};

pub const CONFIG_FILE_NAME: &str = "wormbait.json";

/// Contents of `wormbait.json`: the last-used inputs plus service settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Preferences {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xloc_ids: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deg_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_prefix: Option<String>,
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub identifiers: Option<String>,
    pub database: Option<Utf8PathBuf>,
    pub output: Option<Utf8PathBuf>,
    pub service_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub path: PathBuf,
    pub identifiers: Option<String>,
    pub database: Option<Utf8PathBuf>,
    pub output: Option<Utf8PathBuf>,
    pub service_base: String,
    pub timeout: Duration,
    pub gene_prefix: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Explicit path, else `./wormbait.json`, else the user config directory.
    pub fn locate(path: Option<&str>) -> PathBuf {
        if let Some(path) = path {
            return PathBuf::from(path);
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("wormbait").join(CONFIG_FILE_NAME))
            .unwrap_or(local)
    }

    pub fn load(path: &std::path::Path) -> Result<Preferences, WormbaitError> {
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file");
            return Ok(Preferences::default());
        }
        let content =
            fs::read_to_string(path).map_err(|_| WormbaitError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| WormbaitError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&str>,
        overrides: Overrides,
    ) -> Result<ResolvedConfig, WormbaitError> {
        let config_path = Self::locate(path);
        if path.is_some() && !config_path.exists() {
            return Err(WormbaitError::ConfigRead(config_path));
        }
        let preferences = Self::load(&config_path)?;
        Ok(Self::resolve_preferences(preferences, overrides, config_path))
    }

    pub fn resolve_preferences(
        preferences: Preferences,
        overrides: Overrides,
        path: PathBuf,
    ) -> ResolvedConfig {
        let remembered = |value: Option<String>| value.filter(|value| !is_placeholder(value));

        ResolvedConfig {
            schema_version: preferences.schema_version.unwrap_or(1),
            path,
            identifiers: overrides
                .identifiers
                .or_else(|| remembered(preferences.xloc_ids)),
            database: overrides
                .database
                .or_else(|| remembered(preferences.deg_file).map(Utf8PathBuf::from)),
            output: overrides
                .output
                .or_else(|| remembered(preferences.out_file).map(Utf8PathBuf::from)),
            service_base: overrides
                .service_base
                .or(preferences.service_base)
                .unwrap_or_else(|| DEFAULT_SERVICE_BASE.to_string()),
            timeout: Duration::from_secs(
                overrides
                    .timeout_secs
                    .or(preferences.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            gene_prefix: preferences
                .gene_prefix
                .unwrap_or_else(|| DEFAULT_GENE_PREFIX.to_string()),
        }
    }
}

impl Preferences {
    /// Snapshot of the inputs of a run, identifiers stored comma-joined.
    pub fn remember(&mut self, identifiers: &[String], database: &str, output: &str) {
        self.schema_version.get_or_insert(1);
        self.xloc_ids = Some(identifiers.join(","));
        self.deg_file = Some(database.to_string());
        self.out_file = Some(output.to_string());
    }

    pub fn save(&self, path: &std::path::Path) -> Result<(), WormbaitError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|err| WormbaitError::ConfigWrite(err.to_string()))?;
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| WormbaitError::ConfigWrite(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".wormbait-config")
            .tempfile_in(&parent)
            .map_err(|err| WormbaitError::ConfigWrite(err.to_string()))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.write_all(b"\n"))
            .map_err(|err| WormbaitError::ConfigWrite(err.to_string()))?;
        temp.persist(path)
            .map_err(|err| WormbaitError::ConfigWrite(err.to_string()))?;
        Ok(())
    }
}
