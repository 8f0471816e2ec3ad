//! Configuration loading for the supported document formats
//!
//! - JSON via serde_json
//! - YAML via serde_yaml
//! - TOML via toml
//!
//! The format is picked from the file extension. Loading is two-step: parse
//! into the raw document, then validate into the immutable config.

use crate::error::LoadError;
use crate::network::{NetworkConfig, RawNetworkConfig};
use crate::tenant::{validate_tenants, RawTenantList, TenantConfig};
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl ConfigFormat {
    /// All formats, in lookup order
    pub const ALL: [ConfigFormat; 3] = [Self::Json, Self::Yaml, Self::Toml];

    /// Supported file extensions (without dot)
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Json => &["json"],
            Self::Yaml => &["yaml", "yml"],
            Self::Toml => &["toml"],
        }
    }

    /// Format for an extension, case-insensitive
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&extension.as_str()))
    }

    /// Format for a path
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension).ok_or_else(|| LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: extension.to_string(),
        })
    }

    /// Deserialize a document; `origin` labels syntax errors
    pub fn parse<T: DeserializeOwned>(self, content: &str, origin: &Path) -> Result<T, LoadError> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| LoadError::syntax_error(origin, format!("JSON parse error: {e}"))),
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| LoadError::syntax_error(origin, format!("YAML parse error: {e}"))),
            Self::Toml => toml::from_str(content)
                .map_err(|e| LoadError::syntax_error(origin, format!("TOML parse error: {e}"))),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extensions()[0])
    }
}

/// Parse and validate a network document held in memory
pub fn parse_network_config(
    content: &str,
    format: ConfigFormat,
    origin: &Path,
) -> Result<NetworkConfig, LoadError> {
    let raw: RawNetworkConfig = format.parse(content, origin)?;
    Ok(NetworkConfig::try_from(raw)?)
}

/// Parse and validate a tenant list held in memory
pub fn parse_tenant_configs(
    content: &str,
    format: ConfigFormat,
    origin: &Path,
) -> Result<Vec<TenantConfig>, LoadError> {
    let raw: RawTenantList = format.parse(content, origin)?;
    Ok(validate_tenants(raw.into_records())?)
}

/// Read, parse and validate the network document at `path`
pub fn load_network_config(path: impl AsRef<Path>) -> Result<NetworkConfig, LoadError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = read(path)?;
    let config = parse_network_config(&content, format, path)?;
    tracing::debug!("Loaded network config from {} ({})", path.display(), format);
    Ok(config)
}

/// Read, parse and validate the tenant list at `path`
pub fn load_tenant_configs(path: impl AsRef<Path>) -> Result<Vec<TenantConfig>, LoadError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = read(path)?;
    let tenants = parse_tenant_configs(&content, format, path)?;
    tracing::debug!(
        "Loaded {} tenant configs from {} ({})",
        tenants.len(),
        path.display(),
        format
    );
    Ok(tenants)
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::io_error(path, e))
}
