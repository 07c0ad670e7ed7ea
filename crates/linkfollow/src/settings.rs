//! Declarative link kind configuration

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request settings for one link kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindSettings {
    /// Media types for the `Accept` header, in order of preference
    pub accept: Vec<String>,
    /// Whether unconsumed parameters are merged into the query string
    pub query_bearing: bool,
    /// Headers added unless a builder already set them
    pub headers: BTreeMap<String, String>,
    /// Headers that must be present once the chain has run
    pub required_headers: Vec<String>,
}

impl Default for KindSettings {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            query_bearing: true,
            headers: BTreeMap::new(),
            required_headers: Vec::new(),
        }
    }
}

/// Settings consumed by [`LinkFactory::from_settings`](crate::LinkFactory::from_settings)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `User-Agent` sent by every configured kind
    pub user_agent: Option<String>,
    /// Per kind settings, keyed by kind name
    pub kinds: BTreeMap<String, KindSettings>,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load settings from a file, the format follows the extension
    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        let settings: Settings = config.try_deserialize()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            kinds = settings.kinds.len(),
            "Loaded link settings"
        );
        Ok(settings)
    }
}
