//! Flat override mappings: the process environment and TOML files.
//!
//! Every override tier reads a single string by [`OverrideKey::name`].
//! Blank values are treated as unset by the tiers, not here.

use std::collections::HashMap;
use std::env::VarError;
use std::path::Path;
use std::sync::{Arc, RwLock};

use stackpro_core::{ConfigError, OverrideKey, SourceError};

pub trait OverrideSource: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &OverrideKey) -> Result<Option<String>, SourceError>;
}

/// Overrides read from the process environment at lookup time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvOverrides;

impl OverrideSource for EnvOverrides {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &OverrideKey) -> Result<Option<String>, SourceError> {
        match std::env::var(key.name()) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(SourceError::Malformed {
                source_name: self.name().to_string(),
                reason: format!("{} is not valid unicode", key.name()),
            }),
        }
    }
}

/// In-memory overrides, optionally loaded from a TOML file.
///
/// The file is a flat table. Strings are taken as-is, booleans and numbers
/// are rendered to their literal text:
///
/// ```toml
/// CAP_MESSAGING_BASE_URL = "https://messaging.internal"
/// beta_dashboard = true
/// "beta_dashboard:tenant:acme" = false
/// ```
#[derive(Debug)]
pub struct MapOverrides {
    name: String,
    values: RwLock<HashMap<String, String>>,
}

impl MapOverrides {
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            name: "memory".to_string(),
            values: RwLock::new(values),
        }
    }

    /// Parse TOML text. `origin` names the text in errors.
    pub fn from_toml_str(origin: &str, text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = text.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

        let mut values = HashMap::with_capacity(table.len());
        for (key, value) in table {
            let rendered = match value {
                toml::Value::String(s) => s,
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                other => {
                    return Err(ConfigError::Parse {
                        path: origin.to_string(),
                        reason: format!(
                            "override {} must be a string, boolean or number, got {}",
                            key,
                            other.type_str()
                        ),
                    });
                }
            };
            values.insert(key, rendered);
        }

        Ok(Self {
            name: format!("file:{}", origin),
            values: RwLock::new(values),
        })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&origin, &text)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MapOverrides {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideSource for MapOverrides {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &OverrideKey) -> Result<Option<String>, SourceError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(&key.name()).cloned())
    }
}

/// Layers consulted in order; the first layer with a value wins.
///
/// A failing layer does not hide later ones. Its error is returned only when
/// no later layer has a value.
pub struct LayeredOverrides {
    layers: Vec<Arc<dyn OverrideSource>>,
}

impl LayeredOverrides {
    pub fn new(layers: Vec<Arc<dyn OverrideSource>>) -> Self {
        Self { layers }
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }
}

impl OverrideSource for LayeredOverrides {
    fn name(&self) -> &str {
        "layered"
    }

    fn get(&self, key: &OverrideKey) -> Result<Option<String>, SourceError> {
        let mut first_error = None;
        for layer in &self.layers {
            match layer.get(key) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for LayeredOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredOverrides")
            .field("layers", &self.layer_names())
            .finish()
    }
}
