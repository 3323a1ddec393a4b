//! Engine configuration.
//!
//! Settings live in the `[inference]` table of a TOML document, usually the
//! project's `duckhint.toml`. Every field is optional; a missing table or a
//! missing file section yields [`InferConfig::default`].

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Tunables for the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InferConfig {
    /// Largest candidate set duck typing still reports as a union.
    /// Anything bigger is considered too ambiguous.
    pub duck_max_candidates: usize,
    /// Recursion depth at which inference gives up on a chain.
    pub max_depth: usize,
    /// Type-level methods that construct an instance of the receiver.
    pub constructor_methods: Vec<String>,
    /// Instance methods that initialize the receiver and yield it.
    pub initializer_methods: Vec<String>,
    /// The type every other type inherits behavior from.
    pub catch_all_type: String,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            duck_max_candidates: 3,
            max_depth: 256,
            constructor_methods: vec!["new".to_string()],
            initializer_methods: vec!["initialize".to_string()],
            catch_all_type: "Object".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    inference: InferConfig,
}

impl InferConfig {
    /// Parse the `[inference]` table out of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config = file.inference;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn is_constructor(&self, method: &str) -> bool {
        self.constructor_methods.iter().any(|m| m == method)
    }

    pub fn is_initializer(&self, method: &str) -> bool {
        self.initializer_methods.iter().any(|m| m == method)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_depth",
                message: "must be at least 1".to_string(),
            });
        }
        if self.catch_all_type.is_empty() {
            return Err(ConfigError::Invalid {
                field: "catch_all_type",
                message: "must name a type".to_string(),
            });
        }
        Ok(())
    }
}

/// Failure to load an [`InferConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    Read { path: String, message: String },
    /// The document is not valid TOML or has mistyped fields.
    Parse(String),
    /// A field parsed but holds an unusable value.
    Invalid { field: &'static str, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "failed to read {path}: {message}"),
            Self::Parse(message) => write!(f, "failed to parse config: {message}"),
            Self::Invalid { field, message } => write!(f, "invalid `{field}`: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}
