//! Cockpit configuration
//!
//! ```toml
//! manifests = ["plugins/process-instance.toml"]
//!
//! [log]
//! filter = "cockpit=debug,info"
//! json = false
//!
//! [[views]]
//! extension_point = "cockpit.dashboard"
//! id = "welcome"
//! priority = 100
//! ```

use crate::error::{CockpitError, CockpitResult};
use crate::manifest::ViewEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CockpitConfig {
    /// Logging setup
    pub log: LogConfig,
    /// View manifest files, relative to the configuration file
    pub manifests: Vec<PathBuf>,
    /// Views declared inline; registered after all plugins
    pub views: Vec<ViewEntry>,
}

impl CockpitConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With logging setup
    #[inline]
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// With an additional manifest file
    #[must_use]
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifests.push(path.into());
        self
    }

    /// With an additional inline view
    #[must_use]
    pub fn with_view(mut self, view: ViewEntry) -> Self {
        self.views.push(view);
        self
    }

    /// Parse configuration TOML
    ///
    /// # Errors
    /// - `CockpitError::Parse` on malformed TOML or unknown fields
    pub fn parse(input: &str) -> CockpitResult<Self> {
        toml::from_str(input).map_err(|source| CockpitError::Parse {
            path: "<inline>".into(),
            source,
        })
    }

    /// Read configuration from `path`
    ///
    /// Relative manifest paths are resolved against the file's directory.
    ///
    /// # Errors
    /// - `CockpitError::Io` if the file cannot be read
    /// - `CockpitError::Parse` on malformed TOML or unknown fields
    pub fn load(path: impl AsRef<Path>) -> CockpitResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| CockpitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&input).map_err(|source| CockpitError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(dir) = path.parent() {
            for manifest in &mut config.manifests {
                if manifest.is_relative() {
                    *manifest = dir.join(&*manifest);
                }
            }
        }
        Ok(config)
    }
}

/// Logging setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl LogConfig {
    /// With filter directives
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// With JSON output
    #[inline]
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            json: false,
        }
    }
}
