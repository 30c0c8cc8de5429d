//! Assembly configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Which slots [`crate::Processing::execute`] creates when they are not supplied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// Create a fresh record for every slot that was not supplied
    #[default]
    All,
    /// Only use the supplied records
    Provided,
}

/// Build and run options of an assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Warn about defined attributes nobody reads
    pub report_unused: bool,
    /// Fill mode used by [`crate::Processing::run`]
    pub fill: Fill,
}

impl AssemblyConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With unused attribute reporting
    #[inline]
    #[must_use]
    pub fn with_report_unused(mut self, report: bool) -> Self {
        self.report_unused = report;
        self
    }

    /// With run fill mode
    #[inline]
    #[must_use]
    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    /// Parse from TOML, missing keys take their defaults
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed input or unknown values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            report_unused: true,
            fill: Fill::All,
        }
    }
}
