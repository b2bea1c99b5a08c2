//! Module for driver configuration options.

use serde::{Deserialize, Serialize};
use strata_resolver::config::ResolverConfig;

/// Options for controlling the driver's behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Options handed to the resolver
    pub resolver: ResolverConfig,

    /// Maximum number of failures a check reports
    pub error_limit: Option<usize>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            error_limit: Some(20),
        }
    }
}
