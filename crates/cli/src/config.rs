//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::Deserialize;
use snapshot_lib::sysres::{KubeReserved, KUBE_SYSTEM_NAMESPACE};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// CLI configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Namespace whose pods count as system overhead
    #[serde(default = "default_reserved_namespace")]
    pub reserved_namespace: String,

    /// Kubelet and OS reservation subtracted from every node
    #[serde(default)]
    pub kube_reserved: KubeReserved,

    /// Page size used when listing objects, 0 for everything at once
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Output format used when `--format` is not given
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_reserved_namespace() -> String {
    KUBE_SYSTEM_NAMESPACE.to_string()
}

fn default_page_size() -> u32 {
    500
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            reserved_namespace: default_reserved_namespace(),
            kube_reserved: KubeReserved::default(),
            page_size: default_page_size(),
            log_format: LogFormat::default(),
            output_format: OutputFormat::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a file and `CSNAP_*` environment variables.
    ///
    /// An explicit `path` must exist; the default path is optional. Nested
    /// keys use a double underscore, e.g. `CSNAP_KUBE_RESERVED__CPU=100m`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default) = Self::config_path() {
                    builder = builder.add_source(config::File::from(default).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CSNAP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the default configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("csnap").join("config.toml"))
    }
}
