//! The subset of a compose configuration that docket reads and writes.
//!
//! The same types are used to parse the compose tool's merged `config`
//! output and to emit the source mounts fragment, so every field is optional
//! on input and skipped on output when empty. Fields docket does not know
//! about are ignored.

use std::collections::BTreeMap;

use docket_common::error::{DocketError, Result};
use serde::{Deserialize, Serialize};

/// A volume entry in its long (mapping) form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Mount type (`bind`, `volume`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Host path or volume name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Container path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}

/// A volume entry, either `source:target[:mode]` or a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeSpec {
    /// Long syntax.
    Long(VolumeMount),
    /// Short syntax, kept verbatim.
    Short(String),
}

/// A service command, either a shell string or an argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// Shell form.
    Shell(String),
    /// Exec form.
    Exec(Vec<String>),
}

/// A single service definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Command override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    /// Environment variables; a `null` value means "inherit".
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, Option<String>>,
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Labels, including the role label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Volumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeSpec>,
    /// Working directory inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

/// A compose configuration: services plus declared networks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// File format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Services by name, kept sorted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServiceSpec>,
    /// Networks by name; docket only cares about the names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, serde_yaml::Value>,
}

impl ComposeConfig {
    /// Parses the YAML printed by the compose tool's `config` subcommand.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::ConfigInvalid`] if the text is not a compose
    /// configuration docket understands.
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| DocketError::ConfigInvalid {
            message: format!("failed to parse merged config: {e}"),
        })
    }

    /// Serializes the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Names of the declared networks, sorted.
    pub fn network_names(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }
}
