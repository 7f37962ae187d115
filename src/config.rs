//! Configuration for airtext.
//!
//! The whole topology (which inputs exist, which outputs exist, which
//! inputs feed which outputs in what priority order) comes from one TOML
//! file read once at startup. There is no reload; the topology is static
//! for the process lifetime.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:9200"
//!
//! [[inputs]]
//! type = "dynamic"
//! name = "live"
//! secret = "hackme"
//! expiration_minutes = 10
//!
//! [[inputs]]
//! type = "text"
//! name = "fallback"
//! text = "ZuidWest FM - Altijd in de buurt"
//!
//! [[outputs]]
//! type = "icecast"
//! name = "stream"
//! delay = 6
//! inputs = ["live", "fallback"]
//! server = "http://icecast.local:8000/"
//! mount = "/zuidwest.mp3"
//! username = "admin"
//! password = "hackme"
//! ```
//!
//! Per-type fields are plain optional columns validated after parsing, so
//! a missing `path` on a file output or an unknown formatter name fails
//! startup with a message naming the offending entry.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Upper bound on the configuration file size.
///
/// Prevents an out-of-memory condition from a mistaken path; real
/// configurations are a few kilobytes.
const MAX_CONFIG_SIZE: u64 = 64 * 1024;

/// Default bind address for the HTTP server.
fn default_bind() -> String {
    "0.0.0.0:9200".to_string()
}

/// Default poll interval for URL inputs, in seconds.
fn default_poll_interval() -> u64 {
    30
}

/// Complete configuration for airtext.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metadata sources.
    #[serde(default)]
    pub inputs: Vec<InputConfig>,

    /// Delivery sinks.
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

/// HTTP server settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the push and output endpoints are served on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Input type discriminant.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Static fallback text.
    Text,
    /// HTTP push.
    Dynamic,
    /// JSON endpoint poller.
    Url,
}

/// One `[[inputs]]` table.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Unique name; outputs reference inputs by it.
    pub name: String,

    /// Input type.
    #[serde(rename = "type")]
    pub kind: InputType,

    /// Text rendered before the artist.
    #[serde(default)]
    pub prefix: String,

    /// Text rendered after the title.
    #[serde(default)]
    pub suffix: String,

    /// Formatter chain applied before any output's chain.
    #[serde(default)]
    pub formatters: Vec<String>,

    /// `text`: the fixed text.
    pub text: Option<String>,

    /// `dynamic`: shared secret checked on every push.
    pub secret: Option<String>,

    /// `dynamic`/`url`: fixed fallback lifetime in minutes.
    pub expiration_minutes: Option<u64>,

    /// `url`: endpoint to poll.
    pub url: Option<Url>,

    /// `url`: seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// `url`: JSON pointer to the title.
    pub title_path: Option<String>,

    /// `url`: JSON pointer to the artist.
    pub artist_path: Option<String>,

    /// `url`: JSON pointer to the song id.
    pub song_id_path: Option<String>,

    /// `url`: JSON pointer to the duration.
    pub duration_path: Option<String>,
}

/// Output type discriminant.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Plain text file.
    File,
    /// DAB+ PAD encoder file with DL Plus tags.
    Pad,
    /// Icecast admin metadata update.
    Icecast,
    /// JSON POST to a receiver.
    Webhook,
    /// Served by the HTTP server for polling clients.
    Http,
}

/// One `[[outputs]]` table.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Unique name.
    pub name: String,

    /// Output type.
    #[serde(rename = "type")]
    pub kind: OutputType,

    /// Broadcast-alignment delay in whole seconds.
    #[serde(default)]
    pub delay: u64,

    /// Priority-ordered input names, highest priority first.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Formatter chain applied after the input's chain.
    #[serde(default)]
    pub formatters: Vec<String>,

    /// `file`/`pad`: destination path.
    pub path: Option<PathBuf>,

    /// `webhook`: receiver URL.
    pub url: Option<Url>,

    /// `icecast`: server root URL.
    pub server: Option<Url>,

    /// `icecast`: mountpoint.
    pub mount: Option<String>,

    /// `icecast`: admin username.
    pub username: Option<String>,

    /// `icecast`: admin password.
    pub password: Option<String>,
}

impl Config {
    /// Reads and validates the configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, exceeds the size limit,
    /// is not valid TOML, or fails [validation](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let attributes = fs::metadata(&path)?;
        let file_size = attributes.len();
        if file_size > MAX_CONFIG_SIZE {
            return Err(Error::out_of_range(format!(
                "{} too large: {file_size} bytes",
                path.as_ref().to_string_lossy()
            )));
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks per-type required fields and cross-references.
    ///
    /// Duplicate names are left to router registration, which rejects them
    /// as well.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` naming the offending entry.
    pub fn validate(&self) -> Result<()> {
        for input in &self.inputs {
            match input.kind {
                InputType::Text => {
                    require(&input.text, "text", &input.name, "text")?;
                }
                InputType::Dynamic => {}
                InputType::Url => {
                    require(&input.url, "url", &input.name, "url")?;
                    require(&input.title_path, "url", &input.name, "title_path")?;
                }
            }
        }

        for output in &self.outputs {
            if output.inputs.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "output {} lists no inputs",
                    output.name
                )));
            }
            match output.kind {
                OutputType::File | OutputType::Pad => {
                    require(&output.path, "file", &output.name, "path")?;
                }
                OutputType::Webhook => {
                    require(&output.url, "webhook", &output.name, "url")?;
                }
                OutputType::Icecast => {
                    require(&output.server, "icecast", &output.name, "server")?;
                    require(&output.mount, "icecast", &output.name, "mount")?;
                    require(&output.username, "icecast", &output.name, "username")?;
                    require(&output.password, "icecast", &output.name, "password")?;
                }
                OutputType::Http => {}
            }
        }

        Ok(())
    }
}

/// Requires a per-type field to be present.
fn require<T>(field: &Option<T>, kind: &str, name: &str, field_name: &str) -> Result<()> {
    if field.is_none() {
        return Err(Error::invalid_argument(format!(
            "{kind} entry {name} requires {field_name}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_topology() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [[inputs]]
            type = "dynamic"
            name = "live"
            secret = "hackme"
            expiration_minutes = 10
            prefix = "Nu: "

            [[inputs]]
            type = "url"
            name = "api"
            url = "https://api.example.com/now"
            poll_interval = 15
            title_path = "/now/title"
            artist_path = "/now/artist"

            [[inputs]]
            type = "text"
            name = "fallback"
            text = "Welcome"

            [[outputs]]
            type = "icecast"
            name = "stream"
            delay = 6
            inputs = ["live", "api", "fallback"]
            formatters = ["rds"]
            server = "http://icecast.local:8000/"
            mount = "/zuidwest.mp3"
            username = "admin"
            password = "hackme"

            [[outputs]]
            type = "pad"
            name = "dab"
            delay = 4
            inputs = ["live", "fallback"]
            path = "/tmp/dls.txt"
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.inputs.len(), 3);
        assert_eq!(config.inputs[1].kind, InputType::Url);
        assert_eq!(config.inputs[1].poll_interval, 15);
        assert_eq!(config.outputs[0].delay, 6);
        assert_eq!(config.outputs[1].kind, OutputType::Pad);
    }

    #[test]
    fn missing_per_type_fields_fail_validation() {
        let config: Config = toml::from_str(
            r#"
            [[inputs]]
            type = "text"
            name = "fallback"

            [[outputs]]
            type = "file"
            name = "drop"
            inputs = ["fallback"]
            path = "/tmp/now.txt"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn outputs_must_list_inputs() {
        let config: Config = toml::from_str(
            r#"
            [[inputs]]
            type = "text"
            name = "fallback"
            text = "Welcome"

            [[outputs]]
            type = "http"
            name = "poll"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<Config>(
            r#"
            [[inputs]]
            type = "text"
            name = "fallback"
            text = "Welcome"
            shiny = true
            "#,
        )
        .is_err());
    }

    #[test]
    fn defaults_apply() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9200");
        assert!(config.inputs.is_empty());
    }
}
