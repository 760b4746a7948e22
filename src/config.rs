//! Connection configuration.
//!
//! [`ClientOptions`] is the loosely specified input (every field optional,
//! loadable from TOML). [`Config`] is the resolved, immutable form with
//! defaults applied.
//!
//! ```
//! use slirc_client::config::{ClientOptions, Config};
//!
//! let options = ClientOptions::from_toml_str(r##"
//!     host = "irc.example.org"
//!     nick = "bot"
//!     channels = ["#a", "#b"]
//! "##).unwrap();
//! let config = Config::from(options);
//!
//! assert_eq!(config.port, 6667);
//! assert!(!config.secure);
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "irc.freenode.org";
/// Channel joined when connecting to [`DEFAULT_HOST`] without a channel list.
pub const DEFAULT_CHANNEL: &str = "#freenode";
/// Default plaintext port.
pub const DEFAULT_PORT: u16 = 6667;
/// Default TLS port.
pub const DEFAULT_SECURE_PORT: u16 = 6697;
/// Default text encoding on the wire.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Unresolved connection options.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    /// Validate the server certificate on TLS connections.
    #[serde(alias = "rejectUnauthorized")]
    pub reject_unauthorized: Option<bool>,
    pub nick: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "realName")]
    pub real_name: Option<String>,
    pub channels: Option<Vec<String>>,
    /// Encoding label understood by `encoding_rs`, e.g. `"utf-8"` or `"latin1"`.
    pub encoding: Option<String>,
}

impl ClientOptions {
    /// Parse options from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Resolved connection configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub reject_unauthorized: bool,
    pub nick: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub real_name: Option<String>,
    /// Channels joined once the MOTD has been received.
    pub channels: Vec<String>,
    pub encoding: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::from(ClientOptions::default())
    }
}

impl From<ClientOptions> for Config {
    fn from(options: ClientOptions) -> Self {
        let host_given = options.host.is_some();
        let host = options.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let secure = options.secure.unwrap_or(!host_given);
        let port = options.port.unwrap_or(if secure {
            DEFAULT_SECURE_PORT
        } else {
            DEFAULT_PORT
        });
        let channels = match options.channels {
            Some(channels) => channels,
            None if host == DEFAULT_HOST => vec![DEFAULT_CHANNEL.to_string()],
            None => Vec::new(),
        };

        Config {
            host,
            port,
            secure,
            reject_unauthorized: options.reject_unauthorized.unwrap_or(true),
            nick: options.nick,
            password: options.password,
            username: options.username,
            real_name: options.real_name,
            channels,
            encoding: options
                .encoding
                .unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_host() {
        let config = Config::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert!(config.secure);
        assert_eq!(config.port, DEFAULT_SECURE_PORT);
        assert!(config.reject_unauthorized);
        assert_eq!(config.channels, vec![DEFAULT_CHANNEL.to_string()]);
        assert_eq!(config.encoding, "utf-8");
    }

    #[test]
    fn test_explicit_default_host_still_gets_default_channel() {
        let config = Config::from(ClientOptions {
            host: Some(DEFAULT_HOST.to_string()),
            ..Default::default()
        });
        assert_eq!(config.channels, vec![DEFAULT_CHANNEL.to_string()]);
        assert!(!config.secure);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_explicit_empty_channels_are_kept() {
        let config = Config::from(ClientOptions {
            channels: Some(Vec::new()),
            ..Default::default()
        });
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_other_host_has_no_default_channel() {
        let config = Config::from(ClientOptions {
            host: Some("irc.example.org".to_string()),
            secure: Some(true),
            ..Default::default()
        });
        assert!(config.channels.is_empty());
        assert_eq!(config.port, DEFAULT_SECURE_PORT);
    }

    #[test]
    fn test_toml_with_camel_case_aliases() {
        let options = ClientOptions::from_toml_str(
            r#"
            host = "irc.example.org"
            port = 7000
            rejectUnauthorized = false
            realName = "Some Bot"
            username = "bot"
            "#,
        )
        .unwrap();
        let config = Config::from(options);
        assert_eq!(config.port, 7000);
        assert!(!config.reject_unauthorized);
        assert_eq!(config.real_name.as_deref(), Some("Some Bot"));
    }

    #[test]
    fn test_toml_rejects_unknown_fields() {
        assert!(ClientOptions::from_toml_str("hots = \"typo\"").is_err());
    }
}
