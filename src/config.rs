//! Per-connection configuration.
//!
//! One [`Config`] describes one server connection: where to connect, who
//! to be once connected, and which modules to load. With the `toml`
//! feature it is read from a file:
//!
//! ```toml
//! tag = "libera"
//!
//! [server]
//! host = "irc.libera.chat"
//! port = 6697
//! use_ssl = true
//! channels = ["#bones", "#rust"]
//!
//! [bot]
//! nicknames = "bones\nbones_\nbones__"
//! trigger_prefixes = "+!"
//! modules = ["greeter"]
//! ```
//!
//! List-valued keys accept either an array or a newline-separated string.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

fn default_port() -> u16 {
    6667
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_trigger_prefixes() -> String {
    "+".to_string()
}

fn default_quit_message() -> String {
    "Reactor shutdown".to_string()
}

fn default_version_name() -> String {
    "Bones IRCBot".to_string()
}

fn default_version_number() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_source_url() -> String {
    "https://github.com/404d/Bones-IRCBot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_lost_delay() -> u64 {
    10
}

fn default_failed_delay() -> u64 {
    30
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrLines {
    List(Vec<String>),
    Lines(String),
}

/// Accept `["a", "b"]` or `"a\nb"`; blank entries are dropped.
fn list_or_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match ListOrLines::deserialize(deserializer)? {
        ListOrLines::List(items) => items,
        ListOrLines::Lines(text) => text.lines().map(str::to_owned).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Configuration for one server connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name this connection is known by on the event bus. Defaults to the
    /// server host.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub use_ssl: bool,
    /// Server password, sent as `PASS` before registering.
    #[serde(default)]
    pub password: Option<String>,
    /// Channels joined after signing on.
    #[serde(default, alias = "channel", deserialize_with = "list_or_lines")]
    pub channels: Vec<String>,
    /// Set user mode `+B` on ourselves after signing on.
    #[serde(default)]
    pub set_bot: bool,
    /// Wire encoding label, used with the `encoding` feature.
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// First entry is the preferred nickname, the rest are alternates.
    #[serde(default, alias = "nickname", deserialize_with = "list_or_lines")]
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    /// Characters that introduce a trigger.
    #[serde(default = "default_trigger_prefixes")]
    pub trigger_prefixes: String,
    /// Module identifiers to load, in order.
    #[serde(default, deserialize_with = "list_or_lines")]
    pub modules: Vec<String>,
    #[serde(default)]
    pub join_on_invite: bool,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
    /// Local address to bind before connecting.
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default = "default_version_name")]
    pub version_name: String,
    #[serde(default = "default_version_number")]
    pub version_number: String,
    #[serde(default)]
    pub version_env: String,
    #[serde(default = "default_source_url")]
    pub source_url: String,
}

/// Reconnection backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base delay in seconds after losing an established connection.
    #[serde(default = "default_lost_delay")]
    pub lost_delay: u64,
    /// Base delay in seconds after a connection attempt failed.
    #[serde(default = "default_failed_delay")]
    pub failed_delay: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            enabled: true,
            lost_delay: default_lost_delay(),
            failed_delay: default_failed_delay(),
        }
    }
}

impl ReconnectConfig {
    pub fn lost_base(&self) -> Duration {
        Duration::from_secs(self.lost_delay)
    }

    pub fn failed_base(&self) -> Duration {
        Duration::from_secs(self.failed_delay)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: String::new(),
            port: default_port(),
            use_ssl: false,
            password: None,
            channels: Vec::new(),
            set_bot: false,
            encoding: default_encoding(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            nicknames: Vec::new(),
            username: None,
            realname: None,
            trigger_prefixes: default_trigger_prefixes(),
            modules: Vec::new(),
            join_on_invite: false,
            quit_message: default_quit_message(),
            bind_address: None,
            version_name: default_version_name(),
            version_number: default_version_number(),
            version_env: String::new(),
            source_url: default_source_url(),
        }
    }
}

impl Config {
    /// A config with defaults for everything but host and nicknames.
    pub fn new(host: &str, nicknames: &[&str]) -> Self {
        Config {
            tag: None,
            server: ServerConfig {
                host: host.to_owned(),
                ..ServerConfig::default()
            },
            bot: BotConfig {
                nicknames: nicknames.iter().map(|n| (*n).to_owned()).collect(),
                ..BotConfig::default()
            },
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    #[cfg(feature = "toml")]
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    #[cfg(feature = "toml")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.bot.nicknames.is_empty() {
            return Err(ConfigError::MissingNickname);
        }
        Ok(())
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.server.host)
    }

    /// Preferred nickname.
    pub fn nickname(&self) -> Option<&str> {
        self.bot.nicknames.first().map(String::as_str)
    }

    /// Nicknames to fall back to, in order.
    pub fn alternates(&self) -> &[String] {
        self.bot.nicknames.get(1..).unwrap_or(&[])
    }

    /// Configured username, else `$USER`, else `bones`.
    pub fn username(&self) -> String {
        self.bot
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "bones".to_string())
    }

    /// Configured realname, else the preferred nickname.
    pub fn realname(&self) -> &str {
        self.bot
            .realname
            .as_deref()
            .or_else(|| self.nickname())
            .unwrap_or("bones")
    }

    /// Host to hand to the resolver: IPv6 brackets stripped.
    pub fn connect_host(&self) -> &str {
        strip_brackets(&self.server.host)
    }

    /// Host for display: bare IPv6 addresses get brackets.
    pub fn display_host(&self) -> String {
        let host = &self.server.host;
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.clone()
        }
    }

    pub fn bind_address(&self) -> Option<&str> {
        self.bot.bind_address.as_deref().map(strip_brackets)
    }

    /// Text of the automatic CTCP VERSION reply.
    pub fn version_reply(&self) -> String {
        let bot = &self.bot;
        format!(
            "{} {} {}",
            bot.version_name, bot.version_number, bot.version_env
        )
        .replace(['\r', '\n'], "")
        .trim()
        .to_string()
    }
}

fn strip_brackets(host: &str) -> &str {
    match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(inner) if inner.contains(':') => inner,
        _ => host,
    }
}
