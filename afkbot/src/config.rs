//! Bot settings document.
//!
//! Read once at startup from `settings.json` (or a `.toml` file with the same
//! shape). Keys are kebab-case; every section is optional and falls back to
//! the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use afkbot_sdk::client::ConnectConfig;
use serde::{Deserialize, Serialize};

/// Health endpoint port when neither `PORT` nor the settings name one.
pub const DEFAULT_HEALTH_PORT: u16 = 3000;
/// How long the gateway may stay silent before the connection counts as dead.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad JSON settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("bot-account.usernames must list at least one name")]
    NoUsernames,
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub bot_account: BotAccount,
    pub server: Server,
    pub position: Position,
    pub utils: Utils,
    /// Health endpoint port; `PORT` in the environment takes precedence.
    pub health_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotAccount {
    /// Candidate login names, tried in order when the server rejects one.
    pub usernames: Vec<String>,
    pub password: String,
    /// Authentication mode passed to the gateway.
    #[serde(rename = "type")]
    pub auth: String,
}

impl Default for BotAccount {
    fn default() -> Self {
        Self {
            usernames: vec!["afkbot".to_string()],
            password: String::new(),
            auth: "offline".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Server {
    pub ip: String,
    pub port: u16,
    pub version: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 25565,
            version: None,
        }
    }
}

/// Fixed block to walk to after spawning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Position {
    pub enabled: bool,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Utils {
    pub auto_auth: AutoAuth,
    pub anti_afk: AntiAfk,
    pub chat_messages: ChatMessages,
    pub chat_log: bool,
    pub auto_reconnect: bool,
    /// Milliseconds.
    pub auto_reconnect_delay: u64,
}

impl Default for Utils {
    fn default() -> Self {
        Self {
            auto_auth: AutoAuth::default(),
            anti_afk: AntiAfk::default(),
            chat_messages: ChatMessages::default(),
            chat_log: false,
            auto_reconnect: true,
            auto_reconnect_delay: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct AutoAuth {
    pub enabled: bool,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct AntiAfk {
    pub enabled: bool,
    pub sneak: bool,
    pub jump: bool,
    pub rotate: bool,
    pub hit: Hit,
    pub circle_walk: CircleWalk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Hit {
    pub enabled: bool,
    /// Milliseconds between swings.
    pub delay: u64,
    pub attack_mobs: bool,
}

impl Default for Hit {
    fn default() -> Self {
        Self {
            enabled: false,
            delay: 1000,
            attack_mobs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CircleWalk {
    pub enabled: bool,
    pub radius: f64,
}

impl Default for CircleWalk {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ChatMessages {
    pub enabled: bool,
    pub repeat: bool,
    /// Seconds between repeated messages.
    pub repeat_delay: u64,
    pub messages: Vec<String>,
}

impl Default for ChatMessages {
    fn default() -> Self {
        Self {
            enabled: false,
            repeat: false,
            repeat_delay: 60,
            messages: Vec::new(),
        }
    }
}

impl Settings {
    /// Load and validate a settings file. `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_account.usernames.is_empty() {
            return Err(ConfigError::NoUsernames);
        }
        if let Some(blank) = self.bot_account.usernames.iter().position(|u| u.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "bot-account.usernames[{blank}] is blank"
            )));
        }

        let chat = &self.utils.chat_messages;
        if chat.enabled && chat.repeat {
            if chat.repeat_delay == 0 {
                return Err(ConfigError::Invalid(
                    "utils.chat-messages.repeat-delay must be at least 1 second".to_string(),
                ));
            }
            if chat.messages.is_empty() {
                return Err(ConfigError::Invalid(
                    "utils.chat-messages.messages is empty but repeat is on".to_string(),
                ));
            }
        }

        let anti_afk = &self.utils.anti_afk;
        if anti_afk.enabled && anti_afk.hit.enabled && anti_afk.hit.delay == 0 {
            return Err(ConfigError::Invalid(
                "utils.anti-afk.hit.delay must be at least 1 ms".to_string(),
            ));
        }
        if anti_afk.enabled && anti_afk.circle_walk.enabled && !anti_afk.circle_walk.radius.is_finite() {
            return Err(ConfigError::Invalid(
                "utils.anti-afk.circle-walk.radius must be a finite number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.utils.auto_reconnect_delay)
    }

    /// Connection parameters for one session logging in as `username`.
    pub fn connect_config(&self, username: &str) -> ConnectConfig {
        let password = Some(self.bot_account.password.clone()).filter(|p| !p.is_empty());
        ConnectConfig {
            host: self.server.ip.clone(),
            port: self.server.port,
            username: username.to_string(),
            password,
            auth: self.bot_account.auth.clone(),
            version: self.server.version.clone(),
            check_timeout: CHECK_TIMEOUT,
        }
    }
}
