//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `NICKWATCH_WORK_DIR` and `NICKWATCH_LOG_LEVEL` env overrides.
//! Pushover credentials come from the environment only, never from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// IRC transport configuration, resolved once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct IrcConfig {
    /// Server hostname.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Channel to join after registration.
    pub channel: String,
    /// Whether to wrap the connection in TLS.
    pub tls: bool,
    /// Whether to verify the server certificate. Disabling this is logged
    /// loudly at startup.
    pub verify_certificates: bool,
}

/// Single-tenant watch configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// The operator's own nick to watch in single-tenant mode.
    pub personal_nick: String,
    /// Delivery-priority hint passed through to Pushover.
    pub priority: i32,
}

/// Fully-resolved bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Nick the bot registers with.
    pub bot_nick: String,
    /// IRC username (ident) field.
    pub user_id: String,
    /// IRC realname field.
    pub real_name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub irc: IrcConfig,
    /// Whether the multi-tenant registration system is open.
    pub registration_enabled: bool,
    pub watch: WatchConfig,
    /// Pushover application token from `PUSHOVER_APP_TOKEN` — never TOML.
    pub pushover_app_token: Option<String>,
    /// Operator's Pushover user key from `PUSHOVER_USER_KEY` — never TOML.
    pub pushover_user_key: Option<String>,
}

impl Config {
    /// Path of the persisted tenant registry.
    pub fn users_file(&self) -> PathBuf {
        self.work_dir.join("users.json")
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    irc: RawIrc,
    #[serde(default)]
    registration: RawRegistration,
    #[serde(default)]
    watch: RawWatch,
}

#[derive(Deserialize)]
struct RawBot {
    nick: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    work_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawIrc {
    #[serde(default = "default_irc_server")]
    server: String,
    #[serde(default = "default_irc_port")]
    port: u16,
    #[serde(default = "default_irc_channel")]
    channel: String,
    /// Defaults to `true`: plaintext IRC must be opted into.
    #[serde(default = "default_true")]
    tls: bool,
    /// Defaults to `true`: certificate verification must be opted out of.
    #[serde(default = "default_true")]
    verify_certificates: bool,
}

impl Default for RawIrc {
    fn default() -> Self {
        Self {
            server: default_irc_server(),
            port: default_irc_port(),
            channel: default_irc_channel(),
            tls: true,
            verify_certificates: true,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawRegistration {
    /// Defaults to `false`: registration must be explicitly opened.
    #[serde(default = "default_false")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawWatch {
    #[serde(default = "default_personal_nick")]
    personal_nick: String,
    #[serde(default)]
    priority: i32,
}

impl Default for RawWatch {
    fn default() -> Self {
        Self { personal_nick: default_personal_nick(), priority: 0 }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_irc_server() -> String {
    "irc.efnet.org".to_string()
}

fn default_irc_port() -> u16 {
    6697
}

fn default_irc_channel() -> String {
    "#channel".to_string()
}

fn default_personal_nick() -> String {
    "mynick".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let work_dir_override = env::var("NICKWATCH_WORK_DIR").ok();
    let log_level_override = env::var("NICKWATCH_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;

    let work_dir_str = work_dir_override.unwrap_or(&b.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&b.log_level).to_string();
    let user_id = b.user_id.unwrap_or_else(|| b.nick.clone());
    let real_name = b.real_name.unwrap_or_else(|| b.nick.clone());

    Ok(Config {
        bot_nick: b.nick,
        user_id,
        real_name,
        work_dir,
        log_level,
        irc: IrcConfig {
            server: parsed.irc.server,
            port: parsed.irc.port,
            channel: parsed.irc.channel,
            tls: parsed.irc.tls,
            verify_certificates: parsed.irc.verify_certificates,
        },
        registration_enabled: parsed.registration.enabled,
        watch: WatchConfig {
            personal_nick: parsed.watch.personal_nick,
            priority: parsed.watch.priority,
        },
        pushover_app_token: env::var("PUSHOVER_APP_TOKEN").ok(),
        pushover_user_key: env::var("PUSHOVER_USER_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — no TLS, no credentials, tempdir storage.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_nick: "nickwatchz0r".into(),
            user_id: "nickwatchz0r".into(),
            real_name: "nickwatchz0r test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            irc: IrcConfig {
                server: "127.0.0.1".into(),
                port: 0,
                channel: "#channel".into(),
                tls: false,
                verify_certificates: true,
            },
            registration_enabled: true,
            watch: WatchConfig { personal_nick: "mynick".into(), priority: 0 },
            pushover_app_token: None,
            pushover_user_key: None,
        }
    }
}
