//! Configuration for running the bots.
//!
//! Settings are layered: built-in defaults, then an optional [CONFIG_PATH]
//! file, then environment variables (a `.env` file is loaded first and never
//! overrides variables that are already set). The discord token is required,
//! every other setting has a default.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;
use serenity::UserId;
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;
use crate::serenity;

/// The path to the optional config file.
const CONFIG_PATH: &str = "config.toml";

/// Placeholder token, treated the same as a missing one.
const PLACEHOLDER_TOKEN: &str = "put_token_here";

/// Which bot is being configured, decides where the token comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotKind {
    #[default]
    Music,
    Cards,
    Clippy,
}

impl BotKind {
    /// Environment variable holding this bot's discord token.
    pub fn token_var(self) -> &'static str {
        match self {
            BotKind::Music => "MUSIC_DISCORD_TOKEN",
            BotKind::Cards => "MTG_DISCORD_TOKEN",
            BotKind::Clippy => "CLIPPY_DISCORD_TOKEN",
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            BotKind::Music => "Music Bot",
            BotKind::Cards => "MTG Card Bot",
            BotKind::Clippy => "Clippy Bot",
        }
    }
}

/// Settings that modify bot behavior.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which bot this config was loaded for.
    #[serde(skip)]
    kind: BotKind,

    /// Token needed to use a bot account. Usually comes from the environment.
    discord_token: String,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,

    /// See [MusicSettings]
    pub music: MusicSettings,

    /// See [CardSettings]
    pub cards: CardSettings,

    /// See [ClippySettings]
    pub clippy: ClippySettings,
}

impl Config {
    /// Load the config for `kind` from [CONFIG_PATH] and the process environment.
    ///
    /// A missing config file is fine, an unreadable one is not.
    pub fn load(kind: BotKind) -> Result<Config, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => Err(ConfigError::InvalidConfig {
                reason: format!("Bad .env file: {e}"),
            })?,
        }

        let file = match std::fs::read_to_string(CONFIG_PATH) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => Err(ConfigError::IoError(e))?,
        };

        Config::from_sources(kind, file.as_deref(), |var| std::env::var(var).ok())
    }

    /// Build a config from the contents of a config file (if any) and an
    /// environment lookup, then validate it.
    pub fn from_sources<F>(kind: BotKind, file: Option<&str>, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(content) if !content.trim().is_empty() => {
                // If deserialization fails, return error describing the mistake.
                let to_toml = toml::Deserializer::new(content);
                let result: Result<Config, _> = serde_path_to_error::deserialize(to_toml);
                result.map_err(|error| ConfigError::InvalidConfig {
                    reason: format!("{CONFIG_PATH}: {error}"),
                })?
            }
            _ => Config::default(),
        };
        config.kind = kind;
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings with whatever the environment provides.
    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = env(self.kind.token_var()) {
            self.discord_token = token;
        }

        if let Some(level) = env("LOG_LEVEL") {
            self.logging.level = level.parse()?;
        }
        override_bool(&mut self.logging.json, env("JSON_LOGGING"));
        override_bool(&mut self.logging.logs_enabled, env("LOGS_ENABLED"));
        if let Some(dir) = env("LOG_DIR") {
            self.logging.log_dir = dir;
        }
        if let Some(guild) = env("DEV_GUILD")
            .and_then(|g| g.trim().parse::<u64>().ok())
            .filter(|g| *g != 0)
        {
            self.dev_utils.dev_guild = Some(GuildId::new(guild));
        }

        let music = &mut self.music;
        override_parse(&mut music.max_queue_size, env("MUSIC_MAX_QUEUE_SIZE"));
        override_parse(&mut music.inactivity_timeout, env("MUSIC_INACTIVITY_TIMEOUT"));
        override_parse(&mut music.volume_level, env("MUSIC_VOLUME_LEVEL"));

        let cards = &mut self.cards;
        override_parse(&mut cards.cache_ttl, env("MTG_CACHE_TTL"));
        override_parse(&mut cards.cache_size, env("MTG_CACHE_SIZE"));
        override_parse(&mut cards.fuzzy_threshold, env("MTG_FUZZY_THRESHOLD"));
        override_parse(&mut cards.http_timeout, env("MTG_HTTP_TIMEOUT"));
        if let Some(prefix) = env("MTG_COMMAND_PREFIX") {
            cards.command_prefix = prefix;
        }
        if let Some(url) = env("MTG_API_BASE_URL") {
            cards.api_base_url = url;
        }

        let clippy = &mut self.clippy;
        override_bool(&mut clippy.random_responses, env("CLIPPY_RANDOM_RESPONSES"));
        override_parse(&mut clippy.reply_chance, env("CLIPPY_REPLY_CHANCE"));
        override_parse(&mut clippy.random_interval, env("CLIPPY_RANDOM_INTERVAL"));
        override_parse(&mut clippy.random_message_delay, env("CLIPPY_RANDOM_MESSAGE_DELAY"));

        Ok(())
    }

    /// Check values and reset the ones that have a safe fallback.
    fn validate(&mut self) -> Result<(), ConfigError> {
        self.token()?;

        let music = &mut self.music;
        if music.max_queue_size == 0 {
            music.max_queue_size = MusicSettings::default().max_queue_size;
        }
        if !is_duration(music.inactivity_timeout) {
            music.inactivity_timeout = MusicSettings::default().inactivity_timeout;
        }
        if !(0.0..=1.0).contains(&music.volume_level) {
            Err(invalid("Volume level must be between 0 and 1"))?
        }

        let cards = &self.cards;
        if !is_duration(cards.cache_ttl) {
            Err(invalid("cache_ttl must be a positive number of seconds"))?
        }
        if cards.cache_size == 0 {
            Err(invalid("cache_size must be positive"))?
        }
        if !(cards.fuzzy_threshold > 0.0 && cards.fuzzy_threshold <= 1.0) {
            Err(invalid("fuzzy_threshold must be in (0, 1]"))?
        }
        if !is_duration(cards.http_timeout) {
            Err(invalid("http_timeout must be a positive number of seconds"))?
        }
        if cards.command_prefix.is_empty() {
            Err(invalid("command_prefix cannot be empty"))?
        }

        let clippy = &self.clippy;
        if !(0.0..=1.0).contains(&clippy.reply_chance) {
            Err(invalid("reply_chance must be between 0 and 1"))?
        }
        if !is_duration(clippy.random_interval) {
            Err(invalid("random_interval must be a positive number of seconds"))?
        }
        if !(is_duration(clippy.random_message_delay) && clippy.random_message_delay >= 1.0) {
            Err(invalid("random_message_delay must be at least 1 second"))?
        }

        Ok(())
    }

    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<&str, ConfigError> {
        let given_token = self.discord_token.trim();

        let is_empty = given_token.is_empty();
        let is_placeholder = given_token.contains(PLACEHOLDER_TOKEN);

        if is_empty || is_placeholder {
            Err(ConfigError::MissingToken {
                var: self.kind.token_var(),
            })
        } else {
            Ok(given_token)
        }
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.notify_list(fw)
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Level for traces of this crate.
    pub fn log_level(&self) -> LevelFilter {
        self.logging.level.into()
    }

    /// Whether console logs are written as json.
    pub fn json_logging(&self) -> bool {
        self.logging.json
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }
}

/// Positive, finite and small enough to be a [Duration].
fn is_duration(secs: f64) -> bool {
    secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok()
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::InvalidConfig {
        reason: reason.to_string(),
    }
}

/// Replace `target` if `value` parses, unparsable values keep the current one.
fn override_parse<T: FromStr>(target: &mut T, value: Option<String>) {
    if let Some(parsed) = value.and_then(|v| v.trim().parse().ok()) {
        *target = parsed;
    }
}

/// Replace `target` with a boolean, anything but `true/1/yes/on` is false.
fn override_bool(target: &mut bool, value: Option<String>) {
    if let Some(v) = value {
        *target = matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on");
    }
}

/// Represents possible log levels to filter messages shown.
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigError::InvalidConfig {
                reason: format!(
                    "Invalid log level: {other}. Must be one of trace, debug, info, warn, error"
                ),
            }),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Configs for logging.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    /// Level of this crate's traces.
    level: LogLevel,
    /// Print console traces as json?
    json: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            logs_enabled: false,
            log_dir: "logs".to_string(),
        }
    }
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    dev_guild: Option<GuildId>,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl NotifyConfig {
    /// Construct a bug notification notify list based on the config.
    fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        let mut notify_list = HashSet::new();

        // If disabled, don't add anyone to the list.
        if !self.enabled {
            return notify_list;
        }

        if self.add_owners {
            notify_list.extend(fw.options().owners.iter().copied());
        }
        notify_list.extend(self.userids.iter().copied());

        notify_list
    }
}

/// Music bot tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    /// Max songs waiting in a guild's queue.
    pub max_queue_size: usize,
    /// Seconds without playback (or listeners) before leaving.
    pub inactivity_timeout: f64,
    /// Starting volume of a guild, as a fraction.
    pub volume_level: f64,
}

impl MusicSettings {
    /// How long to wait before leaving an idle or empty channel.
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.inactivity_timeout)
    }

    /// Starting volume in percent.
    pub fn default_volume_percent(&self) -> i64 {
        (self.volume_level * 100.0).round() as i64
    }
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            inactivity_timeout: 300.0,
            volume_level: 0.5,
        }
    }
}

/// Card bot tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSettings {
    /// Seconds a cached card stays valid.
    pub cache_ttl: f64,
    /// Max cached cards.
    pub cache_size: usize,
    /// Minimum similarity for a typo tolerant match.
    pub fuzzy_threshold: f64,
    /// Seconds before an api request is abandoned.
    pub http_timeout: f64,
    /// Prefix for message commands.
    pub command_prefix: String,
    /// Root of the card api.
    pub api_base_url: String,
}

impl CardSettings {
    /// Lifetime of a cached card.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs_f64(self.cache_ttl)
    }

    /// Timeout of a single api request.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.http_timeout)
    }
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            cache_ttl: 3600.0,
            cache_size: 1000,
            fuzzy_threshold: 0.8,
            http_timeout: 20.0,
            command_prefix: "!".to_string(),
            api_base_url: "https://api.scryfall.com".to_string(),
        }
    }
}

/// Clippy bot tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClippySettings {
    /// Reply to random messages at all?
    pub random_responses: bool,
    /// Chance to reply to any one message.
    pub reply_chance: f64,
    /// Average seconds between unprompted messages.
    pub random_interval: f64,
    /// Max seconds to wait before a random reply.
    pub random_message_delay: f64,
}

impl ClippySettings {
    /// Average time between unprompted messages.
    pub fn random_interval(&self) -> Duration {
        Duration::from_secs_f64(self.random_interval)
    }
}

impl Default for ClippySettings {
    fn default() -> Self {
        Self {
            random_responses: true,
            reply_chance: 0.02,
            random_interval: 2700.0,
            random_message_delay: 3.0,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = Config::from_sources(BotKind::Music, None, env_of(&[])).unwrap_err();
        match err {
            ConfigError::MissingToken { var } => assert_eq!(var, "MUSIC_DISCORD_TOKEN"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn token_comes_from_the_bots_own_variable() {
        let env = env_of(&[("MUSIC_DISCORD_TOKEN", "abc")]);
        let err = Config::from_sources(BotKind::Cards, None, env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingToken {
                var: "MTG_DISCORD_TOKEN"
            }
        ));
    }

    #[test]
    fn placeholder_token_is_rejected() {
        let file = r#"discord_token = "put_token_here""#;
        let err = Config::from_sources(BotKind::Clippy, Some(file), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken { .. }));
    }

    #[test]
    fn defaults_are_used_without_overrides() {
        let env = env_of(&[("MTG_DISCORD_TOKEN", "abc")]);
        let config = Config::from_sources(BotKind::Cards, None, env).unwrap();
        assert_eq!(config.token().unwrap(), "abc");
        assert_eq!(config.cards.cache_size, 1000);
        assert_eq!(config.cards.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.music.max_queue_size, 100);
        assert_eq!(config.log_level(), LevelFilter::INFO);
    }

    #[test]
    fn environment_overrides_file() {
        let file = r#"
            [music]
            max_queue_size = 5
            inactivity_timeout = 60.0
        "#;
        let env = env_of(&[
            ("MUSIC_DISCORD_TOKEN", "abc"),
            ("MUSIC_MAX_QUEUE_SIZE", "7"),
            ("LOG_LEVEL", "WARNING"),
        ]);
        let config = Config::from_sources(BotKind::Music, Some(file), env).unwrap();
        assert_eq!(config.music.max_queue_size, 7);
        assert_eq!(config.music.inactivity_timeout(), Duration::from_secs(60));
        assert_eq!(config.log_level(), LevelFilter::WARN);
    }

    #[test]
    fn non_positive_music_values_fall_back() {
        let env = env_of(&[
            ("MUSIC_DISCORD_TOKEN", "abc"),
            ("MUSIC_MAX_QUEUE_SIZE", "0"),
            ("MUSIC_INACTIVITY_TIMEOUT", "-3"),
        ]);
        let config = Config::from_sources(BotKind::Music, None, env).unwrap();
        assert_eq!(config.music.max_queue_size, 100);
        assert_eq!(config.music.inactivity_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn unrepresentable_inactivity_timeout_falls_back() {
        for value in ["inf", "NaN", "1e30"] {
            let env = env_of(&[
                ("MUSIC_DISCORD_TOKEN", "abc"),
                ("MUSIC_INACTIVITY_TIMEOUT", value),
            ]);
            let config = Config::from_sources(BotKind::Music, None, env).unwrap();
            assert_eq!(
                config.music.inactivity_timeout(),
                Duration::from_secs(300),
                "{value}"
            );
        }
    }

    #[test]
    fn unparsable_numbers_keep_defaults() {
        let env = env_of(&[("MTG_DISCORD_TOKEN", "abc"), ("MTG_CACHE_SIZE", "lots")]);
        let config = Config::from_sources(BotKind::Cards, None, env).unwrap();
        assert_eq!(config.cards.cache_size, 1000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            ("MUSIC_VOLUME_LEVEL", "1.5"),
            ("LOG_LEVEL", "loud"),
            ("MTG_CACHE_TTL", "0"),
            ("MTG_CACHE_TTL", "inf"),
            ("MTG_HTTP_TIMEOUT", "NaN"),
            ("MTG_HTTP_TIMEOUT", "1e30"),
            ("CLIPPY_RANDOM_INTERVAL", "1e30"),
            ("CLIPPY_RANDOM_INTERVAL", "NaN"),
            ("CLIPPY_RANDOM_MESSAGE_DELAY", "inf"),
            ("MTG_FUZZY_THRESHOLD", "0"),
            ("CLIPPY_REPLY_CHANCE", "2"),
        ];
        for (key, value) in cases {
            let env = env_of(&[("MUSIC_DISCORD_TOKEN", "abc"), (key, value)]);
            let result = Config::from_sources(BotKind::Music, None, env);
            assert!(
                matches!(result, Err(ConfigError::InvalidConfig { .. })),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn bad_file_reports_the_path() {
        let file = r#"
            [cards]
            cache_size = "many"
        "#;
        let env = env_of(&[("MTG_DISCORD_TOKEN", "abc")]);
        let err = Config::from_sources(BotKind::Cards, Some(file), env).unwrap_err();
        assert!(err.to_string().contains("cards.cache_size"), "{err}");
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let env = env_of(&[
            ("CLIPPY_DISCORD_TOKEN", "abc"),
            ("CLIPPY_RANDOM_RESPONSES", "off"),
            ("JSON_LOGGING", "Yes"),
        ]);
        let config = Config::from_sources(BotKind::Clippy, None, env).unwrap();
        assert!(!config.clippy.random_responses);
        assert!(config.json_logging());
    }
}
