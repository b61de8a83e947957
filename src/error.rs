//! Error types shared by every bot.
//!
//! [UserError]s are expected failures caused by how a command was used. They
//! are shown to the user as-is and only logged at debug level. Everything else
//! inside [BotError] is unexpected and gets reported.

use std::time::Duration;

use thiserror::Error;

use crate::cards::ScryfallError;
use crate::music::ExtractError;
use crate::serenity;

/// Top level error for all bots.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("Serenity error: {0}")]
    SerenityError(#[from] serenity::Error),

    #[error("Failed to join voice channel: {0}")]
    JoinError(#[from] songbird::error::JoinError),

    #[error("Failed to control track: {0}")]
    ControlError(#[from] songbird::error::ControlError),

    #[error("Card lookup failed: {0}")]
    ScryfallError(#[from] ScryfallError),

    #[error("Audio extraction failed: {0}")]
    ExtractError(ExtractError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Something was not set up properly: {reason}")]
    MissingFromSetup { reason: String },

    #[error("Command panicked: {payload:?}")]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },

    #[error("Command check failed: {reason:?}")]
    CheckFailed { reason: Option<String> },
}

/// Errors caused by users, these are displayed back to them.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("This command only works in a server.")]
    GuildOnly,

    #[error("This command only works in direct messages.")]
    DmOnly,

    #[error("This command only works in NSFW channels.")]
    NsfwOnly,

    #[error("Only the bot owner can use this command.")]
    NotOwner,

    #[error("You must be in a voice channel to use this command.")]
    NotInVoice,

    #[error("I'm not in a voice channel. Use `/play` to start playing music first.")]
    BotNotInVoice,

    #[error("You must be in the same voice channel as me to use this command.")]
    NotSameChannel,

    #[error("I'm already playing music in another voice channel.")]
    BusyElsewhere,

    #[error("Nothing is currently playing.")]
    NothingPlaying,

    #[error("Nothing is currently paused.")]
    NothingPaused,

    #[error("The queue is empty.")]
    EmptyQueue,

    #[error("The queue is full ({max} songs max).")]
    QueueFull { max: usize },

    #[error("Volume must be between 0 and 100, got {given}.")]
    VolumeOutOfRange { given: i64 },

    #[error("Please provide a song name or url (max {max} characters).")]
    BadQuery { max: usize },

    #[error("Only http(s) links from supported sites can be played.")]
    UnsupportedUrl,

    #[error("Could not find or load that song: {reason}")]
    SearchFailed { reason: String },

    #[error("Card query cannot be empty.")]
    EmptyCardQuery,

    #[error("{}", card_not_found_message(query, *filtered))]
    CardNotFound { query: String, filtered: bool },

    #[error("Failed to resolve any requested cards.")]
    NoCardsResolved,

    #[error("Couldn't fetch a random card right now, try again later.")]
    NoRandomCard,

    #[error("Too many cards requested at once ({max} max).")]
    TooManyCards { max: usize },

    #[error("API rate limit exceeded. Please try again in a moment.")]
    RateLimited,

    #[error("Expected one of these subcommands: {subcmds}.")]
    MissingSubcommand { subcmds: String },

    #[error("Could not understand the arguments{}.", input.as_ref().map(|i| format!(" '{i}'")).unwrap_or_default())]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {:.1}s.", remaining_cooldown.as_secs_f32())]
    OnCooldown { remaining_cooldown: Duration },

    #[error("I'm missing these permissions: {missing_permissions}.")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },

    #[error("You're missing permissions for this command{}.", missing_permissions.as_ref().map(|p| format!(": {p}")).unwrap_or_default())]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },
}

/// The "no match" message, with a hint depending on the kind of query.
fn card_not_found_message(query: &str, filtered: bool) -> String {
    if filtered {
        format!("No cards found for '{query}'. Try simpler filters like `e:set` or `is:foil`, or check the spelling.")
    } else {
        format!("Card '{query}' not found. Try partial names like 'bolt' for 'Lightning Bolt'.")
    }
}

/// Errors while reading configuration. These are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing discord token, set the {var} environment variable.")]
    MissingToken { var: &'static str },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Could not read config file: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn card_not_found_hints_depend_on_filters() {
        let plain = UserError::CardNotFound {
            query: "lightnig".to_string(),
            filtered: false,
        };
        let filtered = UserError::CardNotFound {
            query: "bolt e:zzz".to_string(),
            filtered: true,
        };
        assert!(plain.to_string().contains("partial names"));
        assert!(filtered.to_string().contains("simpler filters"));
    }

    #[test]
    fn missing_token_names_the_variable() {
        let err = ConfigError::MissingToken {
            var: "MUSIC_DISCORD_TOKEN",
        };
        assert!(err.to_string().contains("MUSIC_DISCORD_TOKEN"));
    }
}
