//! A small collection of Discord bots sharing one configuration, logging and
//! error-reporting stack.
//!
//! - [music]: per-guild audio queue backed by `yt-dlp` and [songbird].
//! - [cards]: Magic: The Gathering card lookups against Scryfall.
//! - [clippy]: canned replies from everyone's favourite paperclip.
//!
//! Each bot has its own binary under `src/bin` which calls [setup::run].

pub mod cards;
pub mod clippy;
pub mod config;
pub mod data;
pub mod error;
pub mod log;
pub mod music;
pub mod setup;
pub mod util;

pub use poise::serenity_prelude as serenity;

pub use config::Config;
pub use error::BotError;
pub use setup::Bot;

/// Convenience type alias for a [poise::Context] of a given bot.
pub type Context<'a, B> = poise::Context<'a, B, BotError>;

/// Convenience type alias for a [poise::Command] of a given bot.
pub type Command<B> = poise::Command<B, BotError>;
