//! A per-guild music queue, streamed into voice with [songbird].
//!
//! Songs are resolved by [extractor] (which shells out to `yt-dlp`), kept in a
//! [queue::TrackQueue] and played by a [player::Player].

mod commands;
mod events;
pub mod extractor;
pub mod player;
pub mod queue;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::ChannelId;
use serenity::GuildId;
use serenity::UserId;
use songbird::SerenityInit;
use songbird::Songbird;

use crate::config::BotKind;
use crate::config::MusicSettings;
use crate::data::GuildData;
use crate::error::UserError;
use crate::serenity;
use crate::Bot;
use crate::BotError;
use crate::Command;
use crate::Config;
pub use extractor::ExtractError;
use player::GuildPlayer;
use player::Player;

/// Convenient type alias for this bot's [crate::Context].
type Context<'a> = crate::Context<'a, MusicBot>;

/// State of the music bot, shared by every command.
pub struct MusicBot {
    /// List of users to send bug notifications
    notify_list: HashSet<UserId>,
    settings: MusicSettings,
    /// Voice manager registered on the client.
    manager: Arc<Songbird>,
    /// Client used to stream audio, internally uses an [Arc].
    http: reqwest::Client,
    discord: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    /// Per-Guild playback
    players: GuildData<GuildPlayer>,
}

impl MusicBot {
    /// Get (or create) the player of `guild`.
    pub async fn player(&self, guild: GuildId) -> Player {
        let state = self
            .players
            .get_or_insert_with(guild, || GuildPlayer::new(&self.settings))
            .await;

        Player {
            guild,
            state,
            manager: self.manager.clone(),
            http: self.http.clone(),
            discord: self.discord.clone(),
            cache: self.cache.clone(),
            inactivity_timeout: self.settings.inactivity_timeout(),
        }
    }
}

#[async_trait]
impl Bot for MusicBot {
    const KIND: BotKind = BotKind::Music;

    fn commands() -> Vec<Command<Self>> {
        commands::list()
    }

    fn configure_client(builder: serenity::ClientBuilder) -> serenity::ClientBuilder {
        // Register songbird as voice manager
        builder.register_songbird()
    }

    async fn build(
        ctx: &serenity::Context,
        config: &Config,
        notify_list: HashSet<UserId>,
    ) -> Result<Self, BotError> {
        let manager = songbird::get(ctx)
            .await
            .ok_or(BotError::MissingFromSetup {
                reason: "Expecting songbird manager.".to_string(),
            })?;

        Ok(Self {
            notify_list,
            settings: config.music.clone(),
            manager,
            http: reqwest::Client::new(),
            discord: ctx.http.clone(),
            cache: ctx.cache.clone(),
            players: GuildData::default(),
        })
    }

    fn notify_list(&self) -> &HashSet<UserId> {
        &self.notify_list
    }
}

/// The guild of the command and the voice channel its author is in.
fn author_voice_channel(ctx: Context<'_>) -> Result<(GuildId, ChannelId), UserError> {
    let guild = ctx.guild().ok_or(UserError::GuildOnly)?;
    let channel = guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id)
        .ok_or(UserError::NotInVoice)?;
    Ok((guild.id, channel))
}

/// Control commands need the author to be listening along with the bot.
async fn player_in_author_channel(ctx: Context<'_>) -> Result<Player, BotError> {
    let (guild, channel) = author_voice_channel(ctx)?;
    let player = ctx.data().player(guild).await;

    let bot_channel = player
        .bot_channel()
        .await
        .ok_or(UserError::BotNotInVoice)?;
    if bot_channel != channel {
        Err(UserError::NotSameChannel)?
    }
    Ok(player)
}
