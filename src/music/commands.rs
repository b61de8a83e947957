//! Music bot commands.

use std::time::Duration;

use poise::CreateReply;
use serenity::AutocompleteChoice;
use serenity::CreateEmbed;
use tracing::instrument;
use tracing::trace;
use tracing::warn;

use super::author_voice_channel;
use super::extractor;
use super::extractor::Query;
use super::player::Enqueued;
use super::player_in_author_channel;
use super::queue::Volume;
use super::Context;
use super::MusicBot;
use crate::error::UserError;
use crate::serenity;
use crate::util::format_duration;
use crate::util::truncate;
use crate::BotError;
use crate::Command;

/// Colour of music embeds.
const EMBED_COLOUR: u32 = 0x5865F2;

/// Discord rejects longer autocomplete choice names.
const MAX_CHOICE_LEN: usize = 100;

/// Lists all the implemented commands
pub fn list() -> Vec<Command<MusicBot>> {
    vec![
        play(),
        pause(),
        resume(),
        skip(),
        stop(),
        queue(),
        volume(),
        nowplaying(),
    ]
}

/// Play music from YouTube (auto-joins your voice channel)
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name or url"]
    #[autocomplete = "autocomplete_query"]
    query: String,
) -> Result<(), BotError> {
    let query = Query::parse(&query)?;
    let (guild, channel) = author_voice_channel(ctx)?;
    let player = ctx.data().player(guild).await;

    if let Some(bot_channel) = player.bot_channel().await {
        if bot_channel != channel {
            Err(UserError::BusyElsewhere)?
        }
    }

    // Resolving can take a while.
    ctx.defer().await?;

    let mut song = extractor::resolve(&query).await?;
    song.requester = Some(ctx.author().id);

    player.join(channel).await?;

    let response = match player.enqueue(song, ctx.channel_id()).await? {
        Enqueued::NowPlaying(song) => format!("🔊 Now playing: {song}"),
        Enqueued::Queued { song, position } => {
            format!("🎵 Added to queue: {song}\nPosition in queue: {position}")
        }
    };
    ctx.say(response).await?;

    Ok(())
}

/// Suggest search results once the query is long enough.
#[instrument(skip(_ctx))]
async fn autocomplete_query(_ctx: Context<'_>, partial: &str) -> Vec<AutocompleteChoice> {
    // Min length before doing actual searches
    let min_partial_len = 3;
    // Discord drops autocomplete responses that take longer than 3 seconds.
    let deadline = Duration::from_millis(2500);

    if partial.chars().count() < min_partial_len || Query::parse(partial).is_err() {
        trace!("Skipping search for '{partial}'.");
        return Vec::new();
    }

    match tokio::time::timeout(deadline, extractor::search(partial, 5)).await {
        Ok(Ok(results)) => results
            .into_iter()
            .map(|r| AutocompleteChoice::new(truncate(&r.name, MAX_CHOICE_LEN), r.url))
            .collect(),
        Ok(Err(e)) => {
            warn!("Autocomplete search failed: {e}");
            Vec::new()
        }
        Err(_) => {
            trace!("Autocomplete search timed out.");
            Vec::new()
        }
    }
}

/// Pause the current song
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), BotError> {
    let player = player_in_author_channel(ctx).await?;
    let song = player.pause().await?;
    ctx.say(format!("⏸️ Paused **{}**", song.title)).await?;
    Ok(())
}

/// Resume playback
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), BotError> {
    let player = player_in_author_channel(ctx).await?;
    let song = player.resume().await?;
    ctx.say(format!("▶️ Resumed **{}**", song.title)).await?;
    Ok(())
}

/// Skip the current song
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn skip(ctx: Context<'_>) -> Result<(), BotError> {
    let player = player_in_author_channel(ctx).await?;
    let song = player.skip().await?;
    ctx.say(format!("⏭️ Skipped **{}**", song.title)).await?;
    Ok(())
}

/// Stop music and disconnect
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), BotError> {
    let player = player_in_author_channel(ctx).await?;
    player.leave().await?;
    ctx.say("⏹️ Stopped music and disconnected from voice channel")
        .await?;
    Ok(())
}

/// Show the music queue
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn queue(ctx: Context<'_>) -> Result<(), BotError> {
    let guild = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    let player = ctx.data().player(guild).await;

    let embed = {
        let state = player.state.lock().await;
        let queue = state.queue();
        if queue.is_empty() {
            Err(UserError::EmptyQueue)?
        }

        let mut embed = CreateEmbed::default()
            .title("🎵 Music Queue")
            .colour(EMBED_COLOUR);

        if let Some(current) = queue.current() {
            let status = match queue.is_paused() {
                true => "⏸️ Paused",
                false => "▶️ Playing",
            };
            let requester = current
                .requester
                .map(|u| format!("\nRequested by: <@{u}>"))
                .unwrap_or_default();
            embed = embed.field(format!("{status} Now"), format!("{current}{requester}"), false);

            if let Some(url) = &current.thumbnail {
                embed = embed.thumbnail(url);
            }
        }

        let lines = queue.upcoming_lines();
        if !lines.is_empty() {
            embed = embed.field("Up Next", lines.join("\n"), false);
        }
        embed
    };

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set or show volume level
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume from 0 to 100"] level: Option<i64>,
) -> Result<(), BotError> {
    let player = player_in_author_channel(ctx).await?;

    let Some(level) = level else {
        let current = player.state.lock().await.volume();
        let reply = CreateReply::default()
            .content(format!("🔊 Current volume: {current}"))
            .ephemeral(true);
        ctx.send(reply).await?;
        return Ok(());
    };

    let volume = Volume::new(level)?;
    player.set_volume(volume).await?;
    ctx.say(format!("🔊 Volume set to {volume}")).await?;
    Ok(())
}

/// Show the song that is playing right now
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), BotError> {
    let guild = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    let player = ctx.data().player(guild).await;

    let embed = {
        let state = player.state.lock().await;
        let queue = state.queue();
        let song = queue.current().ok_or(UserError::NothingPlaying)?;

        let mut embed = CreateEmbed::default()
            .title(&song.title)
            .colour(EMBED_COLOUR)
            .field("Volume", state.volume().to_string(), true)
            .field("Up Next", queue.len().to_string(), true);

        if !song.page_url.is_empty() {
            embed = embed.url(&song.page_url);
        }
        if let Some(duration) = song.duration {
            embed = embed.field("Duration", format_duration(&duration), true);
        }
        if let Some(user) = song.requester {
            embed = embed.field("Requested by", format!("<@{user}>"), true);
        }
        if let Some(url) = &song.thumbnail {
            embed = embed.thumbnail(url);
        }
        if queue.is_paused() {
            embed = embed.description("⏸️ Paused");
        }
        embed
    };

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
