//! Playback of a guild's [TrackQueue] through a [songbird::Call].
//!
//! The queue is owned here rather than by songbird. A track handle is kept for
//! the song that is currently playing, and track events compare against it so
//! stale events (from stopped or replaced tracks) are ignored.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use songbird::input::HttpRequest;
use songbird::tracks::TrackHandle;
use songbird::Songbird;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::events;
use super::queue::Song;
use super::queue::TrackQueue;
use super::queue::Volume;
use crate::config::MusicSettings;
use crate::data::GuildRef;
use crate::error::UserError;
use crate::serenity;
use crate::BotError;

/// Convenience type alias for [songbird::Call].
pub type CallRef = Arc<Mutex<songbird::Call>>;

/// Playback state of one guild.
#[derive(Debug)]
pub struct GuildPlayer {
    /// Songs to play.
    queue: TrackQueue,
    /// Volume applied to every new track.
    volume: Volume,
    /// Handle of the song in `queue.current()`.
    handle: Option<TrackHandle>,
    /// Where to post playback updates, the channel of the last `/play`.
    announce: Option<serenity::ChannelId>,
    /// Last time something was playing.
    last_active: Instant,
}

/// Outcome of the current track ending, see [GuildPlayer::finish_track].
#[derive(Debug, PartialEq)]
struct TrackEnd {
    /// Failure notice for the track that ended.
    failed: Option<String>,
    /// The song to start now, `None` once the queue ran out.
    next: Option<Song>,
}

impl GuildPlayer {
    /// Empty player using the configured queue size and volume.
    pub fn new(settings: &MusicSettings) -> Self {
        Self {
            queue: TrackQueue::new(settings.max_queue_size),
            volume: Volume::clamped(settings.default_volume_percent()),
            handle: None,
            announce: None,
            last_active: Instant::now(),
        }
    }

    /// Songs playing and waiting.
    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    /// Volume applied to new tracks.
    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// How long nothing has been audible.
    fn idle_for(&self) -> Duration {
        match self.handle {
            Some(_) if !self.queue.is_paused() => Duration::ZERO,
            _ => self.last_active.elapsed(),
        }
    }

    /// Move the next song into the current slot, forgetting the old handle.
    fn advance(&mut self) -> Option<Song> {
        self.last_active = Instant::now();
        self.handle = None;
        self.queue.advance().cloned()
    }

    /// Bookkeeping once a track stops. `None` means the track was stale and
    /// nothing changed.
    fn finish_track(&mut self, is_current: bool, errored: bool) -> Option<TrackEnd> {
        if !is_current {
            return None;
        }

        let failed = match self.queue.current() {
            Some(song) if errored => {
                warn!("Playback of {} failed", song.title);
                Some(format!("❌ Failed to play **{}**, skipping.", song.title))
            }
            _ => None,
        };
        Some(TrackEnd {
            failed,
            next: self.advance(),
        })
    }

    /// Drop the queue and stop the current track.
    fn reset(&mut self) {
        self.queue.clear();
        if let Some(handle) = self.handle.take() {
            // The track may already be gone.
            let _ = handle.stop();
        }
        self.last_active = Instant::now();
    }
}

/// What happened to a song handed to [Player::enqueue].
#[derive(Debug)]
pub enum Enqueued {
    /// Nothing was playing so it started right away.
    NowPlaying(Song),
    /// Waiting at this position.
    Queued { song: Song, position: usize },
}

/// Everything needed to control playback in one guild.
/// Internally uses [Arc]s, so it's cheap to clone.
#[derive(Clone)]
pub struct Player {
    pub(super) guild: serenity::GuildId,
    pub(super) state: GuildRef<GuildPlayer>,
    pub(super) manager: Arc<Songbird>,
    /// Client used to stream audio.
    pub(super) http: reqwest::Client,
    /// Used to post announcements from event handlers.
    pub(super) discord: Arc<serenity::Http>,
    /// Used to look up who is in a voice channel.
    pub(super) cache: Arc<serenity::Cache>,
    pub(super) inactivity_timeout: Duration,
}

impl Player {
    /// The guild's call, if the bot has one.
    pub fn call(&self) -> Option<CallRef> {
        self.manager.get(self.guild)
    }

    /// The voice channel the bot is connected to.
    pub async fn bot_channel(&self) -> Option<serenity::ChannelId> {
        let call = self.call()?;
        let channel = call.lock().await.current_channel();
        // Convert songbird::ChannelId -> NonZeroU64 -> serenity::ChannelId
        channel.map(|c| serenity::ChannelId::from(c.0))
    }

    /// Join `channel`, registering event handlers the first time a call is made.
    #[instrument(skip(self), fields(guild = %self.guild))]
    pub async fn join(&self, channel: serenity::ChannelId) -> Result<CallRef, BotError> {
        if self.call().is_none() {
            let call = self.manager.get_or_insert(self.guild);
            events::register(&call, self).await;
        }

        info!("Joining voice channel {channel}");
        let call = self.manager.join(self.guild, channel).await?;
        Ok(call)
    }

    /// Add a song to the queue, starting playback if nothing is playing.
    pub async fn enqueue(
        &self,
        song: Song,
        announce: serenity::ChannelId,
    ) -> Result<Enqueued, BotError> {
        let mut state = self.state.lock().await;
        state.announce = Some(announce);

        let position = state.queue.push(song.clone())?;
        if state.queue.current().is_some() {
            return Ok(Enqueued::Queued { song, position });
        }

        match self.start_next(&mut state).await {
            Ok(Some(song)) => Ok(Enqueued::NowPlaying(song)),
            Ok(None) => Err(UserError::EmptyQueue.into()),
            Err(e) => {
                state.reset();
                Err(e)
            }
        }
    }

    /// Move to the next song and play it. Returns what is now playing.
    async fn start_next(&self, state: &mut GuildPlayer) -> Result<Option<Song>, BotError> {
        let Some(song) = state.advance() else {
            return Ok(None);
        };
        self.play(state, &song).await?;
        Ok(Some(song))
    }

    /// Start streaming `song`, it must already be the queue's current song.
    async fn play(&self, state: &mut GuildPlayer, song: &Song) -> Result<(), BotError> {
        let call = self.call().ok_or(UserError::BotNotInVoice)?;
        let input = HttpRequest::new(self.http.clone(), song.stream_url.clone());
        let handle = call.lock().await.play_only_input(input.into());
        handle.set_volume(state.volume.gain())?;

        info!("Playing {}", song.title);
        state.handle = Some(handle);
        Ok(())
    }

    /// Called by track events. Advances the queue if `track` is the current one.
    pub(super) async fn track_finished(&self, track: &TrackHandle, errored: bool) {
        let mut messages = Vec::new();
        let announce = {
            let mut state = self.state.lock().await;
            let is_current = state.handle.as_ref().is_some_and(|h| h.uuid() == track.uuid());
            let Some(end) = state.finish_track(is_current, errored) else {
                debug!("Ignoring event of a stale track.");
                return;
            };
            messages.extend(end.failed);

            match end.next {
                Some(song) => match self.play(&mut state, &song).await {
                    Ok(()) => messages.push(format!("🎵 Now playing: {song}")),
                    Err(e) => {
                        error!("Failed to start next track: {e}");
                        state.reset();
                    }
                },
                None => debug!("Queue finished."),
            }
            state.announce
        };

        if let Some(channel) = announce {
            for message in messages {
                self.announce(channel, message).await;
            }
        }
    }

    /// Stop the current track, the end event starts the next one.
    pub async fn skip(&self) -> Result<Song, BotError> {
        let state = self.state.lock().await;
        let (Some(handle), Some(song)) = (&state.handle, state.queue.current()) else {
            return Err(UserError::NothingPlaying.into());
        };
        handle.stop()?;
        info!("Skipping {}", song.title);
        Ok(song.clone())
    }

    /// Pause the current track, keeping it as the current song.
    pub async fn pause(&self) -> Result<Song, BotError> {
        let mut state = self.state.lock().await;
        let (Some(handle), Some(song)) = (&state.handle, state.queue.current()) else {
            return Err(UserError::NothingPlaying.into());
        };
        handle.pause()?;
        let song = song.clone();
        state.queue.set_paused(true);
        state.last_active = Instant::now();
        Ok(song)
    }

    /// Continue a paused track.
    pub async fn resume(&self) -> Result<Song, BotError> {
        let mut state = self.state.lock().await;
        if !state.queue.is_paused() {
            Err(UserError::NothingPaused)?
        }
        let (Some(handle), Some(song)) = (&state.handle, state.queue.current()) else {
            return Err(UserError::NothingPaused.into());
        };
        handle.play()?;
        let song = song.clone();
        state.queue.set_paused(false);
        Ok(song)
    }

    /// Change the volume, applying it to the current track right away.
    pub async fn set_volume(&self, volume: Volume) -> Result<(), BotError> {
        let mut state = self.state.lock().await;
        state.volume = volume;
        if let Some(handle) = &state.handle {
            handle.set_volume(volume.gain())?;
        }
        Ok(())
    }

    /// How long the guild has been without audible playback.
    pub(super) async fn idle_for(&self) -> Duration {
        self.state.lock().await.idle_for()
    }

    /// Clear the queue and stop playing, but stay connected.
    pub(super) async fn reset(&self) {
        self.state.lock().await.reset();
    }

    /// Clear everything and leave the voice channel.
    pub async fn leave(&self) -> Result<(), BotError> {
        self.reset().await;
        match self.manager.remove(self.guild).await {
            Ok(()) | Err(songbird::error::JoinError::NoCall) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Post a message in the announcement channel. Failures are only logged.
    pub(super) async fn announce(&self, channel: serenity::ChannelId, content: String) {
        if let Err(e) = channel.say(&self.discord, content).await {
            error!("Failed to post announcement. {e}");
        }
    }

    /// The channel playback updates go to.
    pub(super) async fn announce_channel(&self) -> Option<serenity::ChannelId> {
        self.state.lock().await.announce
    }

    /// Whether a non-bot user is in `channel`.
    pub(super) fn has_listeners(&self, channel: serenity::ChannelId) -> bool {
        let me = self.cache.current_user().id;
        let Some(guild) = self.cache.guild(self.guild) else {
            return false;
        };

        guild
            .voice_states
            .values()
            .filter(|vs| vs.channel_id == Some(channel) && vs.user_id != me)
            .any(|vs| {
                let is_bot = match &vs.member {
                    Some(member) => member.user.bot,
                    None => guild.members.get(&vs.user_id).is_some_and(|m| m.user.bot),
                };
                !is_bot
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::music::queue::test::song;

    fn player_with(titles: &[&str]) -> GuildPlayer {
        let mut player = GuildPlayer::new(&MusicSettings::default());
        for title in titles {
            player.queue.push(song(title)).unwrap();
        }
        player.advance();
        player
    }

    #[test]
    fn failed_track_is_reported_and_queue_advances() {
        let mut player = player_with(&["A", "B"]);

        let end = player.finish_track(true, true).unwrap();
        assert_eq!(
            end,
            TrackEnd {
                failed: Some("❌ Failed to play **A**, skipping.".to_string()),
                next: Some(song("B")),
            }
        );
        assert_eq!(player.queue.current(), Some(&song("B")));
        assert_eq!(player.queue.len(), 0);
    }

    #[test]
    fn finished_track_advances_quietly() {
        let mut player = player_with(&["A", "B"]);
        let end = player.finish_track(true, false).unwrap();
        assert_eq!(end.failed, None);
        assert_eq!(end.next, Some(song("B")));
    }

    #[test]
    fn stale_track_changes_nothing() {
        let mut player = player_with(&["A", "B"]);

        assert_eq!(player.finish_track(false, true), None);
        assert_eq!(player.queue.current(), Some(&song("A")));
        assert_eq!(player.queue.len(), 1);
    }

    #[test]
    fn empty_queue_clears_playback() {
        let mut player = player_with(&["A"]);

        let end = player.finish_track(true, false).unwrap();
        assert_eq!(end.next, None);
        assert!(player.handle.is_none());
        assert!(player.queue.is_empty());
    }
}
