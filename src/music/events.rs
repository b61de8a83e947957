//! Event handling
//!
//! Every call gets the following global events:
//! - Periodically, leave when alone or inactive for too long.
//! - On disconnect, clear the queue and stop playing.
//! - On track end or error, play the next song.

use std::time::Duration;

use async_trait::async_trait;
use songbird::tracks::PlayMode;
use songbird::CoreEvent;
use songbird::Event;
use songbird::EventContext;
use songbird::EventHandler;
use songbird::TrackEvent;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::player::Player;
use crate::serenity;

/// Most time between two idle checks.
const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Register the global events of a freshly made call.
pub(super) async fn register(call: &super::player::CallRef, player: &Player) {
    debug!("Registering global events.");
    let interval = player.inactivity_timeout.min(MAX_CHECK_INTERVAL);

    let mut call = call.lock().await;
    call.add_global_event(
        Event::Periodic(interval, None),
        CheckIdle {
            player: player.clone(),
        },
    );
    call.add_global_event(
        Event::Core(CoreEvent::DriverDisconnect),
        DisconnectStop {
            player: player.clone(),
        },
    );
    call.add_global_event(
        Event::Track(TrackEvent::End),
        NextTrack {
            player: player.clone(),
        },
    );
    call.add_global_event(
        Event::Track(TrackEvent::Error),
        NextTrack {
            player: player.clone(),
        },
    );
}

/// Why the bot should leave a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaveReason {
    /// Not in any channel anymore.
    Disconnected,
    /// No non-bot users are listening.
    Alone,
    /// Nothing played for the inactivity timeout.
    Inactive,
}

impl LeaveReason {
    fn message(self) -> Option<&'static str> {
        match self {
            LeaveReason::Disconnected => None,
            LeaveReason::Alone => Some("👋 Everyone left, so I did too."),
            LeaveReason::Inactive => Some("💤 Left the voice channel due to inactivity."),
        }
    }
}

/// Decide whether to leave based on who's listening and how long it has been quiet.
fn leave_reason(
    channel: Option<serenity::ChannelId>,
    has_listeners: bool,
    idle_for: Duration,
    timeout: Duration,
) -> Option<LeaveReason> {
    match channel {
        None => Some(LeaveReason::Disconnected),
        Some(_) if !has_listeners => Some(LeaveReason::Alone),
        Some(_) if idle_for >= timeout => Some(LeaveReason::Inactive),
        Some(_) => None,
    }
}

/// Leave the call when alone or idle.
struct CheckIdle {
    player: Player,
}

#[async_trait]
impl EventHandler for CheckIdle {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let channel = self.player.bot_channel().await;
        let has_listeners = channel.is_some_and(|c| self.player.has_listeners(c));
        let idle_for = self.player.idle_for().await;

        let reason = leave_reason(
            channel,
            has_listeners,
            idle_for,
            self.player.inactivity_timeout,
        )?;

        info!("Leaving voice channel: {reason:?}");
        let announce = self.player.announce_channel().await;
        if let Err(e) = self.player.leave().await {
            error!("Failed to leave voice channel. {e}");
        }
        if let (Some(channel), Some(message)) = (announce, reason.message()) {
            self.player.announce(channel, message.to_string()).await;
        }
        None
    }
}

/// Stop playing when the driver disconnects.
/// 'Stopping' means:
/// - End anything currently playing.
/// - Reset the queue.
struct DisconnectStop {
    player: Player,
}

#[async_trait]
impl EventHandler for DisconnectStop {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        info!("Stopping on disconnect!");
        self.player.reset().await;
        None
    }
}

/// Play the next song once the current one ends or fails.
struct NextTrack {
    player: Player,
}

#[async_trait]
impl EventHandler for NextTrack {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };

        for (state, handle) in tracks.iter() {
            let errored = matches!(state.playing, PlayMode::Errored(_));
            self.player.track_finished(handle, errored).await;
        }
        None
    }
}
