//! Unprompted Clippy: replies to random messages and posts out of nowhere.

use std::time::Duration;

use rand::seq::IteratorRandom;
use rand::seq::SliceRandom;
use rand::Rng;
use serenity::ChannelId;
use serenity::ChannelType;
use serenity::Message;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::quotes::CLIPPY_QUOTES;
use crate::config::ClippySettings;
use crate::serenity;
use crate::BotError;

/// Shortest wait before a random reply.
const MIN_REPLY_DELAY: f64 = 1.0;

/// One coin flip per message.
pub fn should_reply<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    rng.gen::<f64>() < chance
}

/// Uniform in `[1, max_delay]` seconds, replies feel less robotic.
pub fn reply_delay<R: Rng + ?Sized>(rng: &mut R, max_delay: f64) -> Duration {
    if max_delay <= MIN_REPLY_DELAY {
        return Duration::from_secs_f64(MIN_REPLY_DELAY);
    }
    Duration::from_secs_f64(rng.gen_range(MIN_REPLY_DELAY..=max_delay))
}

/// `base` give or take 25%.
pub fn jittered<R: Rng + ?Sized>(rng: &mut R, base: Duration) -> Duration {
    let base = base.as_secs_f64();
    if base <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rng.gen_range(base * 0.75..=base * 1.25))
}

pub fn quote<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CLIPPY_QUOTES.choose(rng).copied().unwrap_or_default()
}

/// Maybe answer a message with a quote.
pub async fn maybe_reply(
    ctx: &serenity::Context,
    settings: &ClippySettings,
    message: &Message,
) -> Result<(), BotError> {
    if !settings.random_responses || message.author.bot {
        return Ok(());
    }

    // The rng can't be held across awaits.
    let (delay, quote) = {
        let mut rng = rand::thread_rng();
        if !should_reply(&mut rng, settings.reply_chance) {
            return Ok(());
        }
        (
            reply_delay(&mut rng, settings.random_message_delay),
            quote(&mut rng),
        )
    };

    tokio::time::sleep(delay).await;
    message.channel_id.say(ctx, quote).await?;
    info!("Sent random response to {}", message.author.name);
    Ok(())
}

/// Post a quote every `interval` (with jitter) for as long as the bot runs.
pub fn spawn_random_messages(ctx: serenity::Context, interval: Duration) {
    info!("Starting random messages every ~{}s", interval.as_secs());

    tokio::spawn(async move {
        loop {
            let wait = jittered(&mut rand::thread_rng(), interval);
            tokio::time::sleep(wait).await;

            let Some((channel, quote)) = pick_channel(&ctx) else {
                debug!("No channel to send a random message to.");
                continue;
            };
            match channel.say(&ctx, quote).await {
                Ok(_) => info!("Sent random message to {channel}"),
                Err(e) => error!("Failed to send random message: {e}"),
            }
        }
    });
}

/// A random text channel Clippy may talk in, from a random guild, and what to say.
fn pick_channel(ctx: &serenity::Context) -> Option<(ChannelId, &'static str)> {
    let mut rng = rand::thread_rng();
    let me = ctx.cache.current_user().id;
    let guild_id = ctx.cache.guilds().into_iter().choose(&mut rng)?;

    let guild = ctx.cache.guild(guild_id)?;
    let member = guild.members.get(&me)?;
    let channel = guild
        .channels
        .values()
        .filter(|c| c.kind == ChannelType::Text)
        .filter(|c| guild.user_permissions_in(c, member).send_messages())
        .choose(&mut rng)?;

    Some((channel.id, quote(&mut rng)))
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn coin_flip_respects_chance() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| !should_reply(&mut rng, 0.0)));
        assert!((0..1000).all(|_| should_reply(&mut rng, 1.0)));

        let hits = (0..10_000).filter(|_| should_reply(&mut rng, 0.02)).count();
        assert!((100..=300).contains(&hits), "{hits}");
    }

    #[test]
    fn reply_delay_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let delay = reply_delay(&mut rng, 3.0).as_secs_f64();
            assert!((1.0..=3.0).contains(&delay), "{delay}");
        }
        assert_eq!(reply_delay(&mut rng, 0.5), Duration::from_secs(1));
    }

    #[test]
    fn jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_secs(2700);
        for _ in 0..1000 {
            let wait = jittered(&mut rng, base).as_secs_f64();
            assert!((2025.0..=3375.0).contains(&wait), "{wait}");
        }
        assert_eq!(jittered(&mut rng, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn quotes_come_from_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(CLIPPY_QUOTES.contains(&quote(&mut rng)));
    }
}
