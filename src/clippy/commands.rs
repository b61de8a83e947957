//! Clippy's slash commands and the buttons under `/clippy_help`.

use poise::CreateReply;
use serenity::ButtonStyle;
use serenity::CreateActionRow;
use serenity::CreateButton;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use tracing::instrument;

use super::quotes::WISDOM_QUOTES;
use super::random;
use super::ClippyBot;
use super::Context;
use crate::serenity;
use crate::BotError;
use crate::Command;

const EMBED_COLOUR: u32 = 0x5865F2;

pub const CHAOS_BUTTON: &str = "clippy_chaos";
pub const REGRET_BUTTON: &str = "clippy_regret";
pub const CLASSIC_BUTTON: &str = "clippy_classic";

/// Lists all the implemented commands
pub fn list() -> Vec<Command<ClippyBot>> {
    vec![clippy(), clippy_wisdom(), clippy_help()]
}

/// Get an unhinged Clippy response
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn clippy(ctx: Context<'_>) -> Result<(), BotError> {
    let quote = random::quote(&mut rand::thread_rng());
    ctx.say(quote).await?;
    Ok(())
}

/// Receive Clippy's questionable wisdom
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn clippy_wisdom(ctx: Context<'_>) -> Result<(), BotError> {
    let wisdom = {
        use rand::seq::SliceRandom;
        WISDOM_QUOTES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
    };

    let embed = CreateEmbed::default()
        .title("📎 Clippy's Wisdom")
        .description(wisdom)
        .colour(EMBED_COLOUR)
        .footer(CreateEmbedFooter::new(
            "Wisdom is questionable, but confidence is guaranteed!",
        ));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Get help from Clippy (if you dare)
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn clippy_help(ctx: Context<'_>) -> Result<(), BotError> {
    let reply = CreateReply::default()
        .embed(help_embed())
        .components(vec![help_buttons()]);
    ctx.send(reply).await?;
    Ok(())
}

fn help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("📎 Clippy's \"Helpful\" Guide")
        .description("I see you're trying to get help. Would you like me to make it worse?")
        .colour(EMBED_COLOUR)
        .field(
            "🎭 Commands",
            "`/clippy` - Get a classic unhinged Clippy response\n\
             `/clippy_wisdom` - Receive questionable life advice\n\
             `/clippy_help` - Get help (if you dare)",
            false,
        )
        .field(
            "🤖 About Me",
            "I'm Clippy! I terrorized Microsoft Office users from 1997-2003, \
             and now I'm here to bring that same chaotic energy to Discord. \
             It looks like you're trying to have a good time - let me ruin that for you!",
            false,
        )
        .field(
            "📎 Fun Facts",
            "• I'm the original AI assistant (before it was cool)\n\
             • I've been living rent-free in people's heads since the 90s\n\
             • My catchphrase is 'It looks like...' and I'm not sorry\n\
             • I was replaced by Cortana (lol how'd that work out?)",
            false,
        )
        .footer(CreateEmbedFooter::new("Remember: I'm here to help... sort of. 📎"))
}

fn help_buttons() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(CHAOS_BUTTON)
            .label("More Chaos")
            .style(ButtonStyle::Danger)
            .emoji('💥'),
        CreateButton::new(REGRET_BUTTON)
            .label("I Regret This")
            .style(ButtonStyle::Secondary)
            .emoji('😭'),
        CreateButton::new(CLASSIC_BUTTON)
            .label("Classic Clippy")
            .style(ButtonStyle::Primary)
            .emoji('📎'),
    ])
}

/// What a help button answers, `None` for buttons that aren't ours.
pub fn button_response(custom_id: &str) -> Option<String> {
    let response = match custom_id {
        CHAOS_BUTTON => "🎭 **CHAOS MODE ACTIVATED!** 🎭\n\nIt looks like you're trying to embrace disorder. Good choice! Here's some premium chaos energy: Your productivity is now officially my problem. I suggest starting your day with a light existential crisis and finishing with the realization that I'm never going away. Welcome to the club! 📎💥".to_string(),
        REGRET_BUTTON => "😭 **OH, THE REGRET!** 😭\n\nI see you're experiencing buyer's remorse, but like... you didn't actually buy anything? I'm free! Well, free as in 'costs your sanity' but that's the best kind of free, right? Don't worry, regret is just fear wearing a fancy outfit. Plus, it's too late now - I'm already in your head! 📎🧠".to_string(),
        CLASSIC_BUTTON => format!(
            "📎 **CLASSIC CLIPPY MODE** 📎\n\n{}",
            random::quote(&mut rand::thread_rng())
        ),
        _ => return None,
    };
    Some(response)
}
