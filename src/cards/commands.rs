//! Slash commands of the card bot, the same features as the prefix messages.

use poise::CreateReply;
use tracing::instrument;

use super::query;
use super::CardBot;
use super::Context;
use crate::BotError;
use crate::Command;

/// Lists all the implemented commands
pub fn list() -> Vec<Command<CardBot>> {
    vec![card(), random_card(), card_cache(), card_help()]
}

/// Look up a Magic card, separate several cards with `;`
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn card(
    ctx: Context<'_>,
    #[description = "Card name, filters like e:lea, or several cards separated by ;"] query: String,
) -> Result<(), BotError> {
    let mut queries = query::split_queries(&query)?;

    // Lookups can take several requests.
    ctx.defer().await?;

    if queries.len() == 1 {
        let embed = ctx.data().lookup(&queries.remove(0)).await?;
        ctx.send(CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    for embeds in ctx.data().lookup_many(&queries).await? {
        let reply = embeds
            .into_iter()
            .fold(CreateReply::default(), |reply, embed| reply.embed(embed));
        ctx.send(reply).await?;
    }
    Ok(())
}

/// Show a random Magic card
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn random_card(ctx: Context<'_>) -> Result<(), BotError> {
    ctx.defer().await?;
    let embed = ctx.data().random().await?;
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show card cache statistics
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn card_cache(ctx: Context<'_>) -> Result<(), BotError> {
    let embed = ctx.data().cache_stats().await;
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// How to use the card bot
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn card_help(ctx: Context<'_>) -> Result<(), BotError> {
    let embed = ctx.data().help();
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
