//! Magic: The Gathering card lookups.
//!
//! Cards are looked up on [Scryfall](scryfall) through a [lookup::CardResolver]
//! which keeps recently found cards in a [cache::Cache]. Users ask with prefix
//! messages (`!lightning bolt`) or with slash commands.

mod cache;
mod commands;
mod dedup;
mod embed;
mod fuzzy;
mod lookup;
mod query;
pub mod scryfall;

use std::collections::HashSet;

use async_trait::async_trait;
use serenity::CreateEmbed;
use serenity::CreateMessage;
use serenity::FullEvent;
use serenity::Message;
use serenity::UserId;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::BotKind;
use crate::error::UserError;
use crate::serenity;
use crate::Bot;
use crate::BotError;
use crate::Command;
use crate::Config;
use dedup::RecentCommands;
use embed::GridEntry;
use lookup::CardResolver;
use lookup::Resolved;
use query::MessageCommand;
pub use scryfall::ScryfallError;
use scryfall::ScryfallClient;

/// Convenient type alias for this bot's [crate::Context].
type Context<'a> = crate::Context<'a, CardBot>;

/// Shown for anything that isn't the user's fault.
const GENERIC_FAILURE: &str = "Sorry, something went wrong while searching for that card.";

/// State of the card bot.
pub struct CardBot {
    /// List of users to send bug notifications
    notify_list: HashSet<UserId>,
    prefix: String,
    resolver: CardResolver,
    recent: RecentCommands,
}

/// Turn a lookup failure into something the user can act on.
/// Like [lookup_error], but there is no query to blame.
fn random_error(err: ScryfallError) -> BotError {
    match err {
        ScryfallError::NotFound { .. } => UserError::NoRandomCard.into(),
        ScryfallError::RateLimited => UserError::RateLimited.into(),
        other => other.into(),
    }
}

fn lookup_error(err: ScryfallError, query: &str) -> BotError {
    match err {
        ScryfallError::EmptyQuery => UserError::EmptyCardQuery.into(),
        ScryfallError::NotFound { .. } => UserError::CardNotFound {
            query: query.to_string(),
            filtered: query::has_filters(query),
        }
        .into(),
        ScryfallError::RateLimited => UserError::RateLimited.into(),
        other => other.into(),
    }
}

impl CardBot {
    /// The embed for one query.
    pub async fn lookup(&self, query: &str) -> Result<CreateEmbed, BotError> {
        let resolved = self
            .resolver
            .resolve(query)
            .await
            .map_err(|e| lookup_error(e, query))?;
        info!("Found '{}' for '{query}'", resolved.card.name);
        Ok(embed::card(&resolved, query))
    }

    /// Grid messages for several queries. Queries that fail are listed as not found.
    pub async fn lookup_many(&self, queries: &[String]) -> Result<Vec<Vec<CreateEmbed>>, BotError> {
        info!("Looking up {} cards", queries.len());

        // One at a time, the client spaces requests anyway.
        let mut entries = Vec::with_capacity(queries.len());
        for query in queries {
            let found = match self.resolver.resolve(query).await {
                Ok(resolved) => Some(resolved),
                Err(e @ (ScryfallError::NotFound { .. } | ScryfallError::EmptyQuery)) => {
                    debug!("No card for '{query}': {e}");
                    None
                }
                Err(e) => {
                    warn!("Lookup of '{query}' failed: {e}");
                    None
                }
            };
            entries.push(GridEntry {
                query: query.clone(),
                found,
            });
        }

        if entries.iter().all(|entry| entry.found.is_none()) {
            return Err(UserError::NoCardsResolved.into());
        }
        Ok(embed::grid(&entries))
    }

    /// The embed for a random card.
    pub async fn random(&self) -> Result<CreateEmbed, BotError> {
        let card = self.resolver.random().await.map_err(random_error)?;
        let resolved = Resolved {
            card,
            used_fallback: false,
        };
        Ok(embed::card(&resolved, ""))
    }

    /// Usage of the prefix commands.
    pub fn help(&self) -> CreateEmbed {
        embed::help(&self.prefix)
    }

    /// Statistics of the card cache.
    pub async fn cache_stats(&self) -> CreateEmbed {
        embed::cache_stats(&self.resolver.stats().await)
    }

    /// Messages answering a prefix command.
    async fn respond(&self, command: MessageCommand) -> Result<Vec<Vec<CreateEmbed>>, BotError> {
        let embed = match command {
            MessageCommand::Random => self.random().await?,
            MessageCommand::Help => self.help(),
            MessageCommand::Cache => self.cache_stats().await,
            MessageCommand::Lookup(query) => self.lookup(&query).await?,
            MessageCommand::Multi(queries) => return self.lookup_many(&queries).await,
        };
        Ok(vec![vec![embed]])
    }

    /// Handle a chat message that may be a prefix command.
    async fn on_message(&self, ctx: &serenity::Context, message: &Message) -> Result<(), BotError> {
        if message.author.bot || !message.content.starts_with(&self.prefix) {
            return Ok(());
        }
        if !self.recent.check(message.author.id, &message.content).await {
            debug!("Dropping duplicate command from {}", message.author.name);
            return Ok(());
        }

        let result = match query::parse_message(&message.content, &self.prefix) {
            Ok(None) => return Ok(()),
            Ok(Some(command)) => {
                debug!("{} sent {command:?}", message.author.name);
                self.respond(command).await
            }
            Err(user_error) => Err(user_error.into()),
        };

        let replies = match result {
            Ok(replies) => replies,
            Err(BotError::UserError(user_error)) => {
                debug!("{user_error}");
                vec![vec![embed::error(user_error.to_string())]]
            }
            Err(e) => {
                error!("Card command '{}' failed: {e}", message.content);
                vec![vec![embed::error(GENERIC_FAILURE)]]
            }
        };

        for embeds in replies {
            let reply = CreateMessage::new().embeds(embeds);
            message.channel_id.send_message(ctx, reply).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Bot for CardBot {
    const KIND: BotKind = BotKind::Cards;

    fn commands() -> Vec<Command<Self>> {
        commands::list()
    }

    fn intents() -> serenity::GatewayIntents {
        // Prefix commands need to read messages.
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT
    }

    async fn build(
        _ctx: &serenity::Context,
        config: &Config,
        notify_list: HashSet<UserId>,
    ) -> Result<Self, BotError> {
        let settings = &config.cards;
        let client = ScryfallClient::new(&settings.api_base_url, settings.http_timeout())?;

        Ok(Self {
            notify_list,
            prefix: settings.command_prefix.clone(),
            resolver: CardResolver::new(client, settings),
            recent: RecentCommands::default(),
        })
    }

    fn notify_list(&self) -> &HashSet<UserId> {
        &self.notify_list
    }

    async fn on_event(&self, ctx: &serenity::Context, event: &FullEvent) -> Result<(), BotError> {
        if let FullEvent::Message { new_message } = event {
            self.on_message(ctx, new_message).await?;
        }
        Ok(())
    }
}
