//! Clippy, back from retirement to answer slash commands with canned quotes
//! and to butt into conversations now and then.

mod commands;
mod quotes;
mod random;

use std::collections::HashSet;

use async_trait::async_trait;
use serenity::CreateInteractionResponse;
use serenity::CreateInteractionResponseMessage;
use serenity::FullEvent;
use serenity::Interaction;
use serenity::UserId;
use tracing::debug;

use crate::config::BotKind;
use crate::config::ClippySettings;
use crate::serenity;
use crate::Bot;
use crate::BotError;
use crate::Command;
use crate::Config;

/// Convenient type alias for this bot's [crate::Context].
type Context<'a> = crate::Context<'a, ClippyBot>;

pub struct ClippyBot {
    /// List of users to send bug notifications
    notify_list: HashSet<UserId>,
    settings: ClippySettings,
}

#[async_trait]
impl Bot for ClippyBot {
    const KIND: BotKind = BotKind::Clippy;

    fn commands() -> Vec<Command<Self>> {
        commands::list()
    }

    async fn build(
        ctx: &serenity::Context,
        config: &Config,
        notify_list: HashSet<UserId>,
    ) -> Result<Self, BotError> {
        let settings = config.clippy.clone();

        let interval = settings.random_interval();
        if settings.random_responses && !interval.is_zero() {
            random::spawn_random_messages(ctx.clone(), interval);
        }

        Ok(Self {
            notify_list,
            settings,
        })
    }

    fn notify_list(&self) -> &HashSet<UserId> {
        &self.notify_list
    }

    async fn on_event(&self, ctx: &serenity::Context, event: &FullEvent) -> Result<(), BotError> {
        match event {
            FullEvent::Message { new_message } => {
                random::maybe_reply(ctx, &self.settings, new_message).await?;
            }
            FullEvent::InteractionCreate {
                interaction: Interaction::Component(component),
            } => {
                let Some(content) = commands::button_response(&component.data.custom_id) else {
                    return Ok(());
                };
                debug!("{} pressed {}", component.user.name, component.data.custom_id);

                let message = CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true);
                component
                    .create_response(ctx, CreateInteractionResponse::Message(message))
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }
}
