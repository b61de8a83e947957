//! Shared startup for every bot.
//!
//! A bot is a type implementing [Bot]. The type doubles as the
//! [poise] user data, so commands reach their state through `ctx.data()`.

mod framework;

use std::collections::HashSet;
use std::process::ExitCode;

use async_trait::async_trait;
use serenity::UserId;
use tracing::error;
use tracing::info;

use crate::config::BotKind;
use crate::serenity;
use crate::BotError;
use crate::Command;
use crate::Config;

/// The callback surface a bot exposes to the chat library.
#[async_trait]
pub trait Bot: Sized + Send + Sync + 'static {
    /// Which bot this is, decides the token variable.
    const KIND: BotKind;

    /// Slash commands to register.
    fn commands() -> Vec<Command<Self>>;

    /// Gateway intents, see <https://discord.com/developers/docs/topics/gateway#gateway-intents>
    fn intents() -> serenity::GatewayIntents {
        serenity::GatewayIntents::non_privileged()
    }

    /// Hook to register extra client state, such as a voice manager.
    fn configure_client(builder: serenity::ClientBuilder) -> serenity::ClientBuilder {
        builder
    }

    /// Construct the bot once the gateway is ready.
    async fn build(
        ctx: &serenity::Context,
        config: &Config,
        notify_list: HashSet<UserId>,
    ) -> Result<Self, BotError>;

    /// Users that receive bug notifications.
    fn notify_list(&self) -> &HashSet<UserId>;

    /// Raw gateway events, for anything that isn't a slash command.
    async fn on_event(
        &self,
        _ctx: &serenity::Context,
        _event: &serenity::FullEvent,
    ) -> Result<(), BotError> {
        Ok(())
    }
}

/// Constructs a [serenity::Client] for bot `B`.
pub async fn client<B: Bot>(config: Config) -> Result<serenity::Client, BotError> {
    // Checked before anything touches the network.
    let token = config.token()?.to_string();

    let builder = serenity::ClientBuilder::new(token, B::intents())
        .framework(framework::framework::<B>(config));

    let client = B::configure_client(builder).await?;

    Ok(client)
}

/// Load the config, install tracing and run bot `B` until the gateway closes.
///
/// Startup problems are printed to stderr since tracing may not exist yet.
pub async fn run<B: Bot>() -> ExitCode {
    let config = match Config::load(B::KIND) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", B::KIND.name());
            return ExitCode::FAILURE;
        }
    };

    // Hold on to the guard so file logs get flushed.
    let _guard = crate::log::install_tracing(&config);
    info!("Starting {}.", B::KIND.name());

    let mut client = match client::<B>(config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = client.start().await {
        error!("Client stopped: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
