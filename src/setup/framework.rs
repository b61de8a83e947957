//! Setup for [poise::Framework]

use crate::serenity;
use crate::Bot;
use crate::BotError;
use crate::Config;

/// Convenient type alias, one [poise::Framework] per bot.
type Framework<B> = poise::Framework<B, BotError>;

/// Construct a [poise::Framework]
pub(super) fn framework<B: Bot>(config: Config) -> Framework<B> {
    poise::Framework::builder()
        .options(framework_options::<B>())
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, config))
        .build()
}

/// Configure options for the [Framework]
fn framework_options<B: Bot>() -> poise::FrameworkOptions<B, BotError> {
    poise::FrameworkOptions {
        // Add commands to the framework
        commands: B::commands(),
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Everything that isn't a slash command goes to the bot itself
        event_handler: |ctx, event, _fw, data| Box::pin(data.on_event(ctx, event)),
        // Log when commands start and finish
        pre_command: |ctx| {
            Box::pin(async move {
                let command = &ctx.command().qualified_name;
                let user = &ctx.author().name;
                tracing::info!(guild = ?ctx.guild_id(), "'{command}' started by {user}.")
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                let command = &ctx.command().qualified_name;
                tracing::info!(guild = ?ctx.guild_id(), "'{command}' finished.")
            })
        },
        ..Default::default()
    }
}

/// Construct future that runs on startup
fn framework_setup<'a, B: Bot>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework<B>,
    config: Config,
) -> poise::BoxFuture<'a, Result<B, BotError>> {
    Box::pin(async move {
        // Register the commands
        let app_commands = poise::builtins::create_application_commands(&fw.options().commands);

        serenity::Command::set_global_commands(ctx, app_commands.clone()).await?;
        if let Some(dev_guild) = config.dev_guild() {
            // This is faster than global registers, useful for development.
            tracing::info!("Registering commands on dev guild.");
            dev_guild.set_commands(ctx, app_commands).await?;
        }

        let notify_list = config.notify_list(fw);
        let bot = B::build(ctx, &config, notify_list).await?;

        let bot_name = &rdy.user.name;
        let guilds = rdy.guilds.len();
        tracing::info!("{} is ready as {bot_name} in {guilds} guilds.", B::KIND.name());

        Ok(bot)
    })
}
