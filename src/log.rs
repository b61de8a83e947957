//! Logging functionality and error reporting.
//! The logging library of choice is [tracing].

use itertools::Itertools;
use poise::BoxFuture;
use poise::CreateReply;
use poise::FrameworkError;
use serenity::CreateMessage;
use tracing::debug;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::UserError;
use crate::serenity;
use crate::Bot;
use crate::BotError;
use crate::Config;
use crate::Context;

/// The name of this crate, used to set filter target.
const THIS_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Setup format layers, tracing subscribers, and installs tracing.
///
/// The returned guard must be held for as long as file logs should be written.
pub fn install_tracing(config: &Config) -> Option<WorkerGuard> {
    // Uses local time.
    let timer = fmt::time::ChronoLocal::rfc_3339();

    // Other crates (serenity, songbird, ...) only show INFO and above.
    let level = config.log_level();
    let target = Targets::new()
        .with_default(LevelFilter::INFO.min(level))
        .with_target(THIS_CRATE, level);
    let verbose = level >= LevelFilter::DEBUG;

    // Exactly one of these two console layers is enabled.
    let (pretty_layer, json_layer) = if config.json_logging() {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_timer(timer.clone())
            .with_filter(target.clone());
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_ansi(true)
            .with_file(verbose)
            .with_level(true)
            .with_line_number(verbose)
            .with_target(true)
            .with_timer(timer.clone())
            .pretty()
            .with_filter(target.clone());
        (Some(layer), None)
    };

    // Compose the layer that writes logs and get a guard for the writer.
    let (log_layer, guard) = if config.logs_enabled() {
        // Put file logs in `log_dir` as "{THIS_CRATE}.log.{TIMESTAMP}" on an hourly basis.
        let prefix_format = format!("{THIS_CRATE}.log");
        let appender = tracing_appender::rolling::hourly(config.log_dir(), prefix_format);

        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_ansi(false)
            .with_file(verbose)
            .with_level(true)
            .with_line_number(verbose)
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .compact()
            .with_filter(target);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(pretty_layer)
        .with(json_layer)
        .with(log_layer)
        .init();

    guard
}

/// Reply to and log a [FrameworkError].
///
/// [UserError]s get an [ephemeral_reply] and a debug log. Unexpected errors
/// are logged as errors and trigger a [notify_bug].
pub fn handle_framework_error<B: Bot>(err: FrameworkError<'_, B, BotError>) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        // Errors outside of commands have nobody to answer to.
        let Some(ctx) = err.ctx() else {
            log_background_error(err);
            return;
        };

        let response = match err {
            FrameworkError::Command {
                error: BotError::UserError(user_error),
                ..
            } => Response::user(&ctx, user_error),
            FrameworkError::Command { error, .. } => {
                Response::bug(&ctx, error, "Something went wrong... A bug report has been sent.")
            }
            FrameworkError::CommandPanic { payload, .. } => Response::bug(
                &ctx,
                BotError::Panic { payload },
                "Something went horribly wrong... A bug report has been sent.",
            ),
            FrameworkError::CommandStructureMismatch { description, .. } => Response::bug(
                &ctx,
                BotError::CommandStructureMismatch {
                    description: description.to_string(),
                },
                "Command structure mismatch. Please wait until discord catches up to a bot update.",
            ),
            FrameworkError::ArgumentParse { error, input, .. } => {
                let user_error = UserError::BadArgs { input };
                Response::builder()
                    .ctx(&ctx)
                    .reply(user_error.to_string())
                    .source(user_error)
                    .add_info(error.to_string())
                    .build()
            }
            FrameworkError::CommandCheckFailed { error, .. } => {
                let error = BotError::CheckFailed {
                    reason: error.map(|e| e.to_string()),
                };
                Response::builder()
                    .ctx(&ctx)
                    .reply(error.to_string())
                    .source(error)
                    .build()
            }
            // What's left are misuses, shown to the user but never reported.
            other => match misuse(other) {
                Some(user_error) => Response::user(&ctx, user_error),
                None => {
                    error!("Unhandled framework error in '{}'.", ctx.command().name);
                    return;
                }
            },
        };

        response.send().await;
    })
}

/// Framework errors that are the user's doing.
fn misuse<B: Bot>(err: FrameworkError<'_, B, BotError>) -> Option<UserError> {
    let user_error = match err {
        FrameworkError::SubcommandRequired { ctx } => UserError::MissingSubcommand {
            subcmds: ctx
                .command()
                .subcommands
                .iter()
                .map(|s| s.name.as_str())
                .join(", "),
        },
        FrameworkError::CooldownHit {
            remaining_cooldown, ..
        } => UserError::OnCooldown { remaining_cooldown },
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ..
        } => UserError::MissingBotPermissions {
            missing_permissions,
        },
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ..
        } => UserError::MissingUserPermissions {
            missing_permissions,
        },
        FrameworkError::NotAnOwner { .. } => UserError::NotOwner,
        FrameworkError::GuildOnly { .. } => UserError::GuildOnly,
        FrameworkError::DmOnly { .. } => UserError::DmOnly,
        FrameworkError::NsfwOnly { .. } => UserError::NsfwOnly,
        _ => return None,
    };
    Some(user_error)
}

/// Log errors that didn't come from a command invocation.
fn log_background_error<B: Bot>(err: FrameworkError<'_, B, BotError>) {
    match err {
        FrameworkError::Setup { error, .. } => error!("Error during startup: {error}"),
        FrameworkError::EventHandler { error, event, .. } => {
            let event = event.snake_case_name();
            error!("Error while handling {event} event: {error}")
        }
        // Prefix messages are handled by the bots themselves.
        FrameworkError::UnknownCommand { msg_content, .. } => {
            debug!("Ignoring unknown prefix command: {msg_content}")
        }
        FrameworkError::UnknownInteraction { interaction, .. } => {
            let name = &interaction.data.name;
            error!("Received unknown interaction: {name}")
        }
        FrameworkError::DynamicPrefix { .. } => {
            error!("Dynamic prefixes are not supported.")
        }
        _ => error!("Unhandled framework error outside of a command."),
    }
}

/// Sends an ephemeral reply to the [Context] author.
async fn ephemeral_reply<B: Bot>(ctx: &Context<'_, B>, content: impl Into<String>) {
    let reply = CreateReply::default().ephemeral(true).content(content);
    if let Err(e) = ctx.send(reply).await {
        error!("Failed to send ephemeral reply. {e}")
    };
}

/// Sends a notification (via private message) to users in the bot's notify list.
/// If message fails, only log and don't retry.
async fn notify_bug<B: Bot>(ctx: &Context<'_, B>, content: impl Into<String>) {
    let message = CreateMessage::new().content(content);

    for user in ctx.data().notify_list() {
        if let Err(e) = user.direct_message(ctx, message.clone()).await {
            error!("Failed to send bug notification. {e}");
        }
    }
}

/// Helper function to create debug information from [Context]
fn debug_info<B: Bot>(ctx: &Context<'_, B>) -> String {
    let user = &ctx.author().name;
    let cmd = &ctx.command().name;
    let user_input = ctx.invocation_string();
    format!("{user} tried to use {cmd} with {user_input}.")
}

/// Structured response to errors.
/// Always logs as at least [debug level](tracing::debug), but is upgraded to
/// [error level](tracing::error) if `is_error` is set.
/// Additionally, notify messages are accompanied by [debug info](debug_info).
#[derive(bon::Builder)]
#[builder(on(String, into))]
struct Response<'a, B: Bot> {
    /// The context of the response
    ctx: &'a Context<'a, B>,
    /// The reason for this reply, usually the error causing the response.
    #[builder(into)]
    source: BotError,
    /// Optional ephemeral reply to user.
    reply: Option<String>,
    /// Additional information to log
    add_info: Option<String>,
    /// Set to `true` to log as error.
    #[builder(default = false)]
    is_error: bool,
    /// Set to `true` to send notifications of the error.
    /// Does nothing if `is_error` is false.
    #[builder(default = false)]
    notify: bool,
}

impl<'a, B: Bot> Response<'a, B> {
    /// The common case: show a [UserError] to the user and log it quietly.
    fn user(ctx: &'a Context<'a, B>, user_error: UserError) -> Self {
        Self {
            ctx,
            reply: Some(user_error.to_string()),
            source: user_error.into(),
            add_info: None,
            is_error: false,
            notify: false,
        }
    }

    /// An unexpected error: logged as error and reported to the notify list.
    fn bug(ctx: &'a Context<'a, B>, source: BotError, reply: &str) -> Self {
        Self {
            ctx,
            reply: Some(reply.to_string()),
            source,
            add_info: None,
            is_error: true,
            notify: true,
        }
    }

    /// Execute the response
    async fn send(&self) {
        let ctx = self.ctx;

        let log_message = {
            let source = &self.source;
            let add_info = self
                .add_info
                .as_ref()
                // Map `None` to "" otherwise format it to be appended to another string.
                .map_or("".to_string(), |s| format!("| {s}"));
            format!("{source} {add_info}")
        };
        if self.is_error {
            error!("{log_message}");
            if self.notify {
                let dbg_info = debug_info(ctx);
                let content = format!("Debug Info: {dbg_info}\n{log_message}");
                notify_bug(ctx, content).await;
            }
        } else {
            debug!("{log_message}");
        }

        if let Some(ref reply) = self.reply {
            ephemeral_reply(ctx, reply).await;
        }
    }
}
