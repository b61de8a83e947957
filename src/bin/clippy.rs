//! Runs the Clippy bot.

use std::process::ExitCode;

use discord_bots::clippy::ClippyBot;

#[tokio::main]
async fn main() -> ExitCode {
    discord_bots::setup::run::<ClippyBot>().await
}
