//! Runs the card lookup bot.

use std::process::ExitCode;

use discord_bots::cards::CardBot;

#[tokio::main]
async fn main() -> ExitCode {
    discord_bots::setup::run::<CardBot>().await
}
