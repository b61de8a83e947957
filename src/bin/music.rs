//! Runs the music bot.

use std::process::ExitCode;

use discord_bots::music::MusicBot;

#[tokio::main]
async fn main() -> ExitCode {
    discord_bots::setup::run::<MusicBot>().await
}
