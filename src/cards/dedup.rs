//! Discord sometimes delivers the same message twice, and users double tap.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::fuzzy::normalize;
use crate::serenity::UserId;

/// Identical commands from one user inside this window are dropped.
pub const DUPLICATE_WINDOW: Duration = Duration::from_millis(1500);

/// When each user last sent each command.
#[derive(Debug, Default)]
pub struct RecentCommands {
    seen: Mutex<HashMap<(UserId, String), Instant>>,
}

impl RecentCommands {
    /// Record the command, returning `false` if it's a duplicate.
    pub async fn check(&self, user: UserId, content: &str) -> bool {
        let now = Instant::now();
        let key = (user, normalize(content));
        let mut seen = self.seen.lock().await;

        seen.retain(|_, last| now.duration_since(*last) < DUPLICATE_WINDOW);
        if seen.contains_key(&key) {
            return false;
        }
        seen.insert(key, now);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn duplicates_inside_window_are_dropped() {
        let recent = RecentCommands::default();
        let user = UserId::new(1);

        assert!(recent.check(user, "!Lightning Bolt").await);
        assert!(!recent.check(user, "!lightning   bolt").await);

        tokio::time::advance(DUPLICATE_WINDOW).await;
        assert!(recent.check(user, "!lightning bolt").await);
    }

    #[tokio::test(start_paused = true)]
    async fn users_and_commands_are_independent() {
        let recent = RecentCommands::default();

        assert!(recent.check(UserId::new(1), "!bolt").await);
        assert!(recent.check(UserId::new(2), "!bolt").await);
        assert!(recent.check(UserId::new(1), "!random").await);
    }
}
