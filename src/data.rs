//! Per-guild state shared between commands and event handlers.

use std::collections::HashMap;
use std::sync::Arc;

use serenity::GuildId;
use tokio::sync::Mutex;

use crate::serenity;

/// Convenience type alias for a guild's state.
pub type GuildRef<T> = Arc<Mutex<T>>;

/// Map from guild to its state, created on first use.
#[derive(Debug)]
pub struct GuildData<T> {
    #[allow(clippy::missing_docs_in_private_items)]
    inner: Mutex<HashMap<GuildId, GuildRef<T>>>,
}

impl<T> Default for GuildData<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::default(),
        }
    }
}

impl<T> GuildData<T> {
    /// Returns the state of `guild`, creating it with `init` if there is none.
    pub async fn get_or_insert_with(&self, guild: GuildId, init: impl FnOnce() -> T) -> GuildRef<T> {
        let mut map = self.inner.lock().await;
        map.entry(guild)
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn state_is_shared_per_guild() {
        let data: GuildData<Vec<u8>> = GuildData::default();
        let a = GuildId::new(1);
        let b = GuildId::new(2);

        data.get_or_insert_with(a, Vec::new).await.lock().await.push(1);
        data.get_or_insert_with(a, Vec::new).await.lock().await.push(2);
        data.get_or_insert_with(b, Vec::new).await;

        let a_state = data.get_or_insert_with(a, Vec::new).await;
        assert_eq!(*a_state.lock().await, vec![1, 2]);
        let b_state = data.get_or_insert_with(b, || vec![9]).await;
        assert!(b_state.lock().await.is_empty());
    }
}
