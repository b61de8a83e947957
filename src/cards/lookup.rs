//! Turning a user's query into a card: the cache, then Scryfall's own
//! fuzzy lookup, then its autocomplete suggestions.

use tracing::debug;
use tracing::instrument;
use tracing::warn;

use super::cache::Cache;
use super::cache::CacheStats;
use super::fuzzy;
use super::query;
use super::scryfall::Card;
use super::scryfall::ScryfallClient;
use super::scryfall::ScryfallError;
use crate::config::CardSettings;

/// Shortest name worth retrying with when a filtered search finds nothing.
const MIN_FALLBACK_NAME_LEN: usize = 2;

/// A found card.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub card: Card,
    /// The filters matched nothing, so this is only the closest card by name.
    pub used_fallback: bool,
}

/// Resolves queries against the cache first and Scryfall second.
#[derive(Debug)]
pub struct CardResolver {
    client: ScryfallClient,
    cache: Cache<Card>,
    threshold: f64,
}

impl CardResolver {
    /// Resolver with a cache sized and timed by `settings`.
    pub fn new(client: ScryfallClient, settings: &CardSettings) -> Self {
        Self {
            client,
            cache: Cache::new(settings.cache_ttl(), settings.cache_size),
            threshold: settings.fuzzy_threshold,
        }
    }

    /// Find the card a query is about.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn resolve(&self, query: &str) -> Result<Resolved, ScryfallError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScryfallError::EmptyQuery);
        }

        let resolved = if query::has_filters(query) {
            match self.client.search_first(query).await {
                Ok(card) => Resolved {
                    card,
                    used_fallback: false,
                },
                Err(e) => {
                    let name = query::extract_card_name(query);
                    if name.chars().count() < MIN_FALLBACK_NAME_LEN {
                        return Err(e);
                    }
                    debug!("Filtered search failed ({e}), falling back to '{name}'");
                    Resolved {
                        card: self.resolve_name(&name).await?,
                        used_fallback: true,
                    }
                }
            }
        } else {
            Resolved {
                card: self.resolve_name(query).await?,
                used_fallback: false,
            }
        };

        if !resolved.card.is_valid() {
            return Err(ScryfallError::NotFound {
                details: "No card found for query".to_string(),
            });
        }
        Ok(resolved)
    }

    /// Look up a plain card name.
    async fn resolve_name(&self, name: &str) -> Result<Card, ScryfallError> {
        let key = fuzzy::normalize(name);

        if let Some(card) = self.cache.get(&key).await {
            debug!("Exact cache hit for '{key}'");
            return Ok(card);
        }

        match self.lookup_remote(name).await {
            Ok(card) => {
                self.remember(&key, &card).await;
                Ok(card)
            }
            Err(e) if e.is_unavailable() => match self.closest_cached(&key).await {
                Some(card) => {
                    warn!("Card api unavailable ({e}), using cached '{}'", card.name);
                    Ok(card)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Scryfall's fuzzy lookup, then its suggestions with our own matching.
    async fn lookup_remote(&self, name: &str) -> Result<Card, ScryfallError> {
        match self.client.named_fuzzy(name).await {
            Err(ScryfallError::NotFound { .. }) => {}
            other => return other,
        }

        let suggestions = match self.client.autocomplete(name).await {
            Ok(suggestions) => suggestions,
            Err(ScryfallError::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        let best = fuzzy::best_match(name, suggestions.iter().map(String::as_str), self.threshold);

        match best {
            Some((best, score)) => {
                debug!("Autocomplete matched '{name}' to '{best}' ({score:.2})");
                self.client.named_exact(best).await
            }
            None => Err(ScryfallError::NotFound {
                details: format!("No card matches '{name}'"),
            }),
        }
    }

    /// The cached card whose name is most similar to `key`, for when the api is down.
    async fn closest_cached(&self, key: &str) -> Option<Card> {
        let cards = self.cache.values().await;
        let names: Vec<String> = cards.iter().map(Card::display_name).collect();
        let (best, _) = fuzzy::best_match(key, names.iter().map(String::as_str), self.threshold)?;

        cards.into_iter().find(|card| card.display_name() == best)
    }

    /// Cache a card under the query and under its own name.
    async fn remember(&self, key: &str, card: &Card) {
        if !card.is_valid() {
            return;
        }
        self.cache.insert(key, card.clone()).await;
        let name = fuzzy::normalize(&card.display_name());
        if name != key {
            self.cache.insert(name, card.clone()).await;
        }
    }

    /// A random card, never cached.
    pub async fn random(&self) -> Result<Card, ScryfallError> {
        self.client.random().await
    }

    /// Statistics of the card cache.
    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
