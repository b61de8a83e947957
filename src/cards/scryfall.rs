//! Client for the [Scryfall](https://scryfall.com/docs/api) card database.

use std::time::Duration;

use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use tracing::instrument;

/// Sent with every request, Scryfall asks clients to identify themselves.
const USER_AGENT: &str = "MTGCardBot/2.0";

/// Minimum time between two requests (Scryfall allows ~10 per second).
const REQUEST_SPACING: Duration = Duration::from_millis(50);

/// Errors from talking to Scryfall.
#[derive(Debug, Error)]
pub enum ScryfallError {
    #[error("Card query cannot be empty")]
    EmptyQuery,

    #[error("Not found: {details}")]
    NotFound { details: String },

    #[error("Rate limited by the card api")]
    RateLimited,

    #[error("Card api error (status {status}): {details}")]
    Api { status: u16, details: String },

    #[error("Request to the card api failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ScryfallError {
    /// Build an error from a failed response, using the api's error object if it sent one.
    fn from_response(status: u16, body: &[u8]) -> Self {
        let details = serde_json::from_slice::<ApiError>(body)
            .map(|e| e.details)
            .unwrap_or_else(|_| format!("HTTP error {status}"));

        match status {
            404 => ScryfallError::NotFound { details },
            429 => ScryfallError::RateLimited,
            _ => ScryfallError::Api { status, details },
        }
    }

    /// The api couldn't be reached or failed on its side.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ScryfallError::Request(_) => true,
            ScryfallError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// The error object Scryfall answers with.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    details: String,
}

/// Image links of a card (or of one face).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageUris {
    pub png: Option<String>,
    pub large: Option<String>,
    pub normal: Option<String>,
    pub small: Option<String>,
    pub border_crop: Option<String>,
    pub art_crop: Option<String>,
}

impl ImageUris {
    /// Highest quality image available.
    pub fn best(&self) -> Option<&str> {
        [
            &self.png,
            &self.large,
            &self.normal,
            &self.small,
            &self.border_crop,
            &self.art_crop,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|url| !url.is_empty())
    }
}

/// One face of a multi-faced card.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CardFace {
    pub name: String,
    pub mana_cost: String,
    pub type_line: String,
    pub oracle_text: String,
    pub image_uris: Option<ImageUris>,
}

/// A Magic card, only the fields that are displayed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Card {
    pub object: String,
    pub id: String,
    pub name: String,
    pub mana_cost: String,
    pub type_line: String,
    pub oracle_text: String,
    pub set_name: String,
    #[serde(rename = "set")]
    pub set_code: String,
    pub rarity: String,
    pub artist: Option<String>,
    pub scryfall_uri: String,
    pub image_uris: Option<ImageUris>,
    pub card_faces: Vec<CardFace>,
}

impl Card {
    /// The card's name, or the names of its faces.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if !self.card_faces.is_empty() {
            let names: Vec<&str> = self.card_faces.iter().map(|f| f.name.as_str()).collect();
            return names.join(" // ");
        }
        "Unknown Card".to_string()
    }

    /// Highest quality image, double-faced cards show their front.
    pub fn best_image_url(&self) -> Option<&str> {
        self.card_faces
            .first()
            .and_then(|face| face.image_uris.as_ref())
            .and_then(ImageUris::best)
            .or_else(|| self.image_uris.as_ref().and_then(ImageUris::best))
    }

    /// Whether the api gave something that can be shown.
    pub fn is_valid(&self) -> bool {
        self.object == "card" && (!self.name.is_empty() || !self.card_faces.is_empty())
    }
}

/// A page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchList {
    pub total_cards: u64,
    pub has_more: bool,
    pub data: Vec<Card>,
}

/// Name suggestions for a partial name.
#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    data: Vec<String>,
}

/// Keeps requests at least [REQUEST_SPACING] apart.
#[derive(Debug)]
struct RateLimiter {
    spacing: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last: Mutex::new(None),
        }
    }

    /// Wait for our turn. Holding the lock while sleeping queues callers up.
    async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.spacing).await;
        }
        *last = Some(Instant::now());
    }
}

/// Scryfall api client, with request spacing built in.
#[derive(Debug)]
pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl ScryfallClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ScryfallError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(REQUEST_SPACING),
        })
    }

    /// GET `path` and decode the json body.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ScryfallError> {
        self.limiter.wait().await;

        let url = format!("{}{path}", self.base_url);
        debug!("Requesting {path}");
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.bytes().await?;
            return Err(ScryfallError::from_response(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }

    /// Look up a card with Scryfall's own typo tolerance.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn named_fuzzy(&self, name: &str) -> Result<Card, ScryfallError> {
        let name = non_empty(name)?;
        self.get("/cards/named", &[("fuzzy", name)]).await
    }

    /// Look up a card by its exact name.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn named_exact(&self, name: &str) -> Result<Card, ScryfallError> {
        let name = non_empty(name)?;
        self.get("/cards/named", &[("exact", name)]).await
    }

    #[instrument(skip(self), err(level = "debug"))]
    pub async fn random(&self) -> Result<Card, ScryfallError> {
        self.get("/cards/random", &[]).await
    }

    /// Full text search using Scryfall's query syntax.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn search(&self, query: &str) -> Result<SearchList, ScryfallError> {
        let query = non_empty(query)?;
        self.get("/cards/search", &[("q", query)]).await
    }

    /// Most relevant card for a search.
    pub async fn search_first(&self, query: &str) -> Result<Card, ScryfallError> {
        let query = non_empty(query)?;
        let list = self.search(&format!("({query}) order:relevance")).await?;
        list.data
            .into_iter()
            .next()
            .ok_or_else(|| ScryfallError::NotFound {
                details: "No cards found matching query".to_string(),
            })
    }

    /// Card names starting like `partial`.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn autocomplete(&self, partial: &str) -> Result<Vec<String>, ScryfallError> {
        let partial = non_empty(partial)?;
        let catalog: Catalog = self.get("/cards/autocomplete", &[("q", partial)]).await?;
        Ok(catalog.data)
    }
}

fn non_empty(text: &str) -> Result<&str, ScryfallError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ScryfallError::EmptyQuery)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    /// Minimal card json as Scryfall returns it.
    pub(crate) fn card_json(name: &str) -> serde_json::Value {
        json!({
            "object": "card",
            "id": format!("id-{name}"),
            "name": name,
            "mana_cost": "{R}",
            "type_line": "Instant",
            "oracle_text": "Deal 3 damage to any target.",
            "set_name": "Alpha",
            "set": "lea",
            "rarity": "common",
            "artist": "Christopher Rush",
            "scryfall_uri": format!("https://scryfall.com/card/lea/{name}"),
            "image_uris": {
                "small": "https://img/small.jpg",
                "normal": "https://img/normal.jpg",
                "png": "https://img/card.png"
            }
        })
    }

    pub(crate) fn client(server: &MockServer) -> ScryfallClient {
        ScryfallClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fuzzy_lookup_decodes_card() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cards/named")
                    .query_param("fuzzy", "lightning bolt")
                    .header("accept", "application/json")
                    .header("user-agent", USER_AGENT);
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(card_json("Lightning Bolt"));
            })
            .await;

        let card = client(&server).named_fuzzy(" lightning bolt ").await.unwrap();

        api_mock.assert_async().await;
        assert!(card.is_valid());
        assert_eq!(card.display_name(), "Lightning Bolt");
        assert_eq!(card.set_code, "lea");
        assert_eq!(card.best_image_url(), Some("https://img/card.png"));
    }

    #[tokio::test]
    async fn error_objects_are_classified() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(404).json_body(json!({
                    "object": "error",
                    "code": "not_found",
                    "status": 404,
                    "details": "No cards found matching “asdfgh”"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/random");
                then.status(429).body("slow down");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/autocomplete");
                then.status(500).body("<html>oops</html>");
            })
            .await;

        let client = client(&server);
        let err = client.named_exact("asdfgh").await.unwrap_err();
        assert!(matches!(err, ScryfallError::NotFound { ref details } if details.contains("asdfgh")));

        let err = client.random().await.unwrap_err();
        assert!(matches!(err, ScryfallError::RateLimited));

        let err = client.autocomplete("bolt").await.unwrap_err();
        match err {
            ScryfallError::Api { status, details } => {
                assert_eq!(status, 500);
                assert_eq!(details, "HTTP error 500");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_first_orders_by_relevance() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cards/search")
                    .query_param("q", "(sol ring e:lea) order:relevance");
                then.status(200).json_body(json!({
                    "object": "list",
                    "total_cards": 1,
                    "has_more": false,
                    "data": [card_json("Sol Ring")]
                }));
            })
            .await;

        let card = client(&server).search_first("sol ring e:lea").await.unwrap();

        api_mock.assert_async().await;
        assert_eq!(card.name, "Sol Ring");
    }

    #[tokio::test]
    async fn empty_queries_never_hit_the_api() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200);
            })
            .await;

        let client = client(&server);
        assert!(matches!(
            client.named_fuzzy("   ").await,
            Err(ScryfallError::EmptyQuery)
        ));
        assert!(matches!(
            client.search_first("").await,
            Err(ScryfallError::EmptyQuery)
        ));
        api_mock.assert_hits_async(0).await;
    }

    #[test]
    fn faces_provide_names_and_images() {
        let card: Card = serde_json::from_value(json!({
            "object": "card",
            "card_faces": [
                {"name": "Delver of Secrets", "image_uris": {"normal": "https://img/front.jpg"}},
                {"name": "Insectile Aberration", "image_uris": {"normal": "https://img/back.jpg"}}
            ]
        }))
        .unwrap();

        assert!(card.is_valid());
        assert_eq!(
            card.display_name(),
            "Delver of Secrets // Insectile Aberration"
        );
        assert_eq!(card.best_image_url(), Some("https://img/front.jpg"));
    }

    #[test]
    fn non_cards_are_invalid() {
        let card: Card = serde_json::from_value(json!({"object": "error"})).unwrap();
        assert!(!card.is_valid());
        assert_eq!(card.display_name(), "Unknown Card");
        assert_eq!(card.best_image_url(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_spaced_out() {
        let limiter = RateLimiter::new(REQUEST_SPACING);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        assert!(start.elapsed() >= REQUEST_SPACING * 2);
    }
}
