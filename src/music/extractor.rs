//! Functionality for interfacing with `yt-dlp`: resolving songs and searching.
//!
//! Only stdout, stderr and the exit code of the tool are used.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use super::queue::Song;
use crate::error::UserError;
use crate::BotError;

/// Max length of a `/play` query.
pub const MAX_QUERY_LEN: usize = 500;

/// Format selection handed to yt-dlp, audio only streams first.
const FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best[height<=?480]";

/// Hosts a user may link to directly. Subdomains are allowed.
const SUPPORTED_HOSTS: [&str; 8] = [
    "youtube.com",
    "youtu.be",
    "music.youtube.com",
    "soundcloud.com",
    "spotify.com",
    "bandcamp.com",
    "vimeo.com",
    "twitch.tv",
];

/// Errors while resolving songs with yt-dlp.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("yt-dlp is not available")]
    MissingTool,

    #[error("Failed to run yt-dlp: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to access video (age-restricted or region-blocked)")]
    Forbidden,

    #[error("Video is private")]
    Private,

    #[error("Video is unavailable")]
    Unavailable,

    #[error("No results found for search query")]
    NoResults,

    #[error("Video requires sign-in (age-restricted)")]
    SignInRequired,

    #[error("yt-dlp failed: {0}")]
    Failed(String),

    #[error("Incomplete song information or no audio URL found")]
    NoAudio,

    #[error("Could not read yt-dlp output: {0}")]
    BadOutput(#[from] serde_json::Error),
}

impl From<ExtractError> for BotError {
    /// Failures to find a song are the user's to fix, a broken tool is not.
    fn from(value: ExtractError) -> Self {
        match value {
            ExtractError::MissingTool | ExtractError::IoError(_) | ExtractError::BadOutput(_) => {
                BotError::ExtractError(value)
            }
            other => UserError::SearchFailed {
                reason: other.to_string(),
            }
            .into(),
        }
    }
}

/// What a `/play` query refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A link to a supported site.
    Link(Url),
    /// Free text to search for.
    Search(String),
}

impl Query {
    /// Validate user input.
    pub fn parse(input: &str) -> Result<Self, UserError> {
        let input = input.trim();
        if input.is_empty() || input.chars().count() > MAX_QUERY_LEN {
            Err(UserError::BadQuery { max: MAX_QUERY_LEN })?
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            let url = Url::parse(input).map_err(|_| UserError::UnsupportedUrl)?;
            if !is_supported_url(&url) {
                Err(UserError::UnsupportedUrl)?
            }
            Ok(Query::Link(url))
        } else {
            Ok(Query::Search(input.to_string()))
        }
    }

    /// The argument yt-dlp understands.
    fn target(&self) -> String {
        match self {
            Query::Link(url) => url.to_string(),
            Query::Search(text) => format!("ytsearch1:{text}"),
        }
    }
}

/// Is `url` http(s) on a [known host](SUPPORTED_HOSTS)?
pub fn is_supported_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    SUPPORTED_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

/// Resolve a query into a playable [Song].
#[instrument(err)]
pub async fn resolve(query: &Query) -> Result<Song, ExtractError> {
    let target = query.target();
    let args = [
        "-J",
        "--no-warnings",
        "--ignore-config",
        "--no-playlist",
        "--socket-timeout",
        "30",
        "-f",
        FORMAT,
        target.as_str(),
    ];

    let stdout = run_ytdlp(&args).await?;
    parse_info(&stdout)
}

/// A search result with formatted metadata and its url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Display name
    pub name: String,
    /// The url of source
    pub url: String,
}

/// Searches youtube for the given query without resolving streams.
///
/// `limit` is the max amount of results to get.
#[instrument(err)]
pub async fn search(query: &str, limit: u8) -> Result<Vec<SearchResult>, ExtractError> {
    // Discord enforces a 100 char limit on choice names so we budget
    // Format is title [duration] - channel
    let format: &str = &[
        "%(title).60s ",          // Title, at most 60 chars
        "[%(duration_string)s] ", // Duration in '[HH:MM:SS]' format
        "- ",
        "%(channel).20s", // Channel name, at most 20 chars
    ]
    .concat();
    let uri = format!("ytsearch{limit}:{query}");

    let args = [
        "--no-warnings",
        "--ignore-config",
        "--flat-playlist",
        "--print",
        format,
        "--print",
        "webpage_url",
        uri.as_str(),
    ];

    let stdout = run_ytdlp(&args).await?;
    Ok(parse_search(&String::from_utf8_lossy(&stdout)))
}

/// Run yt-dlp, classifying failures from stderr.
async fn run_ytdlp(args: &[&str]) -> Result<Vec<u8>, ExtractError> {
    let output = tokio::process::Command::new("yt-dlp")
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::MissingTool,
            _ => ExtractError::IoError(e),
        })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(classify_failure(&String::from_utf8_lossy(&output.stderr)))
    }
}

/// Turn yt-dlp's complaints into something a user understands.
pub fn classify_failure(stderr: &str) -> ExtractError {
    let lower = stderr.to_lowercase();
    if lower.contains("403") || lower.contains("forbidden") {
        ExtractError::Forbidden
    } else if lower.contains("private video") {
        ExtractError::Private
    } else if lower.contains("video unavailable") {
        ExtractError::Unavailable
    } else if lower.contains("no video results") {
        ExtractError::NoResults
    } else if lower.contains("sign in to confirm") {
        ExtractError::SignInRequired
    } else {
        let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty());
        ExtractError::Failed(last_line.unwrap_or("unknown error").trim().to_string())
    }
}

/// Parse the json output of `yt-dlp -J`.
pub fn parse_info(json: &[u8]) -> Result<Song, ExtractError> {
    let info: VideoInfo = serde_json::from_slice(json)?;

    // Searches give a playlist, take the first result.
    let info = match info.entries {
        Some(entries) => entries.into_iter().next().ok_or(ExtractError::NoResults)?,
        None => info,
    };

    let stream_url = info.best_audio_url().ok_or(ExtractError::NoAudio)?;
    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(ExtractError::NoAudio)?;

    Ok(Song {
        title,
        stream_url,
        page_url: info.webpage_url.unwrap_or_default(),
        duration: info
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64),
        thumbnail: info.thumbnail,
        requester: None,
    })
}

/// Pair up the alternating name/url lines of a flat search.
fn parse_search(stdout: &str) -> Vec<SearchResult> {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    let mut results = Vec::new();

    while let (Some(name), Some(url)) = (lines.next(), lines.next()) {
        results.push(SearchResult {
            name: name.trim().to_string(),
            url: url.trim().to_string(),
        });
    }
    results
}

/// The parts of yt-dlp's info json that are used.
#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    /// Set when yt-dlp already picked a single format.
    url: Option<String>,
    #[serde(default)]
    formats: Vec<Format>,
    entries: Option<Vec<VideoInfo>>,
}

#[derive(Debug, Deserialize)]
struct Format {
    url: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    ext: Option<String>,
}

impl Format {
    fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(a) if !a.is_empty() && a != "none")
    }

    fn is_audio_only(&self) -> bool {
        self.has_audio() && self.vcodec.as_deref() == Some("none")
    }
}

impl VideoInfo {
    /// Prefer the chosen url, then audio only formats, then anything with audio.
    fn best_audio_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }

        let with_url = || {
            self.formats
                .iter()
                .filter(|f| f.url.as_ref().is_some_and(|u| !u.is_empty()))
        };

        with_url()
            .find(|f| f.is_audio_only())
            .or_else(|| {
                with_url()
                    .filter(|f| f.has_audio() && f.ext.as_deref() != Some("mhtml"))
                    .last()
            })
            .and_then(|f| f.url.clone())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn queries_are_validated() {
        assert!(matches!(
            Query::parse("   "),
            Err(UserError::BadQuery { .. })
        ));
        assert!(matches!(
            Query::parse(&"a".repeat(MAX_QUERY_LEN + 1)),
            Err(UserError::BadQuery { .. })
        ));
        assert_eq!(
            Query::parse(" never gonna give you up ").unwrap(),
            Query::Search("never gonna give you up".to_string())
        );
        assert!(matches!(
            Query::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Ok(Query::Link(_))
        ));
        assert!(matches!(
            Query::parse("https://evil.example/track.mp3"),
            Err(UserError::UnsupportedUrl)
        ));
    }

    #[test]
    fn supported_hosts_match_whole_labels() {
        let ok = |s: &str| is_supported_url(&Url::parse(s).unwrap());
        assert!(ok("https://youtu.be/abc"));
        assert!(ok("http://m.soundcloud.com/artist/track"));
        assert!(ok("https://artist.bandcamp.com/track/x"));
        assert!(!ok("https://notyoutube.com/watch"));
        assert!(!ok("https://youtube.com.evil.example/watch"));
        assert!(!ok("ftp://youtube.com/file"));
    }

    #[test]
    fn search_targets() {
        let q = Query::parse("lofi beats").unwrap();
        assert_eq!(q.target(), "ytsearch1:lofi beats");
    }

    #[test]
    fn stderr_is_classified() {
        let cases = [
            ("ERROR: HTTP Error 403: Forbidden", "age-restricted or region-blocked"),
            ("ERROR: [youtube] abc: Private video", "private"),
            ("ERROR: [youtube] abc: Video unavailable", "unavailable"),
            ("ERROR: No video results", "No results"),
            ("ERROR: Sign in to confirm your age", "sign-in"),
        ];
        for (stderr, expected) in cases {
            let err = classify_failure(stderr);
            assert!(err.to_string().contains(expected), "{stderr} -> {err}");
        }

        let other = classify_failure("WARNING: meh\nERROR: something odd\n");
        assert_eq!(other.to_string(), "yt-dlp failed: ERROR: something odd");
    }

    #[test]
    fn user_facing_failures_become_user_errors() {
        let err: BotError = ExtractError::Private.into();
        assert!(matches!(err, BotError::UserError(UserError::SearchFailed { .. })));
        let err: BotError = ExtractError::MissingTool.into();
        assert!(matches!(err, BotError::ExtractError(ExtractError::MissingTool)));
    }

    #[test]
    fn info_prefers_audio_only_formats() {
        let info = json!({
            "title": "Song",
            "webpage_url": "https://www.youtube.com/watch?v=x",
            "duration": 212.0,
            "thumbnail": "https://i.ytimg.com/x.jpg",
            "formats": [
                {"url": "https://cdn/mhtml", "acodec": "none", "vcodec": "none", "ext": "mhtml"},
                {"url": "https://cdn/video", "acodec": "mp4a.40.2", "vcodec": "avc1", "ext": "mp4"},
                {"url": "https://cdn/audio", "acodec": "opus", "vcodec": "none", "ext": "webm"}
            ]
        });
        let song = parse_info(info.to_string().as_bytes()).unwrap();
        assert_eq!(song.title, "Song");
        assert_eq!(song.stream_url, "https://cdn/audio");
        assert_eq!(song.duration, Some(Duration::from_secs(212)));
        assert_eq!(song.thumbnail.as_deref(), Some("https://i.ytimg.com/x.jpg"));
    }

    #[test]
    fn info_falls_back_to_formats_with_audio() {
        let info = json!({
            "title": "Song",
            "formats": [
                {"url": "https://cdn/silent", "acodec": "none", "vcodec": "avc1", "ext": "mp4"},
                {"url": "https://cdn/video", "acodec": "mp4a.40.2", "vcodec": "avc1", "ext": "mp4"}
            ]
        });
        let song = parse_info(info.to_string().as_bytes()).unwrap();
        assert_eq!(song.stream_url, "https://cdn/video");
        assert_eq!(song.page_url, "");
    }

    #[test]
    fn search_results_use_the_first_entry() {
        let info = json!({
            "_type": "playlist",
            "entries": [
                {"title": "First", "url": "https://cdn/first"},
                {"title": "Second", "url": "https://cdn/second"}
            ]
        });
        let song = parse_info(info.to_string().as_bytes()).unwrap();
        assert_eq!(song.title, "First");

        let empty = json!({"_type": "playlist", "entries": []});
        let err = parse_info(empty.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ExtractError::NoResults));
    }

    #[test]
    fn missing_audio_is_an_error() {
        let info = json!({"title": "Silent", "formats": []});
        let err = parse_info(info.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ExtractError::NoAudio));
    }

    #[test]
    fn flat_search_output_is_paired() {
        let out = "Song A [3:01] - Chan\nhttps://youtu.be/a\nSong B [4:10] - Other\nhttps://youtu.be/b\n";
        let results = parse_search(out);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].name, "Song B [4:10] - Other");
        assert_eq!(results[1].url, "https://youtu.be/b");
    }
}
