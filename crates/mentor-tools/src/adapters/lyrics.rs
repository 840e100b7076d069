//! Lyrics adapter
//!
//! Fetches a short preview from lyrics.ovh when the artist is known. Without
//! an artist, or when the lookup misses, it answers with links to licensed
//! sources instead.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use mentor_core::{PerformanceMonitor, Settings};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{compile_all, contains_any, http_client, title_case};
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const LYRICS_OVH_URL: &str = "https://api.lyrics.ovh/v1";
const PREVIEW_LINES: usize = 8;

const LYRICS_INDICATORS: &[&str] = &[
    "lyrics", "song lyrics", "words of", "text of the song", "what are the lyrics",
];

const QUERY_PREFIXES: &[&str] = &[
    "what are the lyrics of", "what are the lyrics for", "what are the lyrics to",
    "song lyrics of", "song lyrics for", "find lyrics for", "search lyrics for", "get lyrics of",
    "show lyrics of", "show me the lyrics of", "show me the lyrics to", "lyrics of", "lyrics for",
    "lyrics to", "words of", "lyrics",
];

lazy_static! {
    static ref SONG_PATTERNS: Vec<Regex> = compile_all(&[
        r"\blyrics?\s+(?:of|for|to)\s+\S+",
        r"\S+\s+lyrics?\b",
        r"\bsing\b",
        r"\bsong\s+\S+",
    ]);
    static ref ARTIST_PATTERNS: Vec<Regex> = compile_all(&[
        r"^(.+?)\s+by\s+(.+)$",
        r"^(.+?)\s+-\s+(.+)$",
        r"^(.+?)\s+from\s+(.+)$",
    ]);
}

/// Song title and (when given) artist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongQuery {
    pub title: String,
    pub artist: Option<String>,
}

impl SongQuery {
    fn search_terms(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} {} lyrics", self.title, artist),
            None => format!("{} lyrics", self.title),
        }
    }

    fn heading(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} by {}", title_case(&self.title), title_case(artist)),
            None => title_case(&self.title),
        }
    }
}

/// Parse "lyrics of <song> by <artist>" style requests
pub fn parse_song_query(text: &str) -> SongQuery {
    let mut rest = text.trim().trim_end_matches(|c: char| "?!.".contains(c)).to_lowercase();
    if let Some(prefix) = QUERY_PREFIXES.iter().find(|p| rest.starts_with(*p)) {
        rest = rest[prefix.len()..].trim().to_string();
    }
    let rest = rest.trim_end_matches(" lyrics").trim_matches(|c: char| c == '"' || c == '\'').trim();

    for re in ARTIST_PATTERNS.iter() {
        if let Some(caps) = re.captures(rest) {
            if let (Some(title), Some(artist)) = (caps.get(1), caps.get(2)) {
                return SongQuery {
                    title: title.as_str().trim().trim_matches('"').to_string(),
                    artist: Some(artist.as_str().trim().trim_matches('"').to_string()),
                };
            }
        }
    }

    SongQuery {
        title: rest.to_string(),
        artist: None,
    }
}

fn guidance(song: &SongQuery) -> String {
    let encoded = urlencoding::encode(&song.search_terms()).into_owned();
    let plus = song.search_terms().replace(' ', "+");

    let mut out = format!("🎵 **Lyrics Search: {}**\n\n", song.heading());
    out.push_str("🔍 **Where to Find Complete Lyrics:**\n\n");
    out.push_str("🎧 **Streaming Platforms:**\n");
    out.push_str(&format!("• [Spotify](https://open.spotify.com/search/{})\n", encoded));
    out.push_str(&format!("• [Apple Music](https://music.apple.com/search?term={})\n", encoded));
    out.push_str(&format!("• [YouTube Music](https://music.youtube.com/search?q={})\n\n", encoded));
    out.push_str("📝 **Licensed Lyrics Websites:**\n");
    out.push_str(&format!("• [Genius](https://genius.com/search?q={})\n", encoded));
    out.push_str(&format!("• [AZLyrics](https://search.azlyrics.com/search.php?q={})\n\n", encoded));
    out.push_str("⚡ **Quick Search:**\n");
    out.push_str(&format!("• [Google](https://www.google.com/search?q={})\n", plus));
    out.push_str(&format!("• [YouTube](https://www.youtube.com/results?search_query={})\n\n", plus));
    out.push_str("⚖️ *Lyrics are copyrighted material. Please support the artist by using official sources.*");
    out
}

fn preview(song: &SongQuery, lyrics: &str) -> String {
    let lines: Vec<&str> = lyrics.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
    let excerpt = lines.iter().take(PREVIEW_LINES).copied().collect::<Vec<_>>().join("\n");

    let mut out = format!("🎵 **{}**\n\n🎼 **Lyrics Preview:**\n```\n{}\n```\n\n", song.heading(), excerpt);
    if lines.len() > PREVIEW_LINES {
        out.push_str("📝 **Note:** This is a preview. Full lyrics are on licensed sites such as Genius or AZLyrics.\n\n");
    }
    out.push_str("⚖️ *Lyrics are copyrighted material. Please support the artist by using official sources.*");
    out
}

#[derive(Debug, Deserialize)]
struct OvhResponse {
    #[serde(default)]
    lyrics: String,
}

/// Lyrics tool
pub struct LyricsTool {
    client: Client,
    api_url: String,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl LyricsTool {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1) * 2)),
            api_url: LYRICS_OVH_URL.to_string(),
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<String>> {
        let start = Instant::now();
        let url = format!(
            "{}/{}/{}",
            self.api_url,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );
        let result: Result<Option<String>> = async {
            let response = self.client.get(&url).send().await.context("Failed to reach lyrics.ovh")?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => {
                    let body: OvhResponse = response.json().await.context("Invalid lyrics response")?;
                    Ok(Some(body.lyrics).filter(|l| !l.trim().is_empty()))
                }
                status => bail!("lyrics.ovh error {}", status),
            }
        }
        .await;

        if let Some(monitor) = &self.monitor {
            monitor.record_api("lyrics_ovh", start.elapsed(), result.is_ok()).await;
        }
        result
    }
}

#[async_trait]
impl Tool for LyricsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Lyrics
    }

    fn description(&self) -> &str {
        "Find song lyrics and where to listen"
    }

    fn can_handle(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        contains_any(&lower, LYRICS_INDICATORS) || SONG_PATTERNS.iter().any(|re| re.is_match(&lower))
    }

    async fn execute(&self, text: &str, _options: &ToolOptions) -> Result<ToolOutput> {
        let song = parse_song_query(text);
        info!(title = %song.title, artist = ?song.artist, "Lyrics lookup");

        if let Some(artist) = &song.artist {
            match self.fetch(artist, &song.title).await {
                Ok(Some(lyrics)) => return Ok(ToolOutput::ok(preview(&song, &lyrics))),
                Ok(None) => debug!("No lyrics found, returning guidance"),
                Err(e) => debug!("Lyrics lookup failed, returning guidance: {:#}", e),
            }
        }
        Ok(ToolOutput::ok(guidance(&song)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::OutputStatus;

    #[test]
    fn test_parse_song_query() {
        assert_eq!(
            parse_song_query("Lyrics of Bohemian Rhapsody by Queen"),
            SongQuery {
                title: "bohemian rhapsody".to_string(),
                artist: Some("queen".to_string()),
            }
        );
        assert_eq!(
            parse_song_query("what are the lyrics to yesterday?"),
            SongQuery {
                title: "yesterday".to_string(),
                artist: None,
            }
        );
        assert_eq!(parse_song_query("hello - adele lyrics").artist.as_deref(), Some("adele"));
    }

    #[test]
    fn test_can_handle() {
        let tool = LyricsTool::new(&Settings::default());
        assert!(tool.can_handle("lyrics of yesterday"));
        assert!(tool.can_handle("can you sing something"));
        assert!(!tool.can_handle("I am using a spreadsheet"));
        assert!(!tool.can_handle("weather in Paris"));
    }

    #[test]
    fn test_preview_truncates() {
        let song = parse_song_query("lyrics of song by band");
        let lyrics = (1..=12).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let text = preview(&song, &lyrics);
        assert!(text.starts_with("🎵 **Song by Band**"));
        assert!(text.contains("line 8"));
        assert!(!text.contains("line 9"));
        assert!(text.contains("This is a preview"));
    }

    #[tokio::test]
    async fn test_unreachable_api_gives_guidance() {
        let tool = LyricsTool::new(&Settings::default()).with_endpoint("http://127.0.0.1:9");
        let out = tool.execute("lyrics of hello by adele", &ToolOptions::new()).await.unwrap();
        assert_eq!(out.status, OutputStatus::Ok);
        assert!(out.content.contains("genius.com/search?q=hello%20adele%20lyrics"));
    }
}
