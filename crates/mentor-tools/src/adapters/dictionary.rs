//! Dictionary adapter
//!
//! The Free Dictionary API is asked first. When it has no entry or is down and
//! `LINGUA_ROBOT_API_KEY` is set, Lingua Robot (via RapidAPI) is asked next.
//! Lookup failures are reported as `Failed` output prefixed with "❌" so the
//! orchestrator can fall back to web search.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use mentor_core::{PerformanceMonitor, Settings};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{compile_all, contains_any, first_capture, http_client};
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const FREE_DICTIONARY_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";
const LINGUA_ROBOT_URL: &str = "https://lingua-robot.p.rapidapi.com";
const LINGUA_ROBOT_HOST: &str = "lingua-robot.p.rapidapi.com";
const LINGUA_ENTRIES: usize = 3;
const LINGUA_SENSES: usize = 3;
const LINGUA_EXAMPLES: usize = 2;
const DEFINITIONS_PER_PART: usize = 2;
const MAX_SYNONYMS: usize = 5;

const DICTIONARY_KEYWORDS: &[&str] = &[
    "define", "definition", "meaning", "what does", "dictionary", "synonym", "antonym",
    "pronunciation", "etymology",
];

/// Words that are never the subject of a lookup
const FILLER_WORDS: &[&str] = &[
    "define", "definition", "meaning", "what", "does", "mean", "of", "for", "the", "a", "an", "is",
    "are", "was", "were", "will", "would", "could", "should", "can", "may", "might", "synonym",
    "synonyms", "antonym", "antonyms", "pronunciation", "etymology", "tell", "me", "about", "give",
    "show", "find", "look", "up", "word", "please",
];

lazy_static! {
    static ref CLAIM_PATTERNS: Vec<Regex> = compile_all(&[
        r"\b\w+\s+meaning\b",
        r"\bdefine\s+\w+\b",
        r"\bwhat\s+does\s+\w+\s+mean\b",
        r"\b\w+\s+definition\b",
    ]);
    static ref WORD_PATTERNS: Vec<Regex> = compile_all(&[
        r"define\s+(?:the\s+word\s+)?([a-z][a-z'-]*)",
        r"definition\s+of\s+(?:the\s+word\s+)?([a-z][a-z'-]*)",
        r"meaning\s+of\s+(?:the\s+word\s+)?([a-z][a-z'-]*)",
        r"what\s+does\s+([a-z][a-z'-]*)\s+mean",
        r"pronunciation\s+of\s+([a-z][a-z'-]*)",
        r"synonyms?\s+(?:for|of)\s+([a-z][a-z'-]*)",
        r"antonyms?\s+(?:for|of)\s+([a-z][a-z'-]*)",
        r"etymology\s+of\s+([a-z][a-z'-]*)",
        r"([a-z][a-z'-]*)\s+meaning",
        r"([a-z][a-z'-]*)\s+definition",
    ]);
}

#[derive(Debug, Deserialize)]
struct Entry {
    word: String,
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    phonetics: Vec<Phonetic>,
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
struct Phonetic {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Meaning {
    #[serde(rename = "partOfSpeech", default)]
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<Definition>,
    #[serde(default)]
    synonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    definition: String,
    #[serde(default)]
    example: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LinguaResponse {
    #[serde(default)]
    results: Vec<LinguaResult>,
}

#[derive(Debug, Deserialize)]
struct LinguaResult {
    #[serde(rename = "lexicalEntries", default)]
    lexical_entries: Vec<LexicalEntry>,
    #[serde(default)]
    pronunciations: Vec<LinguaPronunciation>,
}

#[derive(Debug, Deserialize)]
struct LexicalEntry {
    #[serde(rename = "lexicalCategory", default)]
    lexical_category: Option<LexicalCategory>,
    #[serde(default)]
    entries: Vec<LinguaEntry>,
}

#[derive(Debug, Deserialize)]
struct LexicalCategory {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct LinguaEntry {
    #[serde(default)]
    senses: Vec<Sense>,
}

#[derive(Debug, Deserialize)]
struct Sense {
    #[serde(default)]
    definitions: Vec<String>,
    #[serde(default)]
    examples: Vec<LinguaExample>,
}

#[derive(Debug, Deserialize)]
struct LinguaExample {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinguaPronunciation {
    #[serde(rename = "phoneticSpelling", default)]
    phonetic_spelling: Option<String>,
}

/// Pick the word being asked about
pub fn extract_word(text: &str) -> Option<String> {
    let lower = text.trim().to_lowercase();
    let word = first_capture(&WORD_PATTERNS, &lower)
        .filter(|w| !FILLER_WORDS.contains(&w.as_str()))
        .or_else(|| {
            lower
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .find(|w| !w.is_empty() && !FILLER_WORDS.contains(w))
                .map(str::to_string)
        })?;
    Some(word.trim_matches(|c: char| ".,!?;:'\"".contains(c)).to_string()).filter(|w| !w.is_empty())
}

fn format_entry(entry: &Entry) -> String {
    let mut out = format!("📚 **Definition of {}**\n\n", entry.word);

    let phonetic = entry
        .phonetic
        .clone()
        .or_else(|| entry.phonetics.iter().find_map(|p| p.text.clone()))
        .filter(|p| !p.is_empty());
    if let Some(phonetic) = phonetic {
        out.push_str(&format!("🔊 **Pronunciation:** {}\n\n", phonetic));
    }

    let mut synonyms: Vec<&str> = Vec::new();
    for meaning in &entry.meanings {
        out.push_str(&format!("**{}**\n", meaning.part_of_speech));
        for (i, def) in meaning.definitions.iter().take(DEFINITIONS_PER_PART).enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, def.definition));
            if let Some(example) = def.example.as_deref().filter(|e| !e.is_empty()) {
                out.push_str(&format!("   _Example: {}_\n", example));
            }
        }
        out.push('\n');
        for synonym in &meaning.synonyms {
            if synonyms.len() < MAX_SYNONYMS && !synonyms.contains(&synonym.as_str()) {
                synonyms.push(synonym);
            }
        }
    }

    if !synonyms.is_empty() {
        out.push_str(&format!("🔄 **Synonyms:** {}\n", synonyms.join(", ")));
    }
    out.trim_end().to_string()
}

/// Lingua Robot entry in the same layout as [`format_entry`]; `None` when it
/// carries no definitions
fn format_lingua(word: &str, response: &LinguaResponse) -> Option<String> {
    let result = response.results.first()?;
    let mut body = String::new();

    for lexical in result.lexical_entries.iter().take(LINGUA_ENTRIES) {
        let mut numbered = 0;
        let mut section = String::new();
        for sense in lexical.entries.iter().flat_map(|e| &e.senses).take(LINGUA_SENSES) {
            let Some(definition) = sense.definitions.first() else {
                continue;
            };
            numbered += 1;
            section.push_str(&format!("{}. {}\n", numbered, definition));
            for example in sense.examples.iter().filter_map(|e| e.text.as_deref()).take(LINGUA_EXAMPLES) {
                section.push_str(&format!("   _Example: {}_\n", example));
            }
        }
        if numbered == 0 {
            continue;
        }
        if let Some(category) = lexical.lexical_category.as_ref().filter(|c| !c.text.is_empty()) {
            body.push_str(&format!("**{}**\n", category.text));
        }
        body.push_str(&section);
        body.push('\n');
    }

    if body.is_empty() {
        return None;
    }

    let mut out = format!("📚 **Definition of {}**\n\n", word);
    if let Some(phonetic) = result
        .pronunciations
        .iter()
        .find_map(|p| p.phonetic_spelling.as_deref())
        .filter(|p| !p.is_empty())
    {
        out.push_str(&format!("🔊 **Pronunciation:** {}\n\n", phonetic));
    }
    out.push_str(&body);
    Some(out.trim_end().to_string())
}

/// Dictionary tool
pub struct DictionaryTool {
    client: Client,
    api_url: String,
    lingua_url: String,
    lingua_key: Option<String>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl DictionaryTool {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1) * 2)),
            api_url: FREE_DICTIONARY_URL.to_string(),
            lingua_url: LINGUA_ROBOT_URL.to_string(),
            lingua_key: settings.lingua_robot_api_key.clone(),
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

    pub fn with_lingua_endpoint(mut self, url: impl Into<String>) -> Self {
        self.lingua_url = url.into();
        self
    }

    async fn lookup(&self, word: &str) -> Result<Option<Vec<Entry>>> {
        let start = Instant::now();
        let url = format!("{}/{}", self.api_url, urlencoding::encode(word));
        let result: Result<Option<Vec<Entry>>> = async {
            let response = self.client.get(&url).send().await.context("Failed to reach dictionary API")?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => {
                    Ok(Some(response.json().await.context("Invalid dictionary response")?))
                }
                status => anyhow::bail!("Dictionary API error {}", status),
            }
        }
        .await;

        if let Some(monitor) = &self.monitor {
            monitor.record_api("free_dictionary", start.elapsed(), result.is_ok()).await;
        }
        result
    }

    /// Second opinion from Lingua Robot; `Ok(None)` when not configured or
    /// the word is unknown there too
    async fn lookup_lingua(&self, word: &str) -> Result<Option<String>> {
        let Some(key) = &self.lingua_key else {
            return Ok(None);
        };

        let start = Instant::now();
        let url = format!(
            "{}/language/v1/entries/en/{}",
            self.lingua_url,
            urlencoding::encode(word)
        );
        let result: Result<Option<String>> = async {
            let response = self
                .client
                .get(&url)
                .header("X-RapidAPI-Key", key)
                .header("X-RapidAPI-Host", LINGUA_ROBOT_HOST)
                .send()
                .await
                .context("Failed to reach Lingua Robot")?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => {
                    let body: LinguaResponse = response.json().await.context("Invalid Lingua Robot response")?;
                    Ok(format_lingua(word, &body))
                }
                status => anyhow::bail!("Lingua Robot error {}", status),
            }
        }
        .await;

        if let Some(monitor) = &self.monitor {
            monitor.record_api("lingua_robot", start.elapsed(), result.is_ok()).await;
        }
        result
    }
}

#[async_trait]
impl Tool for DictionaryTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Dictionary
    }

    fn description(&self) -> &str {
        "Get word definitions, pronunciations, and synonyms"
    }

    fn can_handle(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        contains_any(&lower, DICTIONARY_KEYWORDS) || CLAIM_PATTERNS.iter().any(|re| re.is_match(&lower))
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let word = match options.param_str("word") {
            Some(word) => Some(word.to_lowercase()),
            None => extract_word(text),
        };
        let Some(word) = word else {
            return Ok(ToolOutput::failed("❌ Could not extract a word to look up from your query."));
        };
        info!(word = %word, "Dictionary lookup");

        let primary = match self.lookup(&word).await {
            Ok(Some(entries)) if !entries.is_empty() => return Ok(ToolOutput::ok(format_entry(&entries[0]))),
            Ok(_) => None,
            Err(e) => {
                warn!(word = %word, "Dictionary lookup failed: {:#}", e);
                Some(e)
            }
        };

        match self.lookup_lingua(&word).await {
            Ok(Some(text)) => {
                info!(word = %word, "Definition found by Lingua Robot");
                return Ok(ToolOutput::ok(text));
            }
            Ok(None) => {}
            Err(e) => warn!(word = %word, "Lingua Robot lookup failed: {:#}", e),
        }

        match primary {
            None => Ok(ToolOutput::failed(format!(
                "❌ **Word Not Found**\n\nI couldn't find a definition for \"{}\".",
                word
            ))),
            Some(e) => Ok(ToolOutput::failed(format!(
                "❌ Dictionary service unavailable for \"{}\": {}",
                word, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stub_endpoint;
    use crate::tool::OutputStatus;

    #[test]
    fn test_extract_word() {
        assert_eq!(extract_word("define serendipity").as_deref(), Some("serendipity"));
        assert_eq!(extract_word("What does ephemeral mean?").as_deref(), Some("ephemeral"));
        assert_eq!(extract_word("meaning of the word gregarious").as_deref(), Some("gregarious"));
        assert_eq!(extract_word("synonyms for happy").as_deref(), Some("happy"));
        assert_eq!(extract_word("ubiquitous meaning").as_deref(), Some("ubiquitous"));
        assert_eq!(extract_word("define the"), None);
    }

    #[test]
    fn test_can_handle() {
        let tool = DictionaryTool::new(&Settings::default());
        assert!(tool.can_handle("Define serendipity"));
        assert!(tool.can_handle("what does ephemeral mean"));
        assert!(!tool.can_handle("weather in Paris"));
    }

    #[test]
    fn test_format_entry() {
        let entries: Vec<Entry> = serde_json::from_str(
            r#"[{
                "word": "serendipity",
                "phonetics": [{"text": "/ˌsɛɹ.ənˈdɪp.ɪ.ti/"}],
                "meanings": [{
                    "partOfSpeech": "noun",
                    "definitions": [
                        {"definition": "A combination of events which have come together by chance.", "example": "Meeting her was pure serendipity."},
                        {"definition": "Second sense."},
                        {"definition": "Third sense, dropped."}
                    ],
                    "synonyms": ["chance", "fluke"]
                }]
            }]"#,
        )
        .unwrap();

        let text = format_entry(&entries[0]);
        assert!(text.starts_with("📚 **Definition of serendipity**"));
        assert!(text.contains("🔊 **Pronunciation:** /ˌsɛɹ.ənˈdɪp.ɪ.ti/"));
        assert!(text.contains("_Example: Meeting her was pure serendipity._"));
        assert!(text.contains("2. Second sense."));
        assert!(!text.contains("Third sense"));
        assert!(text.contains("chance, fluke"));
    }

    const LINGUA_BODY: &str = r#"{
        "results": [{
            "lexicalEntries": [{
                "lexicalCategory": {"text": "adjective"},
                "entries": [{"senses": [
                    {"definitions": ["Lasting for a very short time."], "examples": [{"text": "ephemeral fame"}]},
                    {"examples": [{"text": "no definition here"}]}
                ]}]
            }],
            "pronunciations": [{"phoneticSpelling": "ɪˈfɛm(ə)rəl"}]
        }]
    }"#;

    #[test]
    fn test_format_lingua() {
        let response: LinguaResponse = serde_json::from_str(LINGUA_BODY).unwrap();
        let text = format_lingua("ephemeral", &response).unwrap();
        assert!(text.starts_with("📚 **Definition of ephemeral**"));
        assert!(text.contains("🔊 **Pronunciation:** ɪˈfɛm(ə)rəl"));
        assert!(text.contains("**adjective**\n1. Lasting for a very short time."));
        assert!(text.contains("_Example: ephemeral fame_"));
        assert!(!text.contains("no definition here"));

        assert!(format_lingua("x", &LinguaResponse::default()).is_none());
    }

    #[tokio::test]
    async fn test_lingua_robot_answers_when_free_dictionary_is_down() {
        let settings = Settings {
            lingua_robot_api_key: Some("rapid-key".to_string()),
            ..Settings::default()
        };
        let monitor = Arc::new(PerformanceMonitor::new());
        let tool = DictionaryTool::new(&settings)
            .with_endpoint("http://127.0.0.1:9")
            .with_lingua_endpoint(stub_endpoint("200 OK", LINGUA_BODY).await)
            .with_monitor(monitor.clone());

        let out = tool.execute("define ephemeral", &ToolOptions::new()).await.unwrap();
        assert_eq!(out.status, OutputStatus::Ok);
        assert!(out.content.contains("Lasting for a very short time."));

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.apis["free_dictionary"].failures, 1);
        assert_eq!(snapshot.apis["lingua_robot"].successes, 1);
    }

    #[tokio::test]
    async fn test_lingua_robot_skipped_without_key() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let tool = DictionaryTool::new(&Settings::default())
            .with_endpoint("http://127.0.0.1:9")
            .with_monitor(monitor.clone());

        let out = tool.execute("define ephemeral", &ToolOptions::new()).await.unwrap();
        assert_eq!(out.status, OutputStatus::Failed);
        assert!(!monitor.snapshot().await.apis.contains_key("lingua_robot"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_failed_with_marker() {
        let tool = DictionaryTool::new(&Settings::default()).with_endpoint("http://127.0.0.1:9");
        let out = tool.execute("define serendipity", &ToolOptions::new()).await.unwrap();
        assert_eq!(out.status, OutputStatus::Failed);
        assert!(out.content.starts_with("❌"));
    }
}
