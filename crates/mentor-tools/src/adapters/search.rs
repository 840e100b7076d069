//! Web search adapter
//!
//! Tavily first (when `TAVILY_API_KEY` is set), then the DuckDuckGo instant
//! answer API, then a clearly marked demo result.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use mentor_core::{PerformanceMonitor, Settings};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{compile_all, contains_any, http_client, truncate_chars};
use crate::cache::TtlCache;
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const TAVILY_URL: &str = "https://api.tavily.com/search";
const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";
const CACHE_TTL: Duration = Duration::from_secs(600);
const CACHE_ENTRIES: usize = 30;
const MAX_RESULTS: usize = 5;

const SEARCH_KEYWORDS: &[&str] = &[
    "search", "find", "look up", "google", "what is", "who is", "where is", "when is", "how to",
    "latest", "news", "information about", "tell me about", "meaning of", "means", "explain",
    "describe",
];

const CURRENT_INFO_TOPICS: &[&str] = &[
    "stock price", "exchange rate", "current events", "recent", "today", "this week", "this month",
];

const QUERY_PREFIXES: &[&str] = &[
    "search for", "find out about", "find", "look up", "google", "tell me about", "what is",
    "who is", "where is", "when is", "how to", "information about", "search meaning of",
    "meaning of", "what does", "explain",
];

lazy_static! {
    static ref QUESTION_PATTERNS: Vec<Regex> = compile_all(&[
        r"what.*is.*\?",
        r"who.*is.*\?",
        r"where.*is.*\?",
        r"when.*is.*\?",
        r"how.*to.*\?",
        r"why.*is.*\?",
        r"tell.*me.*about",
        r"find.*out.*about",
        r".*means.*\?",
    ]);
}

/// One normalized search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// Normalized answer from any provider
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub answer: Option<String>,
    pub hits: Vec<SearchHit>,
    pub source: &'static str,
}

impl SearchResults {
    fn is_empty(&self) -> bool {
        self.answer.is_none() && self.hits.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Strip request phrasing so only the subject is searched
pub fn extract_search_query(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let mut query = lower.as_str();

    for prefix in QUERY_PREFIXES {
        if let Some(rest) = query.strip_prefix(prefix) {
            query = rest.trim_start();
            break;
        }
    }

    let mut query = query.to_string();
    if let Some(stripped) = query.strip_suffix(" meaning") {
        query = stripped.trim().to_string();
    } else if query.contains(" means") {
        query = query.replace(" means", "").trim().to_string();
    }
    let query = query.trim_end_matches('?').trim().to_string();

    if query.is_empty() {
        return text.trim().to_string();
    }

    let asked_for_meaning = contains_any(&lower, &["meaning", "means", "define"]);
    if asked_for_meaning && !contains_any(&query, &["meaning", "definition", "define"]) {
        format!("{} meaning definition", query)
    } else {
        query
    }
}

/// Markdown rendering shared by all providers
pub fn format_results(query: &str, results: &SearchResults) -> String {
    let mut out = format!("🔍 **Search Results for: {}**\n\n", query);

    if let Some(answer) = results.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        out.push_str(&format!("💡 **Answer:** {}\n\n", answer.trim()));
    }

    if !results.hits.is_empty() {
        out.push_str("**Search Results:**\n\n");
        for (i, hit) in results.hits.iter().take(MAX_RESULTS).enumerate() {
            out.push_str(&format!("{}. **{}**\n", i + 1, hit.title));
            out.push_str(&format!("   {}\n", truncate_chars(hit.content.trim(), 200)));
            if !hit.url.is_empty() {
                out.push_str(&format!("   🔗 {}\n", hit.url));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("📊 **Data Source:** {}", results.source));
    out
}

fn demo_results(query: &str) -> String {
    format!(
        "🔍 **Search Results for: {q}**\n\n\
         **Search Results:**\n\n\
         1. **Information about {q}**\n   \
         This is demo search data for '{q}'. Configure TAVILY_API_KEY for real search results.\n   \
         🔗 https://example.com\n\n\
         💡 Note: Demo data - no search provider returned results",
        q = query
    )
}

fn parse_duckduckgo(data: &Value, query: &str) -> SearchResults {
    let mut hits = Vec::new();
    let abstract_text = data["Abstract"].as_str().unwrap_or_default().trim();
    if !abstract_text.is_empty() {
        hits.push(SearchHit {
            title: format!("About {}", query),
            content: abstract_text.to_string(),
            url: data["AbstractURL"].as_str().unwrap_or_default().to_string(),
        });
    }

    if let Some(topics) = data["RelatedTopics"].as_array() {
        for topic in topics.iter().filter(|t| t["Text"].is_string()).take(3) {
            let text = topic["Text"].as_str().unwrap_or_default();
            hits.push(SearchHit {
                title: truncate_chars(text, 50),
                content: text.to_string(),
                url: topic["FirstURL"].as_str().unwrap_or_default().to_string(),
            });
        }
    }

    let answer = data["Answer"]
        .as_str()
        .or_else(|| data["Definition"].as_str())
        .filter(|a| !a.trim().is_empty())
        .map(str::to_string);

    SearchResults {
        answer,
        hits,
        source: "DuckDuckGo Instant Answer",
    }
}

/// Web search tool
pub struct SearchTool {
    client: Client,
    tavily_key: Option<String>,
    tavily_url: String,
    duckduckgo_url: String,
    cache: TtlCache<ToolOutput>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl SearchTool {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1))),
            tavily_key: settings.tavily_api_key.clone(),
            tavily_url: TAVILY_URL.to_string(),
            duckduckgo_url: DUCKDUCKGO_URL.to_string(),
            cache: TtlCache::new(CACHE_ENTRIES, CACHE_TTL),
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.cache = TtlCache::new(CACHE_ENTRIES, CACHE_TTL).with_monitor(monitor.clone());
        self.monitor = Some(monitor);
        self
    }

    /// Point both providers somewhere else
    pub fn with_endpoints(mut self, tavily: impl Into<String>, duckduckgo: impl Into<String>) -> Self {
        self.tavily_url = tavily.into();
        self.duckduckgo_url = duckduckgo.into();
        self
    }

    async fn record_api(&self, api: &str, start: Instant, ok: bool) {
        if let Some(monitor) = &self.monitor {
            monitor.record_api(api, start.elapsed(), ok).await;
        }
    }

    async fn search_tavily(&self, key: &str, query: &str) -> Result<SearchResults> {
        let start = Instant::now();
        let payload = json!({
            "api_key": key,
            "query": query,
            "max_results": MAX_RESULTS,
            "search_depth": "basic",
            "include_answer": true,
            "include_raw_content": false,
        });

        let result: Result<SearchResults> = async {
            let response = self
                .client
                .post(&self.tavily_url)
                .json(&payload)
                .send()
                .await
                .context("Failed to reach Tavily")?;
            if !response.status().is_success() {
                bail!("Tavily API error {}", response.status());
            }
            let data: TavilyResponse = response.json().await.context("Invalid Tavily response")?;
            Ok(SearchResults {
                answer: data.answer,
                hits: data
                    .results
                    .into_iter()
                    .map(|r| SearchHit {
                        title: if r.title.is_empty() { "No title".to_string() } else { r.title },
                        content: r.content,
                        url: r.url,
                    })
                    .collect(),
                source: "Tavily Search API",
            })
        }
        .await;

        self.record_api("tavily", start, result.is_ok()).await;
        result
    }

    async fn search_duckduckgo(&self, query: &str) -> Result<SearchResults> {
        let start = Instant::now();
        let result: Result<SearchResults> = async {
            let response = self
                .client
                .get(&self.duckduckgo_url)
                .query(&[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")])
                .send()
                .await
                .context("Failed to reach DuckDuckGo")?;
            if !response.status().is_success() {
                bail!("DuckDuckGo API error {}", response.status());
            }
            let data: Value = response.json().await.context("Invalid DuckDuckGo response")?;
            Ok(parse_duckduckgo(&data, query))
        }
        .await;

        self.record_api("duckduckgo", start, result.is_ok()).await;
        result
    }

    /// Run the provider chain for an already extracted query
    pub async fn search(&self, query: &str) -> ToolOutput {
        if let Some(cached) = self.cache.get(query).await {
            return cached;
        }

        if let Some(key) = self.tavily_key.as_deref() {
            match self.search_tavily(key, query).await {
                Ok(results) if !results.is_empty() => {
                    let output = ToolOutput::ok(format_results(query, &results));
                    self.cache.insert(query, output.clone()).await;
                    return output;
                }
                Ok(_) => debug!("Tavily returned no results for {}", query),
                Err(e) => warn!("Tavily search failed: {:#}", e),
            }
        }

        match self.search_duckduckgo(query).await {
            Ok(results) if !results.is_empty() => {
                let output = ToolOutput::ok(format_results(query, &results));
                self.cache.insert(query, output.clone()).await;
                output
            }
            Ok(_) => {
                debug!("DuckDuckGo returned no results for {}", query);
                ToolOutput::placeholder(demo_results(query))
            }
            Err(e) => {
                warn!("DuckDuckGo search failed: {:#}", e);
                ToolOutput::placeholder(demo_results(query))
            }
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn description(&self) -> &str {
        "Search the web for current information, news, and answers to questions"
    }

    fn can_handle(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        contains_any(&lower, SEARCH_KEYWORDS)
            || contains_any(&lower, CURRENT_INFO_TOPICS)
            || QUESTION_PATTERNS.iter().any(|p| p.is_match(&lower))
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let query = match options.param_str("query") {
            Some(query) => query.to_string(),
            None => extract_search_query(text),
        };
        info!(query = %query, "Web search");
        Ok(self.search(&query).await)
    }

    fn is_available(&self) -> bool {
        self.tavily_key.is_some()
    }
}
