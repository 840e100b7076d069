//! Conversation memory
//!
//! Bounded per-user message logs. The map of conversations sits behind a
//! `RwLock` and every conversation behind its own `Mutex`, so two turns for
//! the same user are written one after the other while different users never
//! contend beyond the map lookup.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

/// A user's message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub user_id: String,
    pub messages: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Append a message, then apply the size and age limits
    fn push(&mut self, role: Role, content: String, config: &MemoryConfig) {
        // Timestamps never go backwards, even if the wall clock does
        let now = Utc::now();
        let timestamp = match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        self.messages.push(ConversationMessage {
            role,
            content,
            timestamp,
            user_id: self.user_id.clone(),
        });
        self.last_updated = timestamp;

        if self.messages.len() > config.max_messages {
            let excess = self.messages.len() - config.max_messages;
            self.messages.drain(..excess);
            debug!(user_id = %self.user_id, dropped = excess, "Trimmed conversation");
        }

        let cutoff = now - config.max_message_age;
        self.messages.retain(|m| m.timestamp > cutoff);
    }

    /// The last `n` messages, oldest first
    pub fn recent(&self, n: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Render the last `limit` messages as "User:"/"Assistant:" lines
    pub fn context(&self, limit: usize) -> String {
        self.recent(limit)
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Limits applied by [`ConversationMemory`]
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_messages: usize,
    pub max_message_age: Duration,
    pub max_conversations: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_message_age: Duration::hours(24),
            max_conversations: 1000,
        }
    }
}

/// Per-user conversation statistics
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStats {
    pub message_count: usize,
    pub conversation_age_secs: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Store-wide totals
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub total_conversations: usize,
    pub total_messages: usize,
    pub average_messages_per_conversation: f64,
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// Counts and time span of a conversation
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub conversation_duration_hours: f64,
    pub conversation_start: String,
    pub last_activity: String,
}

/// Keyword-count sentiment
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub positive_score: usize,
    pub negative_score: usize,
    pub question_count: usize,
    pub overall_sentiment: String,
    pub engagement_level: String,
}

/// A recent message as shown in an analysis report
#[derive(Debug, Clone, Serialize)]
pub struct RecentMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// Result of [`ConversationMemory::analyze`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationAnalysis {
    pub has_conversation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ConversationSummary>,
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentReport>,
    pub insights: Vec<String>,
    pub recent_messages: Vec<RecentMessage>,
}

impl ConversationAnalysis {
    fn empty(message: &str) -> Self {
        Self {
            has_conversation: false,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }
}

const GENERAL_TOPIC: &str = "General conversation";

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("Weather", &["weather", "temperature", "forecast", "climate", "rain", "sunny", "cloudy"]),
    ("Email", &["email", "mail", "send", "compose", "inbox", "outbox"]),
    ("Spreadsheets", &["sheet", "spreadsheet", "excel", "google sheets", "data", "update"]),
    ("Web Search", &["search", "find", "lookup", "research", "information"]),
    ("Dictionary", &["define", "meaning", "word", "dictionary", "definition"]),
    ("Lyrics", &["lyrics", "song", "music", "artist", "album"]),
    ("Technical", &["code", "programming", "bug", "error", "fix", "debug"]),
    ("Business", &["meeting", "client", "project", "business", "work"]),
    (GENERAL_TOPIC, &["hello", "hi", "hey", "how are you", "thanks", "thank you"]),
];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "perfect", "love", "like", "thanks",
    "thank you", "helpful", "awesome",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "dislike", "problem", "error", "wrong", "fail", "broken",
    "sad", "angry",
];

const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who", "which", "?"];

/// Lowercased text plus its word set
struct Corpus {
    text: String,
    words: HashSet<String>,
}

impl Corpus {
    fn new(messages: &[ConversationMessage]) -> Self {
        let text = messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { text, words }
    }

    /// Single words match whole words; phrases and symbols match as substrings
    fn mentions(&self, keyword: &str) -> bool {
        if keyword.chars().all(char::is_alphanumeric) {
            self.words.contains(keyword)
        } else {
            self.text.contains(keyword)
        }
    }

    fn count(&self, keywords: &[&str]) -> usize {
        keywords.iter().filter(|k| self.mentions(k)).count()
    }
}

fn extract_topics(corpus: &Corpus) -> Vec<String> {
    let mut topics: Vec<String> = TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| corpus.mentions(k)))
        .map(|(topic, _)| topic.to_string())
        .collect();
    if topics.is_empty() {
        topics.push(GENERAL_TOPIC.to_string());
    }
    topics
}

fn analyze_sentiment(corpus: &Corpus) -> SentimentReport {
    let positive = corpus.count(POSITIVE_WORDS);
    let negative = corpus.count(NEGATIVE_WORDS);
    let questions = corpus.count(QUESTION_WORDS);

    let overall = if positive > negative {
        "positive"
    } else if negative > positive {
        "negative"
    } else {
        "neutral"
    };
    let engagement = if questions > 3 {
        "high"
    } else if questions > 1 {
        "medium"
    } else {
        "low"
    };

    SentimentReport {
        positive_score: positive,
        negative_score: negative,
        question_count: questions,
        overall_sentiment: overall.to_string(),
        engagement_level: engagement.to_string(),
    }
}

fn generate_insights(messages: &[ConversationMessage], topics: &[String], sentiment: &SentimentReport) -> Vec<String> {
    let mut insights = Vec::new();

    insights.push(
        match messages.len() {
            n if n > 10 => "Active conversation with substantial message exchange",
            n if n > 5 => "Moderate conversation activity",
            _ => "Brief conversation session",
        }
        .to_string(),
    );

    insights.push(
        match topics.len() {
            n if n > 3 => "Diverse range of topics discussed",
            n if n > 1 => "Multiple topics covered",
            _ => "Focused on single topic",
        }
        .to_string(),
    );

    insights.push(
        match sentiment.overall_sentiment.as_str() {
            "positive" => "Generally positive interaction",
            "negative" => "Some negative sentiment detected",
            _ => "Neutral conversation tone",
        }
        .to_string(),
    );

    insights.push(
        match sentiment.engagement_level.as_str() {
            "high" => "High user engagement with many questions",
            "medium" => "Moderate user engagement",
            _ => "Low question engagement",
        }
        .to_string(),
    );

    if let (Some(first), Some(last)) = (messages.first(), messages.last()) {
        let span = (last.timestamp - first.timestamp).num_seconds();
        insights.push(
            match span {
                s if s > 3600 => "Extended conversation session",
                s if s > 300 => "Sustained conversation",
                _ => "Quick interaction",
            }
            .to_string(),
        );
    }

    insights
}

fn local_time(ts: DateTime<Utc>, format: &str) -> String {
    DateTime::<Local>::from(ts).format(format).to_string()
}

fn preview(content: &str) -> String {
    if content.chars().count() > 100 {
        format!("{}...", content.chars().take(100).collect::<String>())
    } else {
        content.to_string()
    }
}

fn analyze_conversation(conversation: &Conversation) -> ConversationAnalysis {
    let messages = &conversation.messages;
    if messages.is_empty() {
        return ConversationAnalysis::empty("No messages in conversation history.");
    }

    let corpus = Corpus::new(messages);
    let topics = extract_topics(&corpus);
    let sentiment = analyze_sentiment(&corpus);
    let insights = generate_insights(messages, &topics, &sentiment);

    let user_messages = messages.iter().filter(|m| m.role == Role::User).count();
    let duration_secs = (conversation.last_updated - conversation.created_at).num_milliseconds() as f64 / 1000.0;

    let summary = ConversationSummary {
        total_messages: messages.len(),
        user_messages,
        assistant_messages: messages.len() - user_messages,
        conversation_duration_hours: (duration_secs / 3600.0 * 100.0).round() / 100.0,
        conversation_start: local_time(conversation.created_at, "%Y-%m-%d %H:%M:%S"),
        last_activity: local_time(conversation.last_updated, "%Y-%m-%d %H:%M:%S"),
    };

    let recent_messages = conversation
        .recent(5)
        .iter()
        .map(|m| RecentMessage {
            role: m.role,
            content: preview(&m.content),
            timestamp: local_time(m.timestamp, "%H:%M:%S"),
        })
        .collect();

    ConversationAnalysis {
        has_conversation: true,
        message: None,
        summary: Some(summary),
        topics,
        sentiment: Some(sentiment),
        insights,
        recent_messages,
    }
}

// ============================================================================
// STORE
// ============================================================================

type SharedConversation = Arc<Mutex<Conversation>>;

/// Bounded store of per-user conversations
pub struct ConversationMemory {
    conversations: RwLock<HashMap<String, SharedConversation>>,
    config: MemoryConfig,
}

impl ConversationMemory {
    /// Create a store with the default limits
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create a store with custom limits
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    async fn get(&self, user_id: &str) -> Option<SharedConversation> {
        self.conversations.read().await.get(user_id).cloned()
    }

    async fn get_or_create(&self, user_id: &str) -> SharedConversation {
        if let Some(existing) = self.get(user_id).await {
            return existing;
        }

        let mut conversations = self.conversations.write().await;
        if let Some(existing) = conversations.get(user_id) {
            return existing.clone();
        }

        // Evict the least recently updated conversation at capacity
        if conversations.len() >= self.config.max_conversations {
            let mut oldest: Option<(String, DateTime<Utc>)> = None;
            for (id, conversation) in conversations.iter() {
                let updated = conversation.lock().await.last_updated;
                if oldest.as_ref().map_or(true, |(_, ts)| updated < *ts) {
                    oldest = Some((id.clone(), updated));
                }
            }
            if let Some((id, _)) = oldest {
                conversations.remove(&id);
                info!(user_id = %id, "Evicted least recently updated conversation");
            }
        }

        let conversation = Arc::new(Mutex::new(Conversation::new(user_id)));
        conversations.insert(user_id.to_string(), conversation.clone());
        info!(user_id = %user_id, "Created new conversation");
        conversation
    }

    /// Append a message to a user's conversation
    pub async fn add_message(&self, user_id: &str, role: Role, content: impl Into<String>) {
        let content = content.into();
        debug!(user_id = %user_id, role = ?role, len = content.len(), "Recording message");
        let conversation = self.get_or_create(user_id).await;
        conversation.lock().await.push(role, content, &self.config);
    }

    pub async fn add_user_message(&self, user_id: &str, content: impl Into<String>) {
        self.add_message(user_id, Role::User, content).await;
    }

    pub async fn add_assistant_message(&self, user_id: &str, content: impl Into<String>) {
        self.add_message(user_id, Role::Assistant, content).await;
    }

    /// Prompt context from the last `limit` messages; empty for unknown users
    pub async fn context(&self, user_id: &str, limit: usize) -> String {
        match self.get(user_id).await {
            Some(conversation) => conversation.lock().await.context(limit),
            None => String::new(),
        }
    }

    /// Snapshot of a user's messages
    pub async fn messages(&self, user_id: &str) -> Vec<ConversationMessage> {
        match self.get(user_id).await {
            Some(conversation) => conversation.lock().await.messages.clone(),
            None => Vec::new(),
        }
    }

    /// Topic, sentiment and activity report for a user
    pub async fn analyze(&self, user_id: &str) -> ConversationAnalysis {
        match self.get(user_id).await {
            Some(conversation) => analyze_conversation(&*conversation.lock().await),
            None => ConversationAnalysis::empty("No conversation history found for this user."),
        }
    }

    /// Remove a user's conversation; true if one existed
    pub async fn clear(&self, user_id: &str) -> bool {
        let removed = self.conversations.write().await.remove(user_id).is_some();
        if removed {
            info!(user_id = %user_id, "Cleared conversation");
        }
        removed
    }

    pub async fn stats(&self, user_id: &str) -> ConversationStats {
        match self.get(user_id).await {
            Some(conversation) => {
                let conversation = conversation.lock().await;
                ConversationStats {
                    message_count: conversation.messages.len(),
                    conversation_age_secs: (Utc::now() - conversation.created_at).num_milliseconds() as f64
                        / 1000.0,
                    last_activity: Some(conversation.last_updated),
                }
            }
            None => ConversationStats {
                message_count: 0,
                conversation_age_secs: 0.0,
                last_activity: None,
            },
        }
    }

    pub async fn usage(&self) -> MemoryUsage {
        let conversations = self.conversations.read().await;
        let mut total_messages = 0;
        for conversation in conversations.values() {
            total_messages += conversation.lock().await.messages.len();
        }
        let total_conversations = conversations.len();
        MemoryUsage {
            total_conversations,
            total_messages,
            average_messages_per_conversation: if total_conversations == 0 {
                0.0
            } else {
                total_messages as f64 / total_conversations as f64
            },
        }
    }

    /// Drop conversations idle for longer than `max_age`; returns how many
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut conversations = self.conversations.write().await;

        let mut stale = Vec::new();
        for (id, conversation) in conversations.iter() {
            if conversation.lock().await.last_updated < cutoff {
                stale.push(id.clone());
            }
        }
        for id in &stale {
            conversations.remove(id);
            info!(user_id = %id, "Cleaned up idle conversation");
        }
        stale.len()
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write every conversation to a JSON file keyed by user id
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let snapshot: HashMap<String, Conversation> = {
            let conversations = self.conversations.read().await;
            let mut snapshot = HashMap::with_capacity(conversations.len());
            for (id, conversation) in conversations.iter() {
                snapshot.insert(id.clone(), conversation.lock().await.clone());
            }
            snapshot
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize conversations")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), conversations = snapshot.len(), "Saved conversations");
        Ok(())
    }

    /// Load conversations from a JSON file, skipping stale ones
    ///
    /// A missing file is not an error and loads nothing.
    pub async fn load_from(&self, path: &Path) -> Result<usize> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        let stored: HashMap<String, Conversation> =
            serde_json::from_str(&data).with_context(|| format!("Invalid conversation file {}", path.display()))?;

        let cutoff = Utc::now() - self.config.max_message_age;
        let mut conversations = self.conversations.write().await;
        let mut loaded = 0;
        for (id, conversation) in stored {
            if conversation.last_updated < cutoff {
                debug!(user_id = %id, "Skipping stale stored conversation");
                continue;
            }
            if conversations.len() >= self.config.max_conversations {
                warn!("Conversation limit reached while loading; ignoring the rest");
                break;
            }
            conversations.insert(id, Arc::new(Mutex::new(conversation)));
            loaded += 1;
        }
        info!(path = %path.display(), loaded, "Loaded conversations");
        Ok(loaded)
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_renders_roles_in_order() {
        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "hi there").await;
        memory.add_assistant_message("u1", "hello!").await;
        memory.add_user_message("u1", "weather?").await;

        assert_eq!(memory.context("u1", 2).await, "Assistant: hello!\nUser: weather?");
        assert_eq!(memory.context("u1", 10).await, memory.context("u1", 10).await);
        assert_eq!(memory.context("nobody", 5).await, "");
    }

    #[tokio::test]
    async fn test_message_cap_keeps_most_recent() {
        let memory = ConversationMemory::new();
        for i in 0..60 {
            memory.add_user_message("u1", format!("msg {}", i)).await;
        }
        let messages = memory.messages("u1").await;
        assert_eq!(messages.len(), 50);
        assert_eq!(messages[0].content, "msg 10");
        assert_eq!(messages[49].content, "msg 59");
        assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_conversation_cap_evicts_least_recent() {
        let memory = ConversationMemory::with_config(MemoryConfig {
            max_conversations: 2,
            ..Default::default()
        });
        memory.add_user_message("a", "first").await;
        memory.add_user_message("b", "second").await;
        memory.add_user_message("a", "again").await;
        memory.add_user_message("c", "third").await;

        let usage = memory.usage().await;
        assert_eq!(usage.total_conversations, 2);
        assert!(memory.messages("b").await.is_empty());
        assert_eq!(memory.messages("a").await.len(), 2);
    }

    #[tokio::test]
    async fn test_analyze_single_greeting() {
        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "hello").await;

        let analysis = memory.analyze("u1").await;
        assert!(analysis.has_conversation);
        assert!(analysis.topics.contains(&GENERAL_TOPIC.to_string()));
        assert!(!analysis.insights.is_empty());
        assert_eq!(analysis.summary.as_ref().map(|s| s.total_messages), Some(1));
    }

    #[tokio::test]
    async fn test_analyze_topics_and_sentiment() {
        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "What is the weather in Paris?").await;
        memory.add_assistant_message("u1", "It is sunny and 20°C.").await;
        memory.add_user_message("u1", "Great, thanks! How do I send an email?").await;

        let analysis = memory.analyze("u1").await;
        assert!(analysis.topics.contains(&"Weather".to_string()));
        assert!(analysis.topics.contains(&"Email".to_string()));
        assert!(!analysis.topics.contains(&"Dictionary".to_string()));

        let sentiment = analysis.sentiment.unwrap();
        assert_eq!(sentiment.overall_sentiment, "positive");
        assert_eq!(sentiment.engagement_level, "medium");
        assert_eq!(analysis.recent_messages.len(), 3);
    }

    #[tokio::test]
    async fn test_single_words_match_whole_words() {
        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "this code is slow").await;
        let analysis = memory.analyze("u1").await;
        assert_eq!(analysis.topics, vec!["Technical".to_string()]);
    }

    #[tokio::test]
    async fn test_analyze_unknown_user() {
        let memory = ConversationMemory::new();
        let analysis = memory.analyze("ghost").await;
        assert!(!analysis.has_conversation);
        assert!(analysis.message.is_some());
    }

    #[tokio::test]
    async fn test_recent_messages_are_truncated() {
        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "x".repeat(150)).await;
        let analysis = memory.analyze("u1").await;
        assert_eq!(analysis.recent_messages[0].content.chars().count(), 103);
        assert!(analysis.recent_messages[0].content.ends_with("..."));
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let memory = ConversationMemory::new();
        assert_eq!(memory.stats("u1").await.message_count, 0);
        memory.add_user_message("u1", "hello").await;
        assert_eq!(memory.stats("u1").await.message_count, 1);
        assert!(memory.clear("u1").await);
        assert!(!memory.clear("u1").await);
        assert_eq!(memory.stats("u1").await.message_count, 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_active_conversations() {
        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "hello").await;
        assert_eq!(memory.cleanup(Duration::hours(48)).await, 0);
        assert_eq!(memory.cleanup(Duration::seconds(-1)).await, 1);
        assert_eq!(memory.usage().await.total_conversations, 0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory").join("conversations.json");

        let memory = ConversationMemory::new();
        memory.add_user_message("u1", "hello").await;
        memory.add_assistant_message("u1", "hi!").await;
        memory.save_to(&path).await.unwrap();

        let restored = ConversationMemory::new();
        assert_eq!(restored.load_from(&path).await.unwrap(), 1);
        assert_eq!(restored.context("u1", 5).await, "User: hello\nAssistant: hi!");
    }

    #[tokio::test]
    async fn test_load_skips_stale_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new();
        assert_eq!(memory.load_from(&dir.path().join("absent.json")).await.unwrap(), 0);

        let mut old = Conversation::new("old");
        old.last_updated = Utc::now() - Duration::hours(30);
        let stored: HashMap<String, Conversation> = [("old".to_string(), old)].into_iter().collect();
        let path = dir.path().join("stale.json");
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        assert_eq!(memory.load_from(&path).await.unwrap(), 0);
    }
}
