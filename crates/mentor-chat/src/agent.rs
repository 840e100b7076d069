//! Message orchestrator
//!
//! [`Agent::process_message`] is the single entry point. Each message goes to
//! the first branch that applies:
//!
//! 1. empty input is rejected
//! 2. questions about the conversation are answered from memory analysis
//! 3. explicit email requests go straight to the email tool
//! 4. multi-step requests run as a workflow
//! 5. a claimed (or fallback) tool handles it, with search as backstop
//! 6. the language model answers with recent context
//!
//! Every answer is then validated: empty and echoed answers are replaced.

use anyhow::Result;
use lazy_static::lazy_static;
use mentor_core::{PerformanceMonitor, QuotaTracker, Settings};
use mentor_llm::{is_quota_error, ChatManager};
use mentor_tools::adapters::email::parse_email_request;
use mentor_tools::{register_builtin_tools, OutputStatus, ToolKind, ToolOptions, ToolRegistry};
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::memory::{ConversationMemory, Role};
use crate::responses::{self, ModelUnavailable};
use crate::workflow::{planner, WorkflowExecutor, WorkflowPlan, WorkflowPlanner};

const ANALYSIS_PHRASES: &[&str] = &["talked about"];

const RECALL_PHRASES: &[&str] = &[
    "do you remember",
    "did i tell you",
    "what did i say",
    "earlier i mentioned",
    "previously",
    "before i asked",
    "you said",
    "we discussed",
    "our conversation",
    "my name is",
    "i told you my name",
    "what's my name",
    "who am i",
];

const EMAIL_PHRASES: &[&str] = &[
    "send mail",
    "send email",
    "email to",
    "mail to",
    "compose email",
    "gmail",
    "mail as",
    "sick leave",
    "seeking leave",
];

lazy_static! {
    static ref ANALYSIS_WORDS: Option<Regex> = Regex::new(
        r"\b(remember|recall|previous|earlier|before|conversation|discussed|mentioned|said|told|history)\b"
    )
    .ok();
}

/// Asks about the conversation itself ("what did we talk about?")
fn is_analysis_query(lower: &str) -> bool {
    ANALYSIS_WORDS.as_ref().map_or(false, |re| re.is_match(lower))
        || ANALYSIS_PHRASES.iter().any(|p| lower.contains(p))
}

/// Needs the model with context ("what's my name?")
fn is_recall_query(lower: &str) -> bool {
    RECALL_PHRASES.iter().any(|p| lower.contains(p))
}

fn is_email_request(lower: &str) -> bool {
    EMAIL_PHRASES.iter().any(|p| lower.contains(p))
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Messages between language-model session resets
    pub reset_interval: u64,
    pub max_message_length: usize,
    /// History lines in general prompts
    pub context_messages: usize,
    /// History lines in search analysis prompts
    pub search_context_messages: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            reset_interval: 50,
            max_message_length: 4096,
            context_messages: 8,
            search_context_messages: 5,
        }
    }
}

impl AgentConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_message_length: settings.max_message_length,
            ..Self::default()
        }
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// Routes each message to memory, email, a workflow, a tool, or the model
pub struct Agent {
    registry: Arc<ToolRegistry>,
    memory: Arc<ConversationMemory>,
    llm: Option<Arc<ChatManager>>,
    planner: WorkflowPlanner,
    executor: WorkflowExecutor,
    monitor: Option<Arc<PerformanceMonitor>>,
    quota: Option<Arc<QuotaTracker>>,
    config: AgentConfig,
    processed_since_reset: AtomicU64,
    resets: AtomicU64,
}

impl Agent {
    pub fn new(
        registry: Arc<ToolRegistry>,
        memory: Arc<ConversationMemory>,
        llm: Option<Arc<ChatManager>>,
    ) -> Self {
        Self {
            planner: WorkflowPlanner::new(llm.clone()),
            executor: WorkflowExecutor::new(registry.clone(), llm.clone()),
            registry,
            memory,
            llm,
            monitor: None,
            quota: None,
            config: AgentConfig::default(),
            processed_since_reset: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_quota(mut self, quota: Arc<QuotaTracker>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the full stack from settings: Gemini (when a key is set), the
    /// built-in tools and an empty memory store
    pub async fn from_settings(
        settings: &Settings,
        quota: Arc<QuotaTracker>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        let llm = match ChatManager::gemini(settings) {
            Ok(manager) => Some(Arc::new(
                manager.with_quota(quota.clone()).with_monitor(monitor.clone()),
            )),
            Err(e) => {
                warn!("Language model unavailable: {:#}", e);
                None
            }
        };

        let registry = Arc::new(ToolRegistry::new().with_monitor(monitor.clone()));
        register_builtin_tools(&registry, settings, llm.clone(), Some(monitor.clone())).await;

        Self::new(registry, Arc::new(ConversationMemory::new()), llm)
            .with_monitor(monitor)
            .with_quota(quota)
            .with_config(AgentConfig::from_settings(settings))
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Language-model session resets so far
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    fn quota(&self) -> Option<&Arc<QuotaTracker>> {
        self.quota.as_ref().or_else(|| self.llm.as_ref().and_then(|llm| llm.quota()))
    }

    /// Handle one message and return the reply text
    pub async fn process_message(&self, text: &str, user_id: &str) -> String {
        let start = Instant::now();
        let response = self.respond(text, user_id).await;
        if let Some(monitor) = &self.monitor {
            monitor.record_request(start.elapsed()).await;
        }
        response
    }

    async fn respond(&self, text: &str, user_id: &str) -> String {
        self.tick_reset().await;

        let message = text.trim();
        if message.is_empty() {
            return responses::EMPTY_INPUT.to_string();
        }
        info!(user_id = %user_id, len = message.len(), "Processing message");

        let result = self.dispatch(message, user_id).await;
        let reply = self.validate(result, message, user_id).await;

        self.memory.add_message(user_id, Role::User, message).await;
        if let Some(reply) = &reply {
            self.memory.add_message(user_id, Role::Assistant, reply.as_str()).await;
        }
        reply.unwrap_or_else(|| responses::EMPTY_RESULT.to_string())
    }

    async fn tick_reset(&self) {
        let interval = self.config.reset_interval;
        // Count and roll over in one step so concurrent callers reset once
        let previous = self
            .processed_since_reset
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(if n >= interval { 1 } else { n + 1 })
            })
            .unwrap_or_else(|n| n);
        if previous < interval {
            return;
        }

        info!(processed = previous + 1, "Resetting language model session");
        if let Some(llm) = &self.llm {
            match llm.reset().await {
                Ok(()) => {
                    self.resets.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => warn!("Language model reset failed: {:#}", e),
            }
        }
    }

    async fn dispatch(&self, message: &str, user_id: &str) -> String {
        let lower = message.to_lowercase();

        if is_analysis_query(&lower) {
            debug!(user_id = %user_id, "Conversation analysis requested");
            let analysis = self.memory.analyze(user_id).await;
            return responses::memory_report(&analysis);
        }

        if is_recall_query(&lower) {
            debug!(user_id = %user_id, "Recall question; answering with context");
            return self.general(message, user_id).await;
        }

        if is_email_request(&lower) {
            info!(user_id = %user_id, "Email request; using email tool directly");
            return self.send_email(message, user_id).await;
        }

        if let Some(template) = self.planner.detect(message).await {
            let plan = self.planner.plan(template, message);
            return self.run_workflow(plan, user_id).await;
        }
        if planner::wants_decomposition(message) {
            let plan = self.planner.plan_custom(message).await;
            return self.run_workflow(plan, user_id).await;
        }

        match self.registry.select_tool(message).await {
            Some(tool) => self.handle_tool(tool.kind(), message, user_id).await,
            None => self.general(message, user_id).await,
        }
    }

    /// `None` when nothing usable could be produced
    async fn validate(&self, result: String, message: &str, user_id: &str) -> Option<String> {
        if result.trim().is_empty() {
            warn!(user_id = %user_id, "Empty response");
            return None;
        }

        if result.trim().to_lowercase() == message.to_lowercase() {
            warn!(user_id = %user_id, "Response echoed the input; retrying");
            let retry = self.general(&responses::echo_retry_prompt(message), user_id).await;
            let degenerate =
                retry.trim().is_empty() || retry.trim().to_lowercase() == message.to_lowercase();
            return (!degenerate).then_some(retry);
        }

        Some(result)
    }

    // ------------------------------------------------------------------------
    // Branches
    // ------------------------------------------------------------------------

    async fn send_email(&self, message: &str, user_id: &str) -> String {
        if self.registry.get(ToolKind::Email).await.is_none() {
            warn!("Email tool is not registered");
            return responses::EMAIL_UNAVAILABLE.to_string();
        }

        let request = parse_email_request(message);
        let mut options = ToolOptions::for_user(user_id);
        if let Some(to) = request.to {
            options = options.with_param("to", to);
        }
        if let Some(name) = request.recipient_name {
            options = options.with_param("recipient", name);
        }
        if let Some(subject) = request.subject {
            options = options.with_param("subject", subject);
        }

        match self.registry.execute(ToolKind::Email, message, &options).await {
            Ok(output) => output.content,
            Err(e) => {
                warn!(user_id = %user_id, "Email delivery failed: {:#}", e);
                responses::EMAIL_FAILED.to_string()
            }
        }
    }

    async fn run_workflow(&self, plan: WorkflowPlan, user_id: &str) -> String {
        if plan.is_empty() {
            return "I couldn't create a workflow for that request. Let me try a different approach.".to_string();
        }
        let result = self.executor.execute(&plan, Some(user_id)).await;
        for warning in &result.warnings {
            warn!(workflow = %plan.name(), "{}", warning);
        }
        responses::format_response(&responses::workflow_response(&result), self.config.max_message_length)
    }

    async fn handle_tool(&self, kind: ToolKind, message: &str, user_id: &str) -> String {
        let options = ToolOptions::for_user(user_id);
        let output = match self.registry.execute(kind, message, &options).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %kind, "Tool failed, falling back to search: {:#}", e);
                return self.search_fallback(message, None, user_id).await;
            }
        };

        match kind {
            ToolKind::Search => self.analyze_search(message, &output.content, Some(kind), user_id).await,
            ToolKind::Dictionary => {
                if output.status == OutputStatus::Ok && !output.content.trim().starts_with('❌') {
                    output.content
                } else {
                    debug!("Dictionary had no answer; trying search");
                    self.search_fallback(message, Some(kind), user_id).await
                }
            }
            _ => {
                if output.status != OutputStatus::Ok
                    || responses::looks_like_placeholder(&output.content)
                    || responses::looks_like_failure(&output.content)
                {
                    debug!(tool = %kind, status = ?output.status, "Low-confidence tool output; trying search");
                    self.search_fallback(message, Some(kind), user_id).await
                } else {
                    output.content
                }
            }
        }
    }

    async fn search_fallback(&self, message: &str, origin: Option<ToolKind>, user_id: &str) -> String {
        if self.registry.get(ToolKind::Search).await.is_none() {
            return self.general(message, user_id).await;
        }

        let query = responses::extract_search_terms(message);
        let options = ToolOptions::for_user(user_id).with_param("query", query.as_str());
        match self.registry.execute(ToolKind::Search, &query, &options).await {
            Ok(output) => self.analyze_search(message, &output.content, origin, user_id).await,
            Err(e) => {
                warn!("Search fallback failed: {:#}", e);
                self.general(message, user_id).await
            }
        }
    }

    /// Have the model turn raw search results into an answer
    async fn analyze_search(&self, query: &str, results: &str, origin: Option<ToolKind>, user_id: &str) -> String {
        let Some(llm) = &self.llm else {
            return results.to_string();
        };
        if !llm.can_make_request().await {
            return responses::search_digest(query, results);
        }

        let context = self.memory.context(user_id, self.config.search_context_messages).await;
        let context = if context.is_empty() {
            String::new()
        } else {
            format!("\n\nPrevious conversation context:\n{}\n", context)
        };
        let prompt = format!(
            "You are an intelligent assistant. A user asked: \"{}\"{}\n\n\
             I searched the web and found the following information:\n\n{}\n\n\
             Please analyze this information and provide a clear, well-organized response that \
             directly answers the user's question, synthesizes the key points from the results \
             and acknowledges any connection to earlier questions. Use markdown and stay under 1000 words.\n\n\
             Response:",
            query, context, results
        );

        match llm.generate(&prompt).await {
            Ok(answer) if !answer.trim().is_empty() => format!(
                "{}\n\n{}",
                responses::search_header(origin),
                responses::format_response(&answer, self.config.max_message_length)
            ),
            Ok(_) => results.to_string(),
            Err(e) if is_quota_error(&e) => responses::search_digest(query, results),
            Err(e) => {
                warn!("Search analysis failed: {:#}", e);
                results.to_string()
            }
        }
    }

    async fn system_prompt(&self) -> String {
        let tools = self
            .registry
            .describe_all()
            .await
            .into_iter()
            .map(|(name, description)| format!("- {}: {}", name, description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are ModuMentor, a helpful assistant with access to these tools:\n\n{}\n\n\
             You remember the current conversation and can refer back to earlier messages. \
             Answer directly when you know the answer, keep replies concise and friendly, \
             use markdown and the occasional emoji, and suggest alternatives when something fails.",
            tools
        )
    }

    /// Direct model answer seeded with recent history
    async fn general(&self, query: &str, user_id: &str) -> String {
        let Some(llm) = &self.llm else {
            return responses::quota_response(query, ModelUnavailable::NotConfigured);
        };
        if !llm.can_make_request().await {
            return responses::quota_response(query, ModelUnavailable::QuotaExceeded);
        }

        let context = self.memory.context(user_id, self.config.context_messages).await;
        let context = if context.is_empty() {
            String::new()
        } else {
            format!("\n\nPrevious conversation:\n{}\n", context)
        };
        let prompt = format!("{}{}\nUser: {}\nAssistant:", self.system_prompt().await, context, query);

        match llm.generate(&prompt).await {
            Ok(answer) => {
                let formatted = responses::format_response(&answer, self.config.max_message_length);
                let bare = formatted.trim_end_matches(" 😊").trim();
                if bare.is_empty() || bare.to_lowercase() == query.to_lowercase() {
                    warn!("Model returned an empty or echoing answer");
                    responses::REPHRASE.to_string()
                } else {
                    formatted
                }
            }
            Err(e) if is_quota_error(&e) => responses::quota_response(query, ModelUnavailable::QuotaExceeded),
            Err(e) => {
                warn!("General answer failed: {:#}", e);
                responses::TECHNICAL_DIFFICULTIES.to_string()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub async fn clear_conversation(&self, user_id: &str) -> String {
        if self.memory.clear(user_id).await {
            responses::CLEARED.to_string()
        } else {
            responses::NOTHING_TO_CLEAR.to_string()
        }
    }

    pub async fn conversation_stats(&self, user_id: &str) -> String {
        responses::stats_message(&self.memory.stats(user_id).await)
    }

    pub async fn help_message(&self) -> String {
        responses::help_message(&self.registry.describe_all().await)
    }

    pub async fn quota_status(&self) -> String {
        match self.quota() {
            Some(quota) => quota.usage_message().await,
            None => "📊 No language model quota is being tracked.".to_string(),
        }
    }

    pub async fn performance_summary(&self) -> String {
        match &self.monitor {
            Some(monitor) => monitor.summary().await,
            None => "📊 Performance monitoring is not enabled.".to_string(),
        }
    }

    /// Persist conversations when a memory file is configured
    pub async fn save_memory(&self, settings: &Settings) -> Result<()> {
        if let Some(path) = &settings.memory_file {
            self.memory.save_to(path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_llm::ScriptedProvider;
    use mentor_tools::{FnTool, ToolOutput};
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(ToolKind, String, ToolOptions)>>>;

    fn recording(kind: ToolKind, keywords: &[&str], calls: &Calls, output: ToolOutput) -> Arc<FnTool> {
        let calls = calls.clone();
        Arc::new(
            FnTool::new(kind, format!("{} tool", kind), move |text, options| {
                calls.lock().unwrap().push((kind, text.to_string(), options.clone()));
                Ok(output.clone())
            })
            .with_keywords(keywords),
        )
    }

    async fn registry_with(tools: Vec<Arc<FnTool>>) -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        for tool in tools {
            registry.register(tool).await;
        }
        registry
    }

    fn scripted<F>(responder: F) -> Arc<ChatManager>
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Arc::new(ChatManager::from_provider(Arc::new(ScriptedProvider::new(responder))))
    }

    fn kinds(calls: &Calls) -> Vec<ToolKind> {
        calls.lock().unwrap().iter().map(|(k, _, _)| *k).collect()
    }

    #[tokio::test]
    async fn test_weather_request_uses_weather_tool() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![
            recording(
                ToolKind::Weather,
                &["weather"],
                &calls,
                ToolOutput::ok("🌤️ Weather in Paris\nTemperature: 20°C, clear sky"),
            ),
            recording(ToolKind::Search, &[], &calls, ToolOutput::ok("search results")),
        ])
        .await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        let reply = agent.process_message("weather in Paris", "u1").await;

        assert!(reply.contains("20°C"));
        assert_eq!(kinds(&calls), vec![ToolKind::Weather]);
        let messages = agent.memory().messages("u1").await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_empty_input_is_not_recorded() {
        let agent = Agent::new(Arc::new(ToolRegistry::new()), Arc::new(ConversationMemory::new()), None);
        assert_eq!(agent.process_message("   ", "u1").await, responses::EMPTY_INPUT);
        assert!(agent.memory().messages("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_email_request_bypasses_selection() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![
            recording(ToolKind::Email, &[], &calls, ToolOutput::ok("✅ Email sent to a@example.com")),
            recording(ToolKind::Search, &["send", "meeting"], &calls, ToolOutput::ok("results")),
        ])
        .await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        let reply = agent
            .process_message("send email to a@example.com about the meeting", "u1")
            .await;

        assert_eq!(reply, "✅ Email sent to a@example.com");
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ToolKind::Email);
        assert_eq!(calls[0].2.param_str("to"), Some("a@example.com"));
        assert_eq!(calls[0].2.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_email_request_without_email_tool() {
        let agent = Agent::new(Arc::new(ToolRegistry::new()), Arc::new(ConversationMemory::new()), None);
        let reply = agent.process_message("send email to bob@example.com", "u1").await;
        assert_eq!(reply, responses::EMAIL_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_email_delivery_error_is_not_shown_raw() {
        let failing = FnTool::new(ToolKind::Email, "Email", |_, _| {
            anyhow::bail!("535 5.7.8 Username and Password not accepted smtp.gmail.com")
        });
        let registry = registry_with(vec![Arc::new(failing)]).await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        let reply = agent
            .process_message("send email to a@example.com about the meeting", "u1")
            .await;

        assert_eq!(reply, responses::EMAIL_FAILED);
        assert!(!reply.contains("535 5.7.8"));
    }

    #[tokio::test]
    async fn test_session_resets_after_fifty_messages() {
        let llm = scripted(|_| Ok("Here is a thoughtful answer".to_string()));
        let agent = Agent::new(Arc::new(ToolRegistry::new()), Arc::new(ConversationMemory::new()), Some(llm.clone()));

        for i in 0..50 {
            agent.process_message(&format!("tell me a joke number {}", i), "u1").await;
        }
        assert_eq!(agent.reset_count(), 0);

        let reply = agent.process_message("tell me a joke number 50", "u1").await;
        assert!(reply.starts_with("Here is a thoughtful answer"));
        assert_eq!(agent.reset_count(), 1);
        assert_eq!(llm.reset_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_messages_reset_once_per_interval() {
        let llm = scripted(|_| Ok("Here is a thoughtful answer".to_string()));
        let agent = Arc::new(Agent::new(
            Arc::new(ToolRegistry::new()),
            Arc::new(ConversationMemory::new()),
            Some(llm.clone()),
        ));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..101 {
            let agent = agent.clone();
            tasks.spawn(async move { agent.process_message(&format!("tell me a joke number {}", i), "u1").await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert_eq!(agent.reset_count(), 2);
        assert_eq!(llm.reset_count(), 2);
    }

    #[tokio::test]
    async fn test_echoed_tool_output_is_replaced() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let echo = FnTool::new(ToolKind::Lyrics, "Echo", move |text, _| {
            *counter.lock().unwrap() += 1;
            Ok(ToolOutput::ok(text.to_string()))
        })
        .with_keywords(&["sing"]);
        let registry = registry_with(vec![Arc::new(echo)]).await;
        let llm = scripted(|prompt| {
            if prompt.contains("Please help me understand") {
                Ok("Happy to help with that song".to_string())
            } else {
                Ok("none".to_string())
            }
        });
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), Some(llm));

        let reply = agent.process_message("Sing Me Something", "u1").await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_ne!(reply.to_lowercase(), "sing me something");
        assert!(reply.starts_with("Happy to help with that song"));
    }

    #[tokio::test]
    async fn test_placeholder_output_falls_back_to_search() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![
            recording(ToolKind::Weather, &["weather"], &calls, ToolOutput::placeholder("Demo weather data")),
            recording(ToolKind::Search, &[], &calls, ToolOutput::ok("Paris forecast: mild")),
        ])
        .await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        let reply = agent.process_message("weather in Paris", "u1").await;

        assert_eq!(reply, "Paris forecast: mild");
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, ToolKind::Search);
        assert_eq!(calls[1].1, "weather paris");
    }

    #[tokio::test]
    async fn test_dictionary_failure_marker_falls_back() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![
            recording(ToolKind::Dictionary, &["define"], &calls, ToolOutput::ok("❌ No definition found")),
            recording(ToolKind::Search, &[], &calls, ToolOutput::ok("Zyzzyva is a genus of weevils")),
        ])
        .await;
        let llm = scripted(|prompt| {
            if prompt.contains("I searched the web") {
                Ok("A zyzzyva is a tropical weevil 📚".to_string())
            } else {
                Ok("none".to_string())
            }
        });
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), Some(llm));

        let reply = agent.process_message("define zyzzyva", "u1").await;

        assert!(reply.starts_with("🔍 **Analyzed web search results for definition**"));
        assert!(reply.contains("tropical weevil"));
    }

    #[tokio::test]
    async fn test_search_is_summarized() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![recording(
            ToolKind::Search,
            &[],
            &calls,
            ToolOutput::ok("Rust 1.80 was released"),
        )])
        .await;
        let llm = scripted(|prompt| {
            if prompt.contains("I searched the web") {
                Ok("The latest Rust release is 1.80".to_string())
            } else {
                Ok("none".to_string())
            }
        });
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), Some(llm));

        let reply = agent.process_message("latest rust release", "u1").await;

        assert!(reply.starts_with("🔍 **Analyzed web search results**\n\nThe latest Rust release is 1.80"));
    }

    #[tokio::test]
    async fn test_exhausted_quota_uses_template() {
        let quota = Arc::new(QuotaTracker::new(100));
        quota.mark_exceeded().await;
        let provider = Arc::new(ScriptedProvider::fixed("should not be used"));
        let llm = Arc::new(ChatManager::from_provider(provider.clone()).with_quota(quota));
        let agent = Agent::new(Arc::new(ToolRegistry::new()), Arc::new(ConversationMemory::new()), Some(llm));

        let reply = agent.process_message("what is the meaning of life", "u1").await;

        assert!(reply.starts_with("I understand you're asking about: what is the meaning of life"));
        assert!(reply.contains("API quota has been reached"));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_general_prompt_carries_history() {
        let provider = Arc::new(ScriptedProvider::fixed("Nice to meet you"));
        let llm = Arc::new(ChatManager::from_provider(provider.clone()));
        let agent = Agent::new(Arc::new(ToolRegistry::new()), Arc::new(ConversationMemory::new()), Some(llm));

        agent.process_message("my name is Ada", "u1").await;
        agent.process_message("what's my name", "u1").await;

        let prompts = provider.prompts();
        let last = prompts.last().unwrap();
        assert!(last.contains("Previous conversation:\nUser: my name is Ada"));
        assert!(last.ends_with("\nUser: what's my name\nAssistant:"));
    }

    #[tokio::test]
    async fn test_model_failure_message() {
        let llm = scripted(|_| Err(anyhow::anyhow!("connection reset")));
        let agent = Agent::new(Arc::new(ToolRegistry::new()), Arc::new(ConversationMemory::new()), Some(llm));
        assert_eq!(
            agent.process_message("explain monads", "u1").await,
            responses::TECHNICAL_DIFFICULTIES
        );
    }

    #[tokio::test]
    async fn test_workflow_request() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![
            recording(ToolKind::Weather, &["weather"], &calls, ToolOutput::ok("Sunny, 24°C")),
            recording(ToolKind::Email, &["email"], &calls, ToolOutput::ok("✅ Email sent")),
            recording(ToolKind::Search, &[], &calls, ToolOutput::ok("results")),
        ])
        .await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        let reply = agent
            .process_message("check the weather in Paris and email the team", "u1")
            .await;

        assert!(reply.starts_with("🚀 **Smart Workflow Completed!**"));
        assert!(reply.contains("automated steps in"));
        assert_eq!(kinds(&calls), vec![ToolKind::Weather, ToolKind::Email]);
    }

    #[tokio::test]
    async fn test_conversation_report() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![recording(
            ToolKind::Weather,
            &["weather"],
            &calls,
            ToolOutput::ok("Temperature: 18°C"),
        )])
        .await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        assert_eq!(
            agent.process_message("what have we talked about?", "u1").await,
            responses::NO_HISTORY
        );

        agent.process_message("weather in Oslo", "u1").await;
        let report = agent.process_message("what have we talked about?", "u1").await;
        assert!(report.starts_with("🧠 **Conversation Analysis Report** 📊"));
        assert!(report.contains("Weather"));
    }

    #[tokio::test]
    async fn test_commands() {
        let calls: Calls = Arc::default();
        let registry = registry_with(vec![recording(ToolKind::Weather, &["weather"], &calls, ToolOutput::ok("12°C"))]).await;
        let agent = Agent::new(registry, Arc::new(ConversationMemory::new()), None);

        assert_eq!(agent.clear_conversation("u1").await, responses::NOTHING_TO_CLEAR);
        assert_eq!(agent.conversation_stats("u1").await, responses::NOT_STARTED);

        agent.process_message("weather in Oslo", "u1").await;
        assert!(agent.conversation_stats("u1").await.contains("**Messages exchanged:** 2"));
        assert_eq!(agent.clear_conversation("u1").await, responses::CLEARED);

        assert!(agent.help_message().await.contains("• **Weather**: Weather tool"));
        assert!(agent.quota_status().await.contains("No language model quota"));
    }
}
