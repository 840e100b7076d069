//! User-facing response text
//!
//! Fixed messages, the quota fallbacks, report formatting and the low
//! confidence checks the orchestrator applies to tool output.

use mentor_tools::ToolKind;
use std::collections::BTreeMap;

use crate::memory::{ConversationAnalysis, ConversationStats, Role};
use crate::workflow::WorkflowResult;

pub const EMPTY_INPUT: &str = "I didn't receive any message. Could you please send me something? 😊";
pub const EMPTY_RESULT: &str =
    "I'm having trouble generating a response. Could you please try rephrasing your question? 🤖";
pub const TECHNICAL_DIFFICULTIES: &str = "I'm experiencing some technical difficulties. Please try again in a moment! 🔧";
pub const REPHRASE: &str = "I understand you're asking about something, but I'm having trouble formulating a proper response. Could you please rephrase your question? 😊";
pub const NO_HISTORY: &str = "We haven't had any previous conversations in this session. This is our first interaction! 😊";
pub const NOT_STARTED: &str =
    "We haven't started chatting yet! Send me a message to begin our conversation. 😊";
pub const CLEARED: &str = "✅ I've cleared our conversation history. We can start fresh! 😊";
pub const NOTHING_TO_CLEAR: &str =
    "There wasn't any conversation history to clear, but we can start chatting anytime! 😊";
pub const EMAIL_UNAVAILABLE: &str = "❌ Gmail tool not available. Please check configuration.";
pub const EMAIL_FAILED: &str =
    "❌ I couldn't send that email right now. Please check the address and try again in a moment.";

const FRIENDLY_EMOJI: &[&str] = &["😊", "🤖", "👍", "💡", "🔍", "📚", "🌤️"];

/// Prompt used to retry when a handler only echoed the input
pub fn echo_retry_prompt(text: &str) -> String {
    format!("Please help me understand: {}", text)
}

/// Why the language model could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelUnavailable {
    QuotaExceeded,
    NotConfigured,
}

/// Tool-agnostic answer served without the language model
pub fn quota_response(query: &str, reason: ModelUnavailable) -> String {
    let status = match reason {
        ModelUnavailable::QuotaExceeded => {
            "• API quota has been reached for today\n\
             • Tool-based queries (weather, dictionary, search) still work\n\
             • Enhanced analysis will be available when quota resets"
        }
        ModelUnavailable::NotConfigured => {
            "• No language model is configured\n\
             • Tool-based queries (weather, dictionary, search) still work\n\
             • Set GEMINI_API_KEY to enable conversational answers"
        }
    };

    format!(
        "I understand you're asking about: {}\n\n\
         💡 **Suggestions:**\n\
         • Try asking for specific information like weather, definitions, or web searches\n\
         • Use commands like 'define [word]' or 'weather in [city]'\n\
         • Ask me to search for specific information\n\n\
         🔧 **Current Status:**\n{}\n\n\
         📋 **Available Commands:**\n\
         • `/help` - Show available features\n\
         • `/stats` - View conversation statistics\n\
         • `/clear` - Clear conversation history",
        query, status
    )
}

/// Search results shown without model analysis
pub fn search_digest(query: &str, results: &str) -> String {
    let mut out = format!("🔍 **Search Results for: {}**\n\n", query);

    if let Some(answer) = results
        .lines()
        .find(|line| line.to_lowercase().contains("answer") && line.chars().count() > 20)
    {
        out.push_str(&format!("💡 **Quick Answer:**\n{}\n\n", answer.trim()));
    }

    out.push_str("📄 **Search Results:**\n");
    out.push_str(&results.chars().take(1000).collect::<String>());
    if results.chars().count() > 1000 {
        out.push_str("\n\n... (results truncated due to length)");
    }
    out.push_str(
        "\n\n💡 *Note: This is a direct summary of search results. For enhanced analysis, please try again later when API quota resets.*",
    );
    out
}

/// Header naming what the search fallback stood in for
pub fn search_header(origin: Option<ToolKind>) -> &'static str {
    match origin {
        Some(ToolKind::Dictionary) => "🔍 **Analyzed web search results for definition**",
        Some(ToolKind::Weather) => "🔍 **Analyzed web search results for weather information**",
        _ => "🔍 **Analyzed web search results**",
    }
}

/// Truncate, trim, and make sure the text carries a friendly emoji
pub fn format_response(text: &str, max_message_length: usize) -> String {
    let limit = max_message_length.saturating_sub(100);
    let mut response = if text.chars().count() > limit {
        format!("{}...", text.chars().take(limit).collect::<String>())
    } else {
        text.to_string()
    };

    response = response.trim().to_string();
    if !FRIENDLY_EMOJI.iter().any(|e| response.contains(e)) {
        response.push_str(" 😊");
    }
    response
}

const PLACEHOLDER_MARKERS: &[&str] = &[
    "dummy data",
    "placeholder data",
    "configure real apis",
    "get real",
    "demo answer",
    "example.com",
    "this is demo",
    "for real search results",
    "add api key",
];

/// Whether otherwise-ok tool text looks like demo data
///
/// Spreadsheet tables, dictionary entries and temperature readings are
/// exempt even when they mention a marker.
pub fn looks_like_placeholder(text: &str) -> bool {
    let lower = text.to_lowercase();

    if lower.contains("google sheets data") && lower.contains("name") && lower.contains("email") {
        return false;
    }
    if (lower.contains("definition of") || lower.contains("pronunciation:")) && text.contains("📚") {
        return false;
    }
    if (lower.contains("temperature:") || lower.contains("weather")) && (text.contains("°C") || text.contains("°F")) {
        return false;
    }

    PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Generic failure wording in tool text
pub fn looks_like_failure(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("error") || lower.contains("sorry")
}

const SEARCH_STOP_WORDS: &[&str] = &[
    "what", "is", "the", "meaning", "of", "define", "search", "for", "find", "tell", "me", "about",
];

/// Key terms of a request, for the search fallback
pub fn extract_search_terms(query: &str) -> String {
    let lower = query.to_lowercase();
    let terms: Vec<&str> = lower
        .split_whitespace()
        .filter(|w| !SEARCH_STOP_WORDS.contains(w) && w.chars().count() > 2)
        .collect();
    if terms.is_empty() {
        query.to_string()
    } else {
        terms.join(" ")
    }
}

pub fn workflow_response(result: &WorkflowResult) -> String {
    if result.success {
        format!(
            "🚀 **Smart Workflow Completed!**\n\n{}\n\n⚡ Executed {} automated steps in {:.1}s",
            result.final_summary, result.steps_completed, result.elapsed_secs
        )
    } else {
        let mut response = format!(
            "🔄 **Workflow Partially Completed**\n\n{}\n\n✅ {}/{} steps completed",
            result.final_summary, result.steps_completed, result.total_steps
        );
        if !result.errors.is_empty() {
            response.push_str(&format!("\n⚠️ Issues: {} errors encountered", result.errors.len()));
        }
        response
    }
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Report for "what did we talk about" style questions
pub fn memory_report(analysis: &ConversationAnalysis) -> String {
    let (Some(summary), Some(sentiment)) = (&analysis.summary, &analysis.sentiment) else {
        return NO_HISTORY.to_string();
    };
    if !analysis.has_conversation {
        return NO_HISTORY.to_string();
    }

    let mut lines = vec![
        "🧠 **Conversation Analysis Report** 📊".to_string(),
        String::new(),
        "📈 **Conversation Statistics:**".to_string(),
        format!("• **Total Messages:** {}", summary.total_messages),
        format!("• **Your Messages:** {}", summary.user_messages),
        format!("• **My Responses:** {}", summary.assistant_messages),
        format!("• **Duration:** {} hours", summary.conversation_duration_hours),
        format!("• **Started:** {}", summary.conversation_start),
        format!("• **Last Activity:** {}", summary.last_activity),
        String::new(),
        "🎯 **Topics Discussed:**".to_string(),
        format!("• {}", analysis.topics.join(", ")),
        String::new(),
        "😊 **Sentiment Analysis:**".to_string(),
        format!("• **Overall Tone:** {}", title(&sentiment.overall_sentiment)),
        format!("• **Engagement Level:** {}", title(&sentiment.engagement_level)),
        format!("• **Questions Asked:** {}", sentiment.question_count),
        String::new(),
        "💡 **Key Insights:**".to_string(),
    ];
    lines.extend(analysis.insights.iter().map(|i| format!("• {}", i)));

    lines.push(String::new());
    lines.push("🔄 **Recent Messages:**".to_string());
    for message in &analysis.recent_messages {
        let (emoji, label) = match message.role {
            Role::User => ("👤", "User"),
            Role::Assistant => ("🤖", "Assistant"),
        };
        lines.push(format!("{} **{}** ({}): {}", emoji, label, message.timestamp, message.content));
    }

    let topic_count = analysis.topics.len();
    lines.push(String::new());
    lines.push("💭 **Analysis Summary:**".to_string());
    lines.push(format!(
        "This conversation shows {} engagement with a {} tone. We've covered {} main topic{} over {} hours. \
         I'm here to continue helping you with any questions or tasks! 🚀",
        sentiment.engagement_level,
        sentiment.overall_sentiment,
        topic_count,
        if topic_count == 1 { "" } else { "s" },
        summary.conversation_duration_hours
    ));

    lines.join("\n")
}

pub fn stats_message(stats: &ConversationStats) -> String {
    if stats.message_count == 0 {
        return NOT_STARTED.to_string();
    }
    let age = stats.conversation_age_secs as u64;
    format!(
        "📊 **Our Conversation Stats:**\n\n\
         💬 **Messages exchanged:** {}\n\
         ⏰ **Conversation duration:** {}h {}m\n\
         🕐 **Last message:** Just now\n\n\
         I remember our conversation within this session! 🧠",
        stats.message_count,
        age / 3600,
        (age % 3600) / 60
    )
}

/// Feature overview built from the registered tool descriptions
pub fn help_message(tools: &BTreeMap<String, String>) -> String {
    let mut help = String::from("🤖 **Welcome! Here's what I can do:**\n\n## 🚀 **Tools**\n\n");
    for (name, description) in tools {
        help.push_str(&format!("• **{}**: {}\n", name, description));
    }

    help.push_str(
        "\n## 💬 **Try asking**\n\n\
         • \"What's the weather in New York?\"\n\
         • \"Define serendipity\"\n\
         • \"Search for the latest AI news\"\n\
         • \"Show me the employee data from the spreadsheet\"\n\
         • \"Send email to john@company.com about the quarterly meeting\"\n\
         • \"Lyrics of Yesterday by The Beatles\"\n\n\
         ## 🔄 **Smart Workflows**\n\n\
         • \"Check the weather in Paris and email the team\"\n\
         • \"Search for market data, then update the spreadsheet with findings\"\n\
         • \"Analyze the sheet data and email a report to the team\"\n\
         • \"Prepare for the meeting in Berlin\"\n\n\
         ## 🧠 **Memory**\n\n\
         I remember our conversation. Ask \"what have we discussed?\" for a summary.\n\n\
         ## 📋 **Commands**\n\n\
         • `/help` - Show this guide\n\
         • `/clear` - Clear conversation history\n\
         • `/stats` - View conversation statistics",
    );
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_response() {
        assert_eq!(format_response("  Hello there  ", 4096), "Hello there 😊");
        assert_eq!(format_response("Found it 🔍", 4096), "Found it 🔍");

        let long = "a".repeat(300);
        let formatted = format_response(&long, 200);
        assert!(formatted.starts_with(&"a".repeat(100)));
        assert!(formatted.contains("..."));
        assert!(!formatted.contains(&"a".repeat(101)));
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(looks_like_placeholder("Demo results, see example.com"));
        assert!(!looks_like_placeholder("🌤️ Weather in Paris: 21°C, example.com"));
        assert!(!looks_like_placeholder(
            "📊 **Google Sheets Data**\n| Name | Email |\n| Ann | ann@example.com |"
        ));
        assert!(!looks_like_placeholder("Sunny and warm"));
    }

    #[test]
    fn test_failure_words() {
        assert!(looks_like_failure("Sorry, nothing found"));
        assert!(looks_like_failure("An ERROR occurred"));
        assert!(!looks_like_failure("All good"));
    }

    #[test]
    fn test_extract_search_terms() {
        assert_eq!(extract_search_terms("What is the meaning of serendipity"), "serendipity");
        assert_eq!(extract_search_terms("tell me about it"), "tell me about it");
    }

    #[test]
    fn test_search_digest_truncates() {
        let results = format!("The answer is forty-two, obviously\n{}", "x".repeat(2000));
        let digest = search_digest("life", &results);
        assert!(digest.starts_with("🔍 **Search Results for: life**"));
        assert!(digest.contains("💡 **Quick Answer:**\nThe answer is forty-two, obviously"));
        assert!(digest.contains("results truncated"));
    }

    #[test]
    fn test_workflow_response_variants() {
        let mut result = WorkflowResult {
            success: true,
            steps_completed: 2,
            total_steps: 2,
            final_summary: "Done".to_string(),
            elapsed_secs: 1.25,
            ..Default::default()
        };
        assert_eq!(
            workflow_response(&result),
            "🚀 **Smart Workflow Completed!**\n\nDone\n\n⚡ Executed 2 automated steps in 1.2s"
        );

        result.success = false;
        result.steps_completed = 1;
        result.errors = vec!["Error in step x: boom".to_string()];
        let partial = workflow_response(&result);
        assert!(partial.starts_with("🔄 **Workflow Partially Completed**"));
        assert!(partial.contains("✅ 1/2 steps completed\n⚠️ Issues: 1 errors encountered"));
    }

    #[test]
    fn test_quota_response_echoes_query() {
        let text = quota_response("the meaning of life", ModelUnavailable::QuotaExceeded);
        assert!(text.starts_with("I understand you're asking about: the meaning of life"));
        assert!(text.contains("API quota has been reached"));
    }
}
