//! Parameter extraction for workflow templates
//!
//! Each template pulls only the parameters its steps need. Anything the text
//! does not mention gets a fixed placeholder so plans are always complete.

use lazy_static::lazy_static;
use regex::Regex;

use super::WorkflowTemplate;

pub const DEFAULT_LOCATION: &str = "current location";
pub const DEFAULT_RECIPIENT: &str = "team";

const NOT_A_LOCATION: &[&str] = &[
    "the", "our", "my", "his", "her", "their", "your", "this", "that", "me", "us", "you",
];

lazy_static! {
    static ref LOCATION_PATTERNS: Vec<Regex> = [
        r"\b(?i:in)\s+([A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)",
        r"\b(?i:for)\s+([A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)",
        r"\b(?i:at)\s+([A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();

    static ref EMAIL_ADDRESS: Option<Regex> = Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").ok();

    static ref RECIPIENT_PATTERNS: Vec<Regex> = [
        r"(?i)\bemail\s+(?:the\s+)?([A-Za-z][A-Za-z\s]*?)(?:\s+(?:about|regarding|with)\b|[,.!?]|$)",
        r"(?i)\bsend\b.*?\bto\s+(?:the\s+)?([A-Za-z][A-Za-z\s]*?)(?:\s+(?:about|regarding|with)\b|[,.!?]|$)",
        r"(?i)\bnotify\s+(?:the\s+)?([A-Za-z][A-Za-z\s]*?)(?:\s+(?:about|regarding|with)\b|[,.!?]|$)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();

    static ref TOPIC_PATTERNS: Vec<Regex> = [
        r"(?i)\bsearch\s+(?:for\s+)?(.+?)(?:\s+then\b|\s+and\b|$)",
        r"(?i)\bresearch\s+(.+?)(?:\s+then\b|\s+and\b|$)",
        r"(?i)\bfind\s+(.+?)(?:\s+then\b|\s+and\b|$)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
}

/// Parameters a template needs from the request text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateParams {
    pub location: Option<String>,
    pub recipient: Option<String>,
    pub topic: Option<String>,
}

impl TemplateParams {
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }

    pub fn recipient(&self) -> &str {
        self.recipient.as_deref().unwrap_or(DEFAULT_RECIPIENT)
    }

    /// Falls back to the full request
    pub fn topic<'a>(&'a self, request: &'a str) -> &'a str {
        self.topic.as_deref().unwrap_or(request)
    }
}

impl WorkflowTemplate {
    /// Run this template's extractors over the request
    pub fn extract(self, text: &str) -> TemplateParams {
        match self {
            WorkflowTemplate::WeatherEmail => TemplateParams {
                location: extract_location(text),
                recipient: extract_recipient(text),
                topic: None,
            },
            WorkflowTemplate::ResearchUpdate => TemplateParams {
                topic: extract_topic(text),
                ..Default::default()
            },
            WorkflowTemplate::DataAnalysisReport => TemplateParams {
                recipient: extract_recipient(text),
                ..Default::default()
            },
            WorkflowTemplate::MeetingPrep => TemplateParams {
                location: extract_location(text),
                recipient: extract_recipient(text),
                topic: extract_topic(text),
            },
        }
    }
}

/// Place name after in/for/at
pub fn extract_location(text: &str) -> Option<String> {
    for re in LOCATION_PATTERNS.iter() {
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let candidate = m.as_str().trim();
            if candidate.len() > 2 && !NOT_A_LOCATION.contains(&candidate.to_lowercase().as_str()) {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// An email address if present, otherwise a name after email/send...to/notify
pub fn extract_recipient(text: &str) -> Option<String> {
    if let Some(address) = EMAIL_ADDRESS.as_ref().and_then(|re| re.find(text)) {
        return Some(address.as_str().to_string());
    }
    RECIPIENT_PATTERNS
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .find(|name| !name.is_empty())
}

/// What to research
pub fn extract_topic(text: &str) -> Option<String> {
    TOPIC_PATTERNS
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .find(|topic| !topic.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location("check weather in Paris and email the team").as_deref(),
            Some("Paris")
        );
        assert_eq!(extract_location("weather in New York then notify Bob").as_deref(), Some("New York"));
        assert_eq!(extract_location("email the forecast for our office"), None);
        assert_eq!(extract_location("weather please"), None);
    }

    #[test]
    fn test_extract_recipient() {
        assert_eq!(
            extract_recipient("weather in Rome then email bob@example.com").as_deref(),
            Some("bob@example.com")
        );
        assert_eq!(
            extract_recipient("check the weather and email the marketing team about it").as_deref(),
            Some("marketing team")
        );
        assert_eq!(extract_recipient("check the weather"), None);
    }

    #[test]
    fn test_extract_topic() {
        assert_eq!(
            extract_topic("search for rust async runtimes then update the spreadsheet").as_deref(),
            Some("rust async runtimes")
        );
        assert_eq!(
            extract_topic("Research solar prices and add to sheet").as_deref(),
            Some("solar prices")
        );
        assert_eq!(extract_topic("update the sheet"), None);
    }

    #[test]
    fn test_placeholders() {
        let params = WorkflowTemplate::WeatherEmail.extract("weather then notify");
        assert_eq!(params.location(), DEFAULT_LOCATION);
        assert_eq!(params.recipient(), DEFAULT_RECIPIENT);
        assert_eq!(params.topic("whole request"), "whole request");
    }
}
