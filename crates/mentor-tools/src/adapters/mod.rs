//! External-service adapters
//!
//! One module per [`ToolKind`](crate::ToolKind). Each adapter hides its
//! upstream API and its own fallback chain behind the [`Tool`](crate::Tool)
//! trait and reports synthetic output as `OutputStatus::Placeholder`.

pub mod dictionary;
pub mod email;
pub mod lyrics;
pub mod search;
pub mod sheets;
pub mod vision;
pub mod weather;

pub use dictionary::DictionaryTool;
pub use email::EmailTool;
pub use lyrics::LyricsTool;
pub use search::SearchTool;
pub use sheets::SheetsTool;
pub use vision::VisionTool;
pub use weather::WeatherTool;

use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// HTTP client with the adapter request timeout applied
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mentor-assistant/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Compile a pattern table, skipping (and logging) any invalid entry
pub(crate) fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid pattern {}: {}", p, e);
                None
            }
        })
        .collect()
}

/// First capture group of the first pattern that matches
pub(crate) fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Whether the lowercased text contains any of the phrases
pub(crate) fn contains_any(lower: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| lower.contains(p))
}

/// "new york" → "New York"
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Cut to `max` characters, marking the cut with "..."
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Local HTTP endpoint answering every request with a fixed JSON reply
///
/// Returns the base URL (`http://127.0.0.1:<port>`).
#[cfg(test)]
pub(crate) async fn stub_endpoint(status: &'static str, body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            // Drain headers and body before answering
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_capture_skips_bad_patterns() {
        let patterns = compile_all(&[r"(unclosed", r"define\s+(\w+)", r"(\w+) meaning"]);
        assert_eq!(patterns.len(), 2);
        assert_eq!(first_capture(&patterns, "define ephemeral").as_deref(), Some("ephemeral"));
        assert_eq!(first_capture(&patterns, "nothing here"), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new YORK  city"), "New York City");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo world", 5), "héllo...");
    }
}
