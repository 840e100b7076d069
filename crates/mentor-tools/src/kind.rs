//! Tool kinds and their fixed selection priority

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of capabilities the assistant can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "Weather")]
    Weather,
    #[serde(rename = "WebSearch")]
    Search,
    #[serde(rename = "Dictionary")]
    Dictionary,
    #[serde(rename = "GoogleSheets")]
    Sheets,
    #[serde(rename = "Gmail")]
    Email,
    #[serde(rename = "Lyrics")]
    Lyrics,
    #[serde(rename = "AdvancedAI")]
    Vision,
}

impl ToolKind {
    /// Most specific first. Search is last because it is also the fallback.
    pub const PRIORITY: [ToolKind; 7] = [
        ToolKind::Sheets,
        ToolKind::Email,
        ToolKind::Dictionary,
        ToolKind::Lyrics,
        ToolKind::Vision,
        ToolKind::Weather,
        ToolKind::Search,
    ];

    /// Order the built-in adapters are registered in
    pub const REGISTRATION_ORDER: [ToolKind; 7] = [
        ToolKind::Weather,
        ToolKind::Sheets,
        ToolKind::Email,
        ToolKind::Lyrics,
        ToolKind::Dictionary,
        ToolKind::Vision,
        ToolKind::Search,
    ];

    /// Used when nothing matches
    pub const FALLBACK: ToolKind = ToolKind::Search;

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Weather => "Weather",
            ToolKind::Search => "WebSearch",
            ToolKind::Dictionary => "Dictionary",
            ToolKind::Sheets => "GoogleSheets",
            ToolKind::Email => "Gmail",
            ToolKind::Lyrics => "Lyrics",
            ToolKind::Vision => "AdvancedAI",
        }
    }

    /// Position in the priority order (lower wins)
    pub fn priority(self) -> usize {
        match self {
            ToolKind::Sheets => 0,
            ToolKind::Email => 1,
            ToolKind::Dictionary => 2,
            ToolKind::Lyrics => 3,
            ToolKind::Vision => 4,
            ToolKind::Weather => 5,
            ToolKind::Search => 6,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    /// Accepts display names plus the short aliases workflow plans use
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weather" => Ok(ToolKind::Weather),
            "websearch" | "web_search" | "search" => Ok(ToolKind::Search),
            "dictionary" | "define" => Ok(ToolKind::Dictionary),
            "googlesheets" | "google_sheets" | "sheets" | "spreadsheet" => Ok(ToolKind::Sheets),
            "gmail" | "email" | "mail" => Ok(ToolKind::Email),
            "lyrics" => Ok(ToolKind::Lyrics),
            "advancedai" | "advanced_ai" | "vision" | "ai" => Ok(ToolKind::Vision),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_table_matches_priority_fn() {
        for (index, kind) in ToolKind::PRIORITY.iter().enumerate() {
            assert_eq!(kind.priority(), index);
        }
        assert_eq!(ToolKind::PRIORITY.last(), Some(&ToolKind::FALLBACK));
    }

    #[test]
    fn test_names_parse_back() {
        for kind in ToolKind::REGISTRATION_ORDER {
            assert_eq!(kind.name().parse::<ToolKind>().unwrap(), kind);
        }
        assert_eq!("email".parse::<ToolKind>().unwrap(), ToolKind::Email);
        assert!("teleport".parse::<ToolKind>().is_err());
    }

    #[test]
    fn test_serializes_as_display_name() {
        assert_eq!(serde_json::to_string(&ToolKind::Search).unwrap(), "\"WebSearch\"");
    }
}
