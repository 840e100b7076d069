//! Google Sheets adapter
//!
//! Reads go through the Sheets v4 values API when `GOOGLE_SHEETS_API_KEY` is
//! set, otherwise through the public CSV export. Writes are kept in an
//! in-process overlay that later reads merge in.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Local;
use lazy_static::lazy_static;
use mentor_core::{PerformanceMonitor, Settings};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{compile_all, contains_any, first_capture, http_client, truncate_chars};
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";
const VALUES_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const MAX_TABLE_ROWS: usize = 10;
const MAX_ADDED_ROWS: usize = 10;

const SHEETS_KEYWORDS: &[&str] = &[
    "sheet", "spreadsheet", "employee", "customer", "contact", "database", "record", "roster",
    "inventory",
];

const SEARCH_WORDS: &[&str] = &["search", "find", "look for", "filter", "who is", "lookup"];

lazy_static! {
    static ref ADD_PATTERNS: Vec<Regex> =
        compile_all(&[r"(?i)\b(?:add|append|insert|update|write|save)\b"]);
    static ref SEARCH_TERM_PATTERNS: Vec<Regex> = compile_all(&[
        r#"(?i)(?:search|find|look for|filter|lookup)\s+(?:for\s+)?["']?([^"']+?)["']?\s+(?:in|from|on)\s+(?:the\s+|my\s+)?(?:sheet|spreadsheet|database|list|records?)"#,
        r#"(?i)(?:search|find|look for|filter|lookup)\s+(?:for\s+)?["']?([\w@.\- ]+?)["']?\s*$"#,
    ]);
}

/// What the request asks the sheet to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOperation {
    Read,
    Search(String),
    Add,
}

impl SheetOperation {
    /// Explicit `operation` param wins, then the wording of the request
    pub fn detect(text: &str, options: &ToolOptions) -> Self {
        match options.param_str("operation") {
            Some("add_data") | Some("update") | Some("add") => return SheetOperation::Add,
            Some("read") => return SheetOperation::Read,
            Some("search") => {
                if let Some(term) = options.param_str("term") {
                    return SheetOperation::Search(term.to_string());
                }
            }
            _ => {}
        }

        let lower = text.to_lowercase();
        if ADD_PATTERNS.iter().any(|re| re.is_match(&lower)) {
            return SheetOperation::Add;
        }
        if contains_any(&lower, SEARCH_WORDS) {
            if let Some(term) = first_capture(&SEARCH_TERM_PATTERNS, text) {
                return SheetOperation::Search(term);
            }
        }
        SheetOperation::Read
    }
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => row.push(std::mem::take(&mut field)),
            ('\r', false) => {}
            ('\n', false) => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            (c, _) => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows.retain(|r| r.iter().any(|cell| !cell.trim().is_empty()));
    rows
}

fn cell(value: &str) -> String {
    value.trim().replace('|', "\\|").replace('\n', " ")
}

/// Markdown table of the header plus at most `limit` data rows
pub fn render_table(rows: &[Vec<String>], limit: usize) -> String {
    let Some((header, data)) = rows.split_first() else {
        return "_The sheet is empty._".to_string();
    };
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let padded = |row: &[String]| -> String {
        let cells: Vec<String> = (0..width)
            .map(|i| row.get(i).map(|v| cell(v)).unwrap_or_default())
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut out = vec![padded(header), format!("|{}", " --- |".repeat(width))];
    out.extend(data.iter().take(limit).map(|r| padded(r)));
    if data.len() > limit {
        out.push(format!("\n_... and {} more rows_", data.len() - limit));
    }
    out.join("\n")
}

fn demo_rows() -> Vec<Vec<String>> {
    [
        ["Name", "Email", "Department"],
        ["Alice Johnson", "alice@example.com", "Engineering"],
        ["Bob Smith", "bob@example.com", "Marketing"],
        ["Carol Davis", "carol@example.com", "Sales"],
    ]
    .iter()
    .map(|r| r.iter().map(|c| c.to_string()).collect())
    .collect()
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Google Sheets tool
pub struct SheetsTool {
    client: Client,
    sheet_id: Option<String>,
    api_key: Option<String>,
    export_base: String,
    values_base: String,
    overlay: RwLock<Vec<Vec<String>>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl SheetsTool {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1))),
            sheet_id: settings.google_sheets_id.clone(),
            api_key: settings.google_sheets_api_key.clone(),
            export_base: EXPORT_BASE.to_string(),
            values_base: VALUES_BASE.to_string(),
            overlay: RwLock::new(Vec::new()),
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_endpoints(mut self, export_base: impl Into<String>, values_base: impl Into<String>) -> Self {
        self.export_base = export_base.into();
        self.values_base = values_base.into();
        self
    }

    /// Rows added this process, oldest first
    pub async fn pending_rows(&self) -> Vec<Vec<String>> {
        self.overlay.read().await.clone()
    }

    async fn fetch_values(&self, sheet_id: &str, key: &str) -> Result<Vec<Vec<String>>> {
        let url = format!("{}/{}/values/A1:Z1000", self.values_base, sheet_id);
        let response = self
            .client
            .get(&url)
            .query(&[("key", key)])
            .send()
            .await
            .context("Failed to reach Sheets API")?;
        if !response.status().is_success() {
            bail!("Sheets API error {}", response.status());
        }
        let body: ValuesResponse = response.json().await.context("Invalid Sheets API response")?;
        Ok(body.values)
    }

    async fn fetch_csv(&self, sheet_id: &str) -> Result<Vec<Vec<String>>> {
        let url = format!("{}/{}/export?format=csv&gid=0", self.export_base, sheet_id);
        let response = self.client.get(&url).send().await.context("Failed to reach sheet export")?;
        if !response.status().is_success() {
            bail!("Sheet export error {}", response.status());
        }
        let body = response.text().await.context("Failed to read sheet export")?;
        if body.trim_start().starts_with('<') {
            bail!("sheet is not public (export returned HTML)");
        }
        Ok(parse_csv(&body))
    }

    async fn fetch_rows(&self, sheet_id: &str) -> Result<Vec<Vec<String>>> {
        let start = Instant::now();
        let result = match self.api_key.as_deref() {
            Some(key) => match self.fetch_values(sheet_id, key).await {
                Ok(rows) => Ok(rows),
                Err(e) => {
                    warn!("Sheets API read failed, trying CSV export: {:#}", e);
                    self.fetch_csv(sheet_id).await
                }
            },
            None => self.fetch_csv(sheet_id).await,
        };
        if let Some(monitor) = &self.monitor {
            monitor.record_api("google_sheets", start.elapsed(), result.is_ok()).await;
        }
        result
    }

    /// Sheet rows merged with the overlay; `None` for rows means demo data
    async fn current_rows(&self) -> Result<Option<Vec<Vec<String>>>> {
        let overlay = self.overlay.read().await.clone();
        match self.sheet_id.as_deref() {
            Some(id) => {
                let mut rows = self.fetch_rows(id).await?;
                rows.extend(overlay);
                Ok(Some(rows))
            }
            None => Ok(None),
        }
    }

    async fn read(&self) -> Result<ToolOutput> {
        match self.current_rows().await {
            Ok(Some(rows)) => {
                let total = rows.len().saturating_sub(1);
                Ok(ToolOutput::ok(format!(
                    "📊 **Google Sheets Data**\n\n{}\n\n📈 {} rows total",
                    render_table(&rows, MAX_TABLE_ROWS),
                    total
                )))
            }
            Ok(None) => {
                let mut rows = demo_rows();
                rows.extend(self.pending_rows().await);
                Ok(ToolOutput::placeholder(format!(
                    "📊 **Google Sheets Data**\n\n{}\n\n💡 Demo data - set GOOGLE_SHEETS_ID to read your own sheet.",
                    render_table(&rows, MAX_TABLE_ROWS)
                )))
            }
            Err(e) => Ok(ToolOutput::failed(format!(
                "❌ **Sheet Not Accessible**\n\n{}\n\n💡 Share the sheet as \"Anyone with the link can view\" \
                 or set GOOGLE_SHEETS_API_KEY.",
                e
            ))),
        }
    }

    async fn search(&self, term: &str) -> Result<ToolOutput> {
        let (rows, demo) = match self.current_rows().await {
            Ok(Some(rows)) => (rows, false),
            Ok(None) => {
                let mut rows = demo_rows();
                rows.extend(self.pending_rows().await);
                (rows, true)
            }
            Err(e) => return Ok(ToolOutput::failed(format!("❌ **Sheet Not Accessible**\n\n{}", e))),
        };

        let needle = term.to_lowercase();
        let mut matched: Vec<Vec<String>> = rows.iter().take(1).cloned().collect();
        matched.extend(
            rows.iter()
                .skip(1)
                .filter(|r| r.iter().any(|c| c.to_lowercase().contains(&needle)))
                .cloned(),
        );

        let content = if matched.len() <= 1 {
            format!("🔍 **Sheet search for \"{}\"**\n\nNo matching rows found.", term)
        } else {
            format!(
                "📊 **Google Sheets Data**\n\n🔍 **Sheet search for \"{}\"** ({} matches)\n\n{}",
                term,
                matched.len() - 1,
                render_table(&matched, MAX_TABLE_ROWS)
            )
        };
        Ok(if demo { ToolOutput::placeholder(content) } else { ToolOutput::ok(content) })
    }

    async fn add(&self, data: &str) -> Result<ToolOutput> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let new_rows: Vec<Vec<String>> = data
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(MAX_ADDED_ROWS)
            .map(|line| vec![stamp.clone(), truncate_chars(line, 200)])
            .collect();

        if new_rows.is_empty() {
            return Ok(ToolOutput::failed("❌ Nothing to add to the spreadsheet."));
        }

        let added = new_rows.len();
        let pending = {
            let mut overlay = self.overlay.write().await;
            overlay.extend(new_rows);
            overlay.len()
        };
        info!(added, pending, "Rows added to sheet overlay");

        Ok(ToolOutput::ok(format!(
            "✅ **Spreadsheet Updated**\n\nAdded {} row(s) to the session sheet ({} pending in total). \
             They will appear in later reads.",
            added, pending
        )))
    }
}

#[async_trait]
impl Tool for SheetsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Sheets
    }

    fn description(&self) -> &str {
        "Read, search, and add Google Sheets data"
    }

    fn can_handle(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), SHEETS_KEYWORDS)
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let operation = SheetOperation::detect(text, options);
        info!(operation = ?operation, "Sheets request");
        match operation {
            SheetOperation::Read => self.read().await,
            SheetOperation::Search(term) => self.search(&term).await,
            SheetOperation::Add => {
                let data = options.param_str("data").unwrap_or(text);
                self.add(data).await
            }
        }
    }

    fn is_available(&self) -> bool {
        self.sheet_id.is_some()
    }
}
