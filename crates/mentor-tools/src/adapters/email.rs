//! Email adapter
//!
//! Transport chain: Gmail SMTP via lettre when an app password is configured,
//! then the Resend HTTP API when a key is set. Each configured transport is
//! tried in order until one delivers. With none configured the tool returns a
//! demo preview reported as `Placeholder` because nothing was sent.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use mentor_core::{PerformanceMonitor, Settings};
use mentor_llm::ChatManager;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{compile_all, contains_any, first_capture, http_client, truncate_chars};
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";
const GMAIL_SMTP_PORT: u16 = 587;
const RESEND_URL: &str = "https://api.resend.com/emails";
const DEFAULT_SUBJECT: &str = "Message from Mentor Assistant";
const MAX_CONTEXT_CHARS: usize = 2000;

const EMAIL_KEYWORDS: &[&str] = &[
    "email", "mail", "gmail", "inbox", "compose", "send message", "leave request", "mail id",
    "email id",
];

/// Words after "email"/"to" that are not a recipient name
const NOT_A_NAME: &[&str] = &[
    "to", "me", "the", "a", "an", "my", "our", "about", "regarding", "with", "for", "that", "this",
    "it", "them", "him", "her", "someone", "everyone", "saying", "message", "email", "mail",
];

lazy_static! {
    static ref OPERATION_PATTERNS: Vec<Regex> = compile_all(&[
        r"send.*email",
        r"send.*mail",
        r"email.*to",
        r"mail.*to",
        r"compose.*email",
        r"send.*message",
    ]);
    static ref ADDRESS_PATTERNS: Vec<Regex> = compile_all(&[
        r"(?i)\bto\s+([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})",
        r"(?i)\b(?:e-?mail|mail)\s+([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})",
        r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})",
    ]);
    static ref NAME_PATTERNS: Vec<Regex> = compile_all(&[
        r"(?i)\bsend\s+(?:an?\s+)?(?:e-?mail|mail|message)\s+to\s+([a-z][a-z'-]+)",
        r"(?i)\b(?:e-?mail|mail|notify)\s+(?:to\s+)?([a-z][a-z'-]+)",
    ]);
    static ref SUBJECT_PATTERNS: Vec<Regex> = compile_all(&[
        r#"(?i)subject[:\s]+["']([^"']+)["']"#,
        r#"(?i)\babout\s+([^"'.!?\n]+?)(?:\s+saying\b|\s+message\b|[.!?\n]|$)"#,
        r#"(?i)\bregarding\s+([^"'.!?\n]+?)(?:\s+saying\b|[.!?\n]|$)"#,
    ]);
    static ref GENERATED_SUBJECT: Vec<Regex> = compile_all(&[r"(?i)\*{0,2}SUBJECT:\*{0,2}\s*(.+)"]);
    static ref GENERATED_BODY: Vec<Regex> = compile_all(&[r"(?is)\*{0,2}BODY:\*{0,2}\s*(.+)"]);
}

/// What could be parsed out of a free-text email request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailRequest {
    pub to: Option<String>,
    pub recipient_name: Option<String>,
    pub subject: Option<String>,
}

/// Pull recipient address, recipient name, and subject from a request
pub fn parse_email_request(text: &str) -> EmailRequest {
    let to = first_capture(&ADDRESS_PATTERNS, text).map(|a| a.trim_end_matches('.').to_string());

    let recipient_name = if to.is_some() {
        None
    } else {
        NAME_PATTERNS.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_lowercase())
                .find(|name| !NOT_A_NAME.contains(&name.as_str()))
                .map(|name| super::title_case(&name))
        })
    };

    let subject = first_capture(&SUBJECT_PATTERNS, text).map(|s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => s,
        }
    });

    EmailRequest {
        to,
        recipient_name,
        subject,
    }
}

/// Split a "SUBJECT: ... BODY: ..." reply into its parts
fn parse_generated(reply: &str) -> (Option<String>, Option<String>) {
    let subject = first_capture(&GENERATED_SUBJECT, reply)
        .map(|s| s.lines().next().unwrap_or_default().trim().to_string())
        .filter(|s| !s.is_empty());
    let body = first_capture(&GENERATED_BODY, reply).filter(|b| !b.is_empty());
    (subject, body)
}

fn template_body(recipient: &str, subject: &str, context: Option<&str>) -> String {
    let middle = match context {
        Some(context) => format!("Here is the information you asked for:\n\n{}", context),
        None => format!("I wanted to reach out regarding {}.", subject.to_lowercase()),
    };
    format!("Hello {},\n\n{}\n\nBest regards,\nMentor Assistant", recipient, middle)
}

#[derive(Debug, Clone)]
enum Transport {
    Smtp { address: String, password: String },
    Resend { api_key: String, from: String },
}

impl Transport {
    /// Every configured transport, in delivery order
    fn configured(settings: &Settings) -> Vec<Self> {
        let mut transports = Vec::new();
        if let (Some(address), Some(password)) = (&settings.gmail_address, &settings.gmail_app_password) {
            transports.push(Transport::Smtp {
                address: address.clone(),
                password: password.clone(),
            });
        }
        if let Some(api_key) = &settings.resend_api_key {
            transports.push(Transport::Resend {
                api_key: api_key.clone(),
                from: settings
                    .email_from
                    .clone()
                    .unwrap_or_else(|| "Mentor Assistant <onboarding@resend.dev>".to_string()),
            });
        }
        transports
    }

    fn label(&self) -> &'static str {
        match self {
            Transport::Smtp { .. } => "Gmail SMTP",
            Transport::Resend { .. } => "Resend",
        }
    }

    fn api(&self) -> &'static str {
        match self {
            Transport::Smtp { .. } => "smtp",
            Transport::Resend { .. } => "resend",
        }
    }
}

/// Email tool
pub struct EmailTool {
    client: Client,
    transports: Vec<Transport>,
    smtp_host: String,
    smtp_port: u16,
    resend_url: String,
    llm: Option<Arc<ChatManager>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl EmailTool {
    pub fn new(settings: &Settings, llm: Option<Arc<ChatManager>>) -> Self {
        let transports = Transport::configured(settings);
        info!(transports = %Self::chain_label(&transports), "Email tool configured");
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1) * 2)),
            transports,
            smtp_host: GMAIL_SMTP_HOST.to_string(),
            smtp_port: GMAIL_SMTP_PORT,
            resend_url: RESEND_URL.to_string(),
            llm,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_resend_endpoint(mut self, url: impl Into<String>) -> Self {
        self.resend_url = url.into();
        self
    }

    pub fn with_smtp_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self
    }

    fn chain_label(transports: &[Transport]) -> String {
        if transports.is_empty() {
            return "demo".to_string();
        }
        transports.iter().map(Transport::label).collect::<Vec<_>>().join(" -> ")
    }

    /// Subject and body, drafted by the language model when one is available
    async fn compose(
        &self,
        request_text: &str,
        recipient: &str,
        subject: Option<String>,
        context: Option<&str>,
    ) -> (String, String) {
        if let Some(llm) = &self.llm {
            let mut prompt = format!(
                "Write a short, professional email for this request: \"{}\"\n\nRecipient: {}\n",
                request_text, recipient
            );
            if let Some(subject) = &subject {
                prompt.push_str(&format!("Subject: {}\n", subject));
            }
            if let Some(context) = context {
                prompt.push_str(&format!("Include this information:\n{}\n", context));
            }
            prompt.push_str("\nReply in exactly this format:\nSUBJECT: <subject>\nBODY:\n<body>");

            match llm.generate(&prompt).await {
                Ok(reply) => {
                    let (drafted_subject, body) = parse_generated(&reply);
                    let subject = subject.clone().or(drafted_subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
                    let body = body.unwrap_or_else(|| reply.trim().to_string());
                    if !body.is_empty() {
                        return (subject, body);
                    }
                }
                Err(e) => warn!("Email drafting failed, using template: {:#}", e),
            }
        }

        let subject = subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let body = template_body(recipient, &subject, context);
        (subject, body)
    }

    async fn send_smtp(&self, address: &str, password: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(address.parse::<Mailbox>().context("Invalid sender address")?)
            .to(to.parse::<Mailbox>().context("Invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let creds = Credentials::new(address.to_string(), password.to_string());

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)?
                .port(self.smtp_port)
                .credentials(creds)
                .build();

        mailer.send(email).await.context("Failed to send email")?;
        Ok(())
    }

    async fn send_resend(&self, api_key: &str, from: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.resend_url)
            .bearer_auth(api_key)
            .json(&json!({
                "from": from,
                "to": [to],
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .context("Failed to reach Resend")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            bail!("Resend error {}: {}", status, truncate_chars(&detail, 200));
        }
        Ok(())
    }

    async fn send_via(&self, transport: &Transport, to: &str, subject: &str, body: &str) -> Result<()> {
        match transport {
            Transport::Smtp { address, password } => self.send_smtp(address, password, to, subject, body).await,
            Transport::Resend { api_key, from } => self.send_resend(api_key, from, to, subject, body).await,
        }
    }

    /// Try each configured transport in order
    ///
    /// Returns the label of the transport that delivered, or `None` in demo
    /// mode. Fails only when every configured transport failed.
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<Option<&'static str>> {
        let mut failures = Vec::new();

        for transport in &self.transports {
            let start = Instant::now();
            let result = self.send_via(transport, to, subject, body).await;
            if let Some(monitor) = &self.monitor {
                monitor.record_api(transport.api(), start.elapsed(), result.is_ok()).await;
            }

            match result {
                Ok(()) => return Ok(Some(transport.label())),
                Err(e) => {
                    warn!(transport = transport.label(), "Email transport failed: {:#}", e);
                    failures.push(format!("{}: {:#}", transport.label(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(None)
        } else {
            bail!("All email transports failed ({})", failures.join("; "))
        }
    }
}

#[async_trait]
impl Tool for EmailTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Email
    }

    fn description(&self) -> &str {
        "Compose and send emails"
    }

    fn can_handle(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        contains_any(&lower, EMAIL_KEYWORDS) || OPERATION_PATTERNS.iter().any(|re| re.is_match(&lower))
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let parsed = parse_email_request(text);
        let to = options
            .param_str("to")
            .filter(|to| to.contains('@'))
            .map(str::to_string)
            .or(parsed.to);

        let Some(to) = to else {
            let who = options
                .param_str("recipient")
                .map(str::to_string)
                .or(parsed.recipient_name)
                .unwrap_or_else(|| "the recipient".to_string());
            return Ok(ToolOutput::failed(format!(
                "❌ **Missing Email Address**\n\nI couldn't find an email address for {}. \
                 Please include it, e.g. \"send email to name@example.com about the meeting\".",
                who
            )));
        };

        let recipient = options
            .param_str("recipient")
            .filter(|r| !r.contains('@'))
            .map(str::to_string)
            .or(parsed.recipient_name)
            .unwrap_or_else(|| to.split('@').next().unwrap_or("there").to_string());
        let subject = options.param_str("subject").map(str::to_string).or(parsed.subject);
        let context = options.param_str("context").map(|c| truncate_chars(c, MAX_CONTEXT_CHARS));

        let (subject, body) = self.compose(text, &recipient, subject, context.as_deref()).await;
        info!(to = %to, subject = %subject, transports = %Self::chain_label(&self.transports), "Sending email");

        if let Some(via) = self.deliver(&to, &subject, &body).await? {
            Ok(ToolOutput::ok(format!(
                "✅ **Email Sent Successfully!**\n\n📧 **To:** {}\n📝 **Subject:** {}\n🚀 **Via:** {}\n\n**Preview:**\n{}",
                to,
                subject,
                via,
                truncate_chars(&body, 200)
            )))
        } else {
            warn!(to = %to, "No email transport configured, email not sent");
            Ok(ToolOutput::placeholder(format!(
                "⚠️ **DEMO MODE - Email NOT Actually Sent**\n\n📧 **Email Prepared:**\n• **To:** {}\n• **Subject:** {}\n\
                 • **Body:** {}\n\n❌ **Email was NOT sent** because no email service is configured.\n\n\
                 🔧 Set GMAIL_ADDRESS and GMAIL_APP_PASSWORD, or RESEND_API_KEY, to send real emails.",
                to,
                subject,
                truncate_chars(&body, 200)
            )))
        }
    }

    fn is_available(&self) -> bool {
        !self.transports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stub_endpoint;
    use crate::tool::OutputStatus;
    use mentor_llm::ScriptedProvider;

    #[test]
    fn test_parse_email_request() {
        let parsed = parse_email_request("send email to a@example.com about the meeting");
        assert_eq!(parsed.to.as_deref(), Some("a@example.com"));
        assert_eq!(parsed.subject.as_deref(), Some("The meeting"));
        assert_eq!(parsed.recipient_name, None);

        let parsed = parse_email_request("email John regarding the budget review");
        assert_eq!(parsed.to, None);
        assert_eq!(parsed.recipient_name.as_deref(), Some("John"));
        assert_eq!(parsed.subject.as_deref(), Some("The budget review"));

        let parsed = parse_email_request("please mail bob.smith@corp.io");
        assert_eq!(parsed.to.as_deref(), Some("bob.smith@corp.io"));
    }

    #[test]
    fn test_parse_generated() {
        let (subject, body) = parse_generated("SUBJECT: Quarterly numbers\nBODY:\nHi team,\nAll good.");
        assert_eq!(subject.as_deref(), Some("Quarterly numbers"));
        assert_eq!(body.as_deref(), Some("Hi team,\nAll good."));
    }

    #[test]
    fn test_can_handle() {
        let tool = EmailTool::new(&Settings::default(), None);
        assert!(tool.can_handle("send an email to my boss"));
        assert!(tool.can_handle("check my inbox"));
        assert!(!tool.can_handle("weather in Paris"));
    }

    #[tokio::test]
    async fn test_missing_address_is_failed() {
        let tool = EmailTool::new(&Settings::default(), None);
        let out = tool.execute("email the team about lunch", &ToolOptions::new()).await.unwrap();
        assert_eq!(out.status, OutputStatus::Failed);
        assert!(out.content.starts_with("❌ **Missing Email Address**"));
    }

    #[tokio::test]
    async fn test_demo_mode_is_placeholder_with_drafted_body() {
        let llm = Arc::new(ChatManager::from_provider(Arc::new(ScriptedProvider::fixed(
            "SUBJECT: Ignored\nBODY:\nSee you at ten.",
        ))));
        let tool = EmailTool::new(&Settings::default(), Some(llm));
        let out = tool
            .execute("send email to a@example.com about the meeting", &ToolOptions::new())
            .await
            .unwrap();
        assert_eq!(out.status, OutputStatus::Placeholder);
        assert!(out.content.contains("DEMO MODE - Email NOT Actually Sent"));
        assert!(out.content.contains("a@example.com"));
        assert!(out.content.contains("The meeting"));
        assert!(out.content.contains("See you at ten."));
    }

    #[tokio::test]
    async fn test_drafting_failure_keeps_requested_subject() {
        let llm = Arc::new(ChatManager::from_provider(Arc::new(ScriptedProvider::failing("model offline"))));
        let tool = EmailTool::new(&Settings::default(), Some(llm));
        let out = tool
            .execute("send email to a@example.com about the budget review", &ToolOptions::new())
            .await
            .unwrap();
        assert!(out.content.contains("**Subject:** The budget review"));
        assert!(out.content.contains("I wanted to reach out regarding the budget review."));
    }

    #[tokio::test]
    async fn test_params_override_parsing() {
        let tool = EmailTool::new(&Settings::default(), None);
        let options = ToolOptions::new()
            .with_param("to", "ops@example.com")
            .with_param("subject", "Weather Update for Paris")
            .with_param("context", "18°C and sunny");
        let out = tool.execute("Send email to team about it", &options).await.unwrap();
        assert!(out.content.contains("ops@example.com"));
        assert!(out.content.contains("Weather Update for Paris"));
        assert!(out.content.contains("18°C and sunny"));
    }

    fn smtp_and_resend_settings() -> Settings {
        Settings {
            gmail_address: Some("me@gmail.com".to_string()),
            gmail_app_password: Some("app-password".to_string()),
            resend_api_key: Some("re_test".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_transport_chain_order() {
        let transports = Transport::configured(&smtp_and_resend_settings());
        let labels: Vec<_> = transports.iter().map(Transport::label).collect();
        assert_eq!(labels, vec!["Gmail SMTP", "Resend"]);
        assert!(Transport::configured(&Settings::default()).is_empty());
    }

    #[tokio::test]
    async fn test_smtp_failure_falls_back_to_resend() {
        let monitor = Arc::new(PerformanceMonitor::new());
        let tool = EmailTool::new(&smtp_and_resend_settings(), None)
            .with_smtp_relay("127.0.0.1", 9)
            .with_resend_endpoint(format!("{}/emails", stub_endpoint("200 OK", r#"{"id":"email_1"}"#).await))
            .with_monitor(monitor.clone());

        let out = tool
            .execute("send email to a@example.com about the meeting", &ToolOptions::new())
            .await
            .unwrap();

        assert_eq!(out.status, OutputStatus::Ok);
        assert!(out.content.contains("Email Sent Successfully"));
        assert!(out.content.contains("**Via:** Resend"));

        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.apis["smtp"].failures, 1);
        assert_eq!(snapshot.apis["resend"].successes, 1);
    }

    #[tokio::test]
    async fn test_every_transport_failing_is_error() {
        let tool = EmailTool::new(&smtp_and_resend_settings(), None)
            .with_smtp_relay("127.0.0.1", 9)
            .with_resend_endpoint(format!("{}/emails", stub_endpoint("500 Internal Server Error", "{}").await));

        let err = tool
            .execute("send email to a@example.com", &ToolOptions::new())
            .await
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Gmail SMTP"));
        assert!(message.contains("Resend error 500"));
    }

    #[tokio::test]
    async fn test_resend_failure_is_error() {
        let settings = Settings {
            resend_api_key: Some("re_test".to_string()),
            ..Settings::default()
        };
        let tool = EmailTool::new(&settings, None).with_resend_endpoint("http://127.0.0.1:9/emails");
        assert!(tool.is_available());
        let result = tool.execute("send email to a@example.com", &ToolOptions::new()).await;
        assert!(result.is_err());
    }
}
