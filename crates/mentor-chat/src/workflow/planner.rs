//! Workflow planner
//!
//! Detection runs the template triggers in their fixed order and only asks the
//! language model when none match. The model's answer is advisory: anything
//! other than a known template name, including an error, means "no workflow".

use lazy_static::lazy_static;
use mentor_llm::ChatManager;
use mentor_tools::ToolKind;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::extractors::TemplateParams;
use super::{WorkflowPlan, WorkflowStep, WorkflowTemplate};

/// Most steps accepted from a model-proposed plan
pub const MAX_CUSTOM_STEPS: usize = 4;

const DECOMPOSITION_WORDS: &[&str] = &["step by step", "multi-step", "workflow", "automate", "chain"];

lazy_static! {
    static ref TRIGGERS: Vec<(WorkflowTemplate, Regex)> = WorkflowTemplate::ALL
        .iter()
        .flat_map(|t| t.triggers().iter().map(move |p| (*t, p)))
        .filter_map(|(t, p)| Regex::new(p).ok().map(|re| (t, re)))
        .collect();
    static ref STEP_LINE: Option<Regex> =
        Regex::new(r"(?i)^\s*STEP\s*\d+\s*:\s*\[?([A-Za-z_ ]+?)\]?\s+-\s+(.+?)\s*$").ok();
}

/// First template whose trigger matches the lowercased text
pub fn match_trigger(text: &str) -> Option<WorkflowTemplate> {
    let lower = text.to_lowercase();
    TRIGGERS
        .iter()
        .find(|(_, re)| re.is_match(&lower))
        .map(|(template, _)| *template)
}

/// Whether the text explicitly asks for a multi-step breakdown
pub fn wants_decomposition(text: &str) -> bool {
    let lower = text.to_lowercase();
    DECOMPOSITION_WORDS.iter().any(|w| lower.contains(w))
}

/// Steps for a template, with parameters extracted from the request
pub fn build_steps(template: WorkflowTemplate, text: &str) -> Vec<WorkflowStep> {
    let params = template.extract(text);
    match template {
        WorkflowTemplate::WeatherEmail => vec![
            WorkflowStep::new("weather_check", ToolKind::Weather, "get_weather")
                .param("location", params.location())
                .param("include_forecast", true)
                .output("weather_data"),
            email_step("compose_email", &params, format!("Weather Update for {}", params.location()))
                .param("context", "{weather_data}")
                .depends_on(&["weather_check"]),
        ],
        WorkflowTemplate::ResearchUpdate => vec![
            WorkflowStep::new("research", ToolKind::Search, "search")
                .param("query", params.topic(text))
                .param("max_results", 5)
                .output("research_data"),
            WorkflowStep::new("update_sheet", ToolKind::Sheets, "add_data")
                .param("operation", "add_data")
                .param("data", "{research_data}")
                .depends_on(&["research"]),
        ],
        WorkflowTemplate::DataAnalysisReport => vec![
            WorkflowStep::new("read_data", ToolKind::Sheets, "read")
                .param("operation", "read")
                .output("sheet_data"),
            email_step("email_report", &params, "Data Report".to_string())
                .param("context", "{sheet_data}")
                .depends_on(&["read_data"]),
        ],
        WorkflowTemplate::MeetingPrep => vec![
            WorkflowStep::new("meeting_weather", ToolKind::Weather, "get_weather")
                .param("location", params.location())
                .output("weather_data"),
            WorkflowStep::new("meeting_research", ToolKind::Search, "search")
                .param("query", params.topic(text))
                .output("research_data"),
            email_step("meeting_email", &params, "Meeting Preparation".to_string())
                .param("context", "{weather_data}\n\n{research_data}")
                .depends_on(&["meeting_weather", "meeting_research"]),
        ],
    }
}

fn email_step(id: &str, params: &TemplateParams, subject: String) -> WorkflowStep {
    let recipient = params.recipient();
    let step = WorkflowStep::new(id, ToolKind::Email, "send_email")
        .param("recipient", recipient)
        .param("subject", subject);
    if recipient.contains('@') {
        step.param("to", recipient)
    } else {
        step
    }
}

/// Parse "STEP n: tool - description" lines into a linear plan
///
/// Lines with an unknown tool are skipped. Returns an empty list when no line
/// parses.
pub fn parse_custom_steps(response: &str, request: &str) -> Vec<WorkflowStep> {
    let Some(re) = STEP_LINE.as_ref() else {
        return Vec::new();
    };

    let mut steps: Vec<WorkflowStep> = Vec::new();
    for line in response.lines() {
        let Some(caps) = re.captures(line) else { continue };
        let (Some(tool), Some(description)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let tool = match tool.as_str().trim().replace(' ', "").parse::<ToolKind>() {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Skipping proposed workflow step: {}", e);
                continue;
            }
        };

        let id = format!("step_{}", steps.len() + 1);
        let mut step = WorkflowStep::new(id, tool, description.as_str().trim()).param("query", request);
        if let Some(previous) = steps.last() {
            step.depends_on = vec![previous.id.clone()];
        }
        steps.push(step);

        if steps.len() == MAX_CUSTOM_STEPS {
            break;
        }
    }
    steps
}

fn fallback_plan(request: &str) -> WorkflowPlan {
    WorkflowPlan {
        template: None,
        request: request.to_string(),
        steps: vec![WorkflowStep::new("fallback", ToolKind::Search, "search").param("query", request)],
    }
}

/// Turns requests into workflow plans
pub struct WorkflowPlanner {
    llm: Option<Arc<ChatManager>>,
}

impl WorkflowPlanner {
    pub fn new(llm: Option<Arc<ChatManager>>) -> Self {
        Self { llm }
    }

    /// Which template, if any, the request calls for
    pub async fn detect(&self, text: &str) -> Option<WorkflowTemplate> {
        if let Some(template) = match_trigger(text) {
            debug!(workflow = %template, "Workflow trigger matched");
            return Some(template);
        }
        self.classify(text).await
    }

    /// Ask the model to name a template; any failure means none
    async fn classify(&self, text: &str) -> Option<WorkflowTemplate> {
        let llm = self.llm.as_ref()?;

        let templates = WorkflowTemplate::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {} - {}", i + 1, t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Analyze this user request and determine if it requires multiple sequential actions (a workflow):\n\n\
             Query: \"{}\"\n\n\
             Available workflow types:\n{}\n\n\
             If this requires multiple sequential actions, respond with the workflow type.\n\
             If it's a single action, respond with \"none\".\n\n\
             Response (just the workflow type or \"none\"):",
            text, templates
        );

        match llm.generate(&prompt).await {
            Ok(answer) => {
                let answer = answer.trim().trim_matches(|c: char| c == '"' || c == '`' || c == '.');
                let template = answer.parse::<WorkflowTemplate>().ok();
                debug!(answer = %answer, workflow = ?template, "Workflow classification");
                template
            }
            Err(e) => {
                debug!("Workflow classification unavailable: {:#}", e);
                None
            }
        }
    }

    /// Plan for a known template
    pub fn plan(&self, template: WorkflowTemplate, text: &str) -> WorkflowPlan {
        let steps = build_steps(template, text);
        info!(workflow = %template, steps = steps.len(), "Workflow planned");
        WorkflowPlan {
            template: Some(template),
            request: text.to_string(),
            steps,
        }
    }

    /// Ask the model to break the request into steps
    ///
    /// Falls back to a single search step when the model is unavailable or
    /// proposes nothing usable.
    pub async fn plan_custom(&self, text: &str) -> WorkflowPlan {
        let Some(llm) = self.llm.as_ref() else {
            return fallback_plan(text);
        };

        let tools = [
            ToolKind::Weather,
            ToolKind::Search,
            ToolKind::Email,
            ToolKind::Sheets,
            ToolKind::Dictionary,
        ]
        .iter()
        .map(|k| format!("- {}", k.name()))
        .collect::<Vec<_>>()
        .join("\n");
        let prompt = format!(
            "Analyze this user request and break it down into sequential workflow steps:\n\n\
             Request: \"{}\"\n\n\
             Available tools:\n{}\n\n\
             Respond in this exact format:\n\
             STEP 1: [tool_name] - [action_description]\n\
             STEP 2: [tool_name] - [action_description]\n\n\
             Only include steps that are clearly needed. Maximum {} steps.",
            text, tools, MAX_CUSTOM_STEPS
        );

        let steps = match llm.generate(&prompt).await {
            Ok(response) => parse_custom_steps(&response, text),
            Err(e) => {
                warn!("Custom workflow planning failed: {:#}", e);
                Vec::new()
            }
        };

        if steps.is_empty() {
            return fallback_plan(text);
        }
        info!(steps = steps.len(), "Custom workflow planned");
        WorkflowPlan {
            template: None,
            request: text.to_string(),
            steps,
        }
    }
}
