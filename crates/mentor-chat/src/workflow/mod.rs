//! Multi-step workflows
//!
//! A request that implies more than one tool call ("check the weather, then
//! email the team") becomes a [`WorkflowPlan`]: an ordered list of
//! [`WorkflowStep`]s with declared dependencies. The [`WorkflowPlanner`]
//! builds plans from fixed templates or from a model-proposed step list, and
//! the [`WorkflowExecutor`] runs them in dependency order.

pub mod executor;
pub mod extractors;
pub mod planner;

pub use executor::WorkflowExecutor;
pub use extractors::TemplateParams;
pub use planner::WorkflowPlanner;

use mentor_tools::ToolKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The built-in workflow templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTemplate {
    WeatherEmail,
    ResearchUpdate,
    DataAnalysisReport,
    MeetingPrep,
}

impl WorkflowTemplate {
    /// Trigger evaluation order; the first match wins
    pub const ALL: [WorkflowTemplate; 4] = [
        WorkflowTemplate::WeatherEmail,
        WorkflowTemplate::ResearchUpdate,
        WorkflowTemplate::DataAnalysisReport,
        WorkflowTemplate::MeetingPrep,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WorkflowTemplate::WeatherEmail => "weather_email",
            WorkflowTemplate::ResearchUpdate => "research_update",
            WorkflowTemplate::DataAnalysisReport => "data_analysis_report",
            WorkflowTemplate::MeetingPrep => "meeting_prep",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WorkflowTemplate::WeatherEmail => "Check weather and send email notification",
            WorkflowTemplate::ResearchUpdate => "Research a topic and update the spreadsheet",
            WorkflowTemplate::DataAnalysisReport => "Analyze spreadsheet data and email a report",
            WorkflowTemplate::MeetingPrep => "Prepare for a meeting with weather, research and an email",
        }
    }

    /// Lowercase regex triggers
    pub fn triggers(self) -> &'static [&'static str] {
        match self {
            WorkflowTemplate::WeatherEmail => &[r"weather.*email", r"check weather.*send", r"weather.*notify"],
            WorkflowTemplate::ResearchUpdate => &[r"search.*update", r"research.*spreadsheet", r"find.*add to sheet"],
            WorkflowTemplate::DataAnalysisReport => &[r"analyze.*email", r"sheet.*summary.*email", r"data.*report"],
            WorkflowTemplate::MeetingPrep => &[r"meeting.*weather.*email", r"prepare.*meeting", r"meeting prep"],
        }
    }
}

impl fmt::Display for WorkflowTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkflowTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        WorkflowTemplate::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| format!("Unknown workflow: {}", s.trim()))
    }
}

/// One tool invocation inside a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub tool: ToolKind,
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Variable name later steps can reference as `{name}`
    #[serde(default)]
    pub output_variable: Option<String>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, tool: ToolKind, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool,
            action: action.into(),
            parameters: Map::new(),
            depends_on: Vec::new(),
            output_variable: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.depends_on = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn output(mut self, variable: impl Into<String>) -> Self {
        self.output_variable = Some(variable.into());
        self
    }

    pub(crate) fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Steps planned for one request
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowPlan {
    /// `None` for model-proposed plans
    pub template: Option<WorkflowTemplate>,
    pub request: String,
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowPlan {
    pub fn name(&self) -> &str {
        self.template.map(WorkflowTemplate::name).unwrap_or("custom")
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Outcome of running a plan
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowResult {
    /// No executor-level errors occurred
    pub success: bool,
    /// Steps that produced a result, including tool-reported failures
    pub steps_completed: usize,
    pub total_steps: usize,
    /// step id → output text
    pub results: BTreeMap<String, String>,
    /// Step ids in the order they were scheduled
    pub order: Vec<String>,
    pub final_summary: String,
    pub elapsed_secs: f64,
    pub errors: Vec<String>,
    /// Scheduling anomalies (cycles, undefined dependencies)
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_names_round_trip() {
        for template in WorkflowTemplate::ALL {
            assert_eq!(template.name().parse::<WorkflowTemplate>().unwrap(), template);
        }
        assert!("none".parse::<WorkflowTemplate>().is_err());
    }

    #[test]
    fn test_step_builder() {
        let step = WorkflowStep::new("update_sheet", ToolKind::Sheets, "add_data")
            .param("data", "{research_data}")
            .depends_on(&["research"]);
        assert_eq!(step.param_str("data"), Some("{research_data}"));
        assert_eq!(step.depends_on, vec!["research".to_string()]);
        assert!(step.output_variable.is_none());
    }
}
