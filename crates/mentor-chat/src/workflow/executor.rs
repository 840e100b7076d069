//! Workflow executor
//!
//! Steps run one at a time, layer by layer: each pass schedules every
//! remaining step whose dependencies have all been scheduled, in list order.
//! A failing step is recorded and skipped; it never aborts the workflow.

use mentor_llm::ChatManager;
use mentor_tools::{ToolOptions, ToolRegistry};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{WorkflowPlan, WorkflowResult, WorkflowStep};

/// Run order as indices into `steps`, plus a warning if some steps could
/// not be ordered (dependency cycle or unknown dependency)
pub fn execution_order(steps: &[WorkflowStep]) -> (Vec<usize>, Option<String>) {
    let mut order = Vec::with_capacity(steps.len());
    let mut scheduled: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<usize> = (0..steps.len()).collect();

    while !remaining.is_empty() {
        let ready: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| steps[i].depends_on.iter().all(|dep| scheduled.contains(dep.as_str())))
            .collect();

        if ready.is_empty() {
            let stuck = remaining
                .iter()
                .map(|&i| steps[i].id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(steps = %stuck, "Circular or undefined dependency in workflow");
            order.extend(remaining.drain(..));
            return (
                order,
                Some(format!("Dependency cycle or undefined dependency among steps: {}", stuck)),
            );
        }

        for &i in &ready {
            scheduled.insert(steps[i].id.as_str());
        }
        remaining.retain(|i| !ready.contains(i));
        order.extend(ready);
    }

    (order, None)
}

/// Replace `{name}` in string parameters with collected outputs
pub fn substitute(params: &Map<String, Value>, variables: &HashMap<String, String>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => {
                    let mut text = text.clone();
                    for (name, output) in variables {
                        let placeholder = format!("{{{}}}", name);
                        if text.contains(&placeholder) {
                            text = text.replace(&placeholder, output);
                        }
                    }
                    Value::String(text)
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Natural-language request handed to the step's tool
pub fn build_query(action: &str, params: &Map<String, Value>) -> String {
    let get = |key: &str, default: &'static str| -> String {
        params
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    };

    match action {
        "get_weather" => format!("What's the weather in {}?", get("location", "current location")),
        "search" => format!("Search for {}", get("query", "")),
        "send_email" => format!(
            "Send email to {} about {}. Include this information: {}",
            get("recipient", "team"),
            get("subject", "Update"),
            get("context", "")
        ),
        "add_data" => "Add the research data to the spreadsheet".to_string(),
        "read" => "Show me the spreadsheet data".to_string(),
        other => format!("{} with parameters: {}", other, Value::Object(params.clone())),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Summary used when the model cannot narrate the run
pub fn template_summary(result: &WorkflowResult) -> String {
    let mut summary = if result.errors.is_empty() {
        format!(
            "🎉 **Workflow Completed Successfully!**\n\n✅ All {} steps completed\n🚀 Your automated tasks have been executed successfully!",
            result.total_steps
        )
    } else {
        format!(
            "🔄 **Workflow Completed with Issues**\n\n✅ {}/{} steps completed\n❌ {} errors encountered\n\nSome tasks may need manual attention.",
            result.steps_completed,
            result.total_steps,
            result.errors.len()
        )
    };

    for id in result.order.iter().filter(|id| result.results.contains_key(*id)) {
        if let Some(output) = result.results.get(id) {
            summary.push_str(&format!("\n\n**{}:**\n{}", id, preview(output, 300)));
        }
    }
    summary
}

/// Runs workflow plans against the tool registry
pub struct WorkflowExecutor {
    registry: Arc<ToolRegistry>,
    llm: Option<Arc<ChatManager>>,
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<ToolRegistry>, llm: Option<Arc<ChatManager>>) -> Self {
        Self { registry, llm }
    }

    /// Run every step once, in dependency order
    pub async fn execute(&self, plan: &WorkflowPlan, user_id: Option<&str>) -> WorkflowResult {
        let start = Instant::now();
        let steps = &plan.steps;
        info!(workflow = %plan.name(), steps = steps.len(), "Executing workflow");

        let (order, warning) = execution_order(steps);
        let mut result = WorkflowResult {
            total_steps: steps.len(),
            order: order.iter().map(|&i| steps[i].id.clone()).collect(),
            warnings: warning.into_iter().collect(),
            ..Default::default()
        };
        let mut variables: HashMap<String, String> = HashMap::new();

        for &index in &order {
            let step = &steps[index];

            let missing: Vec<String> = step
                .depends_on
                .iter()
                .filter(|dep| !result.results.contains_key(*dep))
                .cloned()
                .collect();
            if !missing.is_empty() {
                let error = format!("Missing dependencies for step {}: {:?}", step.id, missing);
                warn!(step_id = %step.id, "{}", error);
                result.errors.push(error);
                continue;
            }

            let params = substitute(&step.parameters, &variables);
            let query = build_query(&step.action, &params);
            let options = ToolOptions {
                user_id: user_id.map(str::to_string),
                params,
            };

            debug!(step_id = %step.id, tool = %step.tool, query = %query, "Running workflow step");
            match self.registry.execute(step.tool, &query, &options).await {
                Ok(output) => {
                    info!(step_id = %step.id, status = ?output.status, "Workflow step completed");
                    if let Some(variable) = &step.output_variable {
                        variables.insert(variable.clone(), output.content.clone());
                    }
                    variables.insert(step.id.clone(), output.content.clone());
                    result.results.insert(step.id.clone(), output.content);
                    result.steps_completed += 1;
                }
                Err(e) => {
                    let error = format!("Error in step {}: {}", step.id, e);
                    warn!(step_id = %step.id, "{}", error);
                    result.errors.push(error);
                }
            }
        }

        result.success = result.errors.is_empty();
        result.final_summary = self.summarize(steps, &result).await;
        result.elapsed_secs = start.elapsed().as_secs_f64();

        info!(
            workflow = %plan.name(),
            success = result.success,
            completed = result.steps_completed,
            total = result.total_steps,
            "Workflow finished"
        );
        result
    }

    async fn summarize(&self, steps: &[WorkflowStep], result: &WorkflowResult) -> String {
        let Some(llm) = &self.llm else {
            return template_summary(result);
        };

        let steps_info = steps
            .iter()
            .map(|s| format!("- {}: {} using {}", s.id, s.action, s.tool))
            .collect::<Vec<_>>()
            .join("\n");
        let results_info = result
            .results
            .iter()
            .map(|(id, output)| format!("- {}: {}", id, preview(output, 100)))
            .collect::<Vec<_>>()
            .join("\n");
        let errors_info = if result.errors.is_empty() {
            "No errors".to_string()
        } else {
            result
                .errors
                .iter()
                .map(|e| format!("- {}", e))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = format!(
            "Create a concise summary of this workflow execution:\n\n\
             Steps executed:\n{}\n\nResults:\n{}\n\nErrors:\n{}\n\n\
             Provide a user-friendly summary of what was accomplished:",
            steps_info, results_info, errors_info
        );

        match llm.generate(&prompt).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => template_summary(result),
            Err(e) => {
                debug!("Workflow summary unavailable: {:#}", e);
                template_summary(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::planner::build_steps;
    use crate::workflow::WorkflowTemplate;
    use mentor_llm::ScriptedProvider;
    use mentor_tools::{FnTool, ToolKind, ToolOutput};
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(ToolKind, String, ToolOptions)>>>;

    async fn recording_registry(calls: &Calls) -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        for kind in [ToolKind::Weather, ToolKind::Search, ToolKind::Sheets, ToolKind::Email] {
            let calls = calls.clone();
            let tool = FnTool::new(kind, "recording", move |text, options| {
                if let Ok(mut calls) = calls.lock() {
                    calls.push((kind, text.to_string(), options.clone()));
                }
                if text.contains("explode") {
                    anyhow::bail!("upstream exploded");
                }
                Ok(ToolOutput::ok(format!("{} output", kind)))
            });
            registry.register(Arc::new(tool)).await;
        }
        registry
    }

    fn plan(steps: Vec<WorkflowStep>) -> WorkflowPlan {
        WorkflowPlan {
            template: None,
            request: "test".to_string(),
            steps,
        }
    }

    fn position(order: &[usize], steps: &[WorkflowStep], id: &str) -> usize {
        order.iter().position(|&i| steps[i].id == id).unwrap()
    }

    #[test]
    fn test_order_respects_dependencies() {
        let steps = vec![
            WorkflowStep::new("c", ToolKind::Email, "x").depends_on(&["a", "b"]),
            WorkflowStep::new("b", ToolKind::Search, "x").depends_on(&["a"]),
            WorkflowStep::new("d", ToolKind::Search, "x"),
            WorkflowStep::new("a", ToolKind::Weather, "x"),
        ];
        let (order, warning) = execution_order(&steps);
        assert!(warning.is_none());

        let ids: Vec<&str> = order.iter().map(|&i| steps[i].id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
        for step in &steps {
            for dep in &step.depends_on {
                assert!(position(&order, &steps, dep) < position(&order, &steps, &step.id));
            }
        }
    }

    #[test]
    fn test_order_tolerates_cycles() {
        let steps = vec![
            WorkflowStep::new("a", ToolKind::Search, "x").depends_on(&["b"]),
            WorkflowStep::new("b", ToolKind::Search, "x").depends_on(&["a"]),
            WorkflowStep::new("c", ToolKind::Search, "x"),
            WorkflowStep::new("d", ToolKind::Search, "x").depends_on(&["ghost"]),
        ];
        let (order, warning) = execution_order(&steps);
        assert_eq!(order, vec![2, 0, 1, 3]);
        assert!(warning.unwrap().contains("a, b, d"));
    }

    #[test]
    fn test_substitute_only_touches_strings() {
        let mut params = Map::new();
        params.insert("context".into(), Value::from("Weather: {weather_data}"));
        params.insert("max_results".into(), Value::from(5));
        params.insert("other".into(), Value::from("{unknown}"));
        let variables: HashMap<String, String> = [("weather_data".to_string(), "sunny".to_string())].into();

        let out = substitute(&params, &variables);
        assert_eq!(out["context"], "Weather: sunny");
        assert_eq!(out["max_results"], 5);
        assert_eq!(out["other"], "{unknown}");
    }

    #[test]
    fn test_build_query() {
        let mut params = Map::new();
        params.insert("location".into(), Value::from("Paris"));
        assert_eq!(build_query("get_weather", &params), "What's the weather in Paris?");
        assert_eq!(build_query("read", &Map::new()), "Show me the spreadsheet data");
        assert_eq!(build_query("add_data", &Map::new()), "Add the research data to the spreadsheet");

        let mut email = Map::new();
        email.insert("recipient".into(), Value::from("a@example.com"));
        email.insert("subject".into(), Value::from("Report"));
        email.insert("context".into(), Value::from("numbers"));
        assert_eq!(
            build_query("send_email", &email),
            "Send email to a@example.com about Report. Include this information: numbers"
        );
        assert!(build_query("translate", &params).starts_with("translate with parameters: {"));
    }

    #[tokio::test]
    async fn test_research_update_runs_in_order_with_substitution() {
        let calls: Calls = Arc::default();
        let executor = WorkflowExecutor::new(recording_registry(&calls).await, None);
        let steps = build_steps(
            WorkflowTemplate::ResearchUpdate,
            "search for X then update the spreadsheet with findings",
        );

        let result = executor.execute(&plan(steps), Some("u1")).await;
        assert!(result.success);
        assert_eq!(result.steps_completed, 2);
        assert_eq!(result.order, vec!["research".to_string(), "update_sheet".to_string()]);

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, ToolKind::Search);
        assert_eq!(calls[0].1, "Search for X");
        assert_eq!(calls[1].0, ToolKind::Sheets);
        assert_eq!(calls[1].2.param_str("data"), Some("WebSearch output"));
        assert_eq!(calls[1].2.user_id.as_deref(), Some("u1"));
        assert!(result.final_summary.contains("All 2 steps completed"));
    }

    #[tokio::test]
    async fn test_failed_step_skips_dependents() {
        let calls: Calls = Arc::default();
        let executor = WorkflowExecutor::new(recording_registry(&calls).await, None);
        let steps = vec![
            WorkflowStep::new("research", ToolKind::Search, "search").param("query", "explode"),
            WorkflowStep::new("update_sheet", ToolKind::Sheets, "add_data").depends_on(&["research"]),
            WorkflowStep::new("weather", ToolKind::Weather, "get_weather"),
        ];

        let result = executor.execute(&plan(steps), None).await;
        assert!(!result.success);
        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("Error in step research:"));
        assert!(result.errors.iter().any(|e| e.starts_with("Missing dependencies for step update_sheet")));
        assert!(result.final_summary.contains("1/3 steps completed"));
    }

    #[tokio::test]
    async fn test_cycle_terminates_with_warning() {
        let calls: Calls = Arc::default();
        let executor = WorkflowExecutor::new(recording_registry(&calls).await, None);
        let steps = vec![
            WorkflowStep::new("a", ToolKind::Search, "search").depends_on(&["b"]),
            WorkflowStep::new("b", ToolKind::Search, "search").depends_on(&["a"]),
        ];

        let result = executor.execute(&plan(steps), None).await;
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.steps_completed, 0);
        assert_eq!(result.errors.len(), 2);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_tool_is_an_error() {
        let executor = WorkflowExecutor::new(Arc::new(ToolRegistry::new()), None);
        let steps = vec![WorkflowStep::new("lyrics", ToolKind::Lyrics, "search")];
        let result = executor.execute(&plan(steps), None).await;
        assert!(!result.success);
        assert!(result.errors[0].starts_with("Error in step lyrics:"));
    }

    #[tokio::test]
    async fn test_model_summary_and_fallback() {
        let calls: Calls = Arc::default();
        let registry = recording_registry(&calls).await;
        let steps = build_steps(WorkflowTemplate::WeatherEmail, "weather in Paris then email a@example.com");

        let llm = ChatManager::from_provider(Arc::new(ScriptedProvider::fixed("Weather sent to a@example.com.")));
        let executor = WorkflowExecutor::new(registry.clone(), Some(Arc::new(llm)));
        let result = executor.execute(&plan(steps.clone()), None).await;
        assert_eq!(result.final_summary, "Weather sent to a@example.com.");

        let calls_seen = calls.lock().unwrap().clone();
        let email_call = calls_seen.iter().find(|c| c.0 == ToolKind::Email).unwrap();
        assert_eq!(email_call.2.param_str("context"), Some("Weather output"));
        assert_eq!(email_call.2.param_str("to"), Some("a@example.com"));

        let failing = ChatManager::from_provider(Arc::new(ScriptedProvider::failing("boom")));
        let executor = WorkflowExecutor::new(registry, Some(Arc::new(failing)));
        let result = executor.execute(&plan(steps), None).await;
        assert!(result.final_summary.starts_with("🎉 **Workflow Completed Successfully!**"));
    }
}
