//! Built-in adapter set
//!
//! Construction lives here so the web server, the CLI and tests build the
//! same seven tools the same way.

use mentor_core::{PerformanceMonitor, Settings};
use mentor_llm::ChatManager;
use std::sync::Arc;
use tracing::info;

use crate::adapters::{
    DictionaryTool, EmailTool, LyricsTool, SearchTool, SheetsTool, VisionTool, WeatherTool,
};
use crate::registry::ToolRegistry;
use crate::tool::BoxedTool;

/// All built-in tools in registration order
///
/// The search tool is shared with the weather tool, which uses it as its
/// fallback source.
pub fn builtin_tools(
    settings: &Settings,
    llm: Option<Arc<ChatManager>>,
    monitor: Option<Arc<PerformanceMonitor>>,
) -> Vec<BoxedTool> {
    let mut search = SearchTool::new(settings);
    let mut dictionary = DictionaryTool::new(settings);
    let mut sheets = SheetsTool::new(settings);
    let mut email = EmailTool::new(settings, llm.clone());
    let mut lyrics = LyricsTool::new(settings);
    let mut vision = VisionTool::new(settings, llm);

    if let Some(monitor) = &monitor {
        search = search.with_monitor(monitor.clone());
        dictionary = dictionary.with_monitor(monitor.clone());
        sheets = sheets.with_monitor(monitor.clone());
        email = email.with_monitor(monitor.clone());
        lyrics = lyrics.with_monitor(monitor.clone());
        vision = vision.with_monitor(monitor.clone());
    }

    let search = Arc::new(search);
    let mut weather = WeatherTool::new(settings, search.clone());
    if let Some(monitor) = &monitor {
        weather = weather.with_monitor(monitor.clone());
    }

    vec![
        Arc::new(weather) as BoxedTool,
        Arc::new(sheets) as BoxedTool,
        Arc::new(email) as BoxedTool,
        Arc::new(lyrics) as BoxedTool,
        Arc::new(dictionary) as BoxedTool,
        Arc::new(vision) as BoxedTool,
        search as BoxedTool,
    ]
}

/// Register the built-in tools with a registry
pub async fn register_builtin_tools(
    registry: &ToolRegistry,
    settings: &Settings,
    llm: Option<Arc<ChatManager>>,
    monitor: Option<Arc<PerformanceMonitor>>,
) {
    let tools = builtin_tools(settings, llm, monitor);
    let count = tools.len();
    for tool in tools {
        registry.register(tool).await;
    }
    info!(count, "Registered built-in tools");
}
