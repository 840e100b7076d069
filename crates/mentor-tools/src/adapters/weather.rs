//! Weather adapter (OpenWeatherMap current conditions)
//!
//! Without an API key, or when the API fails, the request is answered from
//! web search instead and the search status is passed through.

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
use tracing::{info, warn};

use super::search::SearchTool;
use super::{compile_all, http_client, title_case};
use crate::cache::TtlCache;
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";
const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_ENTRIES: usize = 64;
const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Words dropped when pulling a location out of free text
const NON_LOCATION_WORDS: &[&str] = &[
    "weather", "temperature", "forecast", "climate", "humidity", "wind", "rain", "snow", "sunny",
    "cloudy", "storm", "hot", "cold", "of", "in", "at", "the", "what", "whats", "what's", "how",
    "like", "today", "tomorrow", "now", "current", "currently", "right", "tell", "show", "give",
    "please", "check", "get",
];

lazy_static! {
    static ref WEATHER_WORDS: Vec<Regex> = compile_all(&[
        r"(?i)\b(weather|temperature|forecast|climate|humidity|wind|rain|snow|sunny|cloudy|storm|hot|cold)",
    ]);
}

/// Parsed current conditions
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub country: Option<String>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub humidity: u32,
    pub pressure_hpa: u32,
    pub wind_kmh: f64,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    #[serde(default)]
    sys: Option<OwmSys>,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: u32,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

impl From<OwmResponse> for WeatherReport {
    fn from(raw: OwmResponse) -> Self {
        Self {
            location: raw.name,
            country: raw.sys.and_then(|s| s.country),
            temperature_c: raw.main.temp,
            feels_like_c: raw.main.feels_like,
            condition: raw
                .weather
                .first()
                .map(|w| title_case(&w.description))
                .unwrap_or_else(|| "Unknown".to_string()),
            humidity: raw.main.humidity,
            pressure_hpa: raw.main.pressure,
            // m/s → km/h
            wind_kmh: raw.wind.map(|w| w.speed * 3.6).unwrap_or(0.0),
        }
    }
}

/// Pull a location out of free text; "Unknown Location" when nothing is left
pub fn extract_location(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'' || *c == ',')
                .collect::<String>()
        })
        .map(|w| w.trim_matches(',').to_string())
        .filter(|w| w.chars().count() > 2 && !NON_LOCATION_WORDS.contains(&w.as_str()))
        .collect();

    if words.is_empty() {
        UNKNOWN_LOCATION.to_string()
    } else {
        title_case(&words.join(" ").replace('\'', ""))
    }
}

fn condition_emoji(condition: &str) -> &'static str {
    let lower = condition.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["sunny", "clear", "fair"]) {
        "☀️"
    } else if has(&["cloud", "overcast"]) {
        "☁️"
    } else if has(&["rain", "drizzle", "shower"]) {
        "🌧️"
    } else if has(&["storm", "thunder", "lightning"]) {
        "⛈️"
    } else if has(&["snow", "blizzard", "sleet"]) {
        "❄️"
    } else if has(&["fog", "mist", "haze"]) {
        "🌫️"
    } else {
        "🌤️"
    }
}

fn temperature_advice(celsius: f64) -> &'static str {
    if celsius > 30.0 {
        "🔥 **Hot Weather Alert:** Stay hydrated and avoid prolonged sun exposure"
    } else if celsius > 25.0 {
        "☀️ **Warm Weather:** Perfect for outdoor activities"
    } else if celsius > 15.0 {
        "🌤️ **Mild Weather:** Comfortable conditions for most activities"
    } else if celsius > 5.0 {
        "❄️ **Cool Weather:** Consider wearing a jacket"
    } else {
        "🥶 **Cold Weather:** Bundle up and stay warm"
    }
}

/// Markdown weather report
pub fn format_report(report: &WeatherReport) -> String {
    let emoji = condition_emoji(&report.condition);
    let place = match &report.country {
        Some(country) => format!("{}, {}", report.location, country),
        None => report.location.clone(),
    };

    let mut out = format!("{} **Weather Report: {}** {}\n\n", emoji, place, emoji);
    out.push_str("📊 **Current Conditions:**\n");
    out.push_str(&format!("🌡️ **Temperature:** {:.1}°C\n", report.temperature_c));
    out.push_str(&format!("☁️ **Weather:** {}\n", report.condition));
    out.push_str(&format!("💧 **Humidity:** {}%\n", report.humidity));
    out.push_str(&format!("💨 **Wind:** {:.1} km/h\n", report.wind_kmh));
    out.push_str(&format!("🌡️ **Feels Like:** {:.1}°C\n", report.feels_like_c));
    out.push_str(&format!("📊 **Pressure:** {} hPa\n", report.pressure_hpa));

    out.push_str("\n💼 **Weather Insights:**\n");
    out.push_str(temperature_advice(report.temperature_c));
    out.push('\n');
    let condition = report.condition.to_lowercase();
    if ["rain", "drizzle", "shower"].iter().any(|w| condition.contains(w)) {
        out.push_str("☔ **Rain Alert:** Carry an umbrella\n");
    } else if ["storm", "thunder"].iter().any(|w| condition.contains(w)) {
        out.push_str("⛈️ **Storm Alert:** Stay indoors if you can\n");
    }
    if report.humidity > 80 {
        out.push_str("💦 **High Humidity:** It may feel warmer than it is\n");
    }

    out.push_str(&format!("\n🕐 **Last Updated:** {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
    out
}

/// Weather tool
pub struct WeatherTool {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    cache: TtlCache<ToolOutput>,
    search: Arc<SearchTool>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl WeatherTool {
    pub fn new(settings: &Settings, search: Arc<SearchTool>) -> Self {
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1))),
            api_key: settings.openweather_api_key.clone(),
            api_url: OPENWEATHER_URL.to_string(),
            cache: TtlCache::new(CACHE_ENTRIES, CACHE_TTL),
            search,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.cache = TtlCache::new(CACHE_ENTRIES, CACHE_TTL).with_monitor(monitor.clone());
        self.monitor = Some(monitor);
        self
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn fetch(&self, key: &str, location: &str) -> Result<WeatherReport> {
        let start = Instant::now();
        let result: Result<WeatherReport> = async {
            let response = self
                .client
                .get(&self.api_url)
                .query(&[("q", location), ("appid", key), ("units", "metric")])
                .send()
                .await
                .context("Failed to reach OpenWeatherMap")?;
            if !response.status().is_success() {
                bail!("OpenWeatherMap API error {}", response.status());
            }
            let raw: OwmResponse = response.json().await.context("Invalid OpenWeatherMap response")?;
            Ok(raw.into())
        }
        .await;

        if let Some(monitor) = &self.monitor {
            monitor.record_api("openweathermap", start.elapsed(), result.is_ok()).await;
        }
        result
    }

    async fn via_search(&self, location: &str) -> ToolOutput {
        info!(location = %location, "Answering weather from web search");
        let found = self
            .search
            .search(&format!("current weather {} temperature climate", location))
            .await;

        ToolOutput {
            content: format!(
                "🌤️ **Weather Information: {}**\n\n{}\n\n💡 **Note:** This information is gathered from web search \
                 as real-time weather data is not available for {}.",
                location, found.content, location
            ),
            status: found.status,
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Weather
    }

    fn description(&self) -> &str {
        "Get current weather information for any location"
    }

    fn can_handle(&self, text: &str) -> bool {
        WEATHER_WORDS.iter().any(|re| re.is_match(text))
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let location = match options.param_str("location") {
            Some(location) => title_case(location),
            None => extract_location(text),
        };
        info!(location = %location, "Getting weather");

        if let Some(cached) = self.cache.get(&location).await {
            return Ok(cached);
        }

        let Some(key) = self.api_key.as_deref() else {
            return Ok(self.via_search(&location).await);
        };

        match self.fetch(key, &location).await {
            Ok(report) => {
                let output = ToolOutput::ok(format_report(&report));
                self.cache.insert(&location, output.clone()).await;
                Ok(output)
            }
            Err(e) => {
                warn!(location = %location, "Weather API failed: {:#}", e);
                Ok(self.via_search(&location).await)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::OutputStatus;

    #[test]
    fn test_extract_location() {
        assert_eq!(extract_location("weather in Paris"), "Paris");
        assert_eq!(extract_location("What's the weather in New York?"), "New York");
        assert_eq!(extract_location("temperature at san francisco, today"), "San Francisco");
        assert_eq!(extract_location("weather"), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_can_handle() {
        let tool = WeatherTool::new(&Settings::default(), Arc::new(SearchTool::new(&Settings::default())));
        assert!(tool.can_handle("Weather in Paris"));
        assert!(tool.can_handle("is it cold outside"));
        assert!(!tool.can_handle("analyze this photo"));
        assert!(!tool.can_handle("define serendipity"));
    }

    #[test]
    fn test_report_from_openweather_json() {
        let raw: OwmResponse = serde_json::from_str(
            r#"{
                "name": "Paris",
                "sys": {"country": "FR"},
                "main": {"temp": 18.26, "feels_like": 17.9, "humidity": 85, "pressure": 1012},
                "weather": [{"description": "light rain"}],
                "wind": {"speed": 5.0}
            }"#,
        )
        .unwrap();
        let report = WeatherReport::from(raw);
        assert_eq!(report.condition, "Light Rain");
        assert_eq!(report.wind_kmh, 18.0);

        let text = format_report(&report);
        assert!(text.contains("Paris, FR"));
        assert!(text.contains("18.3°C"));
        assert!(text.contains("Rain Alert"));
        assert!(text.contains("High Humidity"));
        assert!(text.starts_with("🌧️"));
    }

    #[tokio::test]
    async fn test_without_key_uses_search_status() {
        let settings = Settings::default();
        let search = Arc::new(
            SearchTool::new(&settings).with_endpoints("http://127.0.0.1:9/t", "http://127.0.0.1:9/d"),
        );
        let tool = WeatherTool::new(&settings, search);

        let out = tool
            .execute("weather", &ToolOptions::new().with_param("location", "oslo"))
            .await
            .unwrap();
        assert_eq!(out.status, OutputStatus::Placeholder);
        assert!(out.content.contains("Weather Information: Oslo"));
    }
}
