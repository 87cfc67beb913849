use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub portfolio: PortfolioConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub stream: StreamConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// OpenAI-compatible chat completions endpoint (Gemini by default).
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PortfolioConfig {
    pub url: String,
    pub name: String,
    pub role: String,
    pub ttl_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub skill_keywords: Vec<String>,
    pub project_keywords: Vec<String>,
    pub max_skills: usize,
    pub max_projects: usize,
    pub fallback_skills: Vec<String>,
    pub fallback_projects: Vec<String>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            url: "https://aarif-work.github.io/html/index.html".to_string(),
            name: "Mohamed Aarif A".to_string(),
            role: "Flutter Developer & Programmer".to_string(),
            ttl_seconds: 15 * 60,
            fetch_timeout_seconds: 6,
            skill_keywords: to_strings(&[
                "flutter", "dart", "python", "c++", "javascript", "mysql", "iot", "firebase",
            ]),
            project_keywords: to_strings(&["project", "app"]),
            max_skills: 8,
            max_projects: 5,
            fallback_skills: to_strings(&["Flutter", "Dart", "Python", "C++"]),
            fallback_projects: to_strings(&["Portfolio site"]),
        }
    }
}

impl PortfolioConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Response cache limits.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_entries: 200,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound on stored turns; crossing it truncates the history.
    pub max_turns: usize,
    /// Turns kept after truncation.
    pub retained_turns: usize,
    /// Recent turns rendered verbatim into the prompt.
    pub window_turns: usize,
    /// Recent turns excluded from the topic summary.
    pub summary_recent_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            retained_turns: 10,
            window_turns: 4,
            summary_recent_turns: 4,
        }
    }
}

/// Pacing used when a cached reply is replayed as a stream.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub replay_chunk_chars: usize,
    pub replay_delay_ms: u64,
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            replay_chunk_chars: 1,
            replay_delay_ms: 10,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PromptsConfig {
    /// Supports `{{NAME}}` and `{{CONTEXT}}` placeholders.
    pub portfolio_system_prompt: String,
    pub general_system_prompt: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            portfolio_system_prompt: "You are {{NAME}}'s portfolio assistant. Answer about him using:\n{{CONTEXT}}\n\nBe concise and helpful.".to_string(),
            general_system_prompt: "You are a helpful AI assistant. Answer any question clearly and concisely.".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("portfolio.skill_keywords")
                    .with_list_parse_key("portfolio.project_keywords")
                    .with_list_parse_key("portfolio.fallback_skills")
                    .with_list_parse_key("portfolio.fallback_projects"),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        if settings.llm.api_key.is_empty() {
            if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
                settings.llm.api_key = key;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.session.retained_turns > self.session.max_turns {
            anyhow::bail!(
                "session.retained_turns ({}) must not exceed session.max_turns ({})",
                self.session.retained_turns,
                self.session.max_turns
            );
        }
        if self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be at least 1");
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
