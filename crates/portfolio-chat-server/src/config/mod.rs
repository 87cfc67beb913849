pub mod settings;

pub use settings::{
    CacheConfig, LlmConfig, PortfolioConfig, PromptsConfig, ServerConfig, SessionConfig,
    Settings, StreamConfig,
};
