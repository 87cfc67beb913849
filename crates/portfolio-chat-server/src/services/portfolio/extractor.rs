use scraper::{Html, Selector};
use tracing::debug;

use super::snapshot::ExtractedFields;
use crate::config::PortfolioConfig;
use crate::utils::error::FetchError;

const TEXT_ELEMENTS: &str = "span, h3, h2, p";
const MAX_SKILL_CHARS: usize = 50;
const MAX_PROJECT_CHARS: usize = 100;

/// Pulls candidate skill/project strings out of raw page content.
/// Pure function of its input.
pub trait MarkupExtractor: Send + Sync {
    fn extract(&self, raw: &str) -> Result<ExtractedFields, FetchError>;
}

/// Keyword-driven extractor over the page's text elements.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    skill_keywords: Vec<String>,
    project_keywords: Vec<String>,
}

impl HtmlExtractor {
    pub fn new(skill_keywords: Vec<String>, project_keywords: Vec<String>) -> Self {
        Self {
            skill_keywords: lowercase_all(skill_keywords),
            project_keywords: lowercase_all(project_keywords),
        }
    }

    pub fn from_config(cfg: &PortfolioConfig) -> Self {
        Self::new(cfg.skill_keywords.clone(), cfg.project_keywords.clone())
    }
}

impl MarkupExtractor for HtmlExtractor {
    fn extract(&self, raw: &str) -> Result<ExtractedFields, FetchError> {
        if raw.trim().is_empty() {
            return Err(FetchError::Malformed("empty document".to_string()));
        }

        let selector = Selector::parse(TEXT_ELEMENTS)
            .map_err(|e| FetchError::Malformed(format!("selector: {}", e)))?;
        let document = Html::parse_document(raw);

        let mut fields = ExtractedFields::default();

        for element in document.select(&selector) {
            let text: String = element.text().map(str::trim).collect();
            if text.is_empty() {
                continue;
            }

            let lower = text.to_lowercase();
            let chars = text.chars().count();

            if chars < MAX_SKILL_CHARS && contains_any(&lower, &self.skill_keywords) {
                fields.skills.push(text);
            } else if chars < MAX_PROJECT_CHARS && contains_any(&lower, &self.project_keywords) {
                fields.projects.push(text);
            }
        }

        debug!(
            "Extracted {} skill and {} project candidates",
            fields.skills.len(),
            fields.projects.len()
        );
        Ok(fields)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn lowercase_all(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}
