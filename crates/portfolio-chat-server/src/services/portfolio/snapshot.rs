use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PortfolioConfig;

/// Structured view of the remote portfolio page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSnapshot {
    pub name: String,
    pub role: String,
    /// At most `max_skills` entries
    pub skills: Vec<String>,
    /// At most `max_projects` entries
    pub projects: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    /// `ETag` of the page this snapshot was built from
    pub validator: Option<String>,
}

/// Candidate strings pulled out of the raw page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub skills: Vec<String>,
    pub projects: Vec<String>,
}

impl PortfolioSnapshot {
    /// Fixed snapshot used when no page has ever been fetched successfully.
    pub fn fallback(cfg: &PortfolioConfig, now: DateTime<Utc>) -> Self {
        Self {
            name: cfg.name.clone(),
            role: cfg.role.clone(),
            skills: cfg.fallback_skills.clone(),
            projects: cfg.fallback_projects.clone(),
            fetched_at: now,
            validator: None,
        }
    }

    /// Builds a snapshot from extracted fields, capping both lists and
    /// falling back to the configured defaults for an empty list.
    pub fn from_extracted(
        cfg: &PortfolioConfig,
        fields: ExtractedFields,
        validator: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let skills = capped_or(fields.skills, cfg.max_skills, &cfg.fallback_skills);
        let projects = capped_or(fields.projects, cfg.max_projects, &cfg.fallback_projects);

        Self {
            name: cfg.name.clone(),
            role: cfg.role.clone(),
            skills,
            projects,
            fetched_at: now,
            validator,
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age > ttl,
            // fetched_at in the future (clock moved back)
            Err(_) => false,
        }
    }
}

fn capped_or(mut items: Vec<String>, cap: usize, fallback: &[String]) -> Vec<String> {
    items.truncate(cap);
    if items.is_empty() {
        fallback.to_vec()
    } else {
        items
    }
}
