use crate::config::PromptsConfig;
use crate::models::chat::ChatMode;
use crate::services::conversation::Turn;
use crate::services::portfolio::PortfolioSnapshot;

const MAX_RELEVANT_SKILLS: usize = 3;
const MAX_PROMPT_PROJECTS: usize = 3;
const PROJECT_TRIGGERS: &[&str] = &["project", "work", "built", "created"];
const GENERATION_CUE: &str = "AI:";

/// Pieces of the final prompt, in output order.
#[derive(Debug, Clone)]
pub struct PromptComponents {
    pub preamble: String,
    pub summary: String,
    pub history: String,
    pub message: String,
}

impl PromptComponents {
    pub fn build(&self) -> String {
        format!(
            "{}\n\n{}\n{}\n\nUser: {}\n{}",
            self.preamble, self.summary, self.history, self.message, GENERATION_CUE
        )
    }
}

/// Composes the single text prompt sent to the generation backend.
pub struct ContextAssembler {
    portfolio_prompt: String,
    general_prompt: String,
}

impl ContextAssembler {
    pub fn new(prompts: &PromptsConfig) -> Self {
        Self {
            portfolio_prompt: prompts.portfolio_system_prompt.clone(),
            general_prompt: prompts.general_system_prompt.clone(),
        }
    }

    pub fn build_prompt(
        &self,
        summary: &str,
        window: &[Turn],
        snapshot: &PortfolioSnapshot,
        mode: ChatMode,
        message: &str,
    ) -> String {
        PromptComponents {
            preamble: self.preamble(snapshot, mode, message),
            summary: summary.to_string(),
            history: render_history(window),
            message: message.to_string(),
        }
        .build()
    }

    fn preamble(&self, snapshot: &PortfolioSnapshot, mode: ChatMode, message: &str) -> String {
        match mode {
            ChatMode::Portfolio => self
                .portfolio_prompt
                .replace("{{NAME}}", &snapshot.name)
                .replace("{{CONTEXT}}", &relevant_context(message, snapshot)),
            ChatMode::General => self.general_prompt.clone(),
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(&PromptsConfig::default())
    }
}

/// Portfolio facts that matter for this message.
pub fn relevant_context(message: &str, snapshot: &PortfolioSnapshot) -> String {
    let msg_lower = message.to_lowercase();
    let mut parts = vec![
        format!("Name: {}", snapshot.name),
        format!("Role: {}", snapshot.role),
    ];

    let skills: Vec<&str> = snapshot
        .skills
        .iter()
        .filter(|s| msg_lower.contains(&s.to_lowercase()))
        .take(MAX_RELEVANT_SKILLS)
        .map(String::as_str)
        .collect();
    if !skills.is_empty() {
        parts.push(format!("Skills: {}", skills.join(", ")));
    }

    if PROJECT_TRIGGERS.iter().any(|w| msg_lower.contains(w)) {
        let projects: Vec<&str> = snapshot
            .projects
            .iter()
            .take(MAX_PROMPT_PROJECTS)
            .map(String::as_str)
            .collect();
        parts.push(format!("Projects: {}", projects.join(", ")));
    }

    parts.join("\n")
}

fn render_history(window: &[Turn]) -> String {
    window
        .iter()
        .map(|t| format!("User: {}\nAI: {}", t.user_text, t.ai_text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot {
            name: "Mohamed Aarif A".into(),
            role: "Flutter Developer & Programmer".into(),
            skills: vec!["Flutter".into(), "Dart".into(), "Python".into(), "C++".into(), "Firebase".into()],
            projects: vec!["Chat App".into(), "Weather App".into(), "IoT project".into(), "Portfolio site".into()],
            fetched_at: Utc::now(),
            validator: None,
        }
    }

    #[test]
    fn test_relevant_skills_are_filtered_and_capped() {
        let ctx = relevant_context("Does he know flutter, DART, python and c++?", &snapshot());
        assert!(ctx.contains("Skills: Flutter, Dart, Python"));
        assert!(!ctx.contains("C++"));
        assert!(!ctx.contains("Projects:"));
    }

    #[test]
    fn test_projects_only_on_trigger_words() {
        let ctx = relevant_context("What has he built?", &snapshot());
        assert!(ctx.contains("Projects: Chat App, Weather App, IoT project"));
        assert!(!ctx.contains("Portfolio site"));
        assert!(!ctx.contains("Skills:"));

        let ctx = relevant_context("Hello there", &snapshot());
        assert_eq!(ctx, "Name: Mohamed Aarif A\nRole: Flutter Developer & Programmer");
    }

    #[test]
    fn test_portfolio_prompt_layout() {
        let assembler = ContextAssembler::default();
        let window = vec![Turn::new("hi", "hello"), Turn::new("who?", "Aarif")];
        let prompt = assembler.build_prompt(
            "Earlier: discussed skills/projects",
            &window,
            &snapshot(),
            ChatMode::Portfolio,
            "Tell me about his projects",
        );

        let expected = "You are Mohamed Aarif A's portfolio assistant. Answer about him using:\n\
            Name: Mohamed Aarif A\nRole: Flutter Developer & Programmer\n\
            Projects: Chat App, Weather App, IoT project\n\n\
            Be concise and helpful.\n\n\
            Earlier: discussed skills/projects\n\
            User: hi\nAI: hello\nUser: who?\nAI: Aarif\n\n\
            User: Tell me about his projects\nAI:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_general_prompt_ignores_portfolio() {
        let assembler = ContextAssembler::default();
        let prompt = assembler.build_prompt("", &[], &snapshot(), ChatMode::General, "What is Rust?");

        assert!(prompt.starts_with("You are a helpful AI assistant."));
        assert!(!prompt.contains("Aarif"));
        assert!(prompt.ends_with("\n\nUser: What is Rust?\nAI:"));
    }
}
