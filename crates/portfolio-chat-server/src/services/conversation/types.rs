use serde::Serialize;

use crate::config::SessionConfig;

/// One user message paired with one assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user_text: String,
    pub ai_text: String,
}

impl Turn {
    pub fn new(user_text: impl Into<String>, ai_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            ai_text: ai_text.into(),
        }
    }
}

/// Conversation state stored in memory for one session id
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,

    /// Oldest first
    pub turns: Vec<Turn>,

    /// Turns dropped by truncation over the session lifetime
    pub discarded_turns: usize,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            discarded_turns: 0,
        }
    }

    /// Appends a turn and applies the history bound.
    /// Returns the number of turns discarded by this append.
    pub fn push_turn(&mut self, turn: Turn, policy: &SessionPolicy) -> usize {
        self.turns.push(turn);

        if self.turns.len() <= policy.max_turns {
            return 0;
        }

        let drop_count = self.turns.len() - policy.retained_turns;
        self.turns.drain(0..drop_count);
        self.discarded_turns += drop_count;
        drop_count
    }

    /// The most recent `n` turns, oldest first.
    pub fn window(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

/// History limits applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub max_turns: usize,
    pub retained_turns: usize,
    pub window_turns: usize,
    pub summary_recent_turns: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            max_turns: cfg.max_turns.max(1),
            retained_turns: cfg.retained_turns.min(cfg.max_turns.max(1)),
            window_turns: cfg.window_turns,
            summary_recent_turns: cfg.summary_recent_turns,
        }
    }
}
