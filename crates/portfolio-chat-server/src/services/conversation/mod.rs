//! Conversation memory management module
//!
//! Provides in-memory session state with:
//! - Thread-safe storage (DashMap + per-session lock)
//! - Bounded turn history with truncation
//! - Lossy topic summary of older turns

mod store;
mod summary;
pub mod types;

pub use store::{SessionStats, SessionStore};
pub use summary::summarize_turns;
pub use types::{Session, SessionPolicy, Turn};
