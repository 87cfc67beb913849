pub mod error;
pub mod fingerprint;

pub use error::{ApiError, ChatError, FetchError, GenerationError, APOLOGY_REPLY};
pub use fingerprint::fingerprint;
