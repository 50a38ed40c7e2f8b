pub mod cleanup;
pub mod huggingface;
pub mod provider;
pub mod types;

pub use cleanup::strip_reasoning;
pub use huggingface::HfChatProvider;
pub use provider::GenerationProvider;
pub use types::{ChatMessage, ChatRequest};
