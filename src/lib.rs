pub mod core;
pub mod embedding;
pub mod history;
pub mod llm;
pub mod rag;
pub mod sentiment;
pub mod server;
pub mod state;
