pub mod ask;
pub mod health;
pub mod ingest;
pub mod sentiment;
pub mod utils;
