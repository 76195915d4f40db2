pub mod config;
pub mod error;
pub mod ingest;
pub mod material;
pub mod prompts;
pub mod parse;
pub mod llm;
pub mod embeddings;
pub mod cache;
pub mod search;
pub mod session;
pub mod server;

pub use config::Config;
pub use error::{CoursemateError, Result};
pub use session::{Mode, Session, StudyAssistant};
