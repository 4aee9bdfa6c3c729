pub mod db;
pub mod seed;
pub mod time_llm;

pub use db::DbAdapter;
pub use seed::SeedReport;
pub use time_llm::{OpenAiTimeAdapter, Rfc3339TimeParser};
