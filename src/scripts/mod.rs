//! Task scripts: language support, block analysis, commands and health
//! checks.
pub mod analyzer;
pub mod command;
pub mod health;
pub mod language;

pub use analyzer::{Block, BlockKind, ScriptAnalysis, analyze_file};
pub use command::Command;
pub use health::{HealthViolation, check_script};
pub use language::{LANGUAGES, ScriptLanguage};
