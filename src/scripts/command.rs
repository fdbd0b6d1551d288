//! Task commands: a script plus an optional function inside it.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::analyzer::{ScriptAnalysis, analyze_file};
use super::language::{self, ScriptLanguage};
use crate::error::ScriptError;

/// What a task runs. Two tasks may never share a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Command {
    /// Script path.
    pub script: PathBuf,
    /// Function to call; `None` runs the script as a program.
    pub function: Option<String>,
}

impl Command {
    /// Create a command.
    #[must_use]
    pub fn new(script: impl Into<PathBuf>, function: Option<String>) -> Self {
        Self {
            script: script.into(),
            function,
        }
    }

    /// Language of the script, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Unsupported`] for unknown extensions.
    pub fn language(&self) -> Result<&'static dyn ScriptLanguage, ScriptError> {
        language::for_path(&self.script)
    }

    /// Check that the command can run as a task and return the script's
    /// analysis.
    ///
    /// A function-bound command needs the function among the script's
    /// top-level functions, with a single catch-all parameter where the
    /// language has parameter lists. A functionless command needs exactly
    /// one entrypoint block.
    ///
    /// # Errors
    ///
    /// Returns the [`ScriptError`] describing the first violated rule.
    pub fn validate(&self) -> Result<ScriptAnalysis, ScriptError> {
        let analysis = analyze_file(&self.script)?;
        match &self.function {
            Some(function) => {
                let Some(block) = analysis.function(function) else {
                    return Err(ScriptError::FunctionNotFound {
                        function: function.clone(),
                        script: self.script_display(),
                        available: analysis.functions().filter_map(|b| b.name.clone()).collect(),
                    });
                };
                let params = block.params.as_deref().unwrap_or("");
                if analysis.language.has_parameter_lists()
                    && !analysis.language.is_catch_all_signature(params)
                {
                    return Err(ScriptError::InvalidSignature {
                        function: function.clone(),
                        script: self.script_display(),
                        params: params.to_string(),
                    });
                }
            }
            None => {
                let found = analysis.entrypoint_count();
                if found != 1 {
                    return Err(ScriptError::EntrypointCount {
                        script: self.script_display(),
                        found,
                    });
                }
            }
        }
        Ok(analysis)
    }

    fn script_display(&self) -> String {
        self.script.display().to_string()
    }

    /// File name of the script.
    #[must_use]
    pub fn script_name(&self) -> &str {
        self.script
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Script path.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(function) => write!(f, "{}@{function}", self.script.display()),
            None => write!(f, "{}", self.script.display()),
        }
    }
}
