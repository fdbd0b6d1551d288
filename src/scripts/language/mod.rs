//! Per-language script capabilities.
//!
//! Each supported language implements [`ScriptLanguage`]; [`LANGUAGES`] is
//! the registry consulted by extension.
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use super::analyzer::Block;
use crate::error::ScriptError;

mod bash;
mod python;

pub use bash::Bash;
pub use python::Python;

/// What the engine needs to know about a scripting language.
pub trait ScriptLanguage: fmt::Debug + Send + Sync {
    /// Lower-case language name.
    fn name(&self) -> &'static str;

    /// File extensions (without the dot) handled by this language.
    fn extensions(&self) -> &'static [&'static str];

    /// Interpreter program looked up on `PATH`.
    fn interpreter(&self) -> &'static str;

    /// Whether function definitions carry explicit parameter lists.
    fn has_parameter_lists(&self) -> bool {
        false
    }

    /// Split `lines` into classified top-level blocks.
    fn analyze(&self, lines: &[&str]) -> Vec<Block>;

    /// Whether a parameter list consists of a single catch-all parameter.
    fn is_catch_all_signature(&self, _params: &str) -> bool {
        true
    }

    /// Interpreter arguments running `script`, or one of its functions, with
    /// `args`.
    fn invocation_args(&self, script: &Path, function: Option<&str>, args: &[String])
    -> Vec<OsString>;
}

/// Every supported language.
pub static LANGUAGES: [&'static dyn ScriptLanguage; 2] = [&Bash, &Python];

/// Language handling the extension of `path`.
///
/// # Errors
///
/// Returns [`ScriptError::Unsupported`] when no language matches.
pub fn for_path(path: &Path) -> Result<&'static dyn ScriptLanguage, ScriptError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    LANGUAGES
        .iter()
        .copied()
        .find(|lang| lang.extensions().contains(&ext))
        .ok_or_else(|| ScriptError::Unsupported {
            script: path.display().to_string(),
            supported: supported_extensions(),
        })
}

/// Comma-separated list of supported extensions, e.g. `.bash, .sh, .py`.
#[must_use]
pub fn supported_extensions() -> String {
    LANGUAGES
        .iter()
        .flat_map(|lang| lang.extensions().iter())
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a line is empty or a comment in languages using `#` comments.
pub(crate) fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn extensions_select_language() {
        assert_eq!(for_path(Path::new("a/b.bash")).unwrap().name(), "bash");
        assert_eq!(for_path(Path::new("b.sh")).unwrap().name(), "bash");
        assert_eq!(for_path(Path::new("b.py")).unwrap().name(), "python");
    }

    #[test]
    fn unsupported_extension_lists_supported_ones() {
        let err = for_path(Path::new("tool.rb")).unwrap_err();
        assert!(err.to_string().contains(".bash, .sh, .py"));
        assert!(for_path(Path::new("Makefile")).is_err());
    }
}
