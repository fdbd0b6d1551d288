//! Top-level block analysis of task scripts.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::language::{self, ScriptLanguage};
use crate::error::ScriptError;

/// Classification of a top-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Function definition.
    Function,
    /// Class definition.
    Class,
    /// Conditional.
    If,
    /// `case` statement.
    Case,
    /// `for` loop.
    For,
    /// `while` loop.
    While,
    /// `until` loop.
    Until,
    /// Guard that only runs when the script is the main program.
    Entrypoint,
    /// Import or `source` statement.
    Import,
    /// Assignment, shell option or docstring.
    Declaration,
    /// Anything else.
    Other,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Function => "FUNCTION",
            Self::Class => "CLASS",
            Self::If => "IF",
            Self::Case => "CASE",
            Self::For => "FOR",
            Self::While => "WHILE",
            Self::Until => "UNTIL",
            Self::Entrypoint => "ENTRYPOINT",
            Self::Import => "IMPORT",
            Self::Declaration => "DECLARATION",
            Self::Other => "OTHER",
        })
    }
}

/// A top-level block with its zero-based, half-open line span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block classification.
    pub kind: BlockKind,
    /// Function or class name.
    pub name: Option<String>,
    /// Parameter list as written (languages with parameter lists only).
    pub params: Option<String>,
    /// First line of the block.
    pub start: usize,
    /// One past the last line of the block.
    pub end: usize,
}

impl Block {
    pub(crate) const fn new(kind: BlockKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            name: None,
            params: None,
            start,
            end,
        }
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub(crate) fn with_params(mut self, params: &str) -> Self {
        self.params = Some(params.trim().to_string());
        self
    }

    /// One-based line number of the block's first line.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.start + 1
    }
}

/// Result of analyzing a script file.
#[derive(Debug)]
pub struct ScriptAnalysis {
    /// Analyzed script.
    pub path: PathBuf,
    /// Language chosen by extension.
    pub language: &'static dyn ScriptLanguage,
    /// Source lines.
    pub lines: Vec<String>,
    /// Top-level blocks in source order.
    pub blocks: Vec<Block>,
}

impl ScriptAnalysis {
    /// Top-level function blocks.
    pub fn functions(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Function)
    }

    /// Top-level function named `name`.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Block> {
        self.functions().find(|b| b.name.as_deref() == Some(name))
    }

    /// Number of entrypoint blocks.
    #[must_use]
    pub fn entrypoint_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Entrypoint)
            .count()
    }

    /// Lines belonging to `block`.
    #[must_use]
    pub fn block_lines(&self, block: &Block) -> &[String] {
        self.lines.get(block.start..block.end).unwrap_or_default()
    }
}

/// Read and analyze the script at `path`.
///
/// # Errors
///
/// Returns [`ScriptError::Unsupported`] if no language handles the file's
/// extension and [`ScriptError::Io`] if it cannot be read.
pub fn analyze_file(path: &Path) -> Result<ScriptAnalysis, ScriptError> {
    let language = language::for_path(path)?;
    let text = fs::read_to_string(path).map_err(|e| ScriptError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let lines: Vec<String> = text.lines().map(ToString::to_string).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let blocks = language.analyze(&refs);
    Ok(ScriptAnalysis {
        path: path.to_path_buf(),
        language,
        lines,
        blocks,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn analyze_file_picks_language_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tools.py");
        fs::write(
            &path,
            "import sys\n\ndef install(*args):\n    pass\n\nif __name__ == \"__main__\":\n    install(*sys.argv[1:])\n",
        )
        .unwrap();
        let analysis = analyze_file(&path).unwrap();
        assert_eq!(analysis.language.name(), "python");
        assert_eq!(analysis.function("install").unwrap().line(), 3);
        assert_eq!(analysis.entrypoint_count(), 1);
        let entry = analysis.blocks.last().unwrap();
        assert_eq!(analysis.block_lines(entry).len(), 2);
    }

    #[test]
    fn analyze_file_rejects_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tools.rb");
        fs::write(&path, "puts 1\n").unwrap();
        assert!(matches!(
            analyze_file(&path),
            Err(ScriptError::Unsupported { .. })
        ));
    }

    #[test]
    fn analyze_file_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            analyze_file(&tmp.path().join("gone.bash")),
            Err(ScriptError::Io { .. })
        ));
    }
}
