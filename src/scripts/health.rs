//! Structural health check for task scripts.
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::analyzer::{BlockKind, ScriptAnalysis, analyze_file};
use crate::error::ScriptError;

/// A rule violated by a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthViolation {
    /// A top-level block other than a function, entrypoint, import or
    /// declaration.
    DisallowedBlock {
        /// Kind of the offending block.
        kind: BlockKind,
        /// One-based line.
        line: usize,
    },
    /// Two top-level functions share a name.
    DuplicateFunction {
        /// Function name.
        name: String,
        /// One-based line of the repeated definition.
        line: usize,
        /// One-based line of the first definition.
        first_line: usize,
    },
    /// More than one entrypoint block.
    MultipleEntrypoints {
        /// Number found.
        count: usize,
    },
    /// The entrypoint is followed by further top-level blocks.
    EntrypointNotLast {
        /// One-based line of the entrypoint.
        line: usize,
    },
    /// A function that cannot be called as a task.
    InvalidSignature {
        /// Function name.
        name: String,
        /// Parameter list as written.
        params: String,
        /// One-based line.
        line: usize,
    },
}

impl fmt::Display for HealthViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisallowedBlock { kind, line } => {
                write!(f, "line {line}: {kind} block is not allowed at top level")
            }
            Self::DuplicateFunction {
                name,
                line,
                first_line,
            } => write!(
                f,
                "line {line}: function '{name}' is already defined on line {first_line}"
            ),
            Self::MultipleEntrypoints { count } => {
                write!(f, "found {count} entrypoints, at most one is allowed")
            }
            Self::EntrypointNotLast { line } => {
                write!(f, "line {line}: entrypoint must be the last top-level block")
            }
            Self::InvalidSignature { name, params, line } => write!(
                f,
                "line {line}: function '{name}({params})' must only capture a single variadic parameter"
            ),
        }
    }
}

/// Kinds permitted at the top level of a task script.
const ALLOWED: [BlockKind; 4] = [
    BlockKind::Function,
    BlockKind::Entrypoint,
    BlockKind::Import,
    BlockKind::Declaration,
];

/// Check an analyzed script and return every violation, in source order
/// where applicable.
#[must_use]
pub fn check(analysis: &ScriptAnalysis) -> Vec<HealthViolation> {
    let mut violations = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for block in &analysis.blocks {
        if !ALLOWED.contains(&block.kind) {
            violations.push(HealthViolation::DisallowedBlock {
                kind: block.kind,
                line: block.line(),
            });
            continue;
        }
        if block.kind != BlockKind::Function {
            continue;
        }
        let name = block.name.as_deref().unwrap_or_default();
        if let Some(&first_line) = seen.get(name) {
            violations.push(HealthViolation::DuplicateFunction {
                name: name.to_string(),
                line: block.line(),
                first_line,
            });
        } else {
            seen.insert(name, block.line());
        }
        let params = block.params.as_deref().unwrap_or_default();
        if analysis.language.has_parameter_lists()
            && !analysis.language.is_catch_all_signature(params)
        {
            violations.push(HealthViolation::InvalidSignature {
                name: name.to_string(),
                params: params.to_string(),
                line: block.line(),
            });
        }
    }

    let entrypoints: Vec<_> = analysis
        .blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Entrypoint)
        .collect();
    if entrypoints.len() > 1 {
        violations.push(HealthViolation::MultipleEntrypoints {
            count: entrypoints.len(),
        });
    }
    if let Some(entry) = entrypoints.first()
        && analysis.blocks.last().is_some_and(|last| last.start != entry.start)
    {
        violations.push(HealthViolation::EntrypointNotLast { line: entry.line() });
    }
    violations
}

/// Analyze and check the script at `path`.
///
/// # Errors
///
/// Returns a [`ScriptError`] if the script cannot be read or has an
/// unsupported extension.
pub fn check_script(path: &Path) -> Result<Vec<HealthViolation>, ScriptError> {
    Ok(check(&analyze_file(path)?))
}
