//! Python scripts: indentation-delimited blocks.
use std::ffi::OsString;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{ScriptLanguage, is_blank_or_comment};
use crate::scripts::analyzer::{Block, BlockKind};

/// Runs one function of a module with the remaining argv as positional
/// arguments: `python3 -c WRAPPER <script> <function> [args...]`.
///
/// An `int` return value becomes the exit status; `False` exits with 1.
const FUNCTION_WRAPPER: &str = "\
import importlib.util, sys
path, func = sys.argv[1], sys.argv[2]
spec = importlib.util.spec_from_file_location('provision_task', path)
module = importlib.util.module_from_spec(spec)
sys.argv = [path] + sys.argv[3:]
spec.loader.exec_module(module)
res = getattr(module, func)(*sys.argv[1:])
if isinstance(res, bool):
    sys.exit(0 if res else 1)
if isinstance(res, int):
    sys.exit(res)
";

#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("python block pattern is valid")
}

static ENTRYPOINT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"^if\s+__name__\s*==\s*['"]__main__['"]\s*:"#));
static FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(?:async\s+)?def\s+(\w+)\s*\((.*)\)\s*(?:->.*)?:\s*$"));
static CLASS: LazyLock<Regex> = LazyLock::new(|| pattern(r"^class\s+(\w+)\s*(?:\(.*\))?\s*:"));
static IF: LazyLock<Regex> = LazyLock::new(|| pattern(r"^if\b"));
static FOR: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:async\s+)?for\b"));
static WHILE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^while\b"));
static IMPORT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:import|from)\s"));
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"^[A-Za-z_][\w.,\s\[\]'"]*(?::[^=]+)?\s*(?:[-+*/%&|^@]|//|\*\*|>>|<<)?=(?:[^=]|$)"#)
});
static DOCSTRING: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"^[rRbBuUfF]{0,2}(?:"""|'''|"|')"#));
static CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(?:elif\b|else\s*:|except\b|except\s*:|finally\s*:)"));

/// Python 3, run with `python3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Python;

impl ScriptLanguage for Python {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn interpreter(&self) -> &'static str {
        "python3"
    }

    fn has_parameter_lists(&self) -> bool {
        true
    }

    fn analyze(&self, lines: &[&str]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while let Some(line) = lines.get(i) {
            if is_blank_or_comment(line) || line.starts_with([' ', '\t']) {
                i += 1;
                continue;
            }
            let start = i;
            let mut header_start = i;
            while lines.get(header_start).is_some_and(|l| l.starts_with('@')) {
                header_start = logical_end(lines, header_start);
            }
            let header_end = logical_end(lines, header_start);
            let header = header_text(lines, header_start, header_end);
            let mut end = header_end.max(header_start);
            if header.ends_with(':') {
                end = suite_end(lines, end);
                while let Some(next) = lines.get(end)
                    && CONTINUATION.is_match(next)
                {
                    end = suite_end(lines, logical_end(lines, end));
                }
            }
            blocks.push(classify(&header, start, end.max(start + 1)));
            i = end.max(start + 1);
        }
        blocks
    }

    fn is_catch_all_signature(&self, params: &str) -> bool {
        let params: Vec<&str> = split_params(params)
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let [only] = params.as_slice() else {
            return false;
        };
        if only.starts_with("**") {
            return false;
        }
        only.strip_prefix('*').is_some_and(|rest| {
            let name = rest.split(':').next().unwrap_or("").trim();
            !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        })
    }

    fn invocation_args(
        &self,
        script: &Path,
        function: Option<&str>,
        args: &[String],
    ) -> Vec<OsString> {
        let mut argv: Vec<OsString> = Vec::with_capacity(args.len() + 4);
        if let Some(function) = function {
            argv.push("-c".into());
            argv.push(FUNCTION_WRAPPER.into());
            argv.push(script.into());
            argv.push(function.into());
        } else {
            argv.push(script.into());
        }
        argv.extend(args.iter().map(OsString::from));
        argv
    }
}

fn classify(header: &str, start: usize, end: usize) -> Block {
    if ENTRYPOINT.is_match(header) {
        return Block::new(BlockKind::Entrypoint, start, end);
    }
    if let Some(caps) = FUNCTION.captures(header) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let params = caps.get(2).map_or("", |m| m.as_str());
        return Block::new(BlockKind::Function, start, end)
            .named(name)
            .with_params(params);
    }
    if let Some(caps) = CLASS.captures(header) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        return Block::new(BlockKind::Class, start, end).named(name);
    }
    let kind = if IF.is_match(header) {
        BlockKind::If
    } else if FOR.is_match(header) {
        BlockKind::For
    } else if WHILE.is_match(header) {
        BlockKind::While
    } else if IMPORT.is_match(header) {
        BlockKind::Import
    } else if ASSIGNMENT.is_match(header) || DOCSTRING.is_match(header) {
        BlockKind::Declaration
    } else {
        BlockKind::Other
    };
    Block::new(kind, start, end)
}

/// Index one past the last physical line of the logical line at `start`,
/// following open brackets, triple-quoted strings and backslash
/// continuations.
fn logical_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0usize;
    let mut triple: Option<u8> = None;
    let mut i = start;
    while let Some(line) = lines.get(i) {
        i += 1;
        let bytes = line.as_bytes();
        let mut continued = false;
        let mut k = 0;
        while let Some(&c) = bytes.get(k) {
            if let Some(q) = triple {
                if c == b'\\' {
                    k += 2;
                } else if is_triple(bytes, k, q) {
                    triple = None;
                    k += 3;
                } else {
                    k += 1;
                }
                continue;
            }
            match c {
                b'#' => break,
                b'\'' | b'"' if is_triple(bytes, k, c) => {
                    triple = Some(c);
                    k += 3;
                    continue;
                }
                b'\'' | b'"' => {
                    k = skip_string(bytes, k + 1, c);
                    continue;
                }
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b'\\' if k + 1 == bytes.len() => continued = true,
                _ => {}
            }
            k += 1;
        }
        if triple.is_none() && depth == 0 && !continued {
            break;
        }
    }
    i
}

fn is_triple(bytes: &[u8], k: usize, quote: u8) -> bool {
    bytes
        .get(k..k + 3)
        .is_some_and(|s| s.iter().all(|&b| b == quote))
}

fn skip_string(bytes: &[u8], mut k: usize, quote: u8) -> usize {
    while let Some(&c) = bytes.get(k) {
        if c == b'\\' {
            k += 2;
            continue;
        }
        if c == quote {
            return k + 1;
        }
        k += 1;
    }
    k
}

/// End of the indented suite starting at `from`; trailing blank and
/// comment lines are not part of it.
fn suite_end(lines: &[&str], from: usize) -> usize {
    let mut j = from;
    let mut last = from;
    while let Some(line) = lines.get(j) {
        if is_blank_or_comment(line) {
            j += 1;
        } else if line.starts_with([' ', '\t']) {
            j = logical_end(lines, j);
            last = j;
        } else {
            break;
        }
    }
    last
}

/// The code of lines `[start, end)` joined into one line, comments removed.
fn header_text(lines: &[&str], start: usize, end: usize) -> String {
    lines
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .map(|l| strip_comment(l).trim_end().trim_end_matches('\\').trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut k = 0;
    while let Some(&c) = bytes.get(k) {
        match c {
            b'#' => return line.get(..k).unwrap_or(line),
            b'\'' | b'"' => k = skip_string(bytes, k + 1, c),
            _ => k += 1,
        }
    }
    line
}

/// Split a parameter list on commas outside brackets.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (idx, c) in params.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(params.get(last..idx).unwrap_or(""));
                last = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(params.get(last..).unwrap_or(""));
    parts
}
