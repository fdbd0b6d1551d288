//! Bash scripts: brace and keyword-pair delimited blocks.
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{ScriptLanguage, is_blank_or_comment};
use crate::scripts::analyzer::{Block, BlockKind};

#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("bash block pattern is valid")
}

static ENTRYPOINT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^if\s+\[\[.*BASH_SOURCE.*\]\];?\s*"));
static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(?:function\s+([\w:.-]+)\s*(?:\(\s*\))?|([\w:.-]+)\s*\(\s*\))\s*(?:\{.*)?$")
});
static IF: LazyLock<Regex> = LazyLock::new(|| pattern(r"^if\b"));
static CASE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^case\b"));
static FOR: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:for|select)\b"));
static WHILE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^while\b"));
static UNTIL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^until\b"));
static IMPORT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:source|\.)\s+\S"));
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"^(?:(?:export|declare|typeset|readonly|local|set|shopt|trap|umask|unset)\b|[A-Za-z_]\w*(?:\[[^\]]*\])?\+?=)",
    )
});

/// Bash, run with `bash`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bash;

impl ScriptLanguage for Bash {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["bash", "sh"]
    }

    fn interpreter(&self) -> &'static str {
        "bash"
    }

    fn analyze(&self, lines: &[&str]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while let Some(line) = lines.get(i) {
            if is_blank_or_comment(line) {
                i += 1;
                continue;
            }
            let block = classify(line.trim(), i, 0);
            let end = block_end(lines, i, block.kind == BlockKind::Function);
            blocks.push(Block { end, ..block });
            i = end;
        }
        blocks
    }

    fn invocation_args(
        &self,
        script: &Path,
        function: Option<&str>,
        args: &[String],
    ) -> Vec<OsString> {
        let mut argv: Vec<OsString> = Vec::with_capacity(args.len() + 4);
        if let Some(function) = function {
            // $0 is a fixed label so that BASH_SOURCE guards stay closed
            // while the script is sourced.
            argv.push("-c".into());
            argv.push(format!("set -euo pipefail\nsource \"$1\"\nshift\n{function} \"$@\"").into());
            argv.push("provision-task".into());
        }
        argv.push(script.into());
        argv.extend(args.iter().map(OsString::from));
        argv
    }
}

fn classify(line: &str, start: usize, end: usize) -> Block {
    if ENTRYPOINT.is_match(line) {
        return Block::new(BlockKind::Entrypoint, start, end);
    }
    if let Some(caps) = FUNCTION.captures(line) {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        return Block::new(BlockKind::Function, start, end).named(name);
    }
    let kind = if IF.is_match(line) {
        BlockKind::If
    } else if CASE.is_match(line) {
        BlockKind::Case
    } else if FOR.is_match(line) {
        BlockKind::For
    } else if WHILE.is_match(line) {
        BlockKind::While
    } else if UNTIL.is_match(line) {
        BlockKind::Until
    } else if IMPORT.is_match(line) {
        BlockKind::Import
    } else if DECLARATION.is_match(line) {
        BlockKind::Declaration
    } else {
        BlockKind::Other
    };
    Block::new(kind, start, end)
}

/// Index one past the last line of the statement starting at `start`.
///
/// A function header without its opening brace keeps the block open until
/// the brace on a following line.
fn block_end(lines: &[&str], start: usize, needs_body: bool) -> usize {
    let mut scanner = Scanner::default();
    let mut i = start;
    while let Some(line) = lines.get(i) {
        if needs_body
            && !scanner.opened
            && i > start
            && !line.trim().is_empty()
            && !line.trim_start().starts_with('{')
        {
            return i;
        }
        scanner.feed(line);
        i += 1;
        if scanner.is_balanced() && (!needs_body || scanner.opened) {
            return i;
        }
    }
    i
}

/// Tracks nesting across the physical lines of one top-level statement.
#[derive(Debug, Default)]
struct Scanner {
    depth: usize,
    opened: bool,
    quote: Option<u8>,
    continued: bool,
    command_position: bool,
    heredoc: Option<(String, bool)>,
    pending: VecDeque<(String, bool)>,
}

impl Scanner {
    fn is_balanced(&self) -> bool {
        self.depth == 0
            && self.quote.is_none()
            && !self.continued
            && self.heredoc.is_none()
            && self.pending.is_empty()
    }

    fn feed(&mut self, line: &str) {
        if let Some((delim, strip_tabs)) = &self.heredoc {
            let body = if *strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            if body == delim {
                self.heredoc = self.pending.pop_front();
            }
            return;
        }

        if !self.continued && self.quote.is_none() {
            self.command_position = true;
        }
        self.continued = false;

        let bytes = line.as_bytes();
        let mut word = String::new();
        let mut k = 0;
        while let Some(&c) = bytes.get(k) {
            if let Some(q) = self.quote {
                if q == b'"' && c == b'\\' {
                    k += 2;
                    continue;
                }
                if c == q {
                    self.quote = None;
                }
                k += 1;
                continue;
            }
            match c {
                b'\\' if k + 1 == bytes.len() => {
                    self.continued = true;
                    k += 1;
                }
                b'\\' => {
                    word.push('\\');
                    k += 2;
                }
                b'\'' | b'"' => {
                    self.quote = Some(c);
                    word.push('"');
                    k += 1;
                }
                b'#' if word.is_empty() => break,
                b'<' if bytes.get(k + 1) == Some(&b'<') && bytes.get(k + 2) != Some(&b'<') => {
                    self.flush(&mut word);
                    k = self.read_heredoc(bytes, k + 2);
                }
                b' ' | b'\t' | b'<' | b'>' => {
                    self.flush(&mut word);
                    k += 1;
                }
                b';' | b'&' | b'|' | b'(' | b')' => {
                    self.flush(&mut word);
                    self.command_position = true;
                    k += 1;
                }
                _ => {
                    word.push(char::from(c));
                    k += 1;
                }
            }
        }
        self.flush(&mut word);
        if self.quote.is_none() && self.heredoc.is_none() {
            self.heredoc = self.pending.pop_front();
        }
    }

    /// Parse a heredoc delimiter starting at `k` (just after `<<`).
    fn read_heredoc(&mut self, bytes: &[u8], mut k: usize) -> usize {
        let strip_tabs = bytes.get(k) == Some(&b'-');
        if strip_tabs {
            k += 1;
        }
        while bytes.get(k).is_some_and(|b| *b == b' ' || *b == b'\t') {
            k += 1;
        }
        let mut delim = String::new();
        while let Some(&c) = bytes.get(k) {
            if c.is_ascii_whitespace() || matches!(c, b';' | b'|' | b'&' | b'<' | b'>' | b')') {
                break;
            }
            if !matches!(c, b'\'' | b'"' | b'\\') {
                delim.push(char::from(c));
            }
            k += 1;
        }
        if !delim.is_empty() {
            self.pending.push_back((delim, strip_tabs));
        }
        k
    }

    fn flush(&mut self, word: &mut String) {
        if word.is_empty() {
            return;
        }
        match word.as_str() {
            "{" => {
                self.depth += 1;
                self.opened = true;
                self.command_position = true;
            }
            "}" => {
                self.depth = self.depth.saturating_sub(1);
                self.command_position = false;
            }
            "if" | "case" | "for" | "while" | "until" | "select" if self.command_position => {
                self.depth += 1;
                self.opened = true;
            }
            "fi" | "esac" | "done" if self.command_position => {
                self.depth = self.depth.saturating_sub(1);
                self.command_position = false;
            }
            "then" | "do" | "else" | "elif" | "!" | "time" if self.command_position => {}
            _ => self.command_position = false,
        }
        word.clear();
    }
}
