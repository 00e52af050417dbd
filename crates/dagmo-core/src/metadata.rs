//! PEP 723 inline script metadata.
//!
//! Both forms may carry a dependency-declaration block:
//!
//! ```text
//! # /// script
//! # requires-python = ">=3.12"
//! # dependencies = [
//! #     "marimo>=0.13",
//! #     "polars",
//! # ]
//! # ///
//! ```
//!
//! The block is kept as raw lines and only the framework package entry is
//! ever edited, so formatting, comments and unrelated keys survive a
//! conversion byte for byte.

use tracing::debug;

const OPEN_MARKER: &str = "# /// script";
const CLOSE_MARKER: &str = "# ///";

/// An inline script metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMetadata {
    lines: Vec<String>,
    /// Value of `requires-python`, if present.
    pub requires_python: Option<String>,
    /// Requirement strings listed under `dependencies`, in order.
    pub dependencies: Vec<String>,
}

impl ScriptMetadata {
    /// Find the first metadata block in `source`.
    pub fn extract(source: &str) -> Option<Self> {
        let lines: Vec<&str> = source
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();

        let start = lines.iter().position(|l| l.trim_end() == OPEN_MARKER)?;
        let mut block = vec![lines[start].trim_end().to_string()];
        for line in &lines[start + 1..] {
            if !line.starts_with('#') {
                return None;
            }
            if line.trim_end() == CLOSE_MARKER {
                block.push(CLOSE_MARKER.to_string());
                return Some(Self::from_lines(block));
            }
            block.push(line.to_string());
        }
        None
    }

    fn from_lines(lines: Vec<String>) -> Self {
        let dependencies = dependency_array(&lines)
            .map(|array| array.literals.into_iter().map(|l| l.value).collect())
            .unwrap_or_default();
        let requires_python = lines.iter().find_map(|line| {
            let value = key_value(line, "requires-python")?;
            let (_, literal) = scan_literal(value, 0)?;
            Some(literal)
        });
        Self {
            lines,
            requires_python,
            dependencies,
        }
    }

    /// The block exactly as it will be written.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Swap the framework package `from` for `to`.
    ///
    /// - A `from` entry is replaced by the bare `to` name, or removed when
    ///   `to` is already listed.
    /// - With neither listed, `to` is inserted as the first entry, but only
    ///   when `has_units` says the converted module has code to run.
    pub fn translate(&self, from: &str, to: &str, has_units: bool) -> Self {
        let from_name = package_name(from);
        let to_name = package_name(to);
        let mut lines = self.lines.clone();

        let Some(array) = dependency_array(&lines) else {
            if has_units && lines.len() >= 2 {
                debug!("Adding dependencies key for {}", to);
                let at = lines.len() - 1;
                lines.splice(
                    at..at,
                    [
                        "# dependencies = [".to_string(),
                        format!("#     \"{to}\","),
                        "# ]".to_string(),
                    ],
                );
            }
            return Self::from_lines(lines);
        };

        let sources: Vec<&Literal> = array
            .literals
            .iter()
            .filter(|l| package_name(&l.value) == from_name)
            .collect();
        let target_listed = array
            .literals
            .iter()
            .any(|l| package_name(&l.value) == to_name);

        if let Some((first, rest)) = sources.split_first() {
            let mut removals: Vec<&Literal> = rest.to_vec();
            if target_listed {
                removals.push(*first);
            } else {
                debug!("Replacing {} with {}", first.value, to);
                lines[first.line].replace_range(first.start + 1..first.end - 1, to);
            }
            removals.sort_by_key(|l| std::cmp::Reverse((l.line, l.start)));
            for literal in removals {
                debug!("Removing {}", literal.value);
                remove_literal(&mut lines, literal);
            }
        } else if !target_listed && has_units {
            debug!("Inserting {} as first dependency", to);
            insert_first(&mut lines, &array, to);
        }

        Self::from_lines(lines)
    }
}

/// Normalized distribution name of a requirement string (PEP 503).
///
/// `"Marimo[sql]>=0.9"` becomes `"marimo"`.
pub fn package_name(requirement: &str) -> String {
    let raw: String = requirement
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();

    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !name.ends_with('-') {
                name.push('-');
            }
        } else {
            name.push(c.to_ascii_lowercase());
        }
    }
    name
}

/// A quoted string inside the block.
#[derive(Debug, Clone)]
struct Literal {
    line: usize,
    /// Byte offset of the opening quote.
    start: usize,
    /// Byte offset one past the closing quote.
    end: usize,
    quote: char,
    value: String,
}

#[derive(Debug)]
struct DependencyArray {
    /// Line and byte offset just after `[`.
    open: (usize, usize),
    close_line: usize,
    literals: Vec<Literal>,
}

/// Text after `key =` on a block line, if the line assigns `key`.
fn key_value<'l>(line: &'l str, key: &str) -> Option<&'l str> {
    let content = line.strip_prefix('#')?.trim_start();
    let rest = content.strip_prefix(key)?.trim_start();
    Some(rest.strip_prefix('=')?.trim_start())
}

/// Read a quoted string starting at byte `at` of `text`.
///
/// Returns the offset one past the closing quote and the value.
fn scan_literal(text: &str, at: usize) -> Option<(usize, String)> {
    let bytes = text.as_bytes();
    let quote = *bytes.get(at)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let mut value = String::new();
    let mut j = at + 1;
    let mut run_start = j;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' if quote == b'"' && bytes.get(j + 1).is_some_and(u8::is_ascii) => {
                value.push_str(&text[run_start..j]);
                value.push(bytes[j + 1] as char);
                j += 2;
                run_start = j;
            }
            c if c == quote => {
                value.push_str(&text[run_start..j]);
                return Some((j + 1, value));
            }
            _ => j += 1,
        }
    }
    None
}

fn dependency_array(lines: &[String]) -> Option<DependencyArray> {
    let last = lines.len().checked_sub(1)?;
    let (key_line, open_col) = (1..last).find_map(|i| {
        let line = &lines[i];
        let value = key_value(line, "dependencies")?;
        value
            .starts_with('[')
            .then(|| (i, line.len() - value.len() + 1))
    })?;

    let mut literals = Vec::new();
    for (li, line) in lines.iter().enumerate().take(last).skip(key_line) {
        let mut c = if li == key_line { open_col } else { 1 };
        let bytes = line.as_bytes();
        while c < bytes.len() {
            match bytes[c] {
                b'"' | b'\'' => {
                    let (end, value) = scan_literal(line, c)?;
                    literals.push(Literal {
                        line: li,
                        start: c,
                        end,
                        quote: bytes[c] as char,
                        value,
                    });
                    c = end;
                }
                b'#' => break,
                b']' => {
                    return Some(DependencyArray {
                        open: (key_line, open_col),
                        close_line: li,
                        literals,
                    });
                }
                _ => c += 1,
            }
        }
    }
    None
}

fn remove_literal(lines: &mut Vec<String>, literal: &Literal) {
    let line = &lines[literal.line];
    let before = &line[..literal.start];
    let after_trimmed = line[literal.end..].trim_start();
    let trailing = after_trimmed.strip_prefix(',');

    let alone_on_line = before.trim_start_matches('#').trim().is_empty()
        && trailing.unwrap_or(after_trimmed).trim().is_empty();
    // Take the entry with the comma that follows it, or else the one before.
    let cut = match (trailing, before.rfind(',')) {
        (Some(rest), _) => literal.start..line.len() - rest.trim_start().len(),
        (None, Some(comma)) => comma..literal.end,
        (None, None) => literal.start..literal.end,
    };

    if alone_on_line {
        lines.remove(literal.line);
    } else {
        lines[literal.line].replace_range(cut, "");
    }
}

fn insert_first(lines: &mut Vec<String>, array: &DependencyArray, package: &str) {
    let quote = array.literals.first().map_or('"', |l| l.quote);
    let entry = format!("{quote}{package}{quote}");
    let (open_line, open_col) = array.open;

    match array.literals.first() {
        Some(first) if first.line != open_line => {
            let prefix = lines[first.line][..first.start].to_string();
            lines.insert(first.line, format!("{prefix}{entry},"));
        }
        None if array.close_line != open_line => {
            lines.insert(open_line + 1, format!("#     {entry},"));
        }
        Some(_) => lines[open_line].insert_str(open_col, &format!("{entry}, ")),
        None => lines[open_line].insert_str(open_col, &entry),
    }
}
