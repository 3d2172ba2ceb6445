use crate::line::{self, Line};
use crate::Location;
use anyhow::{anyhow, Context, Result};

use std::fs;
use std::path::{Path, PathBuf};

/// Lines starting with this character carry origin metadata, `\0<name>\0<line>`.
pub const MARKER_PREFIX: char = '\0';

/// Renders a marker line (without newline). `line` is the number of the line
/// preceding the next physical line, use `0` at the top of a source.
pub fn marker(source: &str, line: usize) -> String {
    format!("{}{}{}{}", MARKER_PREFIX, source, MARKER_PREFIX, line)
}

/// Reads a marker payload, the part after [`MARKER_PREFIX`].
pub fn parse_marker(payload: &str) -> Location {
    match payload.rsplit_once(MARKER_PREFIX) {
        Some((source, line)) => match line.trim().parse() {
            Ok(line) => Location::new(source, line),
            Err(_) => {
                tracing::warn!(source, line, "malformed marker line number");
                Location::new(source, 0)
            }
        },
        None => {
            tracing::warn!(payload, "marker line without line number");
            Location::new(payload, 0)
        }
    }
}

/// Joins named ledger texts into one stream of lines, each source framed by a
/// marker so errors point back at it. Sources are separated by a blank line, a
/// transaction never runs from one source into the next.
pub fn concat<'a, I>(sources: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (name, text) in sources {
        push_line(&mut out, &marker(name, 0));
        push_text(&mut out, text);
        out.push('\n');
    }
    out
}

/// Reads a ledger file, expanding `include <path>` directives recursively.
/// Included paths are relative to the including file. Directives inside a
/// transaction are postings and left alone.
pub fn read_ledger_file(path: &Path) -> Result<String> {
    let mut out = String::new();
    let mut stack = Vec::new();
    expand(path, &mut stack, &mut out)?;
    Ok(out)
}

fn expand(path: &Path, stack: &mut Vec<PathBuf>, out: &mut String) -> Result<()> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("unable to open ledger file {}", path.display()))?;
    if stack.contains(&canonical) {
        return Err(anyhow!(
            "include cycle: {} includes itself through {}",
            path.display(),
            stack
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        ));
    }

    let bytes =
        fs::read(path).with_context(|| format!("unable to read ledger file {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let name = path.display().to_string();
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    stack.push(canonical);
    push_line(out, &marker(&name, 0));
    let mut open = false;
    for (idx, raw) in content.lines().enumerate() {
        match include_target(raw).filter(|_| !open) {
            Some(target) => {
                expand(&base.join(target), stack, out)?;
                out.push('\n');
                push_line(out, &marker(&name, idx + 1));
            }
            None => {
                open = match line::classify(raw, open) {
                    Line::Blank => false,
                    Line::Header { text, .. } => line::split_header(text).is_some(),
                    _ => open,
                };
                push_line(out, raw);
            }
        }
    }
    stack.pop();

    Ok(())
}

/// Target of an `include` directive, which must start at column 0.
fn include_target(line: &str) -> Option<&str> {
    let target = line.trim_end().strip_prefix("include")?;
    if !target.starts_with([' ', '\t']) {
        return None;
    }
    let target = target.trim();
    (!target.is_empty()).then_some(target)
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_text(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
}
