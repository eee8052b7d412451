/*!
 * Parsing of the two-line issue format.
 *
 * The oracle is asked for pairs of lines:
 *
 * ```text
 * • <short problem description>
 * <severity label>: <1-10>/10
 * ```
 *
 * Anything that does not fit the format ends up in `unparsed` instead of
 * being guessed at.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowest and highest severity score
pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

static SEVERITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3})\s*/\s*10\b").expect("severity pattern is valid")
});

const BULLETS: [char; 5] = ['•', '-', '*', '–', '·'];

/// One problem found in the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub description: String,
    /// 1 = least severe, 10 = clause is certainly unenforceable
    pub severity: u8,
}

/// Structured view of a summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    /// Issues ranked by severity, most severe first
    pub issues: Vec<Issue>,
    /// Lines that did not fit the two-line format
    pub unparsed: Vec<String>,
}

fn strip_bullet(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(|c: char| BULLETS.contains(&c))?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Severity score on a line, if it holds one in range
fn parse_severity(line: &str) -> Option<u8> {
    let captures = SEVERITY_REGEX.captures_iter(line).last()?;
    let score: u8 = captures.get(1)?.as_str().parse().ok()?;
    (MIN_SEVERITY..=MAX_SEVERITY).contains(&score).then_some(score)
}

/// Parse a summary into at most `max_issues` issues.
///
/// Issues are ordered by severity, most severe first; equal severities keep
/// their order in the text. Issues beyond the limit are dropped.
pub fn parse_summary(summary: &str, max_issues: usize) -> IssueSummary {
    let mut issues = Vec::new();
    let mut unparsed = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for line in summary.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((raw, description)) = pending.take() {
            match parse_severity(line) {
                Some(severity) => {
                    issues.push(Issue { description, severity });
                    continue;
                }
                None => unparsed.push(raw),
            }
        }

        match strip_bullet(line) {
            Some(description) if parse_severity(line).is_none() => {
                pending = Some((line.to_string(), description.to_string()));
            }
            _ => unparsed.push(line.to_string()),
        }
    }

    if let Some((raw, _)) = pending {
        unparsed.push(raw);
    }

    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    if issues.len() > max_issues {
        debug!("Dropping {} issues beyond the limit of {}", issues.len() - max_issues, max_issues);
        issues.truncate(max_issues);
    }

    IssueSummary { issues, unparsed }
}
