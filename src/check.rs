//! Manifest hygiene checks.
//!
//! Records are unordered and keyed by normalized package name. The one hard
//! invariant is that a package is never pinned to two different versions;
//! everything else is reported as a warning unless options tighten it.

use crate::manifest::{Manifest, Requirement};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Stable finding codes, rendered in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Code {
    ConflictingPin,
    Duplicate,
    Unpinned,
    NonCanonicalName,
    Missing,
    Unused,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::ConflictingPin => "conflicting-pin",
            Code::Duplicate => "duplicate",
            Code::Unpinned => "unpinned",
            Code::NonCanonicalName => "non-canonical-name",
            Code::Missing => "missing",
            Code::Unused => "unused",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: Code,
    /// Normalized package name.
    pub package: String,
    /// Manifest lines involved (empty for findings with no manifest line).
    pub lines: Vec<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Treat unpinned requirements as errors.
    pub require_pins: bool,
    /// Warn when a name is not written in normalized form.
    pub strict_names: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub requirements: usize,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }
}

pub fn check(manifest: &Manifest, opts: &CheckOptions) -> CheckReport {
    // Phase 1: group records by normalized name.
    let mut by_name: BTreeMap<&str, Vec<&Requirement>> = BTreeMap::new();
    for r in manifest.requirements() {
        by_name.entry(r.name.normalized()).or_default().push(r);
    }

    let mut findings = Vec::new();

    // Phase 2: duplicates and conflicting pins.
    for (name, records) in &by_name {
        if records.len() < 2 {
            continue;
        }
        let lines: Vec<usize> = records.iter().map(|r| r.line).collect();

        let mut pins: Vec<&str> = records.iter().filter_map(|r| r.version.as_deref()).collect();
        pins.sort();
        pins.dedup();

        if pins.len() > 1 {
            findings.push(Finding {
                severity: Severity::Error,
                code: Code::ConflictingPin,
                package: name.to_string(),
                lines: lines.clone(),
                message: format!(
                    "{} is pinned to conflicting versions {} (lines {})",
                    records[0].name,
                    pins.join(", "),
                    join_lines(&lines)
                ),
            });
        } else {
            findings.push(Finding {
                severity: Severity::Warning,
                code: Code::Duplicate,
                package: name.to_string(),
                lines: lines.clone(),
                message: format!(
                    "{} is listed {} times (lines {})",
                    records[0].name,
                    records.len(),
                    join_lines(&lines)
                ),
            });
        }
    }

    // Phase 3: per-record checks.
    for r in manifest.requirements() {
        if !r.is_pinned() {
            findings.push(Finding {
                severity: if opts.require_pins {
                    Severity::Error
                } else {
                    Severity::Warning
                },
                code: Code::Unpinned,
                package: r.name.normalized().to_string(),
                lines: vec![r.line],
                message: format!("{} has no pinned version", r.name),
            });
        }
        if opts.strict_names && !r.name.is_canonical() {
            findings.push(Finding {
                severity: Severity::Warning,
                code: Code::NonCanonicalName,
                package: r.name.normalized().to_string(),
                lines: vec![r.line],
                message: format!("{} should be written as {}", r.name, r.name.normalized()),
            });
        }
    }

    sort_findings(&mut findings);

    CheckReport {
        requirements: manifest.requirements().count(),
        findings,
    }
}

/// Order by first line, then code. Findings without lines sort last by package.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        let first = |f: &Finding| f.lines.first().copied().unwrap_or(usize::MAX);
        first(a)
            .cmp(&first(b))
            .then_with(|| a.code.cmp(&b.code))
            .then_with(|| a.package.cmp(&b.package))
    });
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
