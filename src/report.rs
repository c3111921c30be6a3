//! Report model: combine the manifest with check and audit findings.

use crate::audit::AuditReport;
use crate::check::{CheckReport, Finding, Severity};
use crate::manifest::Manifest;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RequirementView {
    pub name: String,
    pub normalized: String,
    pub version: Option<String>,
    pub comment: Option<String>,
    pub line: usize,
    /// Worst severity among findings on this line, if any.
    pub status: Option<Severity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub requirements: usize,
    pub pinned: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub manifest: String,
    pub requirements: Vec<RequirementView>,
    pub findings: Vec<Finding>,
    pub totals: TotalsView,
    /// Present when the report includes an import audit.
    pub audit: Option<AuditReport>,
}

pub fn build_report_data(
    manifest_path: &str,
    manifest: &Manifest,
    check: &CheckReport,
    audit: Option<&AuditReport>,
) -> ReportData {
    let mut findings: Vec<Finding> = check.findings.clone();
    if let Some(a) = audit {
        findings.extend(a.findings.iter().cloned());
    }

    let requirements: Vec<RequirementView> = manifest
        .requirements()
        .map(|r| RequirementView {
            name: r.name.to_string(),
            normalized: r.name.normalized().to_string(),
            version: r.version.clone(),
            comment: r.comment.clone(),
            line: r.line,
            status: findings
                .iter()
                .filter(|f| f.lines.contains(&r.line))
                .map(|f| f.severity)
                .max(),
        })
        .collect();

    let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();

    ReportData {
        manifest: manifest_path.to_string(),
        totals: TotalsView {
            requirements: requirements.len(),
            pinned: manifest.requirements().filter(|r| r.is_pinned()).count(),
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
        },
        requirements,
        findings,
        audit: audit.cloned(),
    }
}
