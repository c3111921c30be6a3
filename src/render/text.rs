use crate::audit::AuditReport;
use crate::check::{CheckReport, Finding, Severity};
use crate::diagnostics;
use crate::manifest::Manifest;

fn render_finding(path: &str, f: &Finding) -> String {
    let body = format!("{}[{}]: {}", f.severity, f.code, f.message);
    match f.lines.first() {
        Some(&line) => diagnostics::located(path, line, body),
        None => format!("{}: {}", path, body),
    }
}

fn summary(findings: &[Finding]) -> String {
    let errors = findings.iter().filter(|f| f.severity == Severity::Error).count();
    let warnings = findings.len() - errors;
    format!("{} error(s), {} warning(s)", errors, warnings)
}

/// One `path:line: severity[code]: message` line per finding, then a summary.
pub fn render_check_text(path: &str, report: &CheckReport) -> String {
    let mut out = String::new();
    for f in &report.findings {
        out.push_str(&render_finding(path, f));
        out.push('\n');
    }
    out.push_str(&format!(
        "{}: {} requirement(s), {}\n",
        path,
        report.requirements,
        summary(&report.findings)
    ));
    out
}

pub fn render_audit_text(path: &str, report: &AuditReport) -> String {
    let mut out = String::new();
    for f in &report.findings {
        out.push_str(&render_finding(path, f));
        out.push('\n');
    }
    out.push_str(&format!(
        "{}: {} file(s) scanned, {} distribution(s) imported, {}\n",
        path,
        report.files_scanned,
        report.used.len(),
        summary(&report.findings)
    ));
    out
}

/// Aligned `name  version  line` table.
pub fn render_list_text(manifest: &Manifest) -> String {
    let width = manifest
        .requirements()
        .map(|r| r.name.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for r in manifest.requirements() {
        let version = r.version.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{:<width$}  {:<12}  {}\n",
            r.name.as_str(),
            version,
            r.line,
            width = width
        ));
    }
    out
}
