//! Import audit: compare what a Python source tree imports with what the
//! manifest declares.

pub mod modules;
pub mod scan;

pub use modules::ModuleMap;
pub use scan::{ImportSet, ImportSite, scan_tree};

use crate::check::{Code, Finding, Severity, sort_findings};
use crate::manifest::{Manifest, normalize};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    /// Distributions never reported (e.g. servers run from the command line).
    pub ignore: BTreeSet<String>,
}

impl AuditOptions {
    pub fn with_ignored<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignore: names.into_iter().map(|n| normalize(n.as_ref())).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub files_scanned: usize,
    /// Distribution -> third-party modules that resolved to it.
    pub used: BTreeMap<String, Vec<String>>,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }
}

/// Missing distributions are errors; unused declarations are warnings.
pub fn audit(
    manifest: &Manifest,
    imports: &ImportSet,
    map: &ModuleMap,
    opts: &AuditOptions,
) -> AuditReport {
    // Phase 1: resolve third-party imports to distributions.
    let mut used: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut first_site: BTreeMap<String, (&str, &ImportSite)> = BTreeMap::new();
    for (module, site) in &imports.modules {
        let top = module.split('.').next().unwrap_or(module);
        if imports.local.contains(top) || modules::is_stdlib(module) {
            continue;
        }
        let dist = map.distribution_for(module);
        used.entry(dist.clone()).or_default().push(module.clone());
        first_site.entry(dist).or_insert((module.as_str(), site));
    }

    // Phase 2: declared distributions, first line of each.
    let mut declared: BTreeMap<&str, usize> = BTreeMap::new();
    for r in manifest.requirements() {
        declared.entry(r.name.normalized()).or_insert(r.line);
    }

    let mut findings = Vec::new();

    for (dist, (module, site)) in &first_site {
        if declared.contains_key(dist.as_str()) || opts.ignore.contains(dist) {
            continue;
        }
        findings.push(Finding {
            severity: Severity::Error,
            code: Code::Missing,
            package: dist.clone(),
            lines: Vec::new(),
            message: format!(
                "{} is imported at {}:{} but {} is not in the manifest",
                module,
                site.file.display(),
                site.line,
                dist
            ),
        });
    }

    for (dist, line) in &declared {
        if used.contains_key(*dist) || opts.ignore.contains(*dist) {
            continue;
        }
        findings.push(Finding {
            severity: Severity::Warning,
            code: Code::Unused,
            package: dist.to_string(),
            lines: vec![*line],
            message: format!("{} is declared but never imported", dist),
        });
    }

    sort_findings(&mut findings);

    AuditReport {
        files_scanned: imports.files_scanned,
        used,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn imports(modules: &[&str], local: &[&str]) -> ImportSet {
        ImportSet {
            modules: modules
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    (
                        m.to_string(),
                        ImportSite {
                            file: PathBuf::from("app/service.py"),
                            line: i + 1,
                        },
                    )
                })
                .collect(),
            local: local.iter().map(|s| s.to_string()).collect(),
            files_scanned: 1,
        }
    }

    fn summary(report: &AuditReport) -> Vec<(Code, String, Vec<usize>)> {
        report
            .findings
            .iter()
            .map(|f| (f.code, f.package.clone(), f.lines.clone()))
            .collect()
    }

    #[test]
    fn reports_missing_and_unused() {
        let manifest = Manifest::parse("flask==2.0.1\nPillow==10.2.0\nrequests==2.31.0\n").unwrap();
        let set = imports(&["PIL", "app", "boto3", "flask", "json", "sklearn"], &["app"]);

        let report = audit(&manifest, &set, &ModuleMap::default(), &AuditOptions::default());
        assert_eq!(
            summary(&report),
            vec![
                (Code::Unused, "requests".to_string(), vec![3]),
                (Code::Missing, "boto3".to_string(), vec![]),
                (Code::Missing, "scikit-learn".to_string(), vec![]),
            ]
        );
        assert!(report.has_errors());
        assert!(report.findings[2].message.contains("sklearn is imported at app/service.py:6"));
        assert_eq!(report.used["pillow"], vec!["PIL".to_string()]);
        assert!(!report.used.contains_key("json"));
        assert!(!report.used.contains_key("app"));
    }

    #[test]
    fn ignored_distributions_are_exempt() {
        let manifest = Manifest::parse("gunicorn==21.2.0\nflask\n").unwrap();
        let set = imports(&["flask", "botocore"], &[]);
        let opts = AuditOptions::with_ignored(["Gunicorn", "botocore"]);

        let report = audit(&manifest, &set, &ModuleMap::default(), &opts);
        assert!(report.findings.is_empty(), "{:?}", report.findings);
    }

    #[test]
    fn modules_sharing_a_distribution_report_once() {
        let manifest = Manifest::parse("").unwrap();
        let set = imports(&["google.cloud.aiplatform", "vertexai"], &[]);

        let report = audit(&manifest, &set, &ModuleMap::default(), &AuditOptions::default());
        assert_eq!(
            summary(&report),
            vec![(Code::Missing, "google-cloud-aiplatform".to_string(), vec![])]
        );
        assert_eq!(
            report.used["google-cloud-aiplatform"],
            vec!["google.cloud.aiplatform".to_string(), "vertexai".to_string()]
        );
    }

    #[test]
    fn nested_modules_do_not_shadow_distributions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("proj")).unwrap();
        std::fs::write(root.join("proj/__init__.py"), "").unwrap();
        std::fs::write(root.join("proj/celery.py"), "from celery import Celery\n").unwrap();
        let set = scan_tree(root).unwrap();

        let empty = Manifest::parse("").unwrap();
        let report = audit(&empty, &set, &ModuleMap::default(), &AuditOptions::default());
        assert_eq!(
            summary(&report),
            vec![(Code::Missing, "celery".to_string(), vec![])]
        );

        let declared = Manifest::parse("celery==5.3.6\n").unwrap();
        let report = audit(&declared, &set, &ModuleMap::default(), &AuditOptions::default());
        assert!(report.findings.is_empty(), "{:?}", report.findings);
    }
}
