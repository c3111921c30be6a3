//! Import scanning for Python sources.
//!
//! Only the module path matters, so we match `import ...` and
//! `from ... import ...` statements line by line and reduce each to its
//! top-level key. Namespace packages under `google` keep enough segments to
//! tell `google.cloud.storage` from `google.cloud.aiplatform`.

use crate::diagnostics;

use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
const SKIP_DIRS: &[&str] = &[
    "__pycache__",
    "env",
    "node_modules",
    "site-packages",
    "venv",
];

/// Where a module was first imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSite {
    pub file: PathBuf,
    pub line: usize,
}

/// Imports found under a source tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSet {
    /// Module key -> first import site.
    pub modules: BTreeMap<String, ImportSite>,
    /// Names the tree itself provides: directories and `.py` stems directly
    /// under the root.
    pub local: BTreeSet<String>,
    pub files_scanned: usize,
}

pub struct ImportScanner {
    import_re: Regex,
    from_re: Regex,
}

impl ImportScanner {
    pub fn new() -> anyhow::Result<Self> {
        // import a, b.c as d
        const IMPORT_RE: &str = r#"^\s*import\s+(.+?)\s*$"#;
        // from a.b import c, d   /   from . import x   /   from .m import (y, z)
        const FROM_RE: &str = r#"^\s*from\s+(\.*)([A-Za-z_][\w.]*)?\s+import\s+(.+?)\s*$"#;
        Ok(Self {
            import_re: Regex::new(IMPORT_RE)?,
            from_re: Regex::new(FROM_RE)?,
        })
    }

    /// Module keys with their 1-based line numbers, in source order.
    ///
    /// A `from` statement continued with `(` or a trailing `\` is joined
    /// with its following lines and reported at the line it starts on.
    pub fn scan_text(&self, src: &str) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        let mut lines = src.lines().enumerate().peekable();
        while let Some((lineno, raw)) = lines.next() {
            let lno = lineno + 1;
            let mut line = strip_comment(raw).to_string();

            while self.from_re.is_match(&line) && is_continued(&line) {
                let Some((_, next)) = lines.next_if(|(_, next)| !self.starts_import(next)) else {
                    break;
                };
                if let Some(head) = line.trim_end().strip_suffix('\\') {
                    line = head.to_string();
                }
                line.push(' ');
                line.push_str(strip_comment(next));
            }

            if let Some(caps) = self.from_re.captures(&line) {
                let dots = caps.get(1).map_or("", |m| m.as_str());
                let Some(module) = caps.get(2).map(|m| m.as_str()) else {
                    continue;
                };
                if !dots.is_empty() {
                    continue;
                }
                if is_namespace(module) {
                    // A bare namespace names no distribution.
                    let names = caps.get(3).map_or("", |m| m.as_str());
                    for name in imported_names(names) {
                        out.push((module_key(&format!("{}.{}", module, name)), lno));
                    }
                } else {
                    out.push((module_key(module), lno));
                }
                continue;
            }

            if let Some(caps) = self.import_re.captures(&line) {
                let list = caps.get(1).map_or("", |m| m.as_str());
                for part in list.split(',') {
                    let path = part.split_whitespace().next().unwrap_or("");
                    if is_dotted_ident(path) {
                        out.push((module_key(path), lno));
                    }
                }
            }
        }
        out
    }

    fn starts_import(&self, line: &str) -> bool {
        let line = strip_comment(line);
        self.from_re.is_match(line) || self.import_re.is_match(line)
    }
}

/// Top-level module keys imported by `src`.
pub fn scan_imports_in_text(src: &str) -> anyhow::Result<BTreeSet<String>> {
    let scanner = ImportScanner::new()?;
    Ok(scanner.scan_text(src).into_iter().map(|(k, _)| k).collect())
}

/// Walk `root` for `*.py` files and collect their imports.
pub fn scan_tree(root: impl AsRef<Path>) -> anyhow::Result<ImportSet> {
    let root = root.as_ref();
    if !root.is_dir() {
        anyhow::bail!(
            "{}",
            diagnostics::error_message(format!("source directory {} not found", root.display()))
        );
    }

    let scanner = ImportScanner::new()?;
    let mut set = ImportSet::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        let path = entry.path();

        // Only entries directly under the root are importable by bare name.
        if entry.file_type().is_dir() {
            if entry.depth() == 1 {
                if let Some(name) = entry.file_name().to_str() {
                    set.local.insert(name.to_string());
                }
            }
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }
        if entry.depth() == 1 {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                set.local.insert(stem.to_string());
            }
        }

        let src = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                diagnostics::warn(format!("skipping {}: {}", path.display(), e));
                continue;
            }
        };
        set.files_scanned += 1;

        let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        for (module, line) in scanner.scan_text(&src) {
            set.modules.entry(module).or_insert_with(|| ImportSite {
                file: rel.clone(),
                line,
            });
        }
    }

    tracing::debug!(
        files = set.files_scanned,
        modules = set.modules.len(),
        "scanned {}",
        root.display()
    );
    Ok(set)
}

fn is_skipped_dir(e: &DirEntry) -> bool {
    if e.depth() == 0 || !e.file_type().is_dir() {
        return false;
    }
    let name = e.file_name().to_string_lossy();
    name.starts_with('.') || SKIP_DIRS.iter().any(|d| *d == name)
}

/// Reduce a dotted path to its key: `a.b.c` -> `a`, but
/// `google.cloud.storage.blob` -> `google.cloud.storage` and
/// `google.protobuf.json_format` -> `google.protobuf`.
pub fn module_key(path: &str) -> String {
    let segs: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    match segs.as_slice() {
        ["google", "cloud", third, ..] => format!("google.cloud.{}", third),
        ["google", second, ..] => format!("google.{}", second),
        [first, ..] => first.to_string(),
        [] => String::new(),
    }
}

/// An open `(` or a trailing `\` carries the statement onto the next line.
fn is_continued(line: &str) -> bool {
    let line = line.trim_end();
    line.ends_with('\\') || (line.contains('(') && !line.contains(')'))
}

fn is_namespace(module: &str) -> bool {
    matches!(module, "google" | "google.cloud")
}

fn imported_names(list: &str) -> impl Iterator<Item = &str> {
    list.trim_matches(|c| c == '(' || c == ')' || c == '\\')
        .split(',')
        .filter_map(|p| p.split_whitespace().next())
        .filter(|p| is_dotted_ident(p))
}

fn is_dotted_ident(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|seg| {
            let mut chars = seg.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(src: &str) -> Vec<String> {
        scan_imports_in_text(src).unwrap().into_iter().collect()
    }

    #[test]
    fn plain_and_aliased_imports() {
        let src = "import os\nimport numpy as np\nimport json, base64\nimport xml.etree.ElementTree as ET\n";
        assert_eq!(keys(src), vec!["base64", "json", "numpy", "os", "xml"]);
    }

    #[test]
    fn from_imports_and_relative_skips() {
        let src = "\
from flask import Blueprint, request, jsonify
from sklearn.metrics.pairwise import cosine_similarity
from . import helpers
from .services import voyage_service
from PIL import Image
";
        assert_eq!(keys(src), vec!["PIL", "flask", "sklearn"]);
    }

    #[test]
    fn nested_and_commented_imports() {
        let src = "\
def create_app():
    # import should_not_count
    from app.services.vertex_service import initialize_vertex_ai
    import boto3  # aws
";
        assert_eq!(keys(src), vec!["app", "boto3"]);
    }

    #[test]
    fn google_namespace_keeps_subpackage() {
        let src = "\
from google.cloud import aiplatform, storage
from google.cloud.aiplatform.gapic import schema
import google.generativeai as genai
from google.protobuf import json_format
from google import auth
";
        assert_eq!(
            keys(src),
            vec![
                "google.auth",
                "google.cloud.aiplatform",
                "google.cloud.storage",
                "google.generativeai",
                "google.protobuf",
            ]
        );
    }

    #[test]
    fn star_and_parenthesized_from_imports() {
        let src = "\
from google.cloud import (
    aiplatform,  # models
    storage,
)
from os.path import *
from google import *
";
        assert_eq!(
            keys(src),
            vec!["google.cloud.aiplatform", "google.cloud.storage", "os"]
        );
    }

    #[test]
    fn continued_from_imports_keep_their_first_line() {
        let src = "\
import json
from google.cloud import \\
    bigquery, storage
from google.cloud import (
from flask import Flask
";
        let scanner = ImportScanner::new().unwrap();
        assert_eq!(
            scanner.scan_text(src),
            vec![
                ("json".to_string(), 1),
                ("google.cloud.bigquery".to_string(), 2),
                ("google.cloud.storage".to_string(), 2),
                ("flask".to_string(), 5),
            ]
        );
    }

    #[test]
    fn module_key_cases() {
        assert_eq!(module_key("a.b.c"), "a");
        assert_eq!(module_key("google.cloud.storage.blob"), "google.cloud.storage");
        assert_eq!(module_key("google.cloud"), "google.cloud");
        assert_eq!(module_key("google"), "google");
    }

    #[test]
    fn scan_tree_records_sites_and_local_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/services")).unwrap();
        fs::create_dir_all(root.join(".venv/lib")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("app/__init__.py"), "from flask import Flask\n").unwrap();
        fs::write(root.join("app/services/__init__.py"), "").unwrap();
        fs::write(
            root.join("app/services/cohere_service.py"),
            "import os\nimport cohere\nfrom app.utils import x\n",
        )
        .unwrap();
        fs::write(root.join("run.py"), "from app import create_app\n").unwrap();
        fs::write(root.join(".venv/lib/hidden.py"), "import hidden_dep\n").unwrap();
        fs::write(root.join("__pycache__/cached.py"), "import cached_dep\n").unwrap();
        fs::write(root.join("notes.txt"), "import not_python\n").unwrap();

        let set = scan_tree(root).unwrap();
        assert_eq!(set.files_scanned, 4);
        assert_eq!(
            set.modules.keys().cloned().collect::<Vec<_>>(),
            vec!["app", "cohere", "flask", "os"]
        );
        assert_eq!(
            set.modules["cohere"],
            ImportSite {
                file: PathBuf::from("app/services/cohere_service.py"),
                line: 2,
            }
        );
        assert!(set.local.contains("app"));
        assert!(set.local.contains("run"));
        assert!(!set.local.contains("services"));
        assert!(!set.local.contains("cohere_service"));
        assert!(!set.local.contains("hidden"));
    }

    #[test]
    fn scan_tree_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_tree(dir.path().join("missing")).is_err());
    }
}
