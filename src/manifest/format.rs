//! Canonical serialization and cleanup of parsed manifests.

use crate::manifest::entry::{Line, Manifest, Requirement};
use std::collections::BTreeMap;
use std::fmt;

impl Requirement {
    /// `name`, `name==version`, plus `  # comment` when present.
    pub fn render(&self) -> String {
        let mut out = self.name.to_string();
        if let Some(v) = &self.version {
            out.push_str("==");
            out.push_str(v);
        }
        if let Some(c) = &self.comment {
            out.push_str("  # ");
            out.push_str(c);
        }
        out
    }
}

impl Manifest {
    /// Canonical text: one record per line, comment text kept verbatim,
    /// blank runs collapsed, no leading/trailing blank lines.
    pub fn render(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut pending_blank = false;
        for line in &self.lines {
            let rendered = match line {
                Line::Blank => {
                    pending_blank = !out.is_empty();
                    continue;
                }
                Line::Comment(text) => format!("#{}", text),
                Line::Requirement(r) => r.render(),
            };
            if pending_blank {
                out.push(String::new());
                pending_blank = false;
            }
            out.push(rendered);
        }

        if out.is_empty() {
            return String::new();
        }
        let mut text = out.join("\n");
        text.push('\n');
        text
    }

    /// Remove redundant records: repeats of the same pin, and unpinned
    /// repeats of a pinned package. Packages with conflicting pins are left
    /// alone. Returns the removed records in file order.
    pub fn dedupe(&mut self) -> Vec<Requirement> {
        // normalized name -> (distinct pins, index of the line to keep)
        let mut groups: BTreeMap<String, (Vec<String>, usize)> = BTreeMap::new();
        for (idx, line) in self.lines.iter().enumerate() {
            let Line::Requirement(r) = line else {
                continue;
            };
            let entry = groups
                .entry(r.name.normalized().to_string())
                .or_insert_with(|| (Vec::new(), idx));
            if let Some(v) = &r.version {
                if entry.0.is_empty() {
                    entry.1 = idx;
                }
                if !entry.0.contains(v) {
                    entry.0.push(v.clone());
                }
            }
        }

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.lines.len());
        for (idx, line) in std::mem::take(&mut self.lines).into_iter().enumerate() {
            let redundant = match &line {
                Line::Requirement(r) => groups
                    .get(r.name.normalized())
                    .is_some_and(|(pins, keep)| pins.len() <= 1 && *keep != idx),
                _ => false,
            };
            match line {
                Line::Requirement(r) if redundant => removed.push(r),
                other => kept.push(other),
            }
        }
        self.lines = kept;
        removed
    }
}

/// Result of formatting a manifest against the text it was read from.
#[derive(Debug)]
pub struct FmtOutcome {
    pub rendered: String,
    /// The source text already matched `rendered` byte for byte.
    pub canonical: bool,
    /// Records dropped by dedupe, in file order.
    pub removed: Vec<Requirement>,
}

impl Manifest {
    pub fn format_against(mut self, original: &str, dedupe: bool) -> FmtOutcome {
        let removed = if dedupe { self.dedupe() } else { Vec::new() };
        let rendered = self.render();
        FmtOutcome {
            canonical: rendered == original,
            rendered,
            removed,
        }
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
