use crate::diagnostics;
use crate::manifest::entry::{Line, Manifest, Requirement};
use crate::manifest::name::{NameError, PackageName};

use anyhow::{Context, anyhow};
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineError {
    #[error("missing package name before {op:?}")]
    MissingName { op: String },

    #[error("missing version after '==' for {name}")]
    MissingVersion { name: String },

    #[error("unsupported version operator {op:?} (only '==' pins are allowed)")]
    UnsupportedOperator { op: String },

    #[error("invalid version {0:?}")]
    InvalidVersion(String),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("cannot parse line: {0:?}")]
    Malformed(String),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// A line error with its 1-based line number.
#[derive(Debug, Error)]
#[error("line {line}: {error}")]
pub struct LocatedLineError {
    pub line: usize,
    pub error: LineError,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{} malformed line(s): {}", .0.len(), join_errors(.0))]
    Malformed(Vec<LocatedLineError>),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

fn join_errors(errors: &[LocatedLineError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compiled patterns for requirement lines.
///
/// Accepted shape (whitespace around the operator is tolerated):
///   name
///   name==version
///   name==version  # inline comment
pub struct LineParser {
    requirement: Regex,
    version: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, regex::Error> {
        // Capture:
        // 1) name: anything up to whitespace or an operator character
        // 2) op: any comparison operator, so non-'==' ones get a precise error
        // 3) version: rest of the body
        const REQ_RE: &str = r#"^([^\s=<>!~]*)\s*(?:(===|==|~=|!=|>=|<=|>|<|=)\s*(.*?))?$"#;
        const VERSION_RE: &str = r#"^[A-Za-z0-9][A-Za-z0-9.+!_*-]*$"#;
        Ok(Self {
            requirement: Regex::new(REQ_RE)?,
            version: Regex::new(VERSION_RE)?,
        })
    }

    pub fn parse_line(&self, text: &str, line: usize) -> Result<Line, LineError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Line::Blank);
        }
        if let Some(comment) = text.strip_prefix('#') {
            return Ok(Line::Comment(comment.to_string()));
        }

        let (body, comment) = split_inline_comment(text);

        let caps = self
            .requirement
            .captures(body)
            .ok_or_else(|| LineError::Malformed(text.to_string()))?;

        let name = caps.get(1).map_or("", |m| m.as_str());
        let op = caps.get(2).map(|m| m.as_str());
        let version = caps.get(3).map_or("", |m| m.as_str());

        if name.is_empty() {
            return Err(match op {
                Some(op) => LineError::MissingName { op: op.to_string() },
                None => LineError::Malformed(text.to_string()),
            });
        }
        let name = PackageName::parse(name)?;

        let version = match op {
            None => None,
            Some("==") if version.is_empty() => {
                return Err(LineError::MissingVersion {
                    name: name.to_string(),
                });
            }
            Some("==") => {
                if !self.version.is_match(version) {
                    return Err(LineError::InvalidVersion(version.to_string()));
                }
                Some(version.to_string())
            }
            Some(op) => {
                return Err(LineError::UnsupportedOperator { op: op.to_string() });
            }
        };

        Ok(Line::Requirement(Requirement {
            name,
            version,
            comment,
            line,
        }))
    }
}

/// Split `body  # comment`. The `#` only starts a comment when whitespace
/// precedes it, so `name#frag` stays in the body (and fails to parse).
fn split_inline_comment(text: &str) -> (&str, Option<String>) {
    let mut prev_ws = false;
    for (i, c) in text.char_indices() {
        if c == '#' && prev_ws {
            let comment = text[i + 1..].trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            return (text[..i].trim_end(), comment);
        }
        prev_ws = c.is_whitespace();
    }
    (text, None)
}

/// Parse a single line with a freshly compiled parser.
pub fn parse_line(text: &str) -> Result<Line, LineError> {
    LineParser::new()?.parse_line(text, 0)
}

impl Manifest {
    /// Parse manifest text. Every malformed line is reported, not just the first.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let parser = LineParser::new()?;

        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut lines = Vec::new();
        let mut errors = Vec::new();
        for (lineno, raw) in text.lines().enumerate() {
            let lno = lineno + 1;
            match parser.parse_line(raw, lno) {
                Ok(line) => lines.push(line),
                Err(error) => errors.push(LocatedLineError { line: lno, error }),
            }
        }

        if !errors.is_empty() {
            return Err(ManifestError::Malformed(errors));
        }
        Ok(Self { lines })
    }

    /// Read and parse a manifest file. Malformed lines are reported one per
    /// line as `path:line: message`.
    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::read_with_text(path).map(|(_, m)| m)
    }

    /// Like [`Manifest::read`], but also hands back the file text as read.
    pub fn read_with_text(path: impl AsRef<Path>) -> anyhow::Result<(String, Self)> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| {
            diagnostics::error_message(format!("read manifest file {}", path.display()))
        })?;

        match Self::parse(&text) {
            Ok(m) => Ok((text, m)),
            Err(ManifestError::Malformed(errors)) => {
                let report = errors
                    .iter()
                    .map(|e| diagnostics::located(path.display(), e.line, &e.error))
                    .collect::<Vec<_>>()
                    .join("\n");
                Err(anyhow!(
                    "{} malformed line(s) in {}:\n{}",
                    errors.len(),
                    path.display(),
                    report
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn req(line: Line) -> Requirement {
        match line {
            Line::Requirement(r) => r,
            other => panic!("expected requirement, got {:?}", other),
        }
    }

    #[test]
    fn parses_pinned_requirement() {
        let r = req(parse_line("flask==2.0.1").unwrap());
        assert_eq!(r.name.as_str(), "flask");
        assert_eq!(r.version.as_deref(), Some("2.0.1"));
        assert_eq!(r.comment, None);
    }

    #[test]
    fn parses_unpinned_requirement() {
        let r = req(parse_line("numpy").unwrap());
        assert_eq!(r.name.as_str(), "numpy");
        assert_eq!(r.version, None);
    }

    #[test]
    fn tolerates_whitespace_around_operator() {
        let r = req(parse_line("  boto3 == 1.34.0   ").unwrap());
        assert_eq!(r.name.as_str(), "boto3");
        assert_eq!(r.version.as_deref(), Some("1.34.0"));
    }

    #[test]
    fn keeps_inline_comment() {
        let r = req(parse_line("cohere==5.5.8   # embeddings").unwrap());
        assert_eq!(r.version.as_deref(), Some("5.5.8"));
        assert_eq!(r.comment.as_deref(), Some("embeddings"));
    }

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(parse_line("   ").unwrap(), Line::Blank);
        assert_eq!(
            parse_line("# remove invalid entry").unwrap(),
            Line::Comment(" remove invalid entry".to_string())
        );
    }

    #[test]
    fn rejects_missing_name() {
        assert!(matches!(
            parse_line("==1.0"),
            Err(LineError::MissingName { op }) if op == "=="
        ));
    }

    #[test]
    fn rejects_missing_version() {
        assert!(matches!(
            parse_line("flask=="),
            Err(LineError::MissingVersion { name }) if name == "flask"
        ));
    }

    #[test]
    fn rejects_other_operators() {
        for (line, expected) in [
            ("flask>=2.0", ">="),
            ("flask ~= 2.0", "~="),
            ("flask!=2.0", "!="),
            ("flask===2.0", "==="),
            ("flask=2.0", "="),
        ] {
            match parse_line(line) {
                Err(LineError::UnsupportedOperator { op }) => assert_eq!(op, expected),
                other => panic!("{}: unexpected {:?}", line, other),
            }
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_line("flask numpy"),
            Err(LineError::Malformed(_))
        ));
        assert!(matches!(
            parse_line("flask==2.0 extra"),
            Err(LineError::InvalidVersion(v)) if v == "2.0 extra"
        ));
        assert!(matches!(
            parse_line("flask#frag"),
            Err(LineError::Name(NameError::InvalidChar { ch: '#', .. }))
        ));
        assert!(matches!(
            parse_line("-r base.txt"),
            Err(LineError::Malformed(_))
        ));
    }

    #[test]
    fn manifest_reports_every_bad_line() {
        let text = "flask==2.0.1\n==1.0\nnumpy\nrequests>=2\n";
        let err = Manifest::parse(text).unwrap_err();
        match err {
            ManifestError::Malformed(errors) => {
                let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
                assert_eq!(lines, vec![2, 4]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn manifest_records_line_numbers_and_crlf() {
        let m = Manifest::parse("# deps\r\n\r\nflask==2.0.1\r\nnumpy\r\n").unwrap();
        let got: Vec<(String, usize)> = m
            .requirements()
            .map(|r| (r.name.to_string(), r.line))
            .collect();
        assert_eq!(
            got,
            vec![("flask".to_string(), 3), ("numpy".to_string(), 4)]
        );
        assert_eq!(m.lines[0], Line::Comment(" deps".to_string()));
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let m = Manifest::parse("\u{feff}flask==2.0.1\nnumpy\n").unwrap();
        let names: Vec<String> = m.requirements().map(|r| r.name.to_string()).collect();
        assert_eq!(names, vec!["flask".to_string(), "numpy".to_string()]);
    }

    #[test]
    fn read_prefixes_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.txt");
        fs::write(&path, "flask\n==1.0\n").unwrap();

        let msg = Manifest::read(&path).unwrap_err().to_string();
        assert!(msg.contains("requirements.txt:2: missing package name"), "{}", msg);
    }

    #[test]
    fn read_missing_file_mentions_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let msg = format!("{:#}", Manifest::read(&path).unwrap_err());
        assert!(msg.contains("nope.txt"), "{}", msg);

        let msg = format!("{:#}", Manifest::read_with_text(&path).unwrap_err());
        assert!(msg.contains("read manifest file") && msg.contains("nope.txt"), "{}", msg);
    }

    #[test]
    fn read_with_text_returns_the_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.txt");
        fs::write(&path, "flask==2.0.1\r\n\r\n\r\nnumpy\r\n").unwrap();

        let (text, m) = Manifest::read_with_text(&path).unwrap();
        assert_eq!(text, "flask==2.0.1\r\n\r\n\r\nnumpy\r\n");
        assert_eq!(m.requirements().count(), 2);
    }
}
