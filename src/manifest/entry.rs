use crate::manifest::name::PackageName;
use serde::Serialize;

/// A single dependency record: `name` or `name==version`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Requirement {
    #[serde(flatten)]
    pub name: PackageName,
    pub version: Option<String>,
    /// Inline comment after the requirement, without the leading `#`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// 1-based line in the source file (0 when built in memory).
    pub line: usize,
}

impl Requirement {
    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }
}

/// One manifest line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Blank,
    /// Text after the `#`, kept verbatim.
    Comment(String),
    Requirement(Requirement),
}

/// A parsed manifest. Lines keep file order so formatting is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub(crate) lines: Vec<Line>,
}

impl Manifest {
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.lines.iter().filter_map(|l| match l {
            Line::Requirement(r) => Some(r),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements().next().is_none()
    }
}
