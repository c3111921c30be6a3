//! Output formats: terminal text, JSON, and the HTML report.

pub mod html;
pub mod text;

pub use html::render_html_report;
pub use text::{render_audit_text, render_check_text, render_list_text};

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut s = serde_json::to_string_pretty(value)?;
    s.push('\n');
    Ok(s)
}
