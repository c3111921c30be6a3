//! Shared message formatting and warning emission.
//!
//! Errors are returned to `main`, which prints them once; warnings go through
//! `tracing` so `RUST_LOG` controls them.

use std::fmt::Display;

/// Normalize an error message: single line, no trailing punctuation.
pub fn error_message(msg: impl Into<String>) -> String {
    let msg = msg.into();
    let one_line = msg.split_whitespace().collect::<Vec<_>>().join(" ");
    one_line.trim_end_matches(['.', ':']).to_string()
}

/// Prefix a message with a `path:line` location.
pub fn located(path: impl Display, line: usize, msg: impl Display) -> String {
    format!("{}:{}: {}", path, line, msg)
}

pub fn warn(msg: impl Into<String>) {
    let msg = msg.into();
    tracing::warn!("{}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_collapses_whitespace() {
        assert_eq!(
            error_message("cannot parse\n   line 3.  "),
            "cannot parse line 3"
        );
    }

    #[test]
    fn located_uses_path_line_prefix() {
        assert_eq!(
            located("requirements.txt", 7, "duplicate entry"),
            "requirements.txt:7: duplicate entry"
        );
    }
}
