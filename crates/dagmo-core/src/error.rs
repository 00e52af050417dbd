//! Error types for dagmo-core.

use thiserror::Error;

/// Result type for dagmo-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conversion errors.
///
/// Anything the converter does not recognize is reported as an
/// [`UnsupportedConstructWarning`](crate::diagnostics::UnsupportedConstructWarning)
/// instead; only these three conditions abort a conversion.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is not syntactically valid Python.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The dependency graph between units contains a cycle.
    #[error("cyclic dependency detected: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<String> },

    /// Two units resolve to the same name.
    #[error("duplicate unit name: {0}")]
    DuplicateName(String),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Shift the line number of a parse error by `offset` lines.
    ///
    /// Used when a fragment extracted from a larger file is re-parsed.
    pub fn offset_line(self, offset: usize) -> Self {
        match self {
            Self::Parse { line, message } => Self::Parse {
                line: line + offset,
                message,
            },
            other => other,
        }
    }
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} → {}", cycle.join(" → "), first),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_loop() {
        let err = Error::CyclicDependency {
            cycle: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "cyclic dependency detected: a → b → a");
    }

    #[test]
    fn test_parse_offset() {
        let err = Error::parse(3, "unexpected indent").offset_line(10);
        assert!(matches!(err, Error::Parse { line: 13, .. }));
        assert_eq!(err.to_string(), "parse error at line 13: unexpected indent");
    }
}
