//! Compiler-output problem parsing.
//!
//! Converts a captured tool-output buffer into structured problem records,
//! grouped per file. Two line formats are recognized: GCC/Clang
//! (`path:line:col: severity: message`) and, on Windows runs, MSVC
//! (`path(line,col): severity CODE: message`). Everything else is dropped.
//!
//! Each parse pass stands alone — publication through the host sink fully
//! replaces the previous run's problem set, never merges with it.

mod parser;

pub use parser::{ProblemParser, PLATFORM_MSVC};

use host::{Diagnostic, DiagnosticSeverity, Range};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// End-of-capture sentinels in tool stdout. Once either appears, the text
/// before it is the compiler output destined for the parser; the rest is the
/// tool's own run banner and decoration.
pub const RUN_BANNER_SENTINEL: &str = "Run:";
pub const RULE_SENTINEL: &str =
    "--------------------------------------------------------------------------------";

/// Which compiler family produced a problem line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemSource {
    Gcc,
    Msvc,
}

/// Problem severity as emitted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "note" => Some(Self::Note),
            _ => None,
        }
    }
}

/// One parsed problem. `line` and `column` are 1-based, as emitted by the
/// compiler; conversion to the host's 0-based ranges happens in
/// [`CodeProblem::to_diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeProblem {
    pub source: ProblemSource,
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CodeProblem {
    /// Host display form: 0-based half-open range of one character,
    /// note mapped to informational.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let line = self.line.saturating_sub(1);
        let column = self.column.saturating_sub(1);
        Diagnostic {
            range: Range {
                start_line: line,
                start_column: column,
                end_line: line,
                end_column: column + 1,
            },
            severity: match self.severity {
                Severity::Error => DiagnosticSeverity::Error,
                Severity::Warning => DiagnosticSeverity::Warning,
                Severity::Note => DiagnosticSeverity::Information,
            },
            message: self.message.clone(),
            source: match self.source {
                ProblemSource::Gcc => "gcc".to_string(),
                ProblemSource::Msvc => "msvc".to_string(),
            },
            code: self.code.clone(),
        }
    }
}

/// Convert a parse result into the host publication shape.
pub fn to_published(
    problems: &collections::IndexMap<PathBuf, Vec<CodeProblem>>,
) -> Vec<(PathBuf, Vec<Diagnostic>)> {
    problems
        .iter()
        .map(|(file, list)| {
            (
                file.clone(),
                list.iter().map(CodeProblem::to_diagnostic).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_sentinel_is_eighty_dashes() {
        assert_eq!(RULE_SENTINEL.len(), 80);
        assert!(RULE_SENTINEL.bytes().all(|b| b == b'-'));
    }

    #[test]
    fn to_diagnostic_converts_to_zero_based_half_open() {
        let problem = CodeProblem {
            source: ProblemSource::Gcc,
            file: PathBuf::from("/src/main.c"),
            line: 10,
            column: 7,
            severity: Severity::Error,
            message: "boom".into(),
            code: None,
        };
        let diagnostic = problem.to_diagnostic();
        assert_eq!(diagnostic.range.start_line, 9);
        assert_eq!(diagnostic.range.start_column, 6);
        assert_eq!(diagnostic.range.end_line, 9);
        assert_eq!(diagnostic.range.end_column, 7);
    }

    #[test]
    fn to_diagnostic_maps_note_to_information() {
        let problem = CodeProblem {
            source: ProblemSource::Gcc,
            file: PathBuf::from("/src/main.c"),
            line: 1,
            column: 1,
            severity: Severity::Note,
            message: "declared here".into(),
            code: None,
        };
        assert_eq!(
            problem.to_diagnostic().severity,
            DiagnosticSeverity::Information
        );
    }
}
