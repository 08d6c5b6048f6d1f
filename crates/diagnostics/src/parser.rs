//! The line-oriented problem parser.

use crate::{CodeProblem, ProblemSource, Severity};
use collections::{FxHashSet, IndexMap};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Whether this build is a Windows-platform run (enables MSVC patterns).
pub const PLATFORM_MSVC: bool = cfg!(windows);

/// Stateless text-to-problem converter. Construct once and reuse; each
/// [`parse`](ProblemParser::parse) call is an independent pass.
pub struct ProblemParser {
    gcc: Regex,
    msvc: Regex,
    msvc_tolerant: Regex,
    msvc_enabled: bool,
}

impl ProblemParser {
    pub fn new(msvc_enabled: bool) -> Self {
        Self {
            // path:line:col: severity: message
            gcc: Regex::new(r"^(.+?):(\d+):(\d+):\s+(error|warning|note):\s+(.+)$")
                .expect("gcc pattern is valid"),
            // path(line,col): severity CODE: message
            msvc: Regex::new(r"^(.+?)\((\d+),(\d+)\):\s+(error|warning)\s+([A-Z]+\d+):\s+(.+)$")
                .expect("msvc pattern is valid"),
            // note-tolerant variant; the code is optional
            msvc_tolerant: Regex::new(
                r"^(.+?)\((\d+),(\d+)\):\s+(error|warning|note)(?:\s+([A-Z]+\d+))?:\s+(.+)$",
            )
            .expect("msvc tolerant pattern is valid"),
            msvc_enabled,
        }
    }

    /// Parse one captured buffer into problems grouped by file.
    ///
    /// Lines are de-duplicated by raw content within the pass. Paths that do
    /// not exist on disk are re-resolved relative to `cwd` (splitting on both
    /// separators, so relative and mixed-separator tool output resolves).
    /// Unmatched lines are dropped. An empty buffer yields an empty map.
    pub fn parse(&self, buffer: &str, cwd: &Path) -> IndexMap<PathBuf, Vec<CodeProblem>> {
        let mut problems: IndexMap<PathBuf, Vec<CodeProblem>> = IndexMap::default();
        let mut seen: FxHashSet<&str> = FxHashSet::default();

        for line in buffer.lines() {
            let line = line.trim_end();
            if line.is_empty() || !seen.insert(line) {
                continue;
            }
            if let Some(problem) = self.parse_line(line, cwd) {
                problems.entry(problem.file.clone()).or_default().push(problem);
            }
        }
        problems
    }

    fn parse_line(&self, line: &str, cwd: &Path) -> Option<CodeProblem> {
        if let Some(captures) = self.gcc.captures(line) {
            return Some(CodeProblem {
                source: ProblemSource::Gcc,
                file: resolve_path(&captures[1], cwd),
                line: captures[2].parse().ok()?,
                column: captures[3].parse().ok()?,
                severity: Severity::parse(&captures[4])?,
                message: captures[5].to_string(),
                code: None,
            });
        }
        if !self.msvc_enabled {
            return None;
        }
        if let Some(captures) = self.msvc.captures(line) {
            return Some(CodeProblem {
                source: ProblemSource::Msvc,
                file: resolve_path(&captures[1], cwd),
                line: captures[2].parse().ok()?,
                column: captures[3].parse().ok()?,
                severity: Severity::parse(&captures[4])?,
                message: captures[6].to_string(),
                code: Some(captures[5].to_string()),
            });
        }
        if let Some(captures) = self.msvc_tolerant.captures(line) {
            return Some(CodeProblem {
                source: ProblemSource::Msvc,
                file: resolve_path(&captures[1], cwd),
                line: captures[2].parse().ok()?,
                column: captures[3].parse().ok()?,
                severity: Severity::parse(&captures[4])?,
                message: captures[6].to_string(),
                // absent code stays absent, never an empty string
                code: captures.get(5).map(|m| m.as_str().to_string()),
            });
        }
        None
    }
}

impl Default for ProblemParser {
    fn default() -> Self {
        Self::new(PLATFORM_MSVC)
    }
}

/// Re-resolve a captured path against the working directory when it does not
/// exist on disk. Splits on both `/` and `\` and rejoins with the platform
/// separator, so tools that emit relative or mixed-separator paths resolve.
fn resolve_path(raw: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.exists() {
        return path;
    }
    let mut resolved = cwd.to_path_buf();
    for part in raw.split(['/', '\\']).filter(|part| !part.is_empty()) {
        resolved.push(part);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gcc_parser() -> ProblemParser {
        ProblemParser::new(false)
    }

    fn msvc_parser() -> ProblemParser {
        ProblemParser::new(true)
    }

    #[test]
    fn parses_gcc_error_line() {
        let parser = gcc_parser();
        let buffer = "/src/main.c:10:7: error: incompatible integer to pointer conversion";
        let problems = parser.parse(buffer, Path::new("/"));

        assert_eq!(problems.len(), 1);
        let list = &problems[&PathBuf::from("/src/main.c")];
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].source, ProblemSource::Gcc);
        assert_eq!(list[0].line, 10);
        assert_eq!(list[0].column, 7);
        assert_eq!(list[0].severity, Severity::Error);
        assert_eq!(
            list[0].message,
            "incompatible integer to pointer conversion"
        );
    }

    #[test]
    fn parses_gcc_warning_and_note() {
        let parser = gcc_parser();
        let buffer = "\
/src/a.c:3:1: warning: unused variable 'x'
/src/a.c:1:1: note: declared here";
        let problems = parser.parse(buffer, Path::new("/"));
        let list = &problems[&PathBuf::from("/src/a.c")];
        assert_eq!(list[0].severity, Severity::Warning);
        assert_eq!(list[1].severity, Severity::Note);
    }

    #[test]
    fn empty_buffer_yields_empty_map() {
        let parser = gcc_parser();
        assert!(parser.parse("", Path::new("/")).is_empty());
    }

    #[test]
    fn unmatched_lines_are_dropped() {
        let parser = gcc_parser();
        let buffer = "\
Compiling main.c
   Linking app
/src/main.c:2:5: error: expected ';'";
        let problems = parser.parse(buffer, Path::new("/"));
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[&PathBuf::from("/src/main.c")].len(), 1);
    }

    #[test]
    fn duplicate_lines_are_collapsed_within_one_pass() {
        let parser = gcc_parser();
        let buffer = "\
/src/main.c:2:5: error: expected ';'
/src/main.c:2:5: error: expected ';'";
        let problems = parser.parse(buffer, Path::new("/"));
        assert_eq!(problems[&PathBuf::from("/src/main.c")].len(), 1);
    }

    #[test]
    fn each_parse_pass_stands_alone() {
        let parser = gcc_parser();
        let first = parser.parse("/src/a.c:1:1: error: one", Path::new("/"));
        let second = parser.parse("/src/b.c:2:2: error: two", Path::new("/"));

        // No carry-over: the second pass neither merges nor suppresses.
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(second.contains_key(&PathBuf::from("/src/b.c")));
        assert!(!second.contains_key(&PathBuf::from("/src/a.c")));
    }

    #[test]
    fn msvc_line_with_code() {
        let parser = msvc_parser();
        let buffer = r"C:\src\main.cpp(12,34): error C2065: 'x': undeclared identifier";
        let problems = parser.parse(buffer, Path::new("/work"));

        let (_, list) = problems.first().unwrap();
        assert_eq!(list[0].source, ProblemSource::Msvc);
        assert_eq!(list[0].line, 12);
        assert_eq!(list[0].column, 34);
        assert_eq!(list[0].code.as_deref(), Some("C2065"));
    }

    #[test]
    fn msvc_note_without_code_has_no_code_field() {
        let parser = msvc_parser();
        let buffer = r"C:\src\main.cpp(4,2): note: see declaration of 'x'";
        let problems = parser.parse(buffer, Path::new("/work"));

        let (_, list) = problems.first().unwrap();
        assert_eq!(list[0].severity, Severity::Note);
        assert_eq!(list[0].code, None);
    }

    #[test]
    fn msvc_lines_ignored_outside_windows_mode() {
        let parser = gcc_parser();
        let buffer = r"C:\src\main.cpp(12,34): error C2065: 'x': undeclared identifier";
        assert!(parser.parse(buffer, Path::new("/work")).is_empty());
    }

    #[test]
    fn relative_path_resolves_against_cwd() {
        let parser = gcc_parser();
        let problems = parser.parse("src/lib.c:1:1: error: nope", Path::new("/work"));
        assert!(problems.contains_key(&PathBuf::from("/work/src/lib.c")));
    }

    #[test]
    fn mixed_separator_path_resolves_against_cwd() {
        let parser = msvc_parser();
        let buffer = r"src\win/io.cpp(7,1): error C1004: unexpected end of file";
        let problems = parser.parse(buffer, Path::new("/work"));
        let expected: PathBuf = [Path::new("/work"), Path::new("src"), Path::new("win"), Path::new("io.cpp")]
            .iter()
            .collect();
        assert!(problems.contains_key(&expected));
    }

    #[test]
    fn existing_path_is_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.c");
        std::fs::write(&file, "int main;").unwrap();

        let parser = gcc_parser();
        let buffer = format!("{}:1:5: error: boom", file.display());
        let problems = parser.parse(&buffer, Path::new("/elsewhere"));
        assert!(problems.contains_key(&file));
    }

    #[test]
    fn problems_keep_compiler_order_per_file() {
        let parser = gcc_parser();
        let buffer = "\
/src/a.c:9:1: warning: later line first
/src/a.c:2:1: error: earlier line second";
        let problems = parser.parse(buffer, Path::new("/"));
        let list = &problems[&PathBuf::from("/src/a.c")];
        assert_eq!(list[0].line, 9);
        assert_eq!(list[1].line, 2);
    }
}
