//! Lightweight structural validation of raw DBML text.
//!
//! Runs without the parser so malformed input can be rejected up front. The
//! parser remains the secondary safety net.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} ({}): {}", self.line, self.severity, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }
}

/// Validates DBML text. Never fails; `valid` is false iff an error-severity
/// issue was recorded.
pub fn validate(text: &str) -> ValidationReport {
    let lines: Vec<&str> = text.lines().collect();
    let mut errors = Vec::new();
    let mut balance: i64 = 0;
    // Brace depth at which the current table body sits.
    let mut table_depth: Option<i64> = None;

    if text.trim().is_empty() {
        errors.push(ValidationIssue {
            line: 1,
            message: "Schema is empty".to_string(),
            severity: Severity::Warning,
        });
    }

    for (index, raw) in lines.iter().enumerate() {
        let line = strip_line_comment(raw).trim();
        if line.is_empty() || line.starts_with("/*") || line.starts_with('*') {
            continue;
        }

        if table_depth.is_some_and(|depth| balance >= depth) && is_ref_declaration(line) {
            errors.push(ValidationIssue {
                line: index + 1,
                message: "Ref declaration inside a table block; declare it at the top level \
                          or use an inline [ref: ...] setting"
                    .to_string(),
                severity: Severity::Error,
            });
        }

        if is_table_header(line) && table_depth.is_none() {
            table_depth = Some(balance + 1);
        }

        if is_table_header(line) && !line.contains('{') {
            let next_opens = lines
                .get(index + 1)
                .map(|next| strip_line_comment(next).trim_start().starts_with('{'))
                .unwrap_or(false);
            if !next_opens {
                errors.push(ValidationIssue {
                    line: index + 1,
                    message: format!(
                        "Table declaration '{line}' has no opening brace on this or the next line"
                    ),
                    severity: Severity::Error,
                });
            }
        }

        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;
        if opens > 0 && closes > 0 && opens != closes {
            errors.push(ValidationIssue {
                line: index + 1,
                message: format!("Mismatched braces on one line ({opens} '{{' vs {closes} '}}')"),
                severity: Severity::Warning,
            });
        }
        balance += opens - closes;
        let brace_pending = is_table_header(line) && opens == 0;
        if !brace_pending && table_depth.is_some_and(|depth| balance < depth) {
            table_depth = None;
        }
    }

    if balance != 0 {
        errors.push(ValidationIssue {
            line: lines.len().max(1),
            message: format!("Unbalanced braces in document (net {balance:+})"),
            severity: Severity::Warning,
        });
    }

    let valid = !errors.iter().any(|issue| issue.severity == Severity::Error);
    ValidationReport { valid, errors }
}

/// `Ref: ...`, `Ref name: ...` or `Ref {`; a column named `ref` has no colon
/// before its settings.
fn is_ref_declaration(line: &str) -> bool {
    let head = line.split('[').next().unwrap_or_default();
    let first = head
        .split(|c: char| c.is_whitespace() || c == ':' || c == '{')
        .next()
        .unwrap_or_default();
    first.eq_ignore_ascii_case("ref") && (head.contains(':') || head.contains('{'))
}

fn is_table_header(line: &str) -> bool {
    let mut words = line.split_whitespace();
    matches!(words.next(), Some(word) if word.eq_ignore_ascii_case("table"))
        && words.next().is_some()
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_schema_is_valid() {
        let report = validate("Table users {\n  id int [pk]\n}\n");
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_brace_on_next_line_is_accepted() {
        let report = validate("Table users\n{\n  id int\n}\n");
        assert!(report.valid);
    }

    #[test]
    fn test_table_without_brace_is_an_error() {
        let report = validate("Table users\n  id int\n}\n");
        assert!(!report.valid);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].line, 1);
        assert_eq!(report.errors[0].severity, Severity::Error);
    }

    #[test]
    fn test_ref_inside_table_is_an_error() {
        let report = validate("Table a {\n  id int [pk]\n  Ref: a.id > b.id\n}\n");
        assert!(!report.valid);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].line, 3);
        assert!(report.errors[0].message.contains("Ref declaration"));
    }

    #[test]
    fn test_ref_inside_table_with_brace_on_next_line() {
        let report = validate("Table a\n{\n  id int\n  ref items: a.id < b.a_id\n}\n");
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].line, 4);
    }

    #[test]
    fn test_top_level_ref_and_ref_column_are_valid() {
        let text = "Table a {\n  id int [pk]\n  ref varchar [note: 'code']\n}\n\nRef: a.id > b.id\n";
        let report = validate(text);
        assert!(report.valid, "unexpected issues: {:?}", report.errors);
    }

    #[test]
    fn test_mismatched_braces_on_a_line_is_a_warning() {
        let report = validate("Table t { id int }}\n");
        assert!(report.valid);
        let warnings: Vec<_> = report.warnings().collect();
        assert!(warnings
            .iter()
            .any(|w| w.line == 1 && w.message.contains("Mismatched")));
        assert!(warnings.iter().any(|w| w.message.contains("Unbalanced")));
    }

    #[test]
    fn test_empty_schema_warns_but_stays_valid() {
        let report = validate("   \n");
        assert!(report.valid);
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_comments_are_ignored() {
        let report = validate("// Table ghost\nTable users { // trailing }\n  id int\n}\n");
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }
}
