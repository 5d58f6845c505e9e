#![forbid(unsafe_code)]

use std::path::Path;

use bound_ast::{Program, Span};
use bound_parse::ParseError;
use bound_verify::{ProgramReport, StatementOutcome, Verdict};
use serde::Serialize;

pub const REPORT_SCHEMA: &str = "bound.check-report.v1";

#[derive(Debug, Clone, Serialize)]
pub struct SpanRange {
    pub offset: usize,
    pub len: usize,
}

impl From<Span> for SpanRange {
    fn from(s: Span) -> Self {
        Self {
            offset: s.offset(),
            len: s.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub statements: usize,
    pub satisfied: usize,
    pub violated: usize,
    pub unknown: usize,
    pub errors: usize,
}

impl Summary {
    pub fn of(report: &ProgramReport) -> Self {
        let mut out = Summary {
            statements: report.statements.len(),
            ..Summary::default()
        };
        for s in &report.statements {
            match s {
                StatementOutcome::Failed(_) => out.errors += 1,
                StatementOutcome::Checked(r) => match &r.verdict {
                    Some(Verdict::Satisfied) => out.satisfied += 1,
                    Some(Verdict::Violated(_)) => out.violated += 1,
                    Some(Verdict::Unknown) => out.unknown += 1,
                    None => {}
                },
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementSpan {
    pub name: String,
    pub span: SpanRange,
}

/// A statement the parser skipped.
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxErrorEntry {
    pub line: usize,
    pub message: String,
    pub span: SpanRange,
}

impl From<&ParseError> for SyntaxErrorEntry {
    fn from(e: &ParseError) -> Self {
        Self {
            line: e.line,
            message: e.message.clone(),
            span: e.span.into(),
        }
    }
}

/// The JSON document printed by `bound check --json`.
#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    pub schema: &'static str,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub ok: bool,
    pub summary: Summary,
    pub spans: Vec<StatementSpan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub syntax_errors: Vec<SyntaxErrorEntry>,
    #[serde(flatten)]
    pub report: &'a ProgramReport,
}

impl<'a> CheckReport<'a> {
    pub fn new(
        input: &Path,
        config: Option<&Path>,
        program: &Program,
        syntax_errors: &[ParseError],
        report: &'a ProgramReport,
    ) -> Self {
        Self {
            schema: REPORT_SCHEMA,
            input: display_path(input),
            config: config.map(display_path),
            ok: report.is_ok() && syntax_errors.is_empty(),
            summary: Summary::of(report),
            spans: program
                .stmts
                .iter()
                .map(|s| StatementSpan {
                    name: s.name().node.clone(),
                    span: s.span().into(),
                })
                .collect(),
            syntax_errors: syntax_errors.iter().map(SyntaxErrorEntry::from).collect(),
            report,
        }
    }
}

pub fn display_path(path: &Path) -> String {
    // Stable, mostly relative output; fall back to the given path when
    // canonicalization fails.
    let p = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let s = p.to_string_lossy().replace('\\', "/");

    if let Ok(cwd) = std::env::current_dir() {
        let prefix = format!("{}/", cwd.to_string_lossy().replace('\\', "/"));
        if let Some(rest) = s.strip_prefix(&prefix) {
            return rest.to_string();
        }
    }
    s
}
