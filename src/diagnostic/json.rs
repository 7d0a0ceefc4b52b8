use serde::Serialize;

use super::Diagnostic;
use crate::ast::SourceMap;

#[derive(Serialize)]
struct Report<'a> {
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    message: &'a str,
    labels: Vec<LabelReport<'a>>,
    notes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

#[derive(Serialize)]
struct LabelReport<'a> {
    start: usize,
    end: usize,
    message: &'a str,
    /// Only present when the diagnostic carries its source text.
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
}

/// One-line JSON object for machine consumers (`--json`).
pub fn render(d: &Diagnostic) -> String {
    let map = d.source.as_deref().map(SourceMap::new);

    let labels = d
        .labels
        .iter()
        .map(|label| {
            let position = map.as_ref().map(|m| m.lookup(label.span.start));
            LabelReport {
                start: label.span.start,
                end: label.span.end,
                message: &label.message,
                line: position.map(|(line, _)| line),
                col: position.map(|(_, col)| col),
            }
        })
        .collect();

    let report = Report {
        severity: "error",
        code: d.code,
        message: &d.message,
        labels,
        notes: &d.notes,
        suggestion: d.suggestion.as_deref(),
    };
    serde_json::to_string(&report).unwrap_or_else(|_| format!("{{\"severity\":\"error\",\"message\":{:?}}}", d.message))
}
