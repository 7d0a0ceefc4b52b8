use std::fmt::Write;

use super::{Diagnostic, Label};
use crate::ast::SourceMap;

#[derive(Clone, Copy)]
enum Style {
    Bold,
    Error,
    Accent,
    Faint,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Error => "1;31",
            Style::Accent => "36",
            Style::Faint => "2",
        }
    }
}

/// Terminal renderer in the usual `error[CODE]: ... --> line:col` layout.
pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    /// Colour on unless `NO_COLOR` is set (to anything non-empty).
    pub fn from_env() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        AnsiRenderer { use_color: !no_color }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color {
            format!("\x1b[{}m{text}\x1b[0m", style.sgr())
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        let head = match d.code {
            Some(code) => format!("error[{code}]"),
            None => "error".to_string(),
        };
        let _ = writeln!(out, "{}: {}", self.paint(Style::Error, &head), self.paint(Style::Bold, &d.message));

        if let (Some(label), Some(source)) = (d.labels.first(), d.source.as_deref()) {
            self.snippet(&mut out, label, source);
        }

        let eq = self.paint(Style::Faint, "=");
        for note in &d.notes {
            let _ = writeln!(out, "  {eq} note: {note}");
        }
        if let Some(suggestion) = &d.suggestion {
            let _ = writeln!(out, "  {eq} help: {suggestion}");
        }
        out
    }

    /// The `-->` header, the offending source line and a caret underline.
    fn snippet(&self, out: &mut String, label: &Label, source: &str) {
        let map = SourceMap::new(source);
        let (line, col) = map.lookup(label.span.start);

        let width = line.to_string().len();
        let blank = " ".repeat(width);
        let bar = self.paint(Style::Accent, "|");

        let _ = writeln!(out, "  {} {line}:{col}", self.paint(Style::Accent, "-->"));
        let _ = writeln!(out, "{blank} {bar}");
        let _ = writeln!(
            out,
            "{} {bar} {}",
            self.paint(Style::Accent, &format!("{line:>width$}")),
            map.line_text(line)
        );

        // an empty span (end of input) still gets one caret
        let marker = "^".repeat(label.span.len().max(1));
        let mut underline = format!("{}{}", " ".repeat(col - 1), self.paint(Style::Error, &marker));
        if !label.message.is_empty() {
            underline.push(' ');
            underline.push_str(&self.paint(Style::Error, &label.message));
        }
        let _ = writeln!(out, "{blank} {bar} {underline}");
        let _ = writeln!(out, "{blank} {bar}");
    }
}
