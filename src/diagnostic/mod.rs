pub mod ansi;
pub mod json;
pub mod registry;

use crate::archive::ArchiveError;
use crate::ast::Span;
use crate::builtins::BuiltinError;
use crate::compiler::CompileError;
use crate::lexer::TokenKind;
use crate::parser::ParseError;
use crate::vm::VmError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// A rendered-agnostic error report. Built from any stage error, then
/// handed to [`ansi::AnsiRenderer`] or [`json::render`].
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into() });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for the pipeline's error types ----

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        let label = match (e, e.expected()) {
            (ParseError::TooDeep { .. }, _) => "nested too deep".to_string(),
            (_, [single]) => format!("expected '{single}'"),
            _ => "unexpected token".to_string(),
        };
        let mut d = Diagnostic::error(e.to_string())
            .with_code(e.code())
            .with_span(e.span(), label);

        if let ParseError::TooDeep { .. } = e {
            d = d.with_note("split the expression or remove redundant parentheses");
        }

        // `3-5` lexes as `3` `-5`: the minus was swallowed by the literal
        let found = e.found();
        if found.kind == TokenKind::Number && !e.expected().contains(&TokenKind::Number) {
            if let Some(digits) = found.literal.strip_prefix('-') {
                d = d.with_suggestion(format!(
                    "a '-' directly before a digit starts a negative number; write '- {digits}' to subtract"
                ));
            }
        }
        d
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        let mut d = Diagnostic::error(e.to_string()).with_code(e.code());
        if let Some(hint) = e.hint() {
            d = d.with_suggestion(format!("did you mean '{hint}'?"));
        }
        d
    }
}

impl From<&ArchiveError> for Diagnostic {
    fn from(e: &ArchiveError) -> Self {
        Diagnostic::error(e.to_string()).with_code(e.code())
    }
}

impl From<&VmError> for Diagnostic {
    fn from(e: &VmError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(e.code());
        match e {
            VmError::Builtin(BuiltinError::Arity { .. }) => {
                d.with_note("every standard function takes exactly one argument")
            }
            VmError::UnknownOpcode { .. } | VmError::UnknownBuiltin { .. } => {
                d.with_note("the archive may come from a newer calc build")
            }
            _ => d,
        }
    }
}

impl From<&crate::Error> for Diagnostic {
    fn from(e: &crate::Error) -> Self {
        match e {
            crate::Error::Parse(e) => e.into(),
            crate::Error::Compile(e) => e.into(),
            crate::Error::Archive(e) => e.into(),
            crate::Error::Runtime(e) => e.into(),
        }
    }
}
