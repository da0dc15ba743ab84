use serde::Serialize;

/// How serious a [`Diagnostic`] is.
///
/// Neither severity stops parsing: a `Warning` is informational, an `Error`
/// marks a validation failure for one property or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found while parsing or reconstructing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub block_type: Option<String>,
    /// 1-based source line; 0 when the problem has no source line (reconstruction).
    pub line: usize,
    pub property: Option<String>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            block_type: None,
            line,
            property: None,
            severity: Severity::Warning,
        }
    }

    pub fn error(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            block_type: None,
            line,
            property: None,
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn with_block_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = Some(block_type.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Ordered accumulator for diagnostics.
///
/// Every push is also logged so hosts with a logger installed can see
/// problems without inspecting the result.
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => log::debug!("line {}: {}", diagnostic.line, diagnostic.message),
            Severity::Error => log::debug!("line {}: error: {}", diagnostic.line, diagnostic.message),
        }
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        for d in other {
            self.push(d);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}
