//! Document-level directives.
//!
//! Directive markers use reserved block-type names and are routed into the
//! [`Document`]'s dedicated slots instead of the block tree.

use indexmap::IndexMap;

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    document::{DefineKind, Document, InlineDefine},
    kit::KitRegistry,
};

use super::tokenizer::{TokenKind, TokenizedLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Meta,
    Use,
    Theme,
    Preset,
    Style,
    Define(DefineKind),
}

impl DirectiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "meta" => Some(Self::Meta),
            "use" => Some(Self::Use),
            "theme" => Some(Self::Theme),
            "preset" => Some(Self::Preset),
            "style" => Some(Self::Style),
            "define-theme" => Some(Self::Define(DefineKind::Theme)),
            "define-preset" => Some(Self::Define(DefineKind::Preset)),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Use => "use",
            Self::Theme => "theme",
            Self::Preset => "preset",
            Self::Style => "style",
            Self::Define(kind) => kind.directive(),
        }
    }
}

/// Whether a define is still collecting variables or has moved on to raw CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefinePhase {
    Variables,
    Css,
}

/// A directive whose lines are still being collected.
#[derive(Debug)]
pub struct OpenDirective {
    kind: DirectiveKind,
    line: usize,
    label: Option<String>,
    properties: IndexMap<String, String>,
    raw: Vec<String>,
    phase: DefinePhase,
}

impl OpenDirective {
    pub fn new(kind: DirectiveKind, label: Option<String>, line: usize) -> Self {
        Self {
            kind,
            line,
            label,
            properties: IndexMap::new(),
            raw: vec![],
            phase: DefinePhase::Variables,
        }
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn absorb(&mut self, t: &TokenizedLine, diags: &mut Diagnostics) {
        if matches!(t.kind, TokenKind::Comment { .. }) {
            return;
        }
        match self.kind {
            DirectiveKind::Style => push_raw(&mut self.raw, &t.raw),
            DirectiveKind::Define(_) => self.absorb_define(t, diags),
            DirectiveKind::Meta => match &t.kind {
                TokenKind::Property { key, value } => {
                    if valid_key(key, "meta", t.line, diags) {
                        self.properties.insert(key.clone(), value.clone());
                    }
                }
                TokenKind::Text => diags.push(
                    Diagnostic::warning("Unexpected text in meta block", t.line)
                        .with_block_type("meta"),
                ),
                _ => {}
            },
            DirectiveKind::Use | DirectiveKind::Theme | DirectiveKind::Preset => {
                if matches!(t.kind, TokenKind::Text | TokenKind::Property { .. }) {
                    diags.push(
                        Diagnostic::warning(
                            format!("Unexpected line after {} directive", self.kind.name()),
                            t.line,
                        )
                        .with_block_type(self.kind.name()),
                    );
                }
            }
        }
    }

    fn absorb_define(&mut self, t: &TokenizedLine, diags: &mut Diagnostics) {
        if self.phase == DefinePhase::Css {
            push_raw(&mut self.raw, &t.raw);
            return;
        }
        match &t.kind {
            TokenKind::Property { key, value } => {
                if valid_key(key, self.kind.name(), t.line, diags) {
                    self.properties.insert(key.clone(), value.clone());
                }
            }
            TokenKind::Blank => self.phase = DefinePhase::Css,
            _ => {
                self.phase = DefinePhase::Css;
                push_raw(&mut self.raw, &t.raw);
            }
        }
    }

    /// Routes the collected directive into its document slot.
    pub fn finish(self, doc: &mut Document, registry: &KitRegistry, diags: &mut Diagnostics) {
        let name = self.kind.name();
        match self.kind {
            DirectiveKind::Meta => {
                for (k, v) in self.properties {
                    doc.meta.insert(k, v);
                }
            }
            DirectiveKind::Style => {
                let text = join_body(&self.raw);
                if !text.is_empty() {
                    doc.styles.push(text);
                }
            }
            DirectiveKind::Use | DirectiveKind::Theme | DirectiveKind::Preset => {
                let Some(value) = self.label else {
                    diags.push(
                        Diagnostic::error(format!("{name} directive requires a name"), self.line)
                            .with_block_type(name),
                    );
                    return;
                };
                match self.kind {
                    DirectiveKind::Use => {
                        if !registry.has_kit(&value) {
                            diags.push(
                                Diagnostic::warning(format!("Unknown kit \"{value}\""), self.line)
                                    .with_block_type(name),
                            );
                        }
                        doc.uses.push(value);
                    }
                    DirectiveKind::Theme => doc.themes.push(value),
                    _ => doc.presets.push(value),
                }
            }
            DirectiveKind::Define(kind) => {
                let Some(define_name) = self.label else {
                    diags.push(
                        Diagnostic::error(format!("{name} requires a name"), self.line)
                            .with_block_type(name),
                    );
                    return;
                };
                let css = join_body(&self.raw);
                let define = InlineDefine {
                    kind,
                    name: define_name,
                    variables: self.properties,
                    raw_css: (!css.is_empty()).then_some(css),
                };
                if define.is_empty() {
                    diags.push(
                        Diagnostic::warning(
                            format!(
                                "{name} \"{}\" has no variables and no CSS",
                                define.name
                            ),
                            self.line,
                        )
                        .with_block_type(name),
                    );
                }
                doc.defines.push(define);
            }
        }
    }
}

/// Rejects `@`-prefixed keys with an error diagnostic.
pub(crate) fn valid_key(key: &str, block_type: &str, line: usize, diags: &mut Diagnostics) -> bool {
    if key.starts_with('@') {
        diags.push(
            Diagnostic::error(
                format!("Invalid property \"{key}\": property names cannot start with @"),
                line,
            )
            .with_block_type(block_type)
            .with_property(key),
        );
        return false;
    }
    true
}

/// Appends a body line, dropping blank lines before the first real one.
pub(crate) fn push_raw(lines: &mut Vec<String>, raw: &str) {
    if lines.is_empty() && raw.trim().is_empty() {
        return;
    }
    lines.push(raw.to_string());
}

/// Joins body lines, trimming trailing blank lines.
pub(crate) fn join_body(lines: &[String]) -> String {
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);
    let mut out = lines[..end].join("\n");
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_names_round_trip() {
        for name in [
            "meta",
            "use",
            "theme",
            "preset",
            "style",
            "define-theme",
            "define-preset",
        ] {
            assert_eq!(DirectiveKind::from_name(name).unwrap().name(), name);
        }
        assert_eq!(DirectiveKind::from_name("core/text"), None);
    }

    #[test]
    fn join_body_trims_trailing_blank_lines() {
        let lines = vec!["a".to_string(), "".to_string(), "b  ".to_string(), "".to_string()];
        assert_eq!(join_body(&lines), "a\n\nb");
    }

    #[test]
    fn push_raw_skips_leading_blanks() {
        let mut lines = vec![];
        push_raw(&mut lines, "   ");
        push_raw(&mut lines, "x");
        push_raw(&mut lines, "");
        assert_eq!(lines, ["x", ""]);
    }
}
