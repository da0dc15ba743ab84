//! # Kit Contract
//!
//! Kits are pluggable bundles of block types. This module holds the part of
//! the kit contract that parsing and reconstruction consume:
//!
//! - per block type: qualified name, [`ContentMode`], container flag,
//!   declared property shapes and optional [`ContentHints`]
//! - for the web reverse path: [`ClassMapping`]s from CSS class to block type,
//!   optionally with a custom element parser
//! - for the foreign-HTML path: [`ImportPattern`] detect/parse pairs
//!
//! A [`KitRegistry`] is read-only once built; every parse or reconstruct call
//! derives its own lookup tables from it.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::reconstruct::ParsedBlock;

/// How lines following a block's opening marker are absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Every non-blank line is content.
    Text,
    /// Only `key: value` lines; the block has no body.
    Properties,
    /// Leading properties, a blank line, then content.
    Mixed,
    /// Raw body, captured as-is.
    Verbatim,
}

impl ContentMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "properties" => Some(Self::Properties),
            "mixed" => Some(Self::Mixed),
            "verbatim" => Some(Self::Verbatim),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Properties => "properties",
            Self::Mixed => "mixed",
            Self::Verbatim => "verbatim",
        }
    }
}

/// The declared shape of a property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyShape {
    Text,
    Number,
    Boolean,
    Url,
    Color,
    OneOf(Vec<String>),
}

impl PropertyShape {
    pub fn accepts(&self, value: &str) -> bool {
        let v = value.trim();
        match self {
            PropertyShape::Text => true,
            PropertyShape::Number => v.parse::<f64>().is_ok(),
            PropertyShape::Boolean => matches!(v, "true" | "false"),
            PropertyShape::Url => !v.is_empty() && !v.contains(char::is_whitespace),
            PropertyShape::Color => is_color(v),
            PropertyShape::OneOf(options) => options.iter().any(|o| o == v),
        }
    }

    /// Human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            PropertyShape::Text => "text".to_string(),
            PropertyShape::Number => "a number".to_string(),
            PropertyShape::Boolean => "true or false".to_string(),
            PropertyShape::Url => "a URL".to_string(),
            PropertyShape::Color => "a color".to_string(),
            PropertyShape::OneOf(options) => format!("one of {}", options.join(", ")),
        }
    }

    /// Parses the manifest spelling of a shape (`number`, `one-of:a|b`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(options) = name.strip_prefix("one-of:") {
            return Some(PropertyShape::OneOf(
                options.split('|').map(|o| o.trim().to_string()).collect(),
            ));
        }
        match name {
            "text" | "string" => Some(PropertyShape::Text),
            "number" => Some(PropertyShape::Number),
            "boolean" | "bool" => Some(PropertyShape::Boolean),
            "url" => Some(PropertyShape::Url),
            "color" => Some(PropertyShape::Color),
            _ => None,
        }
    }
}

fn is_color(v: &str) -> bool {
    if let Some(hex) = v.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let lower = v.to_ascii_lowercase();
    if ["rgb(", "rgba(", "hsl(", "hsla(", "var("]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return lower.ends_with(')');
    }
    !v.is_empty() && v.chars().all(|c| c.is_ascii_alphabetic())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub shape: PropertyShape,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, shape: PropertyShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// Which parts of a block are editorial copy and which are layout.
///
/// Consumed by template tooling; parsing only carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentHints {
    pub editorial_properties: Vec<String>,
    pub structural_properties: Vec<String>,
    pub editorial_content: bool,
    pub editorial_children: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTypeDef {
    /// Qualified `kit/name`.
    pub name: String,
    pub content_mode: ContentMode,
    pub container: bool,
    pub properties: Vec<PropertyDef>,
    pub hints: Option<ContentHints>,
}

impl BlockTypeDef {
    pub fn new(name: impl Into<String>, content_mode: ContentMode) -> Self {
        Self {
            name: name.into(),
            content_mode,
            container: false,
            properties: vec![],
            hints: None,
        }
    }

    #[must_use]
    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    #[must_use]
    pub fn property(mut self, name: &str, shape: PropertyShape) -> Self {
        self.properties.push(PropertyDef::new(name, shape));
        self
    }

    pub fn property_def(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Default root class of this type in web output: `mkly-<kit>-<name>`.
    pub fn web_class(&self) -> String {
        format!("mkly-{}", self.name.replace('/', "-"))
    }
}

/// Parses the full outer markup of one element into a block.
pub type ElementParser = fn(&str) -> ParsedBlock;

/// Maps a CSS root class to a block type for web-origin reconstruction.
#[derive(Debug, Clone)]
pub struct ClassMapping {
    pub class: String,
    pub block_type: String,
    /// Overrides the built-in parser for this block type.
    pub parse: Option<ElementParser>,
}

/// A kit-supplied recogniser for foreign HTML segments.
#[derive(Debug, Clone)]
pub struct ImportPattern {
    pub name: String,
    pub detect: fn(&str) -> bool,
    pub parse: ElementParser,
}

#[derive(Debug, Clone, Default)]
pub struct KitDefinition {
    pub name: String,
    pub blocks: Vec<BlockTypeDef>,
    pub classes: Vec<ClassMapping>,
    pub import_patterns: Vec<ImportPattern>,
}

impl KitDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a block type; unqualified names are placed in this kit's namespace.
    #[must_use]
    pub fn block(mut self, mut def: BlockTypeDef) -> Self {
        if !def.name.contains('/') {
            def.name = format!("{}/{}", self.name, def.name);
        }
        self.blocks.push(def);
        self
    }

    #[must_use]
    pub fn class(mut self, mapping: ClassMapping) -> Self {
        self.classes.push(mapping);
        self
    }

    #[must_use]
    pub fn import_pattern(mut self, pattern: ImportPattern) -> Self {
        self.import_patterns.push(pattern);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KitError {
    #[error("kit \"{0}\" is already registered")]
    DuplicateKit(String),
    #[error("block type \"{block_type}\" from kit \"{kit}\" is already defined")]
    DuplicateBlockType { kit: String, block_type: String },
    #[error("kit name must not be empty")]
    EmptyName,
}

/// Read-only collection of registered kits, in registration order.
#[derive(Debug, Clone, Default)]
pub struct KitRegistry {
    kits: Vec<KitDefinition>,
    types: HashMap<String, (usize, usize)>,
}

impl KitRegistry {
    /// An empty registry. Every block type will be reported as unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the built-in `core` kit.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        // core_kit() has unique names by construction
        let _ = registry.register(core_kit());
        registry
    }

    pub fn register(&mut self, kit: KitDefinition) -> Result<(), KitError> {
        if kit.name.trim().is_empty() {
            return Err(KitError::EmptyName);
        }
        if self.has_kit(&kit.name) {
            return Err(KitError::DuplicateKit(kit.name));
        }
        let kit_index = self.kits.len();
        for def in &kit.blocks {
            if self.types.contains_key(&def.name) {
                return Err(KitError::DuplicateBlockType {
                    kit: kit.name.clone(),
                    block_type: def.name.clone(),
                });
            }
        }
        for (i, def) in kit.blocks.iter().enumerate() {
            self.types.insert(def.name.clone(), (kit_index, i));
        }
        log::debug!("registered kit {} with {} block types", kit.name, kit.blocks.len());
        self.kits.push(kit);
        Ok(())
    }

    pub fn has_kit(&self, name: &str) -> bool {
        self.kits.iter().any(|k| k.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&BlockTypeDef> {
        self.types
            .get(name)
            .map(|&(k, b)| &self.kits[k].blocks[b])
    }

    pub fn is_container(&self, name: &str) -> bool {
        self.block_type(name).is_some_and(|d| d.container)
    }

    pub fn kits(&self) -> &[KitDefinition] {
        &self.kits
    }

    /// Class mappings in lookup order: every block type's default class first,
    /// then explicit kit mappings, so explicit entries override defaults.
    pub fn class_mappings(&self) -> Vec<ClassMapping> {
        let defaults = self.kits.iter().flat_map(|k| &k.blocks).map(|def| ClassMapping {
            class: def.web_class(),
            block_type: def.name.clone(),
            parse: None,
        });
        let explicit = self.kits.iter().flat_map(|k| k.classes.iter().cloned());
        defaults.chain(explicit).collect()
    }

    /// Import patterns in kit registration order.
    pub fn import_patterns(&self) -> impl Iterator<Item = &ImportPattern> {
        self.kits.iter().flat_map(|k| &k.import_patterns)
    }
}

/// The built-in `core` kit.
pub fn core_kit() -> KitDefinition {
    use ContentMode::*;
    use PropertyShape as S;

    KitDefinition::new("core")
        .block(BlockTypeDef::new("heading", Mixed).property("level", S::Number))
        .block(BlockTypeDef::new("text", Text))
        .block(
            BlockTypeDef::new("image", Properties)
                .property("src", S::Url)
                .property("alt", S::Text)
                .property("width", S::Number)
                .property("link", S::Url),
        )
        .block(
            BlockTypeDef::new("button", Properties)
                .property("url", S::Url)
                .property("label", S::Text),
        )
        .block(BlockTypeDef::new("divider", Properties))
        .block(BlockTypeDef::new("spacer", Properties).property("height", S::Number))
        .block(BlockTypeDef::new("code", Mixed).property("lang", S::Text))
        .block(BlockTypeDef::new("quote", Mixed).property("author", S::Text))
        .block(
            BlockTypeDef::new("hero", Mixed)
                .property("image", S::Url)
                .property("alt", S::Text),
        )
        .block(
            BlockTypeDef::new("section", Mixed)
                .container()
                .property("title", S::Text),
        )
        .block(
            BlockTypeDef::new("card", Mixed)
                .property("image", S::Url)
                .property("link", S::Url),
        )
        .block(BlockTypeDef::new("list", Text))
        .block(
            BlockTypeDef::new("header", Properties)
                .property("logo", S::Url)
                .property("title", S::Text),
        )
        .block(BlockTypeDef::new("footer", Text))
        .block(
            BlockTypeDef::new("cta", Mixed)
                .property("url", S::Url)
                .property("buttonText", S::Text),
        )
        .block(BlockTypeDef::new("tip", Mixed).property(
            "type",
            S::OneOf(vec![
                "info".into(),
                "warning".into(),
                "success".into(),
                "error".into(),
            ]),
        ))
        .block(BlockTypeDef::new("html", Verbatim))
}
