//! Declarative kit manifests.
//!
//! A manifest describes a kit's block types in TOML so that hosts can add
//! kits without writing Rust:
//!
//! ```toml
//! name = "newsletter"
//!
//! [[blocks]]
//! name = "sponsor"
//! content_mode = "mixed"
//! class = "sponsor-box"
//!
//! [[blocks.properties]]
//! name = "url"
//! shape = "url"
//! ```

use std::path::Path;

use mkly_engine::{BlockTypeDef, ClassMapping, ContentHints, ContentMode, KitDefinition, PropertyShape};
use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KitManifest {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockManifest>,
    #[serde(default)]
    pub classes: Vec<ClassManifest>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BlockManifest {
    pub name: String,
    #[serde(default = "default_content_mode")]
    pub content_mode: String,
    #[serde(default)]
    pub container: bool,
    /// Extra root class for web reconstruction, besides `mkly-<kit>-<name>`.
    pub class: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyManifest>,
    pub hints: Option<HintsManifest>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PropertyManifest {
    pub name: String,
    #[serde(default = "default_shape")]
    pub shape: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct HintsManifest {
    pub editorial_properties: Vec<String>,
    pub structural_properties: Vec<String>,
    pub editorial_content: bool,
    pub editorial_children: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClassManifest {
    pub class: String,
    pub block_type: String,
}

fn default_content_mode() -> String {
    "mixed".to_string()
}

fn default_shape() -> String {
    "text".to_string()
}

impl KitManifest {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ManifestReadError {
            manifest_path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ManifestParseError {
            manifest_path: path.to_path_buf(),
            source,
        })
    }

    /// Converts the manifest into an engine kit definition.
    pub fn into_definition(self) -> Result<KitDefinition, ConfigError> {
        let kit_name = self.name;
        let qualify = |name: &str| {
            if name.contains('/') {
                name.to_string()
            } else {
                format!("{kit_name}/{name}")
            }
        };

        let mut kit = KitDefinition::new(kit_name.clone());
        for block in self.blocks {
            let mode = ContentMode::parse(&block.content_mode).ok_or_else(|| ConfigError::UnknownContentMode {
                kit: kit_name.clone(),
                block: block.name.clone(),
                mode: block.content_mode.clone(),
            })?;

            let mut def = BlockTypeDef::new(qualify(&block.name), mode);
            def.container = block.container;
            for prop in block.properties {
                let shape = PropertyShape::from_name(&prop.shape).ok_or_else(|| ConfigError::UnknownShape {
                    kit: kit_name.clone(),
                    block: block.name.clone(),
                    property: prop.name.clone(),
                    shape: prop.shape.clone(),
                })?;
                def = def.property(&prop.name, shape);
            }
            def.hints = block.hints.map(|h| ContentHints {
                editorial_properties: h.editorial_properties,
                structural_properties: h.structural_properties,
                editorial_content: h.editorial_content,
                editorial_children: h.editorial_children,
            });

            if let Some(class) = block.class {
                kit = kit.class(ClassMapping {
                    class,
                    block_type: def.name.clone(),
                    parse: None,
                });
            }
            kit = kit.block(def);
        }

        for mapping in self.classes {
            kit = kit.class(ClassMapping {
                class: mapping.class,
                block_type: qualify(&mapping.block_type),
                parse: None,
            });
        }
        Ok(kit)
    }
}
