pub mod manifest;

use std::path::{Path, PathBuf};

use mkly_engine::{KitError, KitRegistry, ParseOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use manifest::KitManifest;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid kit pattern \"{pattern}\": {source}")]
    KitPatternError {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Failed to read kit manifest at {manifest_path}: {source}")]
    ManifestReadError {
        manifest_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse kit manifest at {manifest_path}: {source}")]
    ManifestParseError {
        manifest_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Block \"{block}\" in kit \"{kit}\" has unknown content mode \"{mode}\"")]
    UnknownContentMode { kit: String, block: String, mode: String },

    #[error("Property \"{property}\" of block \"{block}\" in kit \"{kit}\" has unknown shape \"{shape}\"")]
    UnknownShape {
        kit: String,
        block: String,
        property: String,
        shape: String,
    },

    #[error("Failed to register kit: {0}")]
    KitRegistration(#[from] KitError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob patterns for kit manifests. Relative patterns resolve against the
    /// directory holding the config file.
    pub kits: Vec<String>,
    pub parse: ParseConfig,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub strict_mixed_separation: bool,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.base_dir = config_path.parent().map(Path::to_path_buf);

        log::debug!(
            "loaded config from {} with {} kit patterns",
            config_path.display(),
            config.kits.len()
        );
        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/mkly");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict_mixed_separation: self.parse.strict_mixed_separation,
        }
    }

    /// Manifest files matched by the `kits` patterns, sorted within each
    /// pattern. Unreadable directory entries are skipped.
    pub fn kit_manifest_paths(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut paths = vec![];
        for pattern in &self.kits {
            let expanded = Self::expand_path(Path::new(pattern)).unwrap_or_else(|| PathBuf::from(pattern));
            let full = match &self.base_dir {
                Some(base) if expanded.is_relative() => base.join(expanded),
                _ => expanded,
            };
            let entries = glob::glob(&full.to_string_lossy()).map_err(|source| {
                ConfigError::KitPatternError {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            let mut matched: Vec<PathBuf> = entries
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("skipping kit manifest entry: {e}");
                        None
                    }
                })
                .collect();
            matched.sort();
            log::debug!("kit pattern {pattern} matched {} manifests", matched.len());
            paths.extend(matched);
        }
        Ok(paths)
    }

    /// The core kit plus every configured manifest, in pattern order.
    pub fn registry(&self) -> Result<KitRegistry, ConfigError> {
        let mut registry = KitRegistry::with_core();
        for path in self.kit_manifest_paths()? {
            let kit = KitManifest::load_from_path(&path)?.into_definition()?;
            registry.register(kit)?;
        }
        Ok(registry)
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    const SPONSOR_KIT: &str = r#"
name = "newsletter"

[[blocks]]
name = "sponsor"
content_mode = "mixed"

[[blocks.properties]]
name = "url"
shape = "url"
"#;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/mkly/config.toml"));
    }

    #[test]
    fn test_defaults_when_keys_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.kits.is_empty());
        assert!(!config.parse.strict_mixed_separation);
        assert_eq!(config.parse_options(), ParseOptions::default());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            kits: vec!["kits/*.toml".into()],
            parse: ParseConfig {
                strict_mixed_separation: true,
            },
            ..Config::default()
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(deserialized.kits, original.kits);
        assert_eq!(deserialized.parse, original.parse);
        assert!(deserialized.parse_options().strict_mixed_separation);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(Path::new("~/kits/*.toml")).unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("kits/*.toml"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("MKLY_TEST_KITS", "/test/env/kits");
        }

        let expanded = Config::expand_path(Path::new("$MKLY_TEST_KITS/news.toml")).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/kits/news.toml"));

        unsafe {
            env::remove_var("MKLY_TEST_KITS");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_config_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "kits = 3").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            kits: vec!["a.toml".into(), "b/*.toml".into()],
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config.kits, test_config.kits);
    }

    #[test]
    fn test_relative_kit_patterns_resolve_against_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let kits_dir = temp_dir.path().join("kits");
        std::fs::create_dir_all(&kits_dir).unwrap();
        std::fs::write(kits_dir.join("newsletter.toml"), SPONSOR_KIT).unwrap();
        std::fs::write(kits_dir.join("notes.txt"), "ignored").unwrap();

        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "kits = [\"kits/*.toml\"]\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        let paths = config.kit_manifest_paths().unwrap();
        assert_eq!(paths, [kits_dir.join("newsletter.toml")]);

        let registry = config.registry().unwrap();
        assert!(registry.has_kit("core"));
        let sponsor = registry.block_type("newsletter/sponsor").unwrap();
        assert_eq!(sponsor.properties.len(), 1);
    }

    #[test]
    fn test_registry_with_kits_parses_kit_blocks() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("newsletter.toml"), SPONSOR_KIT).unwrap();
        let config = Config {
            kits: vec![temp_dir.path().join("*.toml").to_string_lossy().into_owned()],
            ..Config::default()
        };

        let registry = config.registry().unwrap();
        let result = mkly_engine::parse_document(
            "--- use: newsletter\n\n--- newsletter/sponsor\nurl: https://e.com\n\nThanks!\n",
            &registry,
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.document.blocks[0].content, "Thanks!");
    }

    #[test]
    fn test_duplicate_kit_manifests_fail_registration() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.toml"), SPONSOR_KIT).unwrap();
        std::fs::write(temp_dir.path().join("b.toml"), SPONSOR_KIT).unwrap();
        let config = Config {
            kits: vec![temp_dir.path().join("*.toml").to_string_lossy().into_owned()],
            ..Config::default()
        };

        let err = config.registry().unwrap_err();
        assert!(matches!(err, ConfigError::KitRegistration(KitError::DuplicateKit(_))));
    }

    #[test]
    fn test_bad_glob_is_reported() {
        let config = Config {
            kits: vec!["/tmp/[".into()],
            ..Config::default()
        };
        assert!(matches!(
            config.kit_manifest_paths(),
            Err(ConfigError::KitPatternError { .. })
        ));
    }
}
