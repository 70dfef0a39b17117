//! Configuration management for dashlight

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default tags whose contents are never scanned
pub const DEFAULT_EXCLUDED_TAGS: &[&str] =
    &["code", "pre", "script", "style", "textarea", "input", "svg"];

/// Default tags treated as block-level by the block-mark strategy
pub const DEFAULT_BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "section",
    "table",
    "td",
    "th",
    "tr",
    "ul",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: Strategy,
    /// Characters kept on each side of a dash in windowed mode
    pub window_radius: usize,
    pub highlight_class: String,
    /// Sentinel attribute carried by every marker the annotator creates
    pub processed_attribute: String,
    /// Re-check text nodes whose contents are edited after load
    pub observe_character_data: bool,
    pub excluded_tags: Vec<String>,
    pub block_tags: Vec<String>,
    pub pattern: PatternConfig,
}

/// How a dash occurrence is made visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Wrap a window of characters around each dash in a marker span
    WindowedSpan,
    /// Put the highlight class on the nearest block-level ancestor
    BlockMark,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "windowed-span" => Ok(Strategy::WindowedSpan),
            "block-mark" => Ok(Strategy::BlockMark),
            other => Err(format!(
                "unknown strategy '{other}' (expected windowed-span or block-mark)"
            )),
        }
    }
}

/// Which dash-like sequences count as a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// U+2014
    pub em_dash: bool,
    /// U+2013
    pub en_dash: bool,
    /// The two-character sequence `--`
    pub double_hyphen: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::WindowedSpan,
            window_radius: 5,
            highlight_class: "emdash-highlight".to_string(),
            processed_attribute: "data-emdash-processed".to_string(),
            observe_character_data: true,
            excluded_tags: DEFAULT_EXCLUDED_TAGS.iter().map(|t| t.to_string()).collect(),
            block_tags: DEFAULT_BLOCK_TAGS.iter().map(|t| t.to_string()).collect(),
            pattern: PatternConfig::default(),
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            em_dash: true,
            en_dash: false,
            double_hyphen: false,
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dashlight")
            .map(|proj_dirs| proj_dirs.config_dir().join("dashlight.toml"))
    }

    /// Load configuration from the platform location, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
            if metadata.permissions().mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.normalize();
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Lower-case tag names so they compare against parsed element tags
    pub fn normalize(&mut self) {
        for tag in self.excluded_tags.iter_mut().chain(self.block_tags.iter_mut()) {
            *tag = tag.trim().to_ascii_lowercase();
        }
    }

    /// Reject values that would make markers unrecognisable
    pub fn validate(&self) -> Result<()> {
        if self.highlight_class.is_empty()
            || self.highlight_class.contains(char::is_whitespace)
        {
            anyhow::bail!(
                "highlight_class must be a single non-empty class name, got {:?}",
                self.highlight_class
            );
        }
        if self.processed_attribute.is_empty()
            || self.processed_attribute.contains(char::is_whitespace)
        {
            anyhow::bail!(
                "processed_attribute must be a non-empty attribute name, got {:?}",
                self.processed_attribute
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.strategy, Strategy::WindowedSpan);
        assert_eq!(config.window_radius, 5);
        assert_eq!(config.highlight_class, "emdash-highlight");
        assert!(config.observe_character_data);
        assert!(config.pattern.em_dash);
        assert!(!config.pattern.en_dash);
        assert!(!config.pattern.double_hyphen);
        assert!(config.excluded_tags.iter().any(|t| t == "pre"));
        assert!(config.block_tags.iter().any(|t| t == "p"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_config() -> Result<()> {
        // Loading should return defaults when file doesn't exist
        if Config::config_path().is_some_and(|p| p.exists()) {
            return Ok(());
        }
        let config = Config::load()?;
        assert_eq!(config.window_radius, 5);
        Ok(())
    }

    #[test]
    fn test_load_valid_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        let toml_content = "strategy = \"block-mark\"\n\
window_radius = 3\n\
highlight_class = \"dash\"\n\
excluded_tags = [\"PRE\", \"kbd\"]\n\
\n\
[pattern]\n\
en_dash = true\n\
double_hyphen = true\n";
        file.write_all(toml_content.as_bytes())?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.strategy, Strategy::BlockMark);
        assert_eq!(config.window_radius, 3);
        assert_eq!(config.highlight_class, "dash");
        assert_eq!(config.excluded_tags, vec!["pre", "kbd"]);
        assert!(config.pattern.em_dash);
        assert!(config.pattern.en_dash);
        assert!(config.pattern.double_hyphen);
        // Untouched keys keep their defaults
        assert_eq!(config.processed_attribute, "data-emdash-processed");

        Ok(())
    }

    #[test]
    fn test_load_partial_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"window_radius = 0\n")?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.window_radius, 0);
        assert_eq!(config.strategy, Strategy::WindowedSpan);
        assert_eq!(config.block_tags.len(), DEFAULT_BLOCK_TAGS.len());

        Ok(())
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"invalid toml [[[syntax").unwrap();

        let result = Config::load_from(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_blank_class() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"highlight_class = \"two words\"\n").unwrap();

        let result = Config::load_from(file.path());
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_rejects_world_writable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new()?;
        file.write_all(b"window_radius = 2\n")?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666))?;

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-writable"));
        Ok(())
    }

    #[test]
    fn test_config_path_returns_some() {
        let path = Config::config_path();
        // Should return Some on all platforms
        assert!(path.is_some());
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("dashlight"));
            assert!(p.to_string_lossy().ends_with("dashlight.toml"));
        }
    }

    #[test]
    fn test_strategy_serialization() -> Result<()> {
        let config = Config {
            strategy: Strategy::BlockMark,
            ..Default::default()
        };

        let toml_str = toml::to_string(&config)?;
        assert!(toml_str.contains("block-mark"));

        let parsed: Config = toml::from_str(&toml_str)?;
        assert_eq!(parsed.strategy, Strategy::BlockMark);

        Ok(())
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("windowed-span".parse(), Ok(Strategy::WindowedSpan));
        assert_eq!("block-mark".parse(), Ok(Strategy::BlockMark));
        assert!("inline".parse::<Strategy>().is_err());
    }
}
