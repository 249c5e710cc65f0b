//! Configuration file support for the ipubpandoc CLI
//!
//! Loads settings from `_ipubpandoc.toml`. Command line flags take precedence
//! over the file, and options set in a document's own metadata take
//! precedence over both.

use anyhow::{Context, Result};
use ipub_filters::OptionOverrides;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_ipubpandoc.toml";

/// Schema URL for the configuration file
pub const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/ipypublish/ipubpandoc/main/crates/ipubpandoc-cli/schema/ipubpandoc.schema.json";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Output configuration
    #[serde(skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,
    /// Filter options, as under `ipub.pandoc` in document metadata
    #[serde(skip_serializing_if = "PandocConfig::is_empty")]
    pub pandoc: PandocConfig,
}

/// Output configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Target format: "latex", "rst" or "html" (default: "latex")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Write the filtered document as pandoc JSON instead of rendering it (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
    /// Input format: "markdown" or "json" (default: "markdown")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl OutputConfig {
    fn is_empty(&self) -> bool {
        self.format.is_none() && self.json.is_none() && self.from.is_none()
    }
}

/// Filter options
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct PandocConfig {
    /// Run the filters at all (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_filters: Option<bool>,
    /// Convert raw LaTeX/RST/HTML references and commands (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_raw: Option<bool>,
    /// Drop raw content written for another format (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_raw: Option<bool>,
    /// Use :numref: rather than :ref: in RST (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_numref: Option<bool>,
    /// Interpret @label prefixes and attribute blocks (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_notation: Option<bool>,
    /// LaTeX command for internal links (default: "cref")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reftag: Option<String>,
    /// Remove document metadata from the output (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_meta: Option<bool>,
    /// CSL-JSON or BibTeX bibliography used to number HTML citations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<PathBuf>,
}

impl PandocConfig {
    fn is_empty(&self) -> bool {
        self.overrides().is_empty() && self.bibliography.is_none()
    }

    /// The filter options set in this section
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            apply_filters: self.apply_filters,
            convert_raw: self.convert_raw,
            hide_raw: self.hide_raw,
            use_numref: self.use_numref,
            at_notation: self.at_notation,
            reftag: self.reftag.clone(),
            strip_meta: self.strip_meta,
        }
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_ipubpandoc.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema {}\n\n{}", SCHEMA_URL, toml_content))
    }

    /// Create a sample configuration with common defaults for init command
    pub fn sample() -> Self {
        Config {
            output: OutputConfig {
                format: Some("latex".to_string()),
                json: Some(false),
                from: Some("markdown".to_string()),
            },
            pandoc: PandocConfig {
                apply_filters: Some(true),
                convert_raw: Some(true),
                hide_raw: Some(false),
                use_numref: Some(false),
                at_notation: Some(true),
                reftag: Some("cref".to_string()),
                strip_meta: Some(false),
                bibliography: None, // user should specify
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.output.format.is_none());
        assert!(config.pandoc.overrides().is_empty());
    }

    #[test]
    fn test_parse_output_section() {
        let config: Config = toml::from_str(
            r#"
            [output]
            format = "rst"
            json = true
            from = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.output.format, Some("rst".to_string()));
        assert_eq!(config.output.json, Some(true));
        assert_eq!(config.output.from, Some("json".to_string()));
    }

    #[test]
    fn test_parse_pandoc_section() {
        let config: Config = toml::from_str(
            r#"
            [pandoc]
            use_numref = true
            reftag = "Cref"
            bibliography = "refs.json"
            "#,
        )
        .unwrap();

        let overrides = config.pandoc.overrides();
        assert_eq!(overrides.use_numref, Some(true));
        assert_eq!(overrides.reftag, Some("Cref".to_string()));
        assert_eq!(overrides.hide_raw, None);
        assert_eq!(config.pandoc.bibliography, Some(PathBuf::from("refs.json")));
    }

    #[test]
    fn test_wrong_value_type_is_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [pandoc]
            use_numref = "yes"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_empty_config() {
        let config = Config::default();
        let toml = config.to_toml_with_schema().unwrap();
        assert!(toml.starts_with("#:schema"));
        assert!(!toml.contains("[output]"));
        assert!(!toml.contains("[pandoc]"));
    }

    #[test]
    fn test_serialize_sample_config() {
        let config = Config::sample();
        let toml = config.to_toml_with_schema().unwrap();
        assert!(toml.contains("[output]"));
        assert!(toml.contains("[pandoc]"));
        assert!(toml.contains("reftag = \"cref\""));
    }

    #[test]
    fn test_json_schema_generation() {
        let schema = Config::json_schema_string().unwrap();
        assert!(schema.contains("\"title\""));
        assert!(schema.contains("PandocConfig"));
    }

    #[test]
    fn test_roundtrip() {
        let config = Config::sample();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.pandoc.overrides(), parsed.pandoc.overrides());
    }
}
