// Editor Configuration
// TOML-backed settings for the paste sanitizer. Every field has a default so
// an empty file (or no file at all) yields the stock behaviour.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::richtext::paste::PasteRules;
use crate::richtext::style::{StyleAllowList, StyleProperty};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// What the sanitizer does with one style property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleRule {
    Keep,
    Drop,
}

/// What the sanitizer does with tags it does not recognise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownTagPolicy {
    /// Replace the element by its children, keeping the text
    #[default]
    Flatten,
    /// Remove the element and everything inside it
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EditorConfig {
    pub paste: PasteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PasteConfig {
    pub unknown_tags: UnknownTagPolicy,
    /// Foreign tags pasted as rows of their own
    pub block_tags: Vec<String>,
    pub style_rules: BTreeMap<String, StyleRule>,
}

impl Default for PasteConfig {
    fn default() -> Self {
        let block_tags = [
            "p", "h4", "h5", "h6", "blockquote", "pre", "section", "article", "header", "footer",
            "tr",
        ];
        let style_rules = StyleProperty::ALL
            .iter()
            .map(|&property| {
                let rule = if StyleAllowList::default().allows(property) {
                    StyleRule::Keep
                } else {
                    StyleRule::Drop
                };
                (property.css_name().to_string(), rule)
            })
            .collect();

        PasteConfig {
            unknown_tags: UnknownTagPolicy::default(),
            block_tags: block_tags.iter().map(|t| t.to_string()).collect(),
            style_rules,
        }
    }
}

impl PasteConfig {
    /// Properties marked `keep`; names outside the style table are ignored
    pub fn allow_list(&self) -> StyleAllowList {
        let mut kept = Vec::new();
        for (name, rule) in &self.style_rules {
            match StyleProperty::from_css_name(name) {
                Some(property) if *rule == StyleRule::Keep => kept.push(property),
                Some(_) => {}
                None => warn!(property = %name, "ignoring unknown style property in paste rules"),
            }
        }
        StyleAllowList::new(kept)
    }

    pub fn rules(&self) -> PasteRules {
        PasteRules {
            allow_list: self.allow_list(),
            unknown_tags: self.unknown_tags,
            block_tags: self
                .block_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}
