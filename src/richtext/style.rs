// Character styling
// A closed table of the style properties the editor understands, plus the
// map, delta and allow-list types built on top of it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z-]+)\s*:\s*([^;]*)").expect("valid declaration pattern"));

/// Style properties with editor semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleProperty {
    FontWeight,
    FontStyle,
    TextDecoration,
    FontFamily,
    FontSize,
    Color,
    BackgroundColor,
}

impl StyleProperty {
    pub const ALL: [StyleProperty; 7] = [
        StyleProperty::FontWeight,
        StyleProperty::FontStyle,
        StyleProperty::TextDecoration,
        StyleProperty::FontFamily,
        StyleProperty::FontSize,
        StyleProperty::Color,
        StyleProperty::BackgroundColor,
    ];

    pub fn css_name(self) -> &'static str {
        match self {
            StyleProperty::FontWeight => "font-weight",
            StyleProperty::FontStyle => "font-style",
            StyleProperty::TextDecoration => "text-decoration",
            StyleProperty::FontFamily => "font-family",
            StyleProperty::FontSize => "font-size",
            StyleProperty::Color => "color",
            StyleProperty::BackgroundColor => "background-color",
        }
    }

    pub fn from_css_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.css_name() == name)
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

/// Style declarations of one element. Keys are unique; order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StyleMap {
    entries: BTreeMap<StyleProperty, String>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `style` attribute value. Unsupported properties are dropped.
    pub fn parse(declarations: &str) -> Self {
        let mut map = StyleMap::new();
        for caps in DECLARATION.captures_iter(declarations) {
            let name = &caps[1];
            let value = caps[2].trim();
            if value.is_empty() {
                continue;
            }
            match StyleProperty::from_css_name(name) {
                Some(property) => map.set(property, value),
                None => trace!(property = name, "dropping unsupported style property"),
            }
        }
        map
    }

    pub fn with(mut self, property: StyleProperty, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    pub fn get(&self, property: StyleProperty) -> Option<&str> {
        self.entries.get(&property).map(String::as_str)
    }

    pub fn set(&mut self, property: StyleProperty, value: impl Into<String>) {
        self.entries.insert(property, value.into());
    }

    pub fn remove(&mut self, property: StyleProperty) -> Option<String> {
        self.entries.remove(&property)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleProperty, &str)> {
        self.entries.iter().map(|(p, v)| (*p, v.as_str()))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(StyleProperty, &str) -> bool) {
        self.entries.retain(|p, v| keep(*p, v));
    }

    /// Apply a delta: set values are written, unset values remove the property
    pub fn apply(&mut self, delta: &StyleDelta) {
        for (property, value) in delta.iter() {
            match value {
                Some(value) => self.set(property, value),
                None => {
                    self.remove(property);
                }
            }
        }
    }

    /// Keep only the declarations `other` has with the same value
    pub fn intersect(&mut self, other: &StyleMap) {
        self.entries
            .retain(|p, v| other.entries.get(p).is_some_and(|o| o == v));
    }

    /// Overlay `inner` on top of this map (inner declarations win)
    pub fn overlay(&mut self, inner: &StyleMap) {
        for (p, v) in inner.iter() {
            self.set(p, v);
        }
    }

    /// Serialize as a `style` attribute value, e.g. `font-weight: bold;`
    pub fn to_declarations(&self) -> String {
        self.entries
            .iter()
            .map(|(p, v)| format!("{}: {};", p.css_name(), v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for StyleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_declarations())
    }
}

/// A set of style changes; `None` unsets the property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDelta {
    changes: Vec<(StyleProperty, Option<String>)>,
}

impl StyleDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(property: StyleProperty, value: Option<&str>) -> Self {
        StyleDelta {
            changes: vec![(property, value.map(str::to_string))],
        }
    }

    pub fn set(mut self, property: StyleProperty, value: impl Into<String>) -> Self {
        self.changes.push((property, Some(value.into())));
        self
    }

    pub fn unset(mut self, property: StyleProperty) -> Self {
        self.changes.push((property, None));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleProperty, Option<&str>)> {
        self.changes.iter().map(|(p, v)| (*p, v.as_deref()))
    }
}

/// Properties that survive paste sanitizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleAllowList {
    keep: BTreeSet<StyleProperty>,
}

impl StyleAllowList {
    pub fn new(keep: impl IntoIterator<Item = StyleProperty>) -> Self {
        StyleAllowList {
            keep: keep.into_iter().collect(),
        }
    }

    pub fn allows(&self, property: StyleProperty) -> bool {
        self.keep.contains(&property)
    }

    pub fn sanitize(&self, style: &mut StyleMap) {
        style.retain(|p, _| self.allows(p));
    }
}

impl Default for StyleAllowList {
    fn default() -> Self {
        StyleAllowList::new([
            StyleProperty::FontWeight,
            StyleProperty::FontStyle,
            StyleProperty::TextDecoration,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations() {
        let map = StyleMap::parse("font-family: Times,serif; font-size: medium; font-weight: bold;");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(StyleProperty::FontFamily), Some("Times,serif"));
        assert_eq!(map.get(StyleProperty::FontWeight), Some("bold"));
    }

    #[test]
    fn test_parse_drops_unknown_properties() {
        let map = StyleMap::parse("line-height: 2; FONT-STYLE: italic");
        assert_eq!(map.to_declarations(), "font-style: italic;");
    }

    #[test]
    fn test_apply_unset_removes() {
        let mut map = StyleMap::new().with(StyleProperty::FontWeight, "bold");
        map.apply(&StyleDelta::new().unset(StyleProperty::FontWeight).set(StyleProperty::Color, "red"));
        assert_eq!(map.get(StyleProperty::FontWeight), None);
        assert_eq!(map.get(StyleProperty::Color), Some("red"));
    }

    #[test]
    fn test_intersect_keeps_agreeing_values() {
        let mut a = StyleMap::new()
            .with(StyleProperty::FontWeight, "bold")
            .with(StyleProperty::FontStyle, "italic");
        let b = StyleMap::new()
            .with(StyleProperty::FontWeight, "bold")
            .with(StyleProperty::FontStyle, "normal");
        a.intersect(&b);
        assert_eq!(a.to_declarations(), "font-weight: bold;");
    }

    #[test]
    fn test_default_allow_list() {
        let mut map = StyleMap::parse("font-family: Times; font-size: medium; font-weight: bold");
        StyleAllowList::default().sanitize(&mut map);
        assert_eq!(map.to_declarations(), "font-weight: bold;");
    }
}
