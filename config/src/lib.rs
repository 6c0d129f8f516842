use std::cell::RefCell;
use std::collections::HashMap;

use log::warn;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use url::Url;

mod loader;

pub use loader::{load_file, ConfigError, RemoteConfigHandle, RemoteConfigLoader, RemoteFetcher};

/// Presentation context for a destination.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum NavContext {
    #[default]
    Default,
    Modal,
}

/// How a destination is placed on the navigation stack.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Presentation {
    #[default]
    Default,
    Push,
    Replace,
    Pop,
    None,
}

/// Merged, read-only properties for one location.
///
/// The underlying map is flat string-to-string; typed accessors cover the
/// keys the navigation layer branches on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathProperties(HashMap<String, String>);

impl PathProperties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn context(&self) -> NavContext {
        match self.get("context") {
            Some("modal") => NavContext::Modal,
            _ => NavContext::Default,
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self.get("presentation") {
            Some("push") => Presentation::Push,
            Some("replace") => Presentation::Replace,
            Some("pop") => Presentation::Pop,
            Some("none") => Presentation::None,
            _ => Presentation::Default,
        }
    }

    /// Pull-to-refresh stays enabled unless a rule disables it, including
    /// over an in-place error view.
    pub fn pull_to_refresh_enabled(&self) -> bool {
        self.get("pull_to_refresh_enabled") != Some("false")
    }

    pub fn fallback_uri(&self) -> Option<&str> {
        self.get("fallback_uri")
    }

    fn merge(&mut self, properties: &HashMap<String, String>) {
        for (key, value) in properties {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for PathProperties {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// One declared rule: a set of patterns plus the properties they contribute.
#[derive(Debug)]
pub struct PathRule {
    patterns: Vec<Regex>,
    properties: HashMap<String, String>,
}

impl PathRule {
    /// Compiles the rule's patterns, case-insensitive.
    ///
    /// Malformed patterns are logged and dropped so one authoring mistake
    /// never takes down the whole lookup (fail-open to no-match).
    fn compile(patterns: &[String], properties: HashMap<String, String>) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(error) => {
                        warn!("ignoring malformed path pattern {pattern:?}: {error}");
                        None
                    }
                }
            })
            .collect();
        Self {
            patterns,
            properties,
        }
    }

    fn matches(&self, path_and_query: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.is_match(path_and_query))
    }
}

/// Immutable-per-load rule table mapping URL path patterns to presentation
/// properties.
///
/// Lookup merges the properties of every matching rule in declaration
/// order; later rules overwrite earlier keys. This is deliberately not
/// first-match-wins — it mirrors the behavior web and native configuration
/// authors already rely on.
#[derive(Debug, Default)]
pub struct PathConfiguration {
    rules: Vec<PathRule>,
    settings: HashMap<String, String>,
    cache: RefCell<HashMap<String, PathProperties>>,
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    rules: Vec<RuleDocument>,
    #[serde(default)]
    settings: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    properties: HashMap<String, String>,
}

impl PathConfiguration {
    /// Parses a configuration document: `{"rules": [...], "settings": {...}}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: ConfigDocument) -> Self {
        let rules = document
            .rules
            .into_iter()
            .map(|rule| PathRule::compile(&rule.patterns, rule.properties))
            .collect();
        Self {
            rules,
            settings: document.settings,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Merged properties for a location.
    ///
    /// Patterns are tested against the location's path plus `?query` when
    /// present. Results are cached per exact location string for the life of
    /// this configuration; reloading replaces the configuration wholesale,
    /// which discards the cache with it.
    pub fn properties(&self, location: &str) -> PathProperties {
        if let Some(cached) = self.cache.borrow().get(location) {
            return cached.clone();
        }

        let path_and_query = path_and_query(location);
        let mut merged = PathProperties::default();
        for rule in &self.rules {
            if rule.matches(&path_and_query) {
                merged.merge(&rule.properties);
            }
        }

        self.cache
            .borrow_mut()
            .insert(location.to_string(), merged.clone());
        merged
    }

    /// Global settings map from the document's `settings` member.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Extracts path plus `?query` from a location. Unparseable locations are
/// matched as-is so relative paths still hit the rules.
fn path_and_query(location: &str) -> String {
    match Url::parse(location) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        },
        Err(_) => location.to_string(),
    }
}
