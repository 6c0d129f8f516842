use log::debug;
use regex::RegexBuilder;

use config::PathProperties;

struct Route<T> {
    pattern: regex::Regex,
    factory: Box<dyn Fn(&str) -> T>,
}

/// Explicit registration table mapping URI patterns to native screen
/// factories.
///
/// Built once at startup, before any session is reachable. Resolution is
/// first-registered-match-wins, unlike path configuration lookup which
/// merges all matching rules; a route either handles a location or it does
/// not.
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers a screen factory for locations matching `pattern`
    /// (case-insensitive). Registration order is resolution order.
    pub fn register<F>(&mut self, pattern: &str, factory: F) -> Result<(), regex::Error>
    where
        F: Fn(&str) -> T + 'static,
    {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        self.routes.push(Route {
            pattern,
            factory: Box::new(factory),
        });
        Ok(())
    }

    /// Builds the screen for the first registered route matching `location`.
    pub fn resolve(&self, location: &str) -> Option<T> {
        self.routes
            .iter()
            .find(|route| route.pattern.is_match(location))
            .map(|route| (route.factory)(location))
    }

    /// Like `resolve`, but falls back to the configuration's fallback URI
    /// when no route handles the location directly.
    pub fn resolve_or_fallback(&self, location: &str, properties: &PathProperties) -> Option<T> {
        self.resolve(location).or_else(|| {
            let fallback = properties.fallback_uri()?;
            debug!("no route for {location}, trying fallback {fallback}");
            self.resolve(fallback)
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
