use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use log::{debug, warn};
use thiserror::Error;

use crate::PathConfiguration;

/// Failure while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration fetch failed: {0}")]
    Fetch(String),
}

/// Loads a bundled configuration asset from disk.
pub fn load_file(path: &Path) -> Result<PathConfiguration, ConfigError> {
    let json = fs::read_to_string(path)?;
    PathConfiguration::from_json(&json)
}

/// Fetches a configuration document over the network.
///
/// The transport lives with the host; this crate only defines the seam.
pub trait RemoteFetcher {
    fn fetch(&self, url: &str) -> Result<String, ConfigError>;
}

/// Receiver side of a background configuration refresh.
///
/// The refresh worker performs blocking I/O off the UI thread; the host
/// polls this non-blockingly from its main loop and swaps the configuration
/// in when a fresh copy arrives.
pub struct RemoteConfigHandle {
    receiver: Receiver<PathConfiguration>,
}

impl RemoteConfigHandle {
    /// Returns the freshest configuration delivered so far, if any.
    pub fn drain_latest(&self) -> Option<PathConfiguration> {
        let mut latest = None;
        while let Ok(config) = self.receiver.try_recv() {
            latest = Some(config);
        }
        latest
    }
}

/// Stale-while-revalidate loader for remotely hosted configuration.
///
/// The last good copy of each URL is persisted under `cache_dir` and always
/// returned first; a background fetch then refreshes it.
pub struct RemoteConfigLoader {
    cache_dir: PathBuf,
}

impl RemoteConfigLoader {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Loads the cached copy for `url` (if one exists and parses) and kicks
    /// off a background refresh. Fetch and parse failures during refresh are
    /// logged and leave the cached copy in place.
    pub fn load<F>(&self, url: &str, fetcher: F) -> (Option<PathConfiguration>, RemoteConfigHandle)
    where
        F: RemoteFetcher + Send + 'static,
    {
        let cache_path = self.cache_path(url);
        let cached = match fs::read_to_string(&cache_path) {
            Ok(json) => match PathConfiguration::from_json(&json) {
                Ok(config) => Some(config),
                Err(error) => {
                    warn!("discarding unreadable cached configuration for {url}: {error}");
                    None
                }
            },
            Err(_) => None,
        };

        let (sender, receiver) = mpsc::channel();
        let url = url.to_string();
        thread::spawn(move || {
            let json = match fetcher.fetch(&url) {
                Ok(json) => json,
                Err(error) => {
                    warn!("configuration refresh for {url} failed: {error}");
                    return;
                }
            };
            let config = match PathConfiguration::from_json(&json) {
                Ok(config) => config,
                Err(error) => {
                    warn!("configuration refresh for {url} returned malformed document: {error}");
                    return;
                }
            };
            if let Some(parent) = cache_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Err(error) = fs::write(&cache_path, &json) {
                debug!("could not persist configuration cache for {url}: {error}");
            }
            let _ = sender.send(config);
        });

        (cached, RemoteConfigHandle { receiver })
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        self.cache_dir
            .join(format!("path-configuration-{:016x}.json", hasher.finish()))
    }
}
