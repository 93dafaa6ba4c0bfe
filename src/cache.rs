/*!
 * Local snapshot of the last loaded content list.
 *
 * The dashboard shows cached contents immediately and replaces them once a
 * fresh list arrives. The snapshot is kept in memory and mirrored to a JSON
 * file so it survives between runs.
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::ContentSummary;

/// On-disk layout of the cache file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    #[serde(rename = "cachedContentData")]
    cached_content_data: Vec<ContentSummary>,

    saved_at: DateTime<Utc>,
}

/// Cached content list with its save time
#[derive(Debug, Clone, PartialEq)]
pub struct CachedContents {
    pub contents: Vec<ContentSummary>,
    pub saved_at: DateTime<Utc>,
}

/// Content list cache shared across the controller
#[derive(Debug, Clone)]
pub struct ContentCache {
    /// File mirror; `None` keeps the cache in memory only
    path: Option<PathBuf>,

    entry: Arc<RwLock<Option<CachedContents>>>,

    /// Whether caching is enabled
    enabled: bool,
}

impl ContentCache {
    /// Create a cache backed by `path`
    pub fn new(path: Option<PathBuf>, enabled: bool) -> Self {
        Self {
            path,
            entry: Arc::new(RwLock::new(None)),
            enabled,
        }
    }

    /// In-memory cache with no file
    pub fn in_memory() -> Self {
        Self::new(None, true)
    }

    /// Disabled cache; every read misses and every write is dropped
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    /// `<user cache dir>/blogflow/contents.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("blogflow").join("contents.json"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the file mirror into memory. A missing or unreadable file leaves
    /// the cache empty.
    pub fn load(&self) -> Option<CachedContents> {
        if !self.enabled {
            return None;
        }

        if let Some(entry) = self.entry.read().clone() {
            return Some(entry);
        }

        let path = self.path.as_ref()?;
        if !path.exists() {
            return None;
        }

        let parsed = fs::read_to_string(path)
            .context("Failed to read content cache")
            .and_then(|raw| serde_json::from_str::<CacheFile>(&raw).context("Failed to parse content cache"));

        match parsed {
            Ok(file) => {
                debug!("Loaded {} cached contents from {}", file.cached_content_data.len(), path.display());
                let entry = CachedContents {
                    contents: file.cached_content_data,
                    saved_at: file.saved_at,
                };
                *self.entry.write() = Some(entry.clone());
                Some(entry)
            }
            Err(e) => {
                warn!("Ignoring content cache at {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Replace the cached list and mirror it to disk
    pub fn store(&self, contents: &[ContentSummary]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = CachedContents {
            contents: contents.to_vec(),
            saved_at: Utc::now(),
        };
        *self.entry.write() = Some(entry.clone());

        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
        }

        let file = CacheFile {
            cached_content_data: entry.contents,
            saved_at: entry.saved_at,
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize content cache")?;
        fs::write(path, json).with_context(|| format!("Failed to write content cache: {}", path.display()))?;

        debug!("Cached {} contents to {}", contents.len(), path.display());
        Ok(())
    }

    /// Current in-memory snapshot without touching disk
    pub fn snapshot(&self) -> Option<CachedContents> {
        self.entry.read().clone()
    }

    /// Forget the cached list and remove the file
    pub fn clear(&self) -> Result<()> {
        *self.entry.write() = None;
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove content cache: {}", path.display()))?;
            }
        }
        Ok(())
    }
}
