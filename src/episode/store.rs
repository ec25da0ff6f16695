use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::{Episode, EpisodeError, EpisodeSummary};

/// Read-only source of episodes
pub trait EpisodeStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Arc<Episode>, EpisodeError>;

    /// Summaries sorted by episode id
    fn list(&self) -> Vec<EpisodeSummary>;
}

/// Episodes held in memory, keyed by id
#[derive(Debug, Default, Clone)]
pub struct MemoryEpisodeStore {
    episodes: BTreeMap<String, Arc<Episode>>,
}

impl MemoryEpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validated episode, replacing any with the same id
    pub fn insert(&mut self, episode: Episode) -> Result<(), EpisodeError> {
        episode.validate()?;
        self.episodes.insert(episode.id.clone(), Arc::new(episode));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

impl EpisodeStore for MemoryEpisodeStore {
    fn get(&self, id: &str) -> Result<Arc<Episode>, EpisodeError> {
        self.episodes
            .get(id)
            .cloned()
            .ok_or_else(|| EpisodeError::NotFound(id.to_string()))
    }

    fn list(&self) -> Vec<EpisodeSummary> {
        self.episodes.values().map(|e| e.summary()).collect()
    }
}

/// Episodes loaded once from a directory of `*.json` files
#[derive(Debug, Default, Clone)]
pub struct DirectoryEpisodeStore {
    inner: MemoryEpisodeStore,
}

impl DirectoryEpisodeStore {
    /// Load every `*.json` file in `dir`. Files that fail to parse or validate
    /// are logged and skipped; an unreadable directory is an error.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EpisodeError> {
        let dir = dir.as_ref();
        let mut inner = MemoryEpisodeStore::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            match load_file(&path) {
                Ok(episode) => {
                    tracing::debug!("Loaded episode {} from {}", episode.id, path.display());
                    if let Err(e) = inner.insert(episode) {
                        tracing::warn!("Skipping {}: {}", path.display(), e);
                    }
                }
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        tracing::info!("Loaded {} episode(s) from {}", inner.len(), dir.display());
        Ok(Self { inner })
    }
}

fn load_file(path: &Path) -> Result<Episode, EpisodeError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

impl EpisodeStore for DirectoryEpisodeStore {
    fn get(&self, id: &str) -> Result<Arc<Episode>, EpisodeError> {
        self.inner.get(id)
    }

    fn list(&self) -> Vec<EpisodeSummary> {
        self.inner.list()
    }
}
