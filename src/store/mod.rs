use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clip::Clip;

/// Holds the single current clip.
///
/// A submit swaps the whole `Arc<Clip>` under the write lock, so readers
/// either see the previous clip or the new one, never a mix of the two.
pub struct ClipStore {
    current: RwLock<Option<Arc<Clip>>>,
    persist_path: Option<PathBuf>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            persist_path: None,
        }
    }

    /// Store backed by a JSON file that survives restarts.
    pub async fn with_persistence(path: PathBuf) -> Self {
        let current = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Clip>(&bytes) {
                Ok(clip) => {
                    info!("Loaded stored {} clip from {}", clip.clip_type, path.display());
                    Some(Arc::new(clip))
                }
                Err(e) => {
                    warn!("Ignoring unreadable store file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read store file {}: {}", path.display(), e);
                None
            }
        };

        Self {
            current: RwLock::new(current),
            persist_path: Some(path),
        }
    }

    /// Replaces the current clip unconditionally.
    pub async fn submit(&self, clip: Clip) -> Arc<Clip> {
        let clip = Arc::new(clip);
        let mut current = self.current.write().await;
        *current = Some(clip.clone());

        // Persist while still holding the lock so the file follows submit order.
        if let Some(path) = &self.persist_path {
            self.persist(path, &clip).await;
        }

        debug!(
            "Stored {} clip from {} ({} bytes)",
            clip.clip_type,
            clip.source,
            clip.data.len()
        );
        clip
    }

    pub async fn fetch(&self) -> Option<Arc<Clip>> {
        self.current.read().await.clone()
    }

    async fn persist(&self, path: &Path, clip: &Clip) {
        let bytes = match serde_json::to_vec_pretty(clip) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize clip for persistence: {}", e);
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent).await {
                    warn!("Failed to create store directory: {}", e);
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, bytes).await {
            warn!("Failed to persist clipboard store: {}", e);
        }
    }
}

impl Default for ClipStore {
    fn default() -> Self {
        Self::new()
    }
}
