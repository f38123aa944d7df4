//! Host registry
//!
//! Ordered candidate hosts for the media server plus the persisted index of
//! the last host that answered. Pure bookkeeping: no network access here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Host;

/// Errors raised by the registry or its persistence
#[derive(Debug, Error)]
pub enum HostRegistryError {
    #[error("Host list is empty")]
    Empty,

    #[error("Host index {index} out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Host state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host state is malformed: {0}")]
    Format(String),
}

// =============================================================================
// Persistence
// =============================================================================

/// Where the last-good host index lives between runs
pub trait HostStore: Send + Sync {
    /// Read the persisted index, `None` if nothing was stored yet
    fn load(&self) -> Result<Option<usize>, HostRegistryError>;

    /// Persist a new index
    fn save(&self, index: usize) -> Result<(), HostRegistryError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    host_index: Option<usize>,
}

/// TOML-backed store (`<data_local_dir>/tvshows/state.toml`)
#[derive(Debug, Clone)]
pub struct FileHostStore {
    path: PathBuf,
}

impl FileHostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default state file location, if the platform has a data directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("tvshows").join("state.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostStore for FileHostStore {
    fn load(&self) -> Result<Option<usize>, HostRegistryError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: PersistedState =
            toml::from_str(&text).map_err(|e| HostRegistryError::Format(e.to_string()))?;
        Ok(state.host_index)
    }

    fn save(&self, index: usize) -> Result<(), HostRegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = PersistedState {
            host_index: Some(index),
        };
        let text =
            toml::to_string_pretty(&state).map_err(|e| HostRegistryError::Format(e.to_string()))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// In-process store, used when no state file is wanted and in tests
#[derive(Debug, Default)]
pub struct MemoryHostStore {
    index: Mutex<Option<usize>>,
    saves: Mutex<usize>,
}

impl MemoryHostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an index, as if written by an earlier run
    pub fn with_index(index: usize) -> Self {
        Self {
            index: Mutex::new(Some(index)),
            saves: Mutex::new(0),
        }
    }

    pub fn stored(&self) -> Option<usize> {
        *lock(&self.index)
    }

    /// Number of writes performed
    pub fn saves(&self) -> usize {
        *lock(&self.saves)
    }
}

impl HostStore for MemoryHostStore {
    fn load(&self) -> Result<Option<usize>, HostRegistryError> {
        Ok(*lock(&self.index))
    }

    fn save(&self, index: usize) -> Result<(), HostRegistryError> {
        *lock(&self.index) = Some(index);
        *lock(&self.saves) += 1;
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered, never-empty host list with a rotating current index.
///
/// Created once per process and shared by reference (`Arc`) with every
/// fetch surface. The persisted index is read lazily on first use.
pub struct HostRegistry {
    hosts: Vec<Host>,
    current: Mutex<Option<usize>>,
    store: Arc<dyn HostStore>,
}

impl HostRegistry {
    pub fn new(hosts: Vec<Host>, store: Arc<dyn HostStore>) -> Result<Self, HostRegistryError> {
        if hosts.is_empty() {
            return Err(HostRegistryError::Empty);
        }
        Ok(Self {
            hosts,
            current: Mutex::new(None),
            store,
        })
    }

    /// Registry with no persistence across runs
    pub fn in_memory(hosts: Vec<Host>) -> Result<Self, HostRegistryError> {
        Self::new(hosts, Arc::new(MemoryHostStore::new()))
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Current index, loading the persisted one on first use
    pub fn index(&self) -> usize {
        let mut current = lock(&self.current);
        self.ensure_loaded(&mut current)
    }

    pub fn current(&self) -> Host {
        self.hosts[self.index()].clone()
    }

    /// Rotate to `(index + 1) mod N` and persist the new index
    pub fn advance(&self) -> Host {
        let next = {
            let mut current = lock(&self.current);
            let index = self.ensure_loaded(&mut current);
            let next = (index + 1) % self.hosts.len();
            *current = Some(next);
            next
        };
        debug!(host = %self.hosts[next], index = next, "Rotated to next host");
        self.persist(next);
        self.hosts[next].clone()
    }

    /// Jump to an explicit index and persist it
    pub fn reset(&self, index: usize) -> Result<Host, HostRegistryError> {
        if index >= self.hosts.len() {
            return Err(HostRegistryError::OutOfRange {
                index,
                len: self.hosts.len(),
            });
        }
        *lock(&self.current) = Some(index);
        self.persist(index);
        Ok(self.hosts[index].clone())
    }

    fn ensure_loaded(&self, current: &mut Option<usize>) -> usize {
        if let Some(index) = *current {
            return index;
        }
        let index = match self.store.load() {
            Ok(Some(index)) if index < self.hosts.len() => index,
            Ok(Some(index)) => {
                warn!(index, len = self.hosts.len(), "Persisted host index out of range, using 0");
                0
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("Could not read persisted host index: {}", e);
                0
            }
        };
        *current = Some(index);
        index
    }

    // Best effort: a failed write never blocks rotation.
    fn persist(&self, index: usize) {
        if let Err(e) = self.store.save(index) {
            warn!(index, "Failed to persist host index: {}", e);
        }
    }
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRegistry")
            .field("hosts", &self.hosts)
            .field("current", &*lock(&self.current))
            .finish()
    }
}

// A poisoned lock only means another thread panicked mid-update of a plain
// index; the value is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
