use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::Task;
use crate::theme::ThemePreference;

pub const TASKS_KEY: &str = "fancy-todo-tasks";
pub const THEME_KEY: &str = "fancy-todo-theme";

/// Byte-valued key-value store. Every `set` replaces the whole value.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn set(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()>;
}

/// One file per key inside a data directory.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        validate_key(key)?;
        Ok(self.data_dir.join(key))
    }
}

impl KvStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(file = %path.display(), len = bytes.len(), "read value");
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
        }
    }

    #[tracing::instrument(skip(self, value), fields(len = value.len()))]
    fn set(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, value)
    }
}

/// In-process store, used by tests and embedders that bring their own
/// persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Typed access to the two entries the app keeps: the task list and the
/// theme preference.
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: KvStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Hydrates the task list. Missing, unreadable or malformed data all
    /// yield an empty list.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> Vec<Task> {
        let bytes = match self.store.get(TASKS_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no stored tasks; starting empty");
                return Vec::new();
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "task store unavailable; starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Task>>(&bytes) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Err(err) => {
                warn!(error = %err, "stored tasks are malformed; starting empty");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save(&mut self, tasks: &[Task]) -> anyhow::Result<()> {
        let serialized = serde_json::to_vec(tasks).context("failed to serialize tasks")?;
        self.store
            .set(TASKS_KEY, &serialized)
            .with_context(|| format!("failed to save {TASKS_KEY}"))
    }

    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> ThemePreference {
        match self.store.get(THEME_KEY) {
            Ok(Some(bytes)) => {
                ThemePreference::from_storage(&String::from_utf8_lossy(&bytes))
            }
            Ok(None) => ThemePreference::default(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "theme store unavailable; using light");
                ThemePreference::default()
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&mut self, theme: ThemePreference) -> anyhow::Result<()> {
        self.store
            .set(THEME_KEY, theme.storage_value().as_bytes())
            .with_context(|| format!("failed to save {THEME_KEY}"))
    }
}

fn validate_key(key: &str) -> anyhow::Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(anyhow!("invalid store key: {key:?}"));
    }
    Ok(())
}

#[tracing::instrument(skip(path, value))]
fn write_atomic(path: &Path, value: &[u8]) -> anyhow::Result<()> {
    debug!(file = %path.display(), len = value.len(), "writing value atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(value)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
