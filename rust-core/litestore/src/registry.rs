// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Name-keyed table of live stores.
//
// A registry hands out one shared `Arc<Store>` per name so that every caller
// sees the same in-memory state. It is an ordinary value: construct one at
// startup and pass it to whoever needs it. Tests build their own isolated
// registries pointed at temporary directories.
//
// Each file backs at most one live store. Paths are compared after lexical
// normalisation (`.` and `..` resolved, relative paths joined to the working
// directory); symlinks are not followed.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::notify::NotificationBus;
use crate::store::Store;

/// Live stores indexed by name and by backing file.
#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Arc<Store>>,
    by_path: HashMap<PathBuf, String>,
}

/// Lookup-or-create table of [`Store`]s, one per name.
///
/// Stores opened through a registry share its codec and notification bus.
/// Entries stay registered until [`StoreRegistry::remove`] is called.
pub struct StoreRegistry {
    config: StoreConfig,
    codec: Arc<dyn Codec>,
    bus: Arc<NotificationBus>,
    entries: RwLock<Entries>,
}

impl StoreRegistry {
    /// Create an empty registry with its own notification bus.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_bus(config, Arc::new(NotificationBus::new()))
    }

    /// Create an empty registry publishing on an existing bus.
    pub fn with_bus(config: StoreConfig, bus: Arc<NotificationBus>) -> Self {
        let codec: Arc<dyn Codec> = Arc::from(config.codec.build());
        Self::with_codec(config, codec, bus)
    }

    /// Create an empty registry with a caller-supplied codec. The codec
    /// named in `config` is ignored.
    pub fn with_codec(config: StoreConfig, codec: Arc<dyn Codec>, bus: Arc<NotificationBus>) -> Self {
        Self {
            config,
            codec,
            bus,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// The bus every store in this registry publishes to.
    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Return the live store named `name`, opening it at the default
    /// location (`<storage_dir>/<name>.<ext>`) on first use.
    ///
    /// `name` must be a single normal path component, since it becomes the
    /// file name. If `name` was first opened with an explicit path, that
    /// instance is returned.
    pub fn store_with_name(&self, name: &str) -> StoreResult<Arc<Store>> {
        if let Some(store) = self.lookup(name) {
            return Ok(store);
        }
        validate_name(name)?;
        let path = self.default_path(name);
        self.open_or_get(name, &path, false)
    }

    /// Return the live store named `name`, opening it at `path` on first
    /// use. Any name is accepted here; it is only a label.
    ///
    /// Fails with [`StoreError::PathConflict`] if `name` is already live at
    /// a different path, and with [`StoreError::PathInUse`] if `path`
    /// already backs another name. Two paths are never merged.
    pub fn store_with_name_and_path(
        &self,
        name: &str,
        path: impl AsRef<Path>,
    ) -> StoreResult<Arc<Store>> {
        self.open_or_get(name, path.as_ref(), true)
    }

    /// Unregister `name` without flushing it. Call `synchronize()` first if
    /// its pending changes matter.
    ///
    /// The removed store no longer flushes when its last handle drops.
    /// Handles already given out keep working; the next lookup by `name`
    /// opens a fresh instance from disk.
    pub fn remove(&self, name: &str) -> Option<Arc<Store>> {
        let mut entries = self.write_entries();
        let store = entries.by_name.remove(name)?;
        entries.by_path.remove(store.path());
        store.set_synchronize_on_drop(false);
        info!(store = %name, "Unregistered store");
        Some(store)
    }

    /// True if `name` is currently live.
    pub fn contains(&self, name: &str) -> bool {
        self.read_entries().by_name.contains_key(name)
    }

    /// Names of all live stores, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_entries().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of live stores.
    pub fn len(&self) -> usize {
        self.read_entries().by_name.len()
    }

    /// True if no store is live.
    pub fn is_empty(&self) -> bool {
        self.read_entries().by_name.is_empty()
    }

    /// Flush every dirty store.
    ///
    /// Every store is attempted even if an earlier one fails; the first
    /// failure is returned.
    pub fn synchronize_all(&self) -> StoreResult<()> {
        let mut first_error = None;
        for store in self.snapshot() {
            if !store.is_dirty() {
                continue;
            }
            if let Err(e) = store.synchronize() {
                warn!(store = %store.name(), error = %e, "Synchronize failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn open_or_get(&self, name: &str, path: &Path, explicit: bool) -> StoreResult<Arc<Store>> {
        let path = normalize_path(path);
        let mut entries = self.write_entries();

        if let Some(existing) = entries.by_name.get(name) {
            if explicit && existing.path() != path {
                return Err(StoreError::PathConflict {
                    name: name.to_string(),
                    existing: existing.path().to_path_buf(),
                    requested: path,
                });
            }
            return Ok(Arc::clone(existing));
        }

        if let Some(owner) = entries.by_path.get(&path) {
            return Err(StoreError::PathInUse {
                path,
                owner: owner.clone(),
                requested: name.to_string(),
            });
        }

        // Loading happens under the registry lock so two racing lookups can
        // never construct two instances for one name or one file.
        let store = Arc::new(
            Store::open(name, path.clone(), Arc::clone(&self.codec), Arc::clone(&self.bus))
                .with_synchronize_on_drop(self.config.synchronize_on_drop),
        );
        info!(store = %name, path = %path.display(), "Registered store");
        entries.by_path.insert(path, name.to_string());
        entries.by_name.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn lookup(&self, name: &str) -> Option<Arc<Store>> {
        self.read_entries().by_name.get(name).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<Store>> {
        self.read_entries().by_name.values().cloned().collect()
    }

    fn default_path(&self, name: &str) -> PathBuf {
        self.config
            .storage_dir
            .join(format!("{}.{}", name, self.codec.extension()))
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "tokio")]
impl StoreRegistry {
    /// [`StoreRegistry::synchronize_all`] on tokio's blocking pool.
    pub async fn synchronize_all_async(self: &Arc<Self>) -> StoreResult<()> {
        let registry = Arc::clone(self);
        tokio::task::spawn_blocking(move || registry.synchronize_all())
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new(StoreConfig::from_env())
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("storage_dir", &self.config.storage_dir)
            .field("codec", &self.codec.name())
            .field("stores", &self.names())
            .finish()
    }
}

/// A name becomes a file name, so it must be a single normal path
/// component.
fn validate_name(name: &str) -> StoreResult<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if name.is_empty() || !single_normal || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` resolved without touching the
/// filesystem. `..` at the root stays at the root.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    };

    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}
