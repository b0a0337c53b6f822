// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A single named store.
//
// # Design
//
// - Contents and the dirty bookkeeping live behind one `RwLock`, so readers
//   never observe a torn update and `synchronize()` always encodes a
//   consistent snapshot.
// - Dirty tracking uses a mutation generation rather than a bare flag. A
//   flush only marks the store clean up to the generation it captured, so a
//   `set` that lands while the file is being written keeps the store dirty.
// - `synchronize()` clones the contents under the lock and releases it
//   before encoding and touching the disk. A separate I/O mutex orders
//   concurrent flushes so an older snapshot never replaces a newer file.
// - Change events are published after the state lock is released.
// - Lock poisoning is recovered. Every critical section leaves the state
//   consistent, and get/set/remove are documented as infallible.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};
use url::Url;

use crate::codec::Codec;
use crate::coercion;
use crate::error::StoreResult;
use crate::notify::{ChangeEvent, NotificationBus};
use crate::value::{Contents, Value};

#[derive(Debug, Default)]
struct State {
    contents: Contents,
    /// Bumped on every effective mutation.
    generation: u64,
    /// Generation captured by the last successful flush.
    synced_generation: u64,
}

impl State {
    fn is_dirty(&self) -> bool {
        self.generation != self.synced_generation
    }
}

/// A named, in-memory key-value mapping that can be flushed to one file.
///
/// Obtain shared instances through [`crate::StoreRegistry`]; [`Store::open`]
/// is available for callers that manage instances themselves.
///
/// Typed getters never fail. An absent key and a value of the wrong type
/// both produce the target type's default (`""`, `0`, `false`, empty
/// collections, `None` for URLs). See [`crate::coercion`] for the exact
/// conversion table.
pub struct Store {
    name: String,
    path: PathBuf,
    codec: Arc<dyn Codec>,
    bus: Arc<NotificationBus>,
    state: RwLock<State>,
    io_lock: Mutex<()>,
    synchronize_on_drop: AtomicBool,
}

impl Store {
    /// Open the store `name` backed by the file at `path`.
    ///
    /// Existing data is decoded with `codec`. A missing file gives an empty
    /// store. An unreadable or undecodable file is logged and also gives an
    /// empty store; the bad file is left in place until the next successful
    /// `synchronize()` replaces it.
    pub fn open(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        codec: Arc<dyn Codec>,
        bus: Arc<NotificationBus>,
    ) -> Self {
        let name = name.into();
        let path = path.into();
        let contents = load_contents(&name, &path, codec.as_ref());

        debug!(store = %name, path = %path.display(), keys = contents.len(), "Opened store");

        Self {
            name,
            path,
            codec,
            bus,
            state: RwLock::new(State {
                contents,
                ..State::default()
            }),
            io_lock: Mutex::new(()),
            synchronize_on_drop: AtomicBool::new(true),
        }
    }

    /// Control whether dropping the last handle to a dirty store flushes it.
    /// Enabled by default.
    pub fn with_synchronize_on_drop(self, enabled: bool) -> Self {
        self.set_synchronize_on_drop(enabled);
        self
    }

    /// Same as [`Store::with_synchronize_on_drop`], on a shared handle.
    pub fn set_synchronize_on_drop(&self, enabled: bool) {
        self.synchronize_on_drop.store(enabled, Ordering::Release);
    }

    /// The store's registry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file this store is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when there are mutations not yet written by `synchronize()`.
    pub fn is_dirty(&self) -> bool {
        self.read_state().is_dirty()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.read_state().contents.len()
    }

    /// True if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.read_state().contents.is_empty()
    }

    /// True if `key` has a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.read_state().contents.contains_key(key)
    }

    /// All keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.read_state().contents.keys().cloned().collect()
    }

    // -----------------------------------------------------------------------
    // Generic access
    // -----------------------------------------------------------------------

    /// The value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_state().contents.get(key).cloned()
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Marks the store dirty and publishes one [`ChangeEvent`] before
    /// returning.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        debug!(store = %self.name, key, kind = value.kind(), "Set value");
        {
            let mut state = self.write_state();
            state.contents.insert(key.to_string(), value);
            state.generation += 1;
        }
        self.notify();
    }

    /// Store `value` under `key`, or remove `key` when `value` is `None`.
    pub fn set_optional(&self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => self.set(key, value),
            None => self.remove(key),
        }
    }

    /// Delete `key`.
    ///
    /// Removing an absent key does nothing: the store is not marked dirty and
    /// no event is published.
    pub fn remove(&self, key: &str) {
        let removed = {
            let mut state = self.write_state();
            let removed = state.contents.remove(key).is_some();
            if removed {
                state.generation += 1;
            }
            removed
        };

        if removed {
            debug!(store = %self.name, key, "Removed value");
            self.notify();
        }
    }

    /// A deep copy of the current contents. Changes to the copy never reach
    /// the store.
    pub fn dictionary_representation(&self) -> Contents {
        self.read_state().contents.clone()
    }

    // -----------------------------------------------------------------------
    // Typed getters
    // -----------------------------------------------------------------------

    /// String view of `key`; `""` on absence or mismatch.
    pub fn string_for(&self, key: &str) -> String {
        self.with_value(key, coercion::to_string)
    }

    /// List view of `key`; empty on absence or mismatch.
    pub fn array_for(&self, key: &str) -> Vec<Value> {
        self.with_value(key, coercion::to_array)
    }

    /// Mapping view of `key`; empty on absence or mismatch.
    pub fn dictionary_for(&self, key: &str) -> Contents {
        self.with_value(key, coercion::to_dictionary)
    }

    /// Blob view of `key`; empty on absence or mismatch.
    pub fn data_for(&self, key: &str) -> Vec<u8> {
        self.with_value(key, coercion::to_data)
    }

    /// List-of-strings view of `key`. Empty unless every element is a
    /// string.
    pub fn string_array_for(&self, key: &str) -> Vec<String> {
        self.with_value(key, coercion::to_string_array)
    }

    /// Integer view of `key`; `0` on absence or mismatch.
    pub fn integer_for(&self, key: &str) -> i64 {
        self.with_value(key, coercion::to_integer)
    }

    /// Single-precision view of `key`; `0.0` on absence or mismatch.
    pub fn float_for(&self, key: &str) -> f32 {
        self.with_value(key, coercion::to_float)
    }

    /// Double-precision view of `key`; `0.0` on absence or mismatch.
    pub fn double_for(&self, key: &str) -> f64 {
        self.with_value(key, coercion::to_double)
    }

    /// Boolean view of `key`; `false` on absence or mismatch.
    pub fn bool_for(&self, key: &str) -> bool {
        self.with_value(key, coercion::to_bool)
    }

    /// URL view of `key`; `None` on absence, mismatch, or parse failure.
    pub fn url_for(&self, key: &str) -> Option<Url> {
        self.with_value(key, coercion::to_url)
    }

    // -----------------------------------------------------------------------
    // Typed setters
    // -----------------------------------------------------------------------

    /// Store an integer.
    pub fn set_integer(&self, key: &str, value: i64) {
        self.set(key, Value::Integer(value));
    }

    /// Store a single-precision float (widened to `Real`).
    pub fn set_float(&self, key: &str, value: f32) {
        self.set(key, Value::Real(f64::from(value)));
    }

    /// Store a double.
    pub fn set_double(&self, key: &str, value: f64) {
        self.set(key, Value::Real(value));
    }

    /// Store a boolean.
    pub fn set_bool(&self, key: &str, value: bool) {
        self.set(key, Value::Bool(value));
    }

    /// Store a URL as its string form.
    pub fn set_url(&self, key: &str, url: &Url) {
        self.set(key, Value::from(url));
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the current contents to [`Store::path`].
    ///
    /// On failure the in-memory contents are untouched and the store stays
    /// dirty, so a later call can retry. On success the store is clean unless
    /// another mutation arrived while the file was being written.
    pub fn synchronize(&self) -> StoreResult<()> {
        let _io = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (snapshot, generation) = {
            let state = self.read_state();
            (state.contents.clone(), state.generation)
        };

        let bytes = self.codec.encode(&snapshot)?;
        write_atomic(&self.path, &bytes)?;

        let still_dirty = {
            let mut state = self.write_state();
            state.synced_generation = state.synced_generation.max(generation);
            state.is_dirty()
        };

        debug!(
            store = %self.name,
            path = %self.path.display(),
            codec = self.codec.name(),
            bytes = bytes.len(),
            keys = snapshot.len(),
            still_dirty,
            "Synchronized store"
        );

        Ok(())
    }

    fn with_value<T>(&self, key: &str, view: impl FnOnce(Option<&Value>) -> T) -> T {
        let state = self.read_state();
        view(state.contents.get(key))
    }

    fn notify(&self) {
        self.bus.publish(&ChangeEvent::new(self.name.clone()));
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "tokio")]
impl Store {
    /// [`Store::synchronize`] on tokio's blocking pool.
    pub async fn synchronize_async(self: &Arc<Self>) -> StoreResult<()> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.synchronize())
            .await
            .map_err(|e| crate::error::StoreError::Io(io::Error::other(e)))?
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if !self.synchronize_on_drop.load(Ordering::Acquire) || !self.is_dirty() {
            return;
        }
        if let Err(e) = self.synchronize() {
            warn!(store = %self.name, path = %self.path.display(), error = %e, "Flush on drop failed");
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("codec", &self.codec.name())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

fn load_contents(name: &str, path: &Path, codec: &dyn Codec) -> Contents {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Contents::new(),
        Err(e) => {
            warn!(store = %name, path = %path.display(), error = %e, "Unreadable store file, starting empty");
            return Contents::new();
        }
    };

    match codec.decode(&bytes) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(store = %name, path = %path.display(), error = %e, "Corrupt store file, starting empty");
            Contents::new()
        }
    }
}

/// Write `bytes` to a sibling temp file, fsync it, then rename it over
/// `path`. Readers see either the old file or the new one.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "store path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
