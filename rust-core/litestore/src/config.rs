// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry configuration.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::codec::CodecKind;

/// Environment variable overriding [`StoreConfig::storage_dir`].
pub const ENV_STORAGE_DIR: &str = "LITESTORE_DIR";

/// Environment variable overriding [`StoreConfig::codec`] (`json` or `cbor`).
pub const ENV_CODEC: &str = "LITESTORE_CODEC";

/// Directory name used under the platform data directory.
const APP_DIR_NAME: &str = "litestore";

/// Configuration shared by every store a registry opens.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding stores opened by name only.
    pub storage_dir: PathBuf,
    /// On-disk encoding.
    pub codec: CodecKind,
    /// Flush a dirty store when its last handle is dropped.
    pub synchronize_on_drop: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            codec: CodecKind::default(),
            synchronize_on_drop: true,
        }
    }
}

impl StoreConfig {
    /// Defaults with `LITESTORE_DIR` and `LITESTORE_CODEC` applied.
    ///
    /// An empty variable is ignored. An unrecognised codec name is logged
    /// and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup(ENV_STORAGE_DIR) {
            self.storage_dir = PathBuf::from(dir);
        }

        if let Some(codec) = lookup(ENV_CODEC) {
            match CodecKind::parse(&codec) {
                Some(kind) => self.codec = kind,
                None => warn!(value = %codec, "Ignoring unknown {}", ENV_CODEC),
            }
        }

        self
    }

    /// Use `dir` for stores opened without an explicit path.
    pub fn with_storage_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.storage_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Select the on-disk encoding.
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Enable or disable the flush on last drop.
    pub fn with_synchronize_on_drop(mut self, enabled: bool) -> Self {
        self.synchronize_on_drop = enabled;
        self
    }
}

/// The platform data directory (`~/.local/share`, `~/Library/Application
/// Support`, `%APPDATA%`) joined with `litestore`, else `./litestore`.
fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}
