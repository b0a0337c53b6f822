// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// LiteStore
//
// Small named key-value stores kept in memory, flushed to one file each on
// demand, with typed accessors over a closed set of value types and a
// synchronous change-notification bus.
//
// # Modules
//
// - [`value`] -- The `Value` sum type stored under every key.
// - [`coercion`] -- Permissive read-side conversions to typed views.
// - [`codec`] -- The `Codec` trait plus JSON and CBOR encodings.
// - [`store`] -- `Store`: contents, dirty tracking, `synchronize()`.
// - [`registry`] -- `StoreRegistry`: one live `Store` per name.
// - [`notify`] -- `NotificationBus` and `ChangeEvent`.
// - [`config`] -- `StoreConfig` defaults and environment overrides.
// - [`error`] -- The `StoreError` enum.
//
// # Example
//
// ```rust
// use litestore::{StoreConfig, StoreRegistry};
//
// let dir = tempfile::tempdir().unwrap();
// let registry = StoreRegistry::new(StoreConfig::default().with_storage_dir(dir.path()));
//
// let prefs = registry.store_with_name("prefs").unwrap();
// prefs.set_integer("volume", 7);
// prefs.set("theme", "dark");
// assert_eq!(prefs.integer_for("volume"), 7);
// assert_eq!(prefs.string_for("missing"), "");
//
// prefs.synchronize().unwrap();
// assert!(!prefs.is_dirty());
// ```

pub mod codec;
pub mod coercion;
pub mod config;
pub mod error;
pub mod notify;
pub mod registry;
pub mod store;
pub mod value;

// Re-export the most commonly used types at the crate root for convenience.
pub use codec::{CborCodec, Codec, CodecKind, JsonCodec};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use notify::{ChangeEvent, NotificationBus, SubscriptionId};
pub use registry::StoreRegistry;
pub use store::Store;
pub use value::{Contents, Value};

// `Url` appears in the typed accessor signatures.
pub use url::Url;
