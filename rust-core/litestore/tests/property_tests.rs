// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for LiteStore

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use litestore::{Codec, CodecKind, Contents, NotificationBus, Store, StoreConfig, StoreRegistry, Value};
use proptest::prelude::*;

/// Generate store keys
fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,15}"
}

/// Generate finite doubles (JSON cannot carry NaN or infinities)
fn arb_finite() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::ZERO | prop::num::f64::SUBNORMAL
}

/// Generate arbitrary values, nesting up to a few levels
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        ".{0,24}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Data),
        any::<i64>().prop_map(Value::Integer),
        arb_finite().prop_map(Value::Real),
        any::<bool>().prop_map(Value::Bool),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(arb_key(), inner, 0..6).prop_map(Value::Dictionary),
        ]
    })
}

fn arb_contents() -> impl Strategy<Value = Contents> {
    prop::collection::btree_map(arb_key(), arb_value(), 0..12)
}

proptest! {
    #[test]
    fn test_set_then_get_returns_value(key in arb_key(), value in arb_value()) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(
            "prop",
            dir.path().join("prop.json"),
            Arc::new(litestore::JsonCodec),
            Arc::new(NotificationBus::new()),
        )
        .with_synchronize_on_drop(false);

        store.set(&key, value.clone());
        prop_assert_eq!(store.get(&key), Some(value));
        prop_assert!(store.is_dirty());
    }

    #[test]
    fn test_codecs_round_trip_contents(contents in arb_contents()) {
        for kind in [CodecKind::Json, CodecKind::Cbor] {
            let codec = kind.build();
            let bytes = codec.encode(&contents).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            prop_assert_eq!(&decoded, &contents);
        }
    }

    #[test]
    fn test_unset_keys_yield_defaults(key in arb_key()) {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(
            StoreConfig::default()
                .with_storage_dir(dir.path())
                .with_synchronize_on_drop(false),
        );
        let store = registry.store_with_name("empty").unwrap();

        prop_assert_eq!(store.string_for(&key), "");
        prop_assert!(store.array_for(&key).is_empty());
        prop_assert!(store.dictionary_for(&key).is_empty());
        prop_assert!(store.data_for(&key).is_empty());
        prop_assert!(store.string_array_for(&key).is_empty());
        prop_assert_eq!(store.integer_for(&key), 0);
        prop_assert_eq!(store.float_for(&key), 0.0);
        prop_assert_eq!(store.double_for(&key), 0.0);
        prop_assert!(!store.bool_for(&key));
        prop_assert!(store.url_for(&key).is_none());
    }

    #[test]
    fn test_remove_is_idempotent(key in arb_key(), value in arb_value()) {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(NotificationBus::new());
        let events = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&events);
        bus.subscribe(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        let store = Store::open("idem", dir.path().join("idem.json"), Arc::new(litestore::JsonCodec), bus)
            .with_synchronize_on_drop(false);
        store.set(&key, value);

        store.remove(&key);
        let after_first = (store.get(&key), store.len(), events.load(Ordering::SeqCst));
        store.remove(&key);
        let after_second = (store.get(&key), store.len(), events.load(Ordering::SeqCst));

        prop_assert!(after_first.0.is_none());
        prop_assert_eq!(after_first, after_second);
        prop_assert_eq!(events.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_string_array_requires_all_strings(
        strings in prop::collection::vec(".{0,8}", 0..8),
        intruder in any::<i64>(),
        position in any::<prop::sample::Index>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(
            StoreConfig::default()
                .with_storage_dir(dir.path())
                .with_synchronize_on_drop(false),
        );
        let store = registry.store_with_name("strings").unwrap();

        store.set("clean", strings.clone());
        prop_assert_eq!(store.string_array_for("clean"), strings.clone());

        let mut mixed: Vec<Value> = strings.into_iter().map(Value::String).collect();
        let at = position.index(mixed.len() + 1);
        mixed.insert(at, Value::Integer(intruder));
        store.set("mixed", mixed);
        prop_assert!(store.string_array_for("mixed").is_empty());
    }

    #[test]
    fn test_synchronize_reload_reconstructs_contents(contents in arb_contents(), cbor in any::<bool>()) {
        let dir = tempfile::tempdir().unwrap();
        let codec = if cbor { CodecKind::Cbor } else { CodecKind::Json };
        let config = StoreConfig::default()
            .with_storage_dir(dir.path())
            .with_codec(codec)
            .with_synchronize_on_drop(false);

        {
            let registry = StoreRegistry::new(config.clone());
            let store = registry.store_with_name("reload").unwrap();
            for (key, value) in &contents {
                store.set(key, value.clone());
            }
            store.synchronize().unwrap();
        }

        let registry = StoreRegistry::new(config);
        let store = registry.store_with_name("reload").unwrap();
        prop_assert_eq!(store.dictionary_representation(), contents);
    }
}
