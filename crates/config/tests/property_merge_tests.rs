//! Property-based tests for the merge engine and flat-key codec.
//!
//! These tests exercise recursive merging with randomly generated nested
//! mappings to catch edge cases the unit tests miss.
//!
//! Test coverage:
//! - Merging a mapping into an empty base reproduces the mapping
//! - Merging a mapping into itself is a no-op
//! - Merges of plain nested mappings never fail
//! - Backend composition agrees with direct layer merging
//! - A list load equals the fold of its members' individual loads
//! - Repeated loads with an unchanged context are byte-identical
//! - Flat-key encoding round-trips for sequence-free mappings
//! - Disabled sources never influence a load

use proptest::prelude::*;
use serde_yaml::{Mapping, Value};

use strata_config::{
    ConfigBackend, ConfigSourceList, OrderMode, SourceSpec, flat_from_nested, merge_mappings,
    nested_from_flat,
};

/// Strategy for scalar leaf values.
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000i64).prop_map(Value::from),
        "[a-z]{1,8}".prop_map(Value::String),
    ]
}

/// Keys that are plain identifiers, so no list-update grammar applies
/// and no dots collide with flat-key encoding.
const KEY_PATTERN: &str = "[a-z][a-z0-9_]{0,6}";

fn entries_to_mapping(entries: Vec<(String, Value)>) -> Mapping {
    entries
        .into_iter()
        .map(|(key, value)| (Value::String(key), value))
        .collect()
}

/// Strategy for nested mappings with scalar leaves, up to three levels deep.
fn mapping_strategy() -> impl Strategy<Value = Mapping> {
    let leaf = prop::collection::vec((KEY_PATTERN, scalar_strategy()), 0..5)
        .prop_map(entries_to_mapping);
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop::collection::vec(
            (
                KEY_PATTERN,
                prop_oneof![scalar_strategy(), inner.prop_map(Value::Mapping)],
            ),
            0..5,
        )
        .prop_map(entries_to_mapping)
    })
}

/// Like `mapping_strategy`, but every container is non-empty, since empty
/// containers are dropped by the flat-key encoding.
fn populated_mapping_strategy() -> impl Strategy<Value = Mapping> {
    let leaf = prop::collection::vec((KEY_PATTERN, scalar_strategy()), 1..4)
        .prop_map(entries_to_mapping);
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop::collection::vec(
            (
                KEY_PATTERN,
                prop_oneof![scalar_strategy(), inner.prop_map(Value::Mapping)],
            ),
            1..4,
        )
        .prop_map(entries_to_mapping)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Merging into an empty base reproduces the update exactly.
    #[test]
    fn merge_into_empty_is_identity(update in mapping_strategy()) {
        let mut base = Mapping::new();
        merge_mappings(&mut base, update.clone()).expect("merge failed");
        prop_assert_eq!(Value::Mapping(base), Value::Mapping(update));
    }

    /// Merging a mapping into itself changes nothing.
    #[test]
    fn self_merge_is_idempotent(mapping in mapping_strategy()) {
        let mut base = mapping.clone();
        merge_mappings(&mut base, mapping.clone()).expect("merge failed");
        prop_assert_eq!(Value::Mapping(base), Value::Mapping(mapping));
    }

    /// Plain nested mappings contain no list-update keys, so merging any
    /// two of them must succeed.
    #[test]
    fn plain_mapping_merges_never_fail(
        base in mapping_strategy(),
        update in mapping_strategy()
    ) {
        let mut merged = base;
        prop_assert!(merge_mappings(&mut merged, update).is_ok());
    }

    /// Composing a source layer and an override layer through the backend
    /// gives the same result as merging the layers directly.
    #[test]
    fn backend_composition_agrees_with_direct_merge(
        source in mapping_strategy(),
        override_layer in mapping_strategy()
    ) {
        let mut expected = Mapping::new();
        merge_mappings(&mut expected, source.clone()).expect("merge failed");
        merge_mappings(&mut expected, override_layer.clone()).expect("merge failed");

        let mut backend = ConfigBackend::new(Value::Mapping(source)).expect("backend failed");
        backend.set_override_config(override_layer).expect("override failed");
        let composed = backend.to_mapping(true).expect("export failed");
        prop_assert_eq!(Value::Mapping(composed), Value::Mapping(expected));
    }

    /// A list load is the left-to-right fold of its members' own loads in
    /// ascending order, wherever the members sat in the declaration.
    #[test]
    fn list_load_folds_member_loads_in_order(
        low in mapping_strategy(),
        mid in mapping_strategy(),
        high in mapping_strategy()
    ) {
        let list = ConfigSourceList::from_specs(
            vec![
                SourceSpec::new(Value::Mapping(high)).with_order(4),
                SourceSpec::new(Value::Mapping(low)).with_order(0),
                SourceSpec::new(Value::Mapping(mid)).with_order(2),
            ],
            OrderMode::Explicit,
        )
        .expect("list failed");

        let mut folded = list.get(0).expect("member").load(None).expect("load failed");
        for index in 1..list.len() {
            let next = list.get(index).expect("member").load(None).expect("load failed");
            merge_mappings(&mut folded, next).expect("merge failed");
        }

        prop_assert_eq!(
            Value::Mapping(list.load(None).expect("load failed")),
            Value::Mapping(folded)
        );
    }

    /// Loading an unchanged list twice under the same context yields the
    /// identical document, key order included.
    #[test]
    fn unchanged_lists_load_identically(
        base in mapping_strategy(),
        gated in mapping_strategy(),
        ready in any::<bool>()
    ) {
        let list = ConfigSourceList::from_specs(
            vec![
                SourceSpec::new(Value::Mapping(base)).with_order(0),
                SourceSpec::new(Value::Mapping(gated))
                    .with_order(1)
                    .with_enable_if("ready"),
            ],
            OrderMode::Explicit,
        )
        .expect("list failed");
        let context: Mapping = [(Value::from("ready"), Value::Bool(ready))]
            .into_iter()
            .collect();

        let first = list.load(Some(&context)).expect("load failed");
        let second = list.load(Some(&context)).expect("load failed");
        prop_assert_eq!(
            serde_yaml::to_string(&first).expect("serialize failed"),
            serde_yaml::to_string(&second).expect("serialize failed")
        );
    }

    /// A disabled source never influences what the list loads.
    #[test]
    fn disabled_sources_are_invisible(
        kept in mapping_strategy(),
        dropped in mapping_strategy()
    ) {
        let with_disabled = ConfigSourceList::from_specs(
            vec![
                SourceSpec::new(Value::Mapping(kept.clone())).with_order(0),
                SourceSpec::new(Value::Mapping(dropped)).with_order(1).disabled(),
            ],
            OrderMode::Explicit,
        )
        .expect("list failed");
        let without = ConfigSourceList::from_specs(
            vec![SourceSpec::new(Value::Mapping(kept)).with_order(0)],
            OrderMode::Explicit,
        )
        .expect("list failed");

        prop_assert_eq!(
            Value::Mapping(with_disabled.load(None).expect("load failed")),
            Value::Mapping(without.load(None).expect("load failed"))
        );
    }

    /// Flattening and re-expanding a sequence-free mapping reproduces it.
    #[test]
    fn flat_encoding_round_trips(mapping in populated_mapping_strategy()) {
        let flat = flat_from_nested(&mapping);
        let rebuilt = nested_from_flat(flat).expect("expansion failed");
        prop_assert_eq!(Value::Mapping(rebuilt), Value::Mapping(mapping));
    }
}
