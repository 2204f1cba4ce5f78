//! Property tests for the outbound canonical signature

use proptest::prelude::*;
use serde_json::{Map, Value as JsonValue};
use taskfund_backend::payments::signature::{canonical_string, sign_params};

fn params_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-zA-Z][a-zA-Z0-9]{0,11}", "[a-zA-Z0-9._:/-]{0,16}", 1..8)
        .prop_filter("signature key is never signed", |m| !m.contains_key("signature"))
        .prop_map(|m| m.into_iter().collect())
}

fn to_map(pairs: &[(String, String)]) -> Map<String, JsonValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
        .collect()
}

proptest! {
    #[test]
    fn canonical_string_ignores_insertion_order(
        (pairs, shuffled) in params_strategy()
            .prop_flat_map(|pairs| {
                let shuffled = Just(pairs.clone()).prop_shuffle();
                (Just(pairs), shuffled)
            })
    ) {
        let original = to_map(&pairs);
        let reordered = to_map(&shuffled);
        prop_assert_eq!(canonical_string(&original), canonical_string(&reordered));
        prop_assert_eq!(
            sign_params(&original, "test-app-secret"),
            sign_params(&reordered, "test-app-secret")
        );
    }

    #[test]
    fn signature_depends_on_secret(
        pairs in params_strategy(),
        secret_a in "[a-z0-9]{1,16}",
        secret_b in "[a-z0-9]{1,16}",
    ) {
        prop_assume!(secret_a != secret_b);
        let params = to_map(&pairs);
        prop_assert_ne!(sign_params(&params, &secret_a), sign_params(&params, &secret_b));
    }

    #[test]
    fn changing_any_value_changes_signature(
        pairs in params_strategy(),
        index in any::<prop::sample::Index>(),
    ) {
        let params = to_map(&pairs);
        let (key, value) = &pairs[index.index(pairs.len())];
        let mut changed = params.clone();
        changed.insert(key.clone(), JsonValue::String(format!("{}x", value)));
        prop_assert_ne!(
            sign_params(&params, "test-app-secret"),
            sign_params(&changed, "test-app-secret")
        );
    }

    #[test]
    fn signature_is_uppercase_hex(pairs in params_strategy()) {
        let signature = sign_params(&to_map(&pairs), "test-app-secret");
        prop_assert_eq!(signature.len(), 32);
        prop_assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
