//! Property tests: signatures survive re-serialization and nothing else.

use json_sign::{canonicalize, Layout, SecretKey, SignError, Signer, VerificationKey, Verifier};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn arb_string() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..8).prop_map(|chars| chars.into_iter().collect())
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        arb_string().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            // Nested objects may use the reserved name; only the top level is special.
            prop::collection::btree_map(
                prop_oneof![Just("signature".to_string()), "[a-z]{1,6}"],
                inner,
                0..6
            )
            .prop_map(|members| Value::Object(members.into_iter().collect())),
        ]
    })
}

/// An unsigned top-level document.
fn arb_document() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z_]{1,8}", arb_value(), 0..6)
        .prop_map(|members| Value::Object(members.into_iter().collect()))
}

fn reversed(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .rev()
                .map(|(key, inner)| (key.clone(), reversed(inner)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(reversed).collect()),
        other => other.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sign_then_verify_returns_document(doc in arb_document()) {
        let key = SecretKey::hmac(b"property-key").unwrap();
        let input = serde_json::to_vec_pretty(&doc).unwrap();

        let signed = Signer::new(&key).sign(&input).unwrap();
        let verified = Verifier::verify(&signed, &key.verification_key()).unwrap();

        prop_assert_eq!(canonicalize(&verified.payload).unwrap(), canonicalize(&doc).unwrap());
    }

    #[test]
    fn prop_reserialization_keeps_signature(doc in arb_document(), seed in any::<[u8; 32]>()) {
        let key = SecretKey::ed25519(&seed).unwrap();
        let signed = Signer::new(&key).sign_value(doc).unwrap();
        let public = key.verification_key();

        for bytes in [
            serde_json::to_vec(&signed).unwrap(),
            serde_json::to_vec_pretty(&signed).unwrap(),
            serde_json::to_vec(&reversed(&signed)).unwrap(),
        ] {
            prop_assert!(Verifier::is_valid(&bytes, &public));
        }
    }

    #[test]
    fn prop_canonical_form_is_a_fixed_point(value in arb_value()) {
        let canonical = canonicalize(&value).unwrap();
        let reparsed: Value = serde_json::from_slice(canonical.as_bytes()).unwrap();
        prop_assert_eq!(canonicalize(&reparsed).unwrap(), canonical);
    }

    #[test]
    fn prop_other_key_fails(
        doc in arb_document(),
        signing in prop::collection::vec(any::<u8>(), 1..32),
        checking in prop::collection::vec(any::<u8>(), 1..32),
    ) {
        prop_assume!(signing != checking);

        let key = SecretKey::hmac(&signing).unwrap();
        let signed = Signer::new(&key)
            .with_layout(Layout::Compact)
            .sign(&serde_json::to_vec(&doc).unwrap())
            .unwrap();

        let other = VerificationKey::hmac(&checking).unwrap();
        prop_assert!(matches!(Verifier::verify(&signed, &other), Err(SignError::SignatureMismatch)));
    }
}
