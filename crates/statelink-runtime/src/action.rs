#![forbid(unsafe_code)]

//! Decoding evaluated expression values into store actions.
//!
//! An action descriptor is an object with a `type` key and an optional
//! `params` array. String types pass through unchanged; any other `type`
//! value is rendered to its JSON text and left for the store to accept or
//! reject:
//!
//! ```text
//! { "type": "inc", "params": [1, 2] }   -> dispatch("inc", 1, 2)
//! { "type": "inc" }                     -> dispatch("inc")
//! { "type": "inc", "params": 5 }        -> dispatch("inc")      (non-array params ignored)
//! { "type": 3 }                         -> dispatch("3")
//! { "type": null }                      -> dispatch("null")
//! 5, null, [..], { "kind": "inc" }      -> invalid
//! ```

use statelink_core::Value;

/// A validated `{type, params?}` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    /// Action name passed to `Store::dispatch`.
    pub kind: String,
    /// Positional parameters, in order.
    pub params: Vec<Value>,
}

/// Outcome of decoding an evaluated value.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    /// The value is an action descriptor.
    Valid(ActionDescriptor),
    /// The value cannot be dispatched.
    Invalid,
}

impl DispatchResult {
    /// Classify `value`. Pure; never panics.
    #[must_use]
    pub fn decode(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::Invalid;
        };
        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(other) => other.to_string(),
            None => return Self::Invalid,
        };
        let params = match map.remove("params") {
            Some(Value::Array(params)) => params,
            _ => Vec::new(),
        };
        Self::Valid(ActionDescriptor { kind, params })
    }

    /// The descriptor, if valid.
    #[must_use]
    pub fn into_action(self) -> Option<ActionDescriptor> {
        match self {
            Self::Valid(action) => Some(action),
            Self::Invalid => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn decode(value: Value) -> DispatchResult {
        DispatchResult::decode(value)
    }

    #[test]
    fn type_and_params() {
        assert_eq!(
            decode(json!({"type": "inc", "params": [1, 2]})),
            DispatchResult::Valid(ActionDescriptor {
                kind: "inc".into(),
                params: vec![json!(1), json!(2)],
            })
        );
    }

    #[test]
    fn missing_params_means_no_arguments() {
        let action = decode(json!({"type": "inc"})).into_action().unwrap();
        assert!(action.params.is_empty());
    }

    #[test]
    fn non_array_params_are_ignored() {
        let action = decode(json!({"type": "inc", "params": {"by": 2}}))
            .into_action()
            .unwrap();
        assert!(action.params.is_empty());
    }

    #[test]
    fn non_objects_are_invalid() {
        for value in [json!(5), json!(null), json!("inc"), json!(["inc"]), json!(true)] {
            assert_eq!(decode(value), DispatchResult::Invalid);
        }
    }

    #[test]
    fn only_a_missing_type_key_is_invalid() {
        assert_eq!(decode(json!({"kind": "inc"})), DispatchResult::Invalid);
        assert_eq!(decode(json!({})), DispatchResult::Invalid);
    }

    #[test]
    fn non_string_types_are_rendered() {
        for (value, kind) in [
            (json!({"type": 3}), "3"),
            (json!({"type": null}), "null"),
            (json!({"type": true}), "true"),
            (json!({"type": ["a"]}), r#"["a"]"#),
        ] {
            let action = decode(value).into_action().expect("descriptor with a type key");
            assert_eq!(action.kind, kind);
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let action = decode(json!({"type": "save", "meta": {"source": "form"}}))
            .into_action()
            .unwrap();
        assert_eq!(action.kind, "save");
    }

    proptest! {
        #[test]
        fn params_are_splatted_in_order(kind in "[a-z]{1,12}", params in proptest::collection::vec(any::<i64>(), 0..8)) {
            let value = json!({"type": kind.clone(), "params": params.clone()});
            let action = decode(value).into_action().expect("valid descriptor");
            prop_assert_eq!(action.kind, kind);
            let expected: Vec<Value> = params.into_iter().map(Value::from).collect();
            prop_assert_eq!(action.params, expected);
        }
    }
}
