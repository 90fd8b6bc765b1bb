//! End-to-end goal verification over unconsumed checkpoints.

use serde_json::{Map, Value};
use tracing::debug;

use crate::golden::EndToEndSpec;
use crate::log::Checkpoint;
use crate::url_match;

/// Whether `url` reaches the target path with a query whose values,
/// each JSON-decoded, equal the expected parameters.
///
/// A value that is not valid JSON fails verification.
pub fn verify_url(spec: &EndToEndSpec, url: &str) -> bool {
    let parsed = url_match::parse(url);
    if parsed.path != spec.path {
        return false;
    }

    let mut decoded = Map::new();
    for (key, values) in parsed.query {
        let Some(raw) = values.first() else {
            continue;
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                decoded.insert(key, value);
            }
            Err(err) => {
                debug!(%key, %err, "end-to-end parameter is not JSON");
                return false;
            }
        }
    }

    Value::Object(decoded) == spec.params
}

/// Whether any extra checkpoint satisfies the end-to-end goal
pub fn verify(spec: &EndToEndSpec, extra_checkpoints: &[Checkpoint]) -> bool {
    extra_checkpoints.iter().any(|c| verify_url(spec, &c.url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thanks_spec() -> EndToEndSpec {
        EndToEndSpec {
            path: "/playground/thanks".to_string(),
            params: json!({
                "cart": {"customizations": {"memory": "8GB", "storage": "512GB"}, "id": "1"},
                "location": {"city": "Cambridge"},
            }),
        }
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let url = r#"/playground/thanks?location={"city":"Cambridge"}&cart={"id":"1","customizations":{"storage":"512GB","memory":"8GB"}}"#;
        assert!(verify_url(&thanks_spec(), url));
    }

    #[test]
    fn test_values_must_be_equal() {
        let url = r#"/playground/thanks?cart={"id":"2","customizations":{"memory":"8GB","storage":"512GB"}}&location={"city":"Cambridge"}"#;
        assert!(!verify_url(&thanks_spec(), url));

        let missing_key = r#"/playground/thanks?cart={"id":"1","customizations":{"memory":"8GB","storage":"512GB"}}"#;
        assert!(!verify_url(&thanks_spec(), missing_key));
    }

    #[test]
    fn test_wrong_path() {
        let url = r#"/playground/checkout?cart={"id":"1","customizations":{"memory":"8GB","storage":"512GB"}}&location={"city":"Cambridge"}"#;
        assert!(!verify_url(&thanks_spec(), url));
    }

    #[test]
    fn test_malformed_json_is_a_failure() {
        assert!(!verify_url(&thanks_spec(), "/playground/thanks?cart={oops&location=Cambridge"));
    }

    #[test]
    fn test_numbers_compare_as_json() {
        let spec = EndToEndSpec {
            path: "/playground/checkout".to_string(),
            params: json!({"cart": {"price": 2999}}),
        };
        assert!(verify_url(&spec, r#"/playground/checkout?cart={"price":2999}"#));
        assert!(!verify_url(&spec, r#"/playground/checkout?cart={"price":"2999"}"#));
    }

    #[test]
    fn test_any_extra_checkpoint() {
        let hit = Checkpoint::new(
            r#"/playground/thanks?cart={"id":"1","customizations":{"memory":"8GB","storage":"512GB"}}&location={"city":"Cambridge"}"#,
            Vec::new(),
        );
        assert!(verify(&thanks_spec(), &[Checkpoint::new("/playground", Vec::new()), hit]));
        assert!(!verify(&thanks_spec(), &[]));
    }
}
