//! URL templates with `{name}` placeholders
//!
//! Commands are turned into requests by convention: every payload field named
//! in the template is bound into the URL, and whatever is left becomes the
//! request body.
//!
//! ```
//! use optimistic_runtime::template::{bind_path_variables, request_body};
//! use serde_json::json;
//!
//! let payload = json!({ "id": 7, "completed": true });
//!
//! let url = bind_path_variables("/todos/{id}", &payload)?;
//! assert_eq!(url, "/todos/7");
//!
//! // Only one field is left over, so the body is that field's value
//! assert_eq!(request_body("/todos/{id}", &payload), json!(true));
//! # Ok::<(), optimistic_core::DispatchError>(())
//! ```

use optimistic_core::DispatchError;
use serde_json::{Map, Value};

/// Placeholder names in the order they appear in the template
///
/// Text after an unclosed `{` is not a placeholder.
#[must_use]
pub fn path_variables(template: &str) -> Vec<&str> {
    template
        .split('{')
        .skip(1)
        .filter_map(|segment| segment.split_once('}').map(|(name, _)| name))
        .collect()
}

/// Substitute each `{name}` with the payload field of the same name
///
/// Payload fields that do not appear in the template are ignored. String
/// fields are inserted without quotes; other values use their JSON text.
///
/// # Errors
///
/// Returns [`DispatchError::MissingPathVariable`] when any placeholder is left
/// unbound, including when the payload is not an object.
pub fn bind_path_variables(template: &str, payload: &Value) -> Result<String, DispatchError> {
    let mut url = template.to_string();
    let mut missing = Vec::new();

    for name in path_variables(template) {
        match payload.get(name) {
            Some(value) => {
                url = url.replace(&format!("{{{name}}}"), &path_segment(value));
            }
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() && !url.contains('{') {
        Ok(url)
    } else {
        Err(DispatchError::MissingPathVariable {
            template: template.to_string(),
            missing,
        })
    }
}

/// The request body for a payload sent to `template`
///
/// - Non-object payloads (including `null`) are the body as-is.
/// - Fields consumed by the URL are removed.
/// - If exactly one field remains, the body is that field's value.
#[must_use]
pub fn request_body(template: &str, payload: &Value) -> Value {
    let Value::Object(fields) = payload else {
        return payload.clone();
    };

    let consumed = path_variables(template);
    let remaining: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| !consumed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if remaining.len() == 1 {
        remaining
            .into_iter()
            .next()
            .map_or(Value::Null, |(_, value)| value)
    } else {
        Value::Object(remaining)
    }
}

fn path_segment(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn template_without_variables_is_returned_unchanged() {
        assert_eq!(bind_path_variables("a", &Value::Null).unwrap(), "a");
        assert_eq!(bind_path_variables("/todos", &json!({ "text": "x" })).unwrap(), "/todos");
    }

    #[test]
    fn binds_every_placeholder() {
        assert_eq!(bind_path_variables("/a/{a}", &json!({ "a": 1 })).unwrap(), "/a/1");
        assert_eq!(
            bind_path_variables("/a/{a}/b/{b}/c/{test}", &json!({ "a": 1, "b": 2, "test": 3 }))
                .unwrap(),
            "/a/1/b/2/c/3"
        );
    }

    #[test]
    fn ignores_fields_not_in_template() {
        assert_eq!(
            bind_path_variables("/a/{a}", &json!({ "a": 1, "b": 2 })).unwrap(),
            "/a/1"
        );
    }

    #[test]
    fn string_fields_are_bound_without_quotes() {
        assert_eq!(
            bind_path_variables("/users/{name}", &json!({ "name": "ada" })).unwrap(),
            "/users/ada"
        );
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let error = bind_path_variables("/a/{a}", &json!({})).unwrap_err();
        assert_eq!(
            error,
            DispatchError::MissingPathVariable {
                template: "/a/{a}".to_string(),
                missing: vec!["a".to_string()],
            }
        );
        assert!(error.is_construction_error());

        assert!(bind_path_variables("/a/{a}", &Value::Null).is_err());
    }

    #[test]
    fn parses_placeholder_names_in_order() {
        assert!(path_variables("api/todo").is_empty());
        assert_eq!(
            path_variables("/todo/{todoId}/item/{itemId}/detail/{detailId}"),
            vec!["todoId", "itemId", "detailId"]
        );
    }

    #[test]
    fn body_drops_fields_bound_into_url() {
        assert_eq!(request_body("/api/{todoId}", &json!({ "todoId": 1, "b": 2 })), json!(2));
        assert_eq!(
            request_body("/api/{todoId}", &json!({ "todoId": 1, "b": 2, "c": 3 })),
            json!({ "b": 2, "c": 3 })
        );
    }

    #[test]
    fn non_object_payload_is_the_body() {
        assert_eq!(request_body("/api/todo", &Value::Null), Value::Null);
        assert_eq!(request_body("/api/{todoId}", &Value::Null), Value::Null);
        assert_eq!(request_body("/api/todo", &json!("1/31/2019")), json!("1/31/2019"));
    }

    #[test]
    fn fully_consumed_payload_leaves_empty_object() {
        assert_eq!(request_body("/todos/{id}", &json!({ "id": 3 })), json!({}));
    }

    proptest::proptest! {
        #[test]
        fn bound_fields_never_reach_the_body(id in 0_u32..100_000, text in "[a-z]{1,12}") {
            let payload = json!({ "id": id, "text": text });

            let url = bind_path_variables("/todos/{id}", &payload).unwrap();
            proptest::prop_assert_eq!(url, format!("/todos/{id}"));
            proptest::prop_assert_eq!(request_body("/todos/{id}", &payload), json!(text));
        }
    }
}
