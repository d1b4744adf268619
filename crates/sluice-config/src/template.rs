//! Parameter template resolution using minijinja.
//!
//! Trigger parameters may reference the coordinates of the owning flow:
//! ```json
//! { "sql": "SELECT * FROM `{{ namespace }}.events` WHERE flow = '{{ flow_id }}'" }
//! ```
//!
//! Rendering is strict: referencing an unknown variable is an error rather
//! than an empty string, so a typo never silently produces a different query.

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;

use crate::error::ConfigError;
use crate::trigger::Parameters;

/// Render every parameter value against `context`.
pub fn resolve_parameters<C: Serialize>(
  params: &Parameters,
  context: &C,
) -> Result<Parameters, ConfigError> {
  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);
  let ctx = Value::from_serialize(context);

  params
    .iter()
    .map(|(key, template)| {
      let rendered =
        env
          .render_str(template, ctx.clone())
          .map_err(|e| ConfigError::Template {
            key: key.clone(),
            message: e.to_string(),
          })?;
      Ok((key.clone(), rendered))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn params(entries: &[(&str, &str)]) -> Parameters {
    entries
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_resolve_coordinates() {
    let input = params(&[
      ("sql", "SELECT * FROM `{{ namespace }}.{{ flow_id }}`"),
      ("store_prefix", "{{ namespace }}/{{ flow_id }}/{{ trigger_id }}"),
    ]);
    let ctx = json!({
      "namespace": "io.sluice",
      "flow_id": "listen",
      "trigger_id": "watch",
    });

    let resolved = resolve_parameters(&input, &ctx).unwrap();
    assert_eq!(resolved["sql"], "SELECT * FROM `io.sluice.listen`");
    assert_eq!(resolved["store_prefix"], "io.sluice/listen/watch");
  }

  #[test]
  fn test_literals_pass_through() {
    let input = params(&[("legacy_sql", "false")]);
    let resolved = resolve_parameters(&input, &json!({})).unwrap();
    assert_eq!(resolved["legacy_sql"], "false");
  }

  #[test]
  fn test_unknown_variable_is_error() {
    let input = params(&[("sql", "SELECT {{ missing }}")]);
    let err = resolve_parameters(&input, &json!({})).unwrap_err();
    match err {
      ConfigError::Template { key, .. } => assert_eq!(key, "sql"),
      other => panic!("expected template error, got {other:?}"),
    }
  }

  #[test]
  fn test_filters() {
    let input = params(&[("table", "{{ flow_id | upper }}")]);
    let resolved = resolve_parameters(&input, &json!({ "flow_id": "events" })).unwrap();
    assert_eq!(resolved["table"], "EVENTS");
  }
}
