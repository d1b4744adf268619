use serde::{Deserialize, Serialize};
use sluice_config::TriggerDef;

/// Identifies the trigger instance being evaluated and the flow it belongs to.
///
/// Built fresh by the host for every tick and never stored by the trigger.
/// Its fields double as the template variables available to parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContext {
  pub namespace: String,
  pub flow_id: String,
  pub flow_revision: u32,
  pub trigger_id: String,
}

impl TriggerContext {
  pub fn new(
    namespace: impl Into<String>,
    flow_id: impl Into<String>,
    flow_revision: u32,
    trigger_id: impl Into<String>,
  ) -> Self {
    Self {
      namespace: namespace.into(),
      flow_id: flow_id.into(),
      flow_revision,
      trigger_id: trigger_id.into(),
    }
  }

  /// Key identifying this trigger instance across every flow:
  /// `{namespace}/{flow_id}/{trigger_id}`.
  pub fn instance_id(&self) -> String {
    format!("{}/{}/{}", self.namespace, self.flow_id, self.trigger_id)
  }

  /// Context for the flow a definition is declared in.
  pub fn for_def(def: &TriggerDef) -> Self {
    Self::new(
      def.namespace.clone(),
      def.flow_id.clone(),
      def.flow_revision,
      def.trigger_id.clone(),
    )
  }
}
