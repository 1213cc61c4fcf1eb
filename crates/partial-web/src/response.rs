use indexmap::IndexMap;
use partial_core::{WidgetId, replace_region};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body the client runtime posts when a widget calls back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackRequest {
    /// Identity of the widget that raised the callback.
    pub target: String,
    #[serde(default)]
    pub payload: Value,
    /// Page state field as last served to the client.
    #[serde(default)]
    pub state: String,
    /// Checked item indices of every rendered list, keyed by widget identity.
    #[serde(default)]
    pub form: IndexMap<String, Vec<usize>>,
}

/// Partial response: refreshed fragments keyed by widget identity, plus the
/// new page state for the client to store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackResponse {
    #[serde(default)]
    pub controls: IndexMap<String, String>,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallbackResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.controls.contains_key(id)
    }

    /// Applies the fragments to a served document the way the client runtime
    /// does: each marked region is swapped whole. Fragments whose region is
    /// missing are skipped.
    pub fn apply_to(&self, document: &str) -> String {
        let mut html = document.to_string();
        for (id, fragment) in &self.controls {
            let replaced = WidgetId::new(id.as_str())
                .ok()
                .and_then(|id| replace_region(&html, &id, fragment));
            match replaced {
                Some(next) => html = next,
                None => tracing::warn!(widget = %id, "no marked region to replace"),
            }
        }
        html
    }
}
