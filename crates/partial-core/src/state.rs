use crate::error::{PartialError, Result};
use crate::identity::WidgetId;
use crate::script::is_hook_expression;
use crate::signing::StateKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Callback attributes set once by the widget author.
///
/// Every field has a "no behavior" default, so a widget whose persisted state
/// lacks a key degrades to a no-op instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    #[serde(rename = "AutoCallBack")]
    pub auto_callback: bool,
    #[serde(rename = "EnableCallBack", default = "default_true")]
    pub enable_callback: bool,
    #[serde(rename = "CausesValidation")]
    pub causes_validation: bool,
    #[serde(rename = "ValidationGroup")]
    pub validation_group: String,
    #[serde(rename = "TextDuringCallBack")]
    pub text_during_callback: String,
    #[serde(rename = "EnabledDuringCallBack", default = "default_true")]
    pub enabled_during_callback: bool,
    /// Client hooks are JavaScript expressions written into the call as-is:
    /// a function name (`onDone`, `app.hooks.done`) or an inline
    /// `function (r) { ... }`. A value that is not one balanced expression
    /// fails `load`.
    #[serde(rename = "PreCallBackFunction")]
    pub pre_callback_function: String,
    #[serde(rename = "PostCallBackFunction")]
    pub post_callback_function: String,
    #[serde(rename = "CallBackCancelledFunction")]
    pub callback_cancelled_function: String,
}

fn default_true() -> bool {
    true
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            auto_callback: false,
            enable_callback: default_true(),
            causes_validation: false,
            validation_group: String::new(),
            text_during_callback: String::new(),
            enabled_during_callback: default_true(),
            pre_callback_function: String::new(),
            post_callback_function: String::new(),
            callback_cancelled_function: String::new(),
        }
    }
}

impl CallbackConfig {
    /// True when a user action should go through a callback rather than the
    /// native submission path.
    pub fn callbacks_active(&self) -> bool {
        self.auto_callback && self.enable_callback
    }

    /// Rejects hook values that would spill out of their argument slot.
    ///
    /// Blank hooks are fine; they serialize as `null`.
    pub fn validate(&self, id: &WidgetId) -> Result<()> {
        let hooks = [
            ("PreCallBackFunction", &self.pre_callback_function),
            ("PostCallBackFunction", &self.post_callback_function),
            ("CallBackCancelledFunction", &self.callback_cancelled_function),
        ];
        for (field, value) in hooks {
            let trimmed = value.trim();
            if !trimmed.is_empty() && !is_hook_expression(trimmed) {
                return Err(PartialError::InvalidHook {
                    id: id.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Everything a widget carries across the state-persistence boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetState {
    #[serde(flatten)]
    pub callback: CallbackConfig,
    #[serde(rename = "AutoUpdateAfterCallBack")]
    pub auto_update_after_callback: bool,
    /// Explicit visibility override; `None` defers to the native rule.
    #[serde(rename = "Visible", skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Item indices the server last accepted as selected, for widgets that
    /// have a selection.
    #[serde(rename = "Selected", skip_serializing_if = "Option::is_none")]
    pub selected: Option<Vec<usize>>,
}

/// Persisted state of every widget on a page, keyed by identity.
///
/// The page pipeline encodes this into the document and the client runtime
/// posts it back with each callback, so a widget re-rendered after a callback
/// sees the same flags it had when the page was first served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageState {
    widgets: IndexMap<WidgetId, WidgetState>,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a state field as posted by the client. A blank field is the
    /// state of a first visit.
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(raw)?)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes and seals the state for the hidden field.
    pub fn seal(&self, key: &StateKey) -> Result<String> {
        key.seal(&self.encode()?)
    }

    /// Verifies and decodes a sealed state field. A blank field is the state
    /// of a first visit; anything else must carry a valid tag.
    pub fn open(raw: &str, key: &StateKey) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        Self::decode(key.open(raw)?)
    }

    pub fn get(&self, id: &WidgetId) -> Option<&WidgetState> {
        self.widgets.get(id)
    }

    pub fn insert(&mut self, id: WidgetId, state: WidgetState) {
        self.widgets.insert(id, state);
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}
