//! Client invocation scripts and the trigger plan.
//!
//! A widget with callbacks active gets a single call expression attached to
//! its triggering event and loses its native submission trigger in the same
//! step. [`TriggerPlan`] is the record of which path is live; it can only be
//! one of the two.

use crate::state::CallbackConfig;
use indexmap::IndexMap;
use std::fmt;

/// A control's own full-submission trigger (auto-postback).
pub trait NativeSubmit {
    fn auto_postback(&self) -> bool;
    fn set_auto_postback(&mut self, enabled: bool);
}

/// Client function reference passed to the runtime, or `null` when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientHook {
    Unset,
    Function(String),
}

impl ClientHook {
    pub fn from_config(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            ClientHook::Unset
        } else {
            ClientHook::Function(trimmed.to_string())
        }
    }
}

impl fmt::Display for ClientHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientHook::Unset => f.write_str("null"),
            ClientHook::Function(name) => f.write_str(name),
        }
    }
}

/// True when `raw` can sit in one argument slot of the invocation: brackets
/// balance, strings close, and no top-level `,` or `;` or comment ends the
/// argument early. Accepts names like `app.hooks.done` and inline
/// `function (r) { ... }` alike.
pub fn is_hook_expression(raw: &str) -> bool {
    let mut open: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';

    for c in raw.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' | '[' | '{' => open.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if open.pop() != Some(expected) {
                    return false;
                }
            }
            ',' | ';' if open.is_empty() => return false,
            '/' | '*' if prev == '/' => return false,
            _ => {}
        }
        prev = c;
    }
    !raw.trim().is_empty() && quote.is_none() && open.is_empty()
}

/// The seven positional parameters of a callback invocation, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackInvocation {
    pub causes_validation: bool,
    pub validation_group: String,
    pub text_during_callback: String,
    pub enabled_during_callback: bool,
    pub pre_callback: ClientHook,
    pub post_callback: ClientHook,
    pub callback_cancelled: ClientHook,
}

impl CallbackInvocation {
    pub fn from_config(config: &CallbackConfig) -> Self {
        Self {
            causes_validation: config.causes_validation,
            validation_group: config.validation_group.clone(),
            text_during_callback: config.text_during_callback.clone(),
            enabled_during_callback: config.enabled_during_callback,
            pre_callback: ClientHook::from_config(&config.pre_callback_function),
            post_callback: ClientHook::from_config(&config.post_callback_function),
            callback_cancelled: ClientHook::from_config(&config.callback_cancelled_function),
        }
    }

    /// Parameter list without the leading `event` argument.
    pub fn arguments(&self) -> String {
        format!(
            "{},'{}','{}',{},{},{},{}",
            self.causes_validation,
            escape_js_string(&self.validation_group),
            escape_js_string(&self.text_during_callback),
            self.enabled_during_callback,
            self.pre_callback,
            self.post_callback,
            self.callback_cancelled
        )
    }

    pub fn to_script(&self, function: &str) -> String {
        format!("{}(event,{});", function, self.arguments())
    }
}

/// Escapes a value for a single-quoted JavaScript string literal.
pub fn escape_js_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3C"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Client event handler attributes of a control, in insertion order.
///
/// Adding a script to an event that already has a handler chains it after the
/// existing one instead of replacing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventHandlers {
    handlers: IndexMap<String, String>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_script(&mut self, event: &str, script: &str) {
        let script = script.trim();
        if script.is_empty() {
            return;
        }
        let entry = self.handlers.entry(event.to_ascii_lowercase()).or_default();
        if !entry.is_empty() && !entry.ends_with(';') {
            entry.push(';');
        }
        entry.push_str(script);
    }

    pub fn get(&self, event: &str) -> Option<&str> {
        self.handlers
            .get(&event.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.handlers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Which submission path a user action takes after pre-render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TriggerPlan {
    /// Callbacks are off; the control's own trigger is untouched.
    #[default]
    Native,
    /// `script` is attached to `event` and the native trigger is off.
    Callback { event: &'static str, script: String },
}

impl TriggerPlan {
    pub fn is_callback(&self) -> bool {
        matches!(self, TriggerPlan::Callback { .. })
    }

    pub fn script(&self) -> Option<&str> {
        match self {
            TriggerPlan::Native => None,
            TriggerPlan::Callback { script, .. } => Some(script),
        }
    }
}

/// Builds and attaches the client invocation for one kind of control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackScriptEmitter {
    function: &'static str,
    event: &'static str,
}

impl CallbackScriptEmitter {
    /// List controls call back when one of their items is clicked.
    pub const LIST_CLICK: Self = Self::new("PartialList_OnClick", "onclick");

    pub const fn new(function: &'static str, event: &'static str) -> Self {
        Self { function, event }
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn event(&self) -> &'static str {
        self.event
    }

    pub fn plan(&self, config: &CallbackConfig) -> TriggerPlan {
        if !config.callbacks_active() {
            return TriggerPlan::Native;
        }
        TriggerPlan::Callback {
            event: self.event,
            script: CallbackInvocation::from_config(config).to_script(self.function),
        }
    }

    /// Attaches the callback script and disables the native trigger together.
    ///
    /// Nothing is emitted in design mode, where no client runtime exists.
    pub fn apply(
        &self,
        config: &CallbackConfig,
        handlers: &mut EventHandlers,
        native: &mut dyn NativeSubmit,
        design_mode: bool,
    ) -> TriggerPlan {
        if design_mode {
            return TriggerPlan::Native;
        }
        let plan = self.plan(config);
        if let TriggerPlan::Callback { event, script } = &plan {
            tracing::trace!(event = *event, script = %script, "attaching callback trigger");
            handlers.add_script(event, script);
            native.set_auto_postback(false);
        }
        plan
    }
}
