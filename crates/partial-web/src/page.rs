//! Request-scoped page pipeline.
//!
//! A [`Page`] owns the widgets of one request and drives them through
//! restore → load → event dispatch → pre-render → render/capture → unload.
//! The three entry points cover a first visit, a native full postback, and a
//! callback that answers with fragments only.

use crate::PARTIAL_RUNTIME_JS;
use crate::checkbox_list::CheckBoxList;
use crate::error::{Result, WebError};
use crate::html::{attr, escape_html, hidden_field};
use crate::list::CheckBoxListRenderer;
use crate::response::CallbackResponse;
use indexmap::IndexMap;
use partial_core::{
    CallbackTarget, Coordinator, PageCoordinator, PageState, RenderContext, StateKey,
    UpdatableControl, WidgetId,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::rc::Rc;

/// Hidden field carrying the persisted page state.
pub const STATE_FIELD: &str = "__PARTIALSTATE";
/// Hidden field naming the item that raised a native postback.
pub const EVENT_TARGET_FIELD: &str = "__EVENTTARGET";
pub const DEFAULT_CALLBACK_URL: &str = "/callback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Callback,
    Postback,
}

/// A user action routed to page code, after the target's selection has been
/// updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEvent {
    pub kind: EventKind,
    pub target: WidgetId,
    pub checked: Vec<usize>,
}

pub type PageHandler = Box<dyn FnMut(&mut Controls, &PageEvent) -> Result<()>>;

/// Checked item indices per list, as the client runtime reads them from the
/// browser when it raises a callback.
pub type PostedSelection = IndexMap<String, Vec<usize>>;

/// The widgets of a page, keyed by identity in declaration order.
#[derive(Default)]
pub struct Controls {
    lists: IndexMap<WidgetId, CheckBoxList>,
}

impl Controls {
    pub fn get(&self, id: &str) -> Option<&CheckBoxList> {
        self.lists.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CheckBoxList> {
        self.lists.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckBoxList> {
        self.lists.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CheckBoxList> {
        self.lists.values_mut()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

enum Block {
    Html(String),
    Control(WidgetId),
}

#[derive(Debug, Default, Deserialize)]
struct SelectionPayload {
    #[serde(default)]
    checked: Option<Vec<usize>>,
}

pub struct Page {
    title: String,
    callback_url: String,
    design_mode: bool,
    state_key: StateKey,
    coordinator: Rc<PageCoordinator>,
    blocks: Vec<Block>,
    controls: Controls,
    handlers: Vec<PageHandler>,
}

impl Page {
    pub fn new(title: impl Into<String>, coordinator: Rc<PageCoordinator>) -> Self {
        Self {
            title: title.into(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            design_mode: false,
            state_key: StateKey::generate(),
            coordinator,
            blocks: Vec::new(),
            controls: Controls::default(),
            handlers: Vec::new(),
        }
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    /// Renders for an authoring tool: no markers, no scripts, everything
    /// visible.
    pub fn with_design_mode(mut self, design_mode: bool) -> Self {
        self.design_mode = design_mode;
        self
    }

    /// Key sealing the state field. Pages of one site must share it, or state
    /// served by one request is rejected by the next.
    pub fn with_state_key(mut self, key: StateKey) -> Self {
        self.state_key = key;
        self
    }

    /// Coordinator to hand to widgets constructed for this page.
    pub fn coordinator(&self) -> Rc<dyn Coordinator> {
        self.coordinator.clone()
    }

    pub fn add_html(&mut self, html: impl Into<String>) {
        self.blocks.push(Block::Html(html.into()));
    }

    pub fn add(&mut self, list: CheckBoxList) -> Result<()> {
        let id = list.id().clone();
        if self.controls.lists.contains_key(&id) {
            return Err(partial_core::PartialError::DuplicateRegistration(id).into());
        }
        for existing in self.controls.lists.keys() {
            let (owner, derived) = if derives(existing.as_str(), id.as_str()) {
                (existing, &id)
            } else if derives(id.as_str(), existing.as_str()) {
                (&id, existing)
            } else {
                continue;
            };
            return Err(WebError::IdentityCollision {
                id: derived.to_string(),
                owner: owner.to_string(),
            });
        }
        self.blocks.push(Block::Control(id.clone()));
        self.controls.lists.insert(id, list);
        Ok(())
    }

    /// Registers page code to run for every callback or postback event.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Controls, &PageEvent) -> Result<()> + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    /// Full document for a first visit or a reload with saved `state`.
    pub fn render_document(mut self, state: &str) -> Result<String> {
        self.restore(state)?;
        self.load()?;
        self.finish_document()
    }

    /// Full document after a native form submission.
    pub fn render_postback(mut self, form: &HashMap<String, String>) -> Result<String> {
        let state = form.get(STATE_FIELD).map(String::as_str).unwrap_or_default();
        self.restore(state)?;
        self.load()?;

        // Browsers post only checked boxes, so every rendered list is posted.
        self.apply_posted(|list| {
            Some(
                (0..list.items().len())
                    .filter(|&index| {
                        form.contains_key(&CheckBoxListRenderer::item_name(list.id(), index))
                    })
                    .collect(),
            )
        })?;

        if let Some(raw) = form
            .get(EVENT_TARGET_FIELD)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            let target = raw.rsplit_once('$').map(|(id, _)| id).unwrap_or(raw);
            let list = self
                .controls
                .get(target)
                .ok_or_else(|| WebError::UnknownTarget(target.to_string()))?;
            let event = PageEvent {
                kind: EventKind::Postback,
                target: list.id().clone(),
                checked: list.selected_indices(),
            };
            tracing::debug!(widget = %event.target, "postback");
            self.dispatch(&event)?;
        }

        self.finish_document()
    }

    /// Fragments of every widget that asked to be refreshed, after applying
    /// the posted selections and routing the callback to its target.
    ///
    /// Lists missing from `posted` keep the selection restored from `state`.
    pub fn render_callback(
        mut self,
        state: &str,
        posted: &PostedSelection,
    ) -> Result<CallbackResponse> {
        let target = self
            .coordinator
            .callback_target()
            .cloned()
            .ok_or(WebError::NoCallbackTarget)?;

        self.restore(state)?;
        self.load()?;
        self.apply_posted(|list| posted.get(list.id().as_str()).cloned())?;

        let checked = parse_selection(&target)?;
        let list = self
            .controls
            .get_mut(target.id.as_str())
            .ok_or_else(|| WebError::UnknownTarget(target.id.to_string()))?;
        if let Some(checked) = checked {
            list.apply_selection(&checked)?;
        }
        let event = PageEvent {
            kind: EventKind::Callback,
            target: target.id.clone(),
            checked: list.selected_indices(),
        };
        tracing::debug!(widget = %event.target, checked = ?event.checked, "callback");
        self.dispatch(&event)?;

        self.pre_render()?;
        let fragments = self.coordinator.capture(
            self.controls
                .iter_mut()
                .map(|list| list as &mut dyn UpdatableControl),
        )?;
        let state = self.unload()?;

        Ok(CallbackResponse {
            controls: fragments
                .into_iter()
                .map(|(id, html)| (String::from(id), html))
                .collect(),
            state,
            error: None,
        })
    }

    fn restore(&mut self, raw: &str) -> Result<()> {
        let saved = PageState::open(raw, &self.state_key)?;
        for list in self.controls.iter_mut() {
            if let Some(state) = saved.get(list.id()) {
                list.restore(state.clone());
            }
        }
        Ok(())
    }

    /// Applies submitted selections to lists the user could have edited:
    /// hidden and disabled lists keep their server-side selection.
    fn apply_posted<F>(&mut self, posted: F) -> Result<()>
    where
        F: Fn(&CheckBoxList) -> Option<Vec<usize>>,
    {
        for list in self.controls.iter_mut() {
            if !list.visible() || !list.enabled() {
                continue;
            }
            if let Some(checked) = posted(list) {
                list.apply_selection(&checked)?;
            }
        }
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        for list in self.controls.iter_mut() {
            list.load()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &PageEvent) -> Result<()> {
        for handler in self.handlers.iter_mut() {
            handler(&mut self.controls, event)?;
        }
        Ok(())
    }

    fn render_context(&self) -> RenderContext {
        if self.design_mode {
            RenderContext::design()
        } else {
            RenderContext::new()
        }
    }

    fn pre_render(&mut self) -> Result<()> {
        let ctx = self.render_context();
        for list in self.controls.iter_mut() {
            list.pre_render(&ctx)?;
        }
        Ok(())
    }

    fn unload(&mut self) -> Result<String> {
        let mut state = PageState::new();
        for list in self.controls.iter_mut() {
            state.insert(list.id().clone(), list.unload());
        }
        Ok(state.seal(&self.state_key)?)
    }

    fn finish_document(mut self) -> Result<String> {
        self.pre_render()?;

        let mut ctx = self.render_context();
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                Block::Html(html) => body.push_str(html),
                Block::Control(id) => {
                    if let Some(list) = self.controls.lists.get_mut(id) {
                        list.render(&mut ctx, &mut body)?;
                    }
                }
            }
            body.push('\n');
        }

        let state = self.unload()?;
        Ok(self.document(&body, &state))
    }

    fn document(&self, body: &str, state: &str) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!(
            "<form id=\"partial-form\" method=\"post\"{}>\n",
            attr("data-partial-callback", &self.callback_url)
        ));
        html.push_str(&hidden_field(EVENT_TARGET_FIELD, ""));
        html.push('\n');
        html.push_str(body);
        html.push_str(&hidden_field(STATE_FIELD, state));
        html.push_str("\n</form>\n");
        if !self.design_mode {
            html.push_str(&format!("<script>{}</script>\n", PARTIAL_RUNTIME_JS));
        }
        html.push_str("</body>\n</html>");
        html
    }
}

/// True when `candidate` equals an id the page derives from widget `owner`:
/// an item id, an item field name or the marker id.
fn derives(owner: &str, candidate: &str) -> bool {
    let item = candidate
        .strip_prefix(owner)
        .and_then(|rest| rest.strip_prefix('_').or_else(|| rest.strip_prefix('$')))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()));
    let marker = candidate
        .strip_prefix("partial_")
        .and_then(|rest| rest.strip_suffix("__"))
        == Some(owner);
    item || marker
}

fn parse_selection(target: &CallbackTarget) -> Result<Option<Vec<usize>>> {
    if target.payload.is_null() {
        return Ok(None);
    }
    serde_json::from_value::<SelectionPayload>(target.payload.clone())
        .map(|payload| payload.checked)
        .map_err(|e| WebError::InvalidPayload {
            target: target.id.to_string(),
            message: e.to_string(),
        })
}
