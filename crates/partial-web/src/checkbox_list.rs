use crate::error::{Result, WebError};
use crate::list::{CheckBoxListRenderer, ListItem, RepeatLayout};
use partial_core::{
    CallbackConfig, CallbackScriptEmitter, Coordinator, EventHandlers, Partial, RenderContext,
    TriggerPlan, UpdatableControl, WidgetId, WidgetState,
};
use std::rc::Rc;

/// Multi-selection checkbox group that calls back to the server when an item
/// is clicked, if `auto_callback` is set.
pub struct CheckBoxList {
    widget: Partial<CheckBoxListRenderer>,
}

impl CheckBoxList {
    pub fn new(id: &str, coordinator: Rc<dyn Coordinator>) -> Result<Self> {
        let id = WidgetId::new(id)?;
        Ok(Self {
            widget: Partial::new(
                id,
                CheckBoxListRenderer::default(),
                CallbackScriptEmitter::LIST_CLICK,
                coordinator,
            ),
        })
    }

    pub fn with_items<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = ListItem>,
    {
        self.widget.native_mut().items = items.into_iter().collect();
        self
    }

    pub fn with_layout(mut self, layout: RepeatLayout) -> Self {
        self.widget.native_mut().repeat_layout = layout;
        self
    }

    pub fn with_config<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut CallbackConfig),
    {
        configure(self.widget.config_mut());
        self
    }

    pub fn id(&self) -> &WidgetId {
        self.widget.id()
    }

    pub fn widget(&self) -> &Partial<CheckBoxListRenderer> {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut Partial<CheckBoxListRenderer> {
        &mut self.widget
    }

    pub fn config(&self) -> &CallbackConfig {
        self.widget.config()
    }

    pub fn config_mut(&mut self) -> &mut CallbackConfig {
        self.widget.config_mut()
    }

    pub fn items(&self) -> &[ListItem] {
        &self.widget.native().items
    }

    pub fn items_mut(&mut self) -> &mut Vec<ListItem> {
        &mut self.widget.native_mut().items
    }

    pub fn auto_postback(&self) -> bool {
        self.widget.native().auto_postback
    }

    pub fn set_auto_postback(&mut self, enabled: bool) {
        self.widget.native_mut().auto_postback = enabled;
    }

    pub fn set_css_class(&mut self, class: impl Into<String>) {
        self.widget.native_mut().css_class = Some(class.into());
    }

    pub fn enabled(&self) -> bool {
        self.widget.native().enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.widget.native_mut().enabled = enabled;
    }

    pub fn handlers_mut(&mut self) -> &mut EventHandlers {
        self.widget.handlers_mut()
    }

    pub fn visible(&self) -> bool {
        self.widget.visible(&RenderContext::new())
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.widget.set_visible(visible);
    }

    pub fn update_after_callback(&self) -> bool {
        self.widget.update_after_callback()
    }

    pub fn set_update_after_callback(&mut self, update: bool) {
        self.widget.set_update_after_callback(update);
    }

    pub fn auto_update_after_callback(&self) -> bool {
        self.widget.auto_update_after_callback()
    }

    pub fn set_auto_update_after_callback(&mut self, auto: bool) {
        self.widget.set_auto_update_after_callback(auto);
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        self.items()
            .iter()
            .enumerate()
            .filter(|(_, item)| item.selected)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn selected_values(&self) -> Vec<&str> {
        self.items()
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.value.as_str())
            .collect()
    }

    /// Sets the selection to exactly `checked`. Disabled items keep their
    /// state. Returns whether anything changed.
    pub fn apply_selection(&mut self, checked: &[usize]) -> Result<bool> {
        let len = self.items().len();
        if let Some(bad) = checked.iter().find(|&&index| index >= len) {
            return Err(WebError::InvalidPayload {
                target: self.id().to_string(),
                message: format!("item index {} out of range ({} items)", bad, len),
            });
        }

        let mut changed = false;
        for (index, item) in self.items_mut().iter_mut().enumerate() {
            if !item.enabled {
                continue;
            }
            let selected = checked.contains(&index);
            if item.selected != selected {
                item.selected = selected;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Restores persisted flags and the last accepted selection. Indices
    /// past the current item list are ignored.
    pub fn restore(&mut self, state: WidgetState) {
        if let Some(selected) = &state.selected {
            for (index, item) in self.items_mut().iter_mut().enumerate() {
                item.selected = selected.contains(&index);
            }
        }
        self.widget.restore(state);
    }

    pub fn load(&mut self) -> Result<()> {
        Ok(self.widget.load()?)
    }

    pub fn pre_render(&mut self, ctx: &RenderContext) -> Result<&TriggerPlan> {
        Ok(self.widget.pre_render(ctx)?)
    }

    pub fn render(&mut self, ctx: &mut RenderContext, out: &mut String) -> Result<()> {
        Ok(self.widget.render(ctx, out)?)
    }

    pub fn unload(&mut self) -> WidgetState {
        let mut state = self.widget.unload();
        state.selected = Some(self.selected_indices());
        state
    }
}

impl UpdatableControl for CheckBoxList {
    fn widget_id(&self) -> &WidgetId {
        self.widget.widget_id()
    }

    fn update_after_callback(&self) -> bool {
        UpdatableControl::update_after_callback(&self.widget)
    }

    fn auto_update_after_callback(&self) -> bool {
        UpdatableControl::auto_update_after_callback(&self.widget)
    }

    fn render_for_callback(&mut self) -> partial_core::Result<String> {
        self.widget.render_for_callback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partial_core::{PageCoordinator, locate_region};

    fn colors(coordinator: Rc<dyn Coordinator>) -> CheckBoxList {
        CheckBoxList::new("chk1", coordinator)
            .unwrap()
            .with_items([
                ListItem::new("Red", "r"),
                ListItem::new("Green", "g"),
                ListItem::new("Blue", "b"),
            ])
    }

    fn render(list: &mut CheckBoxList) -> String {
        let mut ctx = RenderContext::new();
        let mut out = String::new();
        list.pre_render(&ctx).unwrap();
        list.render(&mut ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn scenario_trigger_expression() {
        let mut list = colors(Rc::new(PageCoordinator::new())).with_config(|config| {
            config.auto_callback = true;
            config.causes_validation = true;
            config.validation_group = "grp".to_string();
            config.text_during_callback = "Loading...".to_string();
            config.enabled_during_callback = false;
            config.post_callback_function = "onDone".to_string();
        });
        list.set_auto_postback(true);
        list.load().unwrap();
        let html = render(&mut list);

        assert_eq!(
            list.widget().trigger().script(),
            Some("PartialList_OnClick(event,true,'grp','Loading...',false,null,onDone,null);")
        );
        assert!(!list.auto_postback());
        assert!(!html.contains("__doPostBack"));
        assert!(html.contains(
            "onclick=\"PartialList_OnClick(event,true,&#39;grp&#39;,&#39;Loading...&#39;,false,null,onDone,null);\""
        ));
    }

    #[test]
    fn callbacks_off_keeps_postback() {
        let mut list = colors(Rc::new(PageCoordinator::new()));
        list.set_auto_postback(true);
        list.load().unwrap();
        let html = render(&mut list);
        assert_eq!(list.widget().trigger(), &TriggerPlan::Native);
        assert_eq!(html.matches("__doPostBack").count(), 3);
        assert!(!html.contains("PartialList_OnClick"));
    }

    #[test]
    fn table_layout_is_wrapped_in_div_marker() {
        let mut list = colors(Rc::new(PageCoordinator::new()));
        list.load().unwrap();
        let html = render(&mut list);
        assert!(html.starts_with("<div id=\"partial_chk1__\""));
        assert_eq!(locate_region(&html, list.id()), Some(0..html.len()));
    }

    #[test]
    fn selection_survives_unload_and_restore() {
        let mut list = colors(Rc::new(PageCoordinator::new()));
        list.apply_selection(&[1]).unwrap();
        list.load().unwrap();
        let state = list.unload();
        assert_eq!(state.selected, Some(vec![1]));

        let mut next = colors(Rc::new(PageCoordinator::new()));
        next.items_mut()[0].selected = true;
        next.restore(state);
        assert_eq!(next.selected_indices(), vec![1]);
    }

    #[test]
    fn selection_applies_to_enabled_items_only() {
        let mut list = colors(Rc::new(PageCoordinator::new()));
        list.items_mut()[2].enabled = false;
        list.items_mut()[2].selected = true;

        assert!(list.apply_selection(&[0]).unwrap());
        assert_eq!(list.selected_indices(), vec![0, 2]);
        assert_eq!(list.selected_values(), vec!["r", "b"]);
        assert!(!list.apply_selection(&[0]).unwrap());
        assert!(matches!(
            list.apply_selection(&[3]),
            Err(WebError::InvalidPayload { .. })
        ));
    }
}
