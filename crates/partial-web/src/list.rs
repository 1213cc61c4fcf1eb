use crate::html::{attr, escape_html};
use partial_core::{EventHandlers, MarkerTag, NativeControl, NativeSubmit, NativeVisibility, WidgetId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
    pub value: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ListItem {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
            selected: false,
            enabled: true,
        }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatLayout {
    #[default]
    Table,
    Flow,
}

/// Plain checkbox-list markup: one checkbox and label per item, laid out as
/// table rows or inline with line breaks.
#[derive(Debug, Clone)]
pub struct CheckBoxListRenderer {
    pub items: Vec<ListItem>,
    pub repeat_layout: RepeatLayout,
    pub auto_postback: bool,
    pub enabled: bool,
    pub natively_visible: bool,
    pub css_class: Option<String>,
}

impl Default for CheckBoxListRenderer {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            repeat_layout: RepeatLayout::Table,
            auto_postback: false,
            enabled: true,
            natively_visible: true,
            css_class: None,
        }
    }
}

impl CheckBoxListRenderer {
    /// Form field name of item `index`.
    pub fn item_name(id: &WidgetId, index: usize) -> String {
        format!("{}${}", id, index)
    }

    fn render_item(&self, id: &WidgetId, index: usize, item: &ListItem) -> String {
        let input_id = format!("{}_{}", id, index);
        let name = Self::item_name(id, index);
        let mut input = String::from("<input type=\"checkbox\"");
        input.push_str(&attr("id", &input_id));
        input.push_str(&attr("name", &name));
        input.push_str(&attr("value", &item.value));
        input.push_str(&format!(" data-index=\"{}\"", index));
        if item.selected {
            input.push_str(" checked=\"checked\"");
        }
        if !self.enabled || !item.enabled {
            input.push_str(" disabled=\"disabled\"");
        }
        if self.auto_postback {
            let script = format!("javascript:setTimeout('__doPostBack(\\'{}\\',\\'\\')', 0)", name);
            input.push_str(&attr("onclick", &script));
        }
        input.push_str(" />");

        format!(
            "{}<label for=\"{}\">{}</label>",
            input,
            escape_html(&input_id),
            escape_html(&item.text)
        )
    }

    fn outer_attrs(&self, id: &WidgetId, handlers: &EventHandlers) -> String {
        let mut attrs = attr("id", id.as_str());
        if let Some(class) = self.css_class.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            attrs.push_str(&attr("class", class));
        }
        for (event, script) in handlers.iter() {
            attrs.push_str(&attr(event, script));
        }
        attrs
    }
}

impl NativeVisibility for CheckBoxListRenderer {
    fn natively_visible(&self) -> bool {
        self.natively_visible
    }
}

impl NativeSubmit for CheckBoxListRenderer {
    fn auto_postback(&self) -> bool {
        self.auto_postback
    }

    fn set_auto_postback(&mut self, enabled: bool) {
        self.auto_postback = enabled;
    }
}

impl NativeControl for CheckBoxListRenderer {
    fn marker_tag(&self) -> MarkerTag {
        match self.repeat_layout {
            RepeatLayout::Flow => MarkerTag::Span,
            RepeatLayout::Table => MarkerTag::Div,
        }
    }

    fn render(&self, id: &WidgetId, handlers: &EventHandlers, out: &mut String) {
        let attrs = self.outer_attrs(id, handlers);
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| self.render_item(id, index, item));

        match self.repeat_layout {
            RepeatLayout::Table => {
                out.push_str(&format!("<table{}>", attrs));
                for item in items {
                    out.push_str(&format!("<tr><td>{}</td></tr>", item));
                }
                out.push_str("</table>");
            }
            RepeatLayout::Flow => {
                out.push_str(&format!("<span{}>", attrs));
                out.push_str(&items.collect::<Vec<_>>().join("<br />"));
                out.push_str("</span>");
            }
        }
    }
}
