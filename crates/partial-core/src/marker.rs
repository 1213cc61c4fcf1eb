//! Begin/end markers around a widget's fragment.
//!
//! A marker pair is a real wrapper element: the opening tag is the begin
//! marker and its closing tag the end marker. The element id is derived from
//! the widget identity, and the DOM itself pairs the two tags, so nested
//! widgets never get matched against each other's end marker. The server-side
//! [`locate_region`] follows the same rule by counting same-name tags.

use crate::identity::WidgetId;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Element used for a marker pair. Flow layouts stay inline; table layouts
/// need a block wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerTag {
    #[default]
    Span,
    Div,
}

impl MarkerTag {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerTag::Span => "span",
            MarkerTag::Div => "div",
        }
    }
}

/// Render-time facts shared by every widget on a page.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    design_mode: bool,
    depth: usize,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context of an authoring or preview tool, where no client runtime runs.
    pub fn design() -> Self {
        Self {
            design_mode: true,
            depth: 0,
        }
    }

    pub fn is_design_mode(&self) -> bool {
        self.design_mode
    }

    /// Number of marker pairs currently open around the render position.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

pub struct MarkerWriter;

impl MarkerWriter {
    /// Writes `body` between a begin and an end marker for `id`.
    ///
    /// In design mode the body is written bare. Emission cannot fail: the
    /// pair is always closed after `body` returns.
    pub fn wrap<F>(out: &mut String, ctx: &mut RenderContext, tag: MarkerTag, id: &WidgetId, body: F)
    where
        F: FnOnce(&mut String, &mut RenderContext),
    {
        if ctx.design_mode {
            body(out, ctx);
            return;
        }

        Self::write_begin(out, tag, id, ctx.depth);
        ctx.depth += 1;
        body(out, ctx);
        ctx.depth -= 1;
        Self::write_end(out, tag);
    }

    fn write_begin(out: &mut String, tag: MarkerTag, id: &WidgetId, depth: usize) {
        tracing::trace!(widget = %id, depth, "begin marker");
        out.push_str(&format!(
            "<{} id=\"{}\" data-partial-id=\"{}\" data-partial-depth=\"{}\">",
            tag.as_str(),
            id.marker_id(),
            id,
            depth
        ));
    }

    fn write_end(out: &mut String, tag: MarkerTag) {
        out.push_str(&format!("</{}>", tag.as_str()));
    }
}

/// Byte range of the region bracketed by `id`'s markers, tags included.
///
/// Matching starts at the begin marker and counts nested elements of the same
/// name, so the first fully matching pair is returned even when other widgets
/// or native markup using the same tag are nested inside.
pub fn locate_region(html: &str, id: &WidgetId) -> Option<Range<usize>> {
    let needle = format!(" id=\"{}\"", id.marker_id());
    let attr_pos = html.find(&needle)?;
    let start = html[..attr_pos].rfind('<')?;
    let name = &html[start + 1..attr_pos];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let open_pattern = format!("<{name}");
    let close_pattern = format!("</{name}>");
    let mut cursor = start + html[start..].find('>')? + 1;
    let mut depth = 1usize;

    loop {
        let rest = &html[cursor..];
        let next_close = rest.find(&close_pattern)?;
        match find_open_tag(rest, &open_pattern) {
            Some(open) if open < next_close => {
                let tag_end = open + rest[open..].find('>')?;
                if !rest[..tag_end].ends_with('/') {
                    depth += 1;
                }
                cursor += tag_end + 1;
            }
            _ => {
                depth -= 1;
                cursor += next_close + close_pattern.len();
                if depth == 0 {
                    return Some(start..cursor);
                }
            }
        }
    }
}

/// Swaps the marked region of `id` for `replacement`, the way the client
/// runtime applies a callback response.
pub fn replace_region(html: &str, id: &WidgetId, replacement: &str) -> Option<String> {
    let range = locate_region(html, id)?;
    let mut out = String::with_capacity(html.len() - range.len() + replacement.len());
    out.push_str(&html[..range.start]);
    out.push_str(replacement);
    out.push_str(&html[range.end..]);
    Some(out)
}

fn find_open_tag(haystack: &str, pattern: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(pattern) {
        let at = from + pos;
        let next = haystack[at + pattern.len()..].chars().next();
        if matches!(next, Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/') {
            return Some(at);
        }
        from = at + pattern.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> WidgetId {
        WidgetId::new(raw).unwrap()
    }

    #[test]
    fn wraps_body_with_identity() {
        let mut out = String::new();
        let mut ctx = RenderContext::new();
        MarkerWriter::wrap(&mut out, &mut ctx, MarkerTag::Div, &id("chk1"), |out, _| {
            out.push_str("<table></table>")
        });
        assert_eq!(
            out,
            "<div id=\"partial_chk1__\" data-partial-id=\"chk1\" data-partial-depth=\"0\"><table></table></div>"
        );
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn design_mode_writes_body_only() {
        let mut out = String::new();
        let mut ctx = RenderContext::design();
        MarkerWriter::wrap(&mut out, &mut ctx, MarkerTag::Span, &id("chk1"), |out, _| {
            out.push_str("body")
        });
        assert_eq!(out, "body");
    }

    #[test]
    fn nested_markers_record_depth_and_stay_paired() {
        let mut out = String::new();
        let mut ctx = RenderContext::new();
        MarkerWriter::wrap(&mut out, &mut ctx, MarkerTag::Span, &id("outer"), |out, ctx| {
            out.push_str("<span>a</span>");
            MarkerWriter::wrap(out, ctx, MarkerTag::Span, &id("inner"), |out, _| {
                out.push_str("<span>b</span>")
            });
            out.push_str("<span>c</span>");
        });

        assert!(out.contains("data-partial-id=\"inner\" data-partial-depth=\"1\""));

        let outer = locate_region(&out, &id("outer")).unwrap();
        assert_eq!(outer, 0..out.len());

        let inner = &out[locate_region(&out, &id("inner")).unwrap()];
        assert!(inner.starts_with("<span id=\"partial_inner__\""));
        assert!(inner.ends_with("<span>b</span></span>"));
    }

    #[test]
    fn locator_skips_self_closing_and_similar_tag_names() {
        let html = "<p>x</p><span id=\"partial_w__\" data-partial-id=\"w\" data-partial-depth=\"0\"><spanner></spanner><span/>text</span><span>tail</span>";
        let region = &html[locate_region(html, &id("w")).unwrap()];
        assert!(region.ends_with("text</span>"));
        assert!(!region.contains("tail"));
    }

    #[test]
    fn replace_swaps_whole_region() {
        let html = "<b>before</b><span id=\"partial_w__\" data-partial-id=\"w\" data-partial-depth=\"0\">old</span><b>after</b>";
        let replaced = replace_region(html, &id("w"), "<span id=\"partial_w__\">new</span>").unwrap();
        assert_eq!(
            replaced,
            "<b>before</b><span id=\"partial_w__\">new</span><b>after</b>"
        );
        assert!(replace_region(html, &id("missing"), "").is_none());
    }

    #[test]
    fn unterminated_region_is_not_found() {
        let html = "<span id=\"partial_w__\"><span>open";
        assert!(locate_region(html, &id("w")).is_none());
    }
}
