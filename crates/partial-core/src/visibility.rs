use crate::state::WidgetState;

/// The visibility rule a control applies when nothing has overridden it.
pub trait NativeVisibility {
    fn natively_visible(&self) -> bool;
}

/// Visibility that a callback response can toggle without a full page render.
///
/// The explicit flag lives in the widget's persisted state. Once written it
/// wins over the native rule until written again.
pub struct VisibilityStore;

impl VisibilityStore {
    pub fn get(native: &dyn NativeVisibility, state: &WidgetState, design_mode: bool) -> bool {
        if design_mode {
            return true;
        }
        state
            .visible
            .unwrap_or_else(|| native.natively_visible())
    }

    pub fn set(state: &mut WidgetState, visible: bool) {
        state.visible = Some(visible);
    }
}
