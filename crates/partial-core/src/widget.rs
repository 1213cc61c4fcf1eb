use crate::coordinator::{Coordinator, UpdatableControl};
use crate::error::{PartialError, Result};
use crate::identity::WidgetId;
use crate::lifecycle::Phase;
use crate::marker::{MarkerTag, MarkerWriter, RenderContext};
use crate::script::{CallbackScriptEmitter, EventHandlers, NativeSubmit, TriggerPlan};
use crate::state::{CallbackConfig, WidgetState};
use crate::visibility::{NativeVisibility, VisibilityStore};
use std::rc::Rc;

/// The native rendering capability a [`Partial`] decorates.
pub trait NativeControl: NativeVisibility + NativeSubmit {
    /// Marker element suited to the control's layout.
    fn marker_tag(&self) -> MarkerTag;

    /// Writes the control's own markup. `handlers` are the client event
    /// attributes of the control's outer element.
    fn render(&self, id: &WidgetId, handlers: &EventHandlers, out: &mut String);
}

/// A native control that can refresh itself through callbacks.
///
/// Adds markers, callback script emission and the visibility override around
/// `N`, and drives the per-request lifecycle against an injected
/// [`Coordinator`].
pub struct Partial<N> {
    id: WidgetId,
    native: N,
    state: WidgetState,
    update_after_callback: bool,
    handlers: EventHandlers,
    attached: EventHandlers,
    trigger: TriggerPlan,
    phase: Phase,
    emitter: CallbackScriptEmitter,
    coordinator: Rc<dyn Coordinator>,
}

impl<N: NativeControl> Partial<N> {
    pub fn new(
        id: WidgetId,
        native: N,
        emitter: CallbackScriptEmitter,
        coordinator: Rc<dyn Coordinator>,
    ) -> Self {
        Self {
            id,
            native,
            state: WidgetState::default(),
            update_after_callback: false,
            handlers: EventHandlers::new(),
            attached: EventHandlers::new(),
            trigger: TriggerPlan::Native,
            phase: Phase::Initialized,
            emitter,
            coordinator,
        }
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }

    pub fn config(&self) -> &CallbackConfig {
        &self.state.callback
    }

    pub fn config_mut(&mut self) -> &mut CallbackConfig {
        &mut self.state.callback
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Replaces the persisted state with the one saved by an earlier request.
    pub fn restore(&mut self, state: WidgetState) {
        self.state = state;
    }

    /// Author-supplied client handlers; the callback script is chained after
    /// them at pre-render.
    pub fn handlers_mut(&mut self) -> &mut EventHandlers {
        &mut self.handlers
    }

    /// Handlers as they will be rendered, including any callback script.
    pub fn attached_handlers(&self) -> &EventHandlers {
        &self.attached
    }

    pub fn trigger(&self) -> &TriggerPlan {
        &self.trigger
    }

    pub fn coordinator(&self) -> &Rc<dyn Coordinator> {
        &self.coordinator
    }

    pub fn visible(&self, ctx: &RenderContext) -> bool {
        VisibilityStore::get(&self.native, &self.state, ctx.is_design_mode())
    }

    pub fn set_visible(&mut self, visible: bool) {
        VisibilityStore::set(&mut self.state, visible);
    }

    pub fn update_after_callback(&self) -> bool {
        self.update_after_callback
    }

    pub fn set_update_after_callback(&mut self, update: bool) {
        self.update_after_callback = update;
    }

    pub fn auto_update_after_callback(&self) -> bool {
        self.state.auto_update_after_callback
    }

    /// Turning the persisted flag on also marks the current request.
    pub fn set_auto_update_after_callback(&mut self, auto: bool) {
        if auto {
            self.update_after_callback = true;
        }
        self.state.auto_update_after_callback = auto;
    }

    /// Validates configuration and registers with the coordinator.
    pub fn load(&mut self) -> Result<()> {
        if self.phase != Phase::Initialized {
            return Err(self.out_of_order("load"));
        }
        self.state.callback.validate(&self.id)?;
        self.coordinator.register(&*self)?;
        self.phase = Phase::Loaded;
        Ok(())
    }

    /// Attaches the callback trigger and suppresses the native one.
    ///
    /// Handlers are rebuilt from the author's set on every call, so repeated
    /// pre-renders never stack scripts.
    pub fn pre_render(&mut self, ctx: &RenderContext) -> Result<&TriggerPlan> {
        if !self.phase.can_pre_render() {
            return Err(self.out_of_order("pre-render"));
        }
        self.attached = self.handlers.clone();
        self.trigger = self.emitter.apply(
            &self.state.callback,
            &mut self.attached,
            &mut self.native,
            ctx.is_design_mode(),
        );
        self.phase = Phase::PreRendered;
        Ok(&self.trigger)
    }

    /// Writes the begin marker, the native fragment when visible, and the end
    /// marker.
    pub fn render(&mut self, ctx: &mut RenderContext, out: &mut String) -> Result<()> {
        if !self.phase.can_render() {
            return Err(self.out_of_order("render"));
        }
        if !self.coordinator.is_registered(&self.id) {
            return Err(PartialError::NotRegistered(self.id.clone()));
        }

        let visible = self.visible(ctx);
        let tag = self.native.marker_tag();
        let native = &self.native;
        let attached = &self.attached;
        let id = &self.id;
        MarkerWriter::wrap(out, ctx, tag, id, |out, _| {
            if visible {
                native.render(id, attached, out);
            }
        });
        self.phase = Phase::Rendered;
        Ok(())
    }

    /// Ends the request and hands back the state to persist.
    pub fn unload(&mut self) -> WidgetState {
        self.phase = Phase::Done;
        self.update_after_callback = false;
        self.state.clone()
    }

    fn out_of_order(&self, action: &'static str) -> PartialError {
        PartialError::Lifecycle {
            id: self.id.clone(),
            action,
            phase: self.phase,
        }
    }
}

impl<N: NativeControl> UpdatableControl for Partial<N> {
    fn widget_id(&self) -> &WidgetId {
        &self.id
    }

    fn update_after_callback(&self) -> bool {
        self.update_after_callback
    }

    fn auto_update_after_callback(&self) -> bool {
        self.state.auto_update_after_callback
    }

    fn render_for_callback(&mut self) -> Result<String> {
        let mut out = String::new();
        let mut ctx = RenderContext::new();
        self.render(&mut ctx, &mut out)?;
        Ok(out)
    }
}
