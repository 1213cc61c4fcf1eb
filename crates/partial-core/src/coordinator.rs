use crate::error::{PartialError, Result};
use crate::identity::WidgetId;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::cell::RefCell;

/// What a coordinator needs from a widget to decide on and capture its
/// fragment for a callback response.
pub trait UpdatableControl {
    fn widget_id(&self) -> &WidgetId;

    /// Request-local pending-update flag.
    fn update_after_callback(&self) -> bool;

    /// Persisted flag asking to be refreshed after every callback.
    fn auto_update_after_callback(&self) -> bool;

    /// Renders the widget's marked fragment for a callback response. Markers
    /// are always written, even for a hidden widget, so it can be revealed in
    /// place later.
    fn render_for_callback(&mut self) -> Result<String>;
}

/// The widget that a callback request targets, with the submitted payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackTarget {
    pub id: WidgetId,
    pub payload: Value,
}

/// Registration and routing boundary between widgets and the page pipeline.
///
/// Widgets receive a coordinator at construction and call
/// [`register`](Coordinator::register) once during load.
pub trait Coordinator {
    fn register(&self, control: &dyn UpdatableControl) -> Result<()>;

    fn is_registered(&self, id: &WidgetId) -> bool;

    /// The current callback target; `None` on a full page request.
    fn callback_target(&self) -> Option<&CallbackTarget>;

    fn is_callback(&self) -> bool {
        self.callback_target().is_some()
    }

    /// Payload submitted to `id` when it is the current callback target.
    fn payload_for(&self, id: &WidgetId) -> Option<&Value> {
        self.callback_target()
            .filter(|target| &target.id == id)
            .map(|target| &target.payload)
    }

    /// Whether `control`'s fragment belongs in the current callback response.
    fn should_capture(&self, control: &dyn UpdatableControl) -> bool {
        self.is_callback()
            && (control.update_after_callback() || control.auto_update_after_callback())
    }
}

/// Coordinator for a single request.
#[derive(Debug, Default)]
pub struct PageCoordinator {
    registered: RefCell<IndexSet<WidgetId>>,
    target: Option<CallbackTarget>,
}

impl PageCoordinator {
    /// Coordinator of a full page request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinator of a callback request aimed at `target`.
    pub fn for_callback(target: CallbackTarget) -> Self {
        Self {
            registered: RefCell::new(IndexSet::new()),
            target: Some(target),
        }
    }

    pub fn registered(&self) -> Vec<WidgetId> {
        self.registered.borrow().iter().cloned().collect()
    }

    /// Renders the fragments of every control that should be captured, in the
    /// order given.
    pub fn capture<'a, I>(&self, controls: I) -> Result<IndexMap<WidgetId, String>>
    where
        I: IntoIterator<Item = &'a mut dyn UpdatableControl>,
    {
        let mut fragments = IndexMap::new();
        for control in controls {
            if !self.should_capture(&*control) {
                continue;
            }
            let id = control.widget_id().clone();
            if !self.is_registered(&id) {
                return Err(PartialError::NotRegistered(id));
            }
            let html = control.render_for_callback()?;
            tracing::debug!(widget = %id, bytes = html.len(), "captured fragment");
            fragments.insert(id, html);
        }
        Ok(fragments)
    }
}

impl Coordinator for PageCoordinator {
    fn register(&self, control: &dyn UpdatableControl) -> Result<()> {
        let id = control.widget_id();
        let mut registered = self.registered.borrow_mut();
        if !registered.insert(id.clone()) {
            return Err(PartialError::DuplicateRegistration(id.clone()));
        }
        tracing::debug!(widget = %id, "registered");
        Ok(())
    }

    fn is_registered(&self, id: &WidgetId) -> bool {
        self.registered.borrow().contains(id)
    }

    fn callback_target(&self) -> Option<&CallbackTarget> {
        self.target.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Stub {
        id: WidgetId,
        pending: bool,
        auto: bool,
        renders: usize,
    }

    impl Stub {
        fn new(id: &str, pending: bool, auto: bool) -> Self {
            Self {
                id: WidgetId::new(id).unwrap(),
                pending,
                auto,
                renders: 0,
            }
        }
    }

    impl UpdatableControl for Stub {
        fn widget_id(&self) -> &WidgetId {
            &self.id
        }

        fn update_after_callback(&self) -> bool {
            self.pending
        }

        fn auto_update_after_callback(&self) -> bool {
            self.auto
        }

        fn render_for_callback(&mut self) -> Result<String> {
            self.renders += 1;
            Ok(format!("<span>{}</span>", self.id))
        }
    }

    fn target(id: &str) -> CallbackTarget {
        CallbackTarget {
            id: WidgetId::new(id).unwrap(),
            payload: json!({"checked": [1]}),
        }
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let coordinator = PageCoordinator::new();
        let stub = Stub::new("chk1", false, false);
        coordinator.register(&stub).unwrap();
        assert!(matches!(
            coordinator.register(&stub),
            Err(PartialError::DuplicateRegistration(_))
        ));
        assert_eq!(coordinator.registered().len(), 1);
    }

    #[test]
    fn payload_only_reaches_the_target() {
        let coordinator = PageCoordinator::for_callback(target("chk1"));
        let chk1 = WidgetId::new("chk1").unwrap();
        let chk2 = WidgetId::new("chk2").unwrap();
        assert_eq!(coordinator.payload_for(&chk1), Some(&json!({"checked": [1]})));
        assert_eq!(coordinator.payload_for(&chk2), None);
        assert!(PageCoordinator::new().payload_for(&chk1).is_none());
    }

    #[test]
    fn captures_pending_or_auto_updating_controls() {
        let coordinator = PageCoordinator::for_callback(target("chk1"));
        let mut quiet = Stub::new("quiet", false, false);
        let mut pending = Stub::new("pending", true, false);
        let mut auto = Stub::new("auto", false, true);
        for control in [&quiet, &pending, &auto] {
            coordinator.register(control).unwrap();
        }

        let controls: Vec<&mut dyn UpdatableControl> = vec![&mut quiet, &mut pending, &mut auto];
        let fragments = coordinator.capture(controls).unwrap();

        let ids: Vec<&str> = fragments.keys().map(WidgetId::as_str).collect();
        assert_eq!(ids, vec!["pending", "auto"]);
        assert_eq!(quiet.renders, 0);
        assert_eq!(auto.renders, 1);
    }

    #[test]
    fn full_page_requests_capture_nothing() {
        let coordinator = PageCoordinator::new();
        let mut auto = Stub::new("auto", true, true);
        coordinator.register(&auto).unwrap();
        let controls: Vec<&mut dyn UpdatableControl> = vec![&mut auto];
        assert!(coordinator.capture(controls).unwrap().is_empty());
    }

    #[test]
    fn capturing_an_unregistered_control_fails() {
        let coordinator = PageCoordinator::for_callback(target("chk1"));
        let mut stray = Stub::new("stray", true, false);
        let controls: Vec<&mut dyn UpdatableControl> = vec![&mut stray];
        assert!(matches!(
            coordinator.capture(controls),
            Err(PartialError::NotRegistered(_))
        ));
    }
}
