use crate::error::{Result, WebError};
use crate::page::Page;
use crate::response::{CallbackRequest, CallbackResponse};
use partial_core::{CallbackTarget, PageCoordinator, StateKey, WidgetId};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub type PageFactory = Arc<dyn Fn(Rc<PageCoordinator>) -> Result<Page> + Send + Sync + 'static>;

/// Builds a fresh [`Page`] per request and runs the matching pipeline.
///
/// Pages and their coordinator never leave the calling thread; only the
/// factory and the state key are shared.
#[derive(Clone)]
pub struct PageHost {
    factory: PageFactory,
    key: StateKey,
}

impl PageHost {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(Rc<PageCoordinator>) -> Result<Page> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            key: StateKey::generate(),
        }
    }

    /// Uses a fixed key, so state survives restarts and is shared between
    /// processes serving the same site.
    pub fn with_state_key(mut self, key: StateKey) -> Self {
        self.key = key;
        self
    }

    pub fn state_key(&self) -> &StateKey {
        &self.key
    }

    fn page(&self, coordinator: PageCoordinator) -> Result<Page> {
        let page = (self.factory)(Rc::new(coordinator))?;
        Ok(page.with_state_key(self.key.clone()))
    }

    pub fn render(&self) -> Result<String> {
        self.page(PageCoordinator::new())?.render_document("")
    }

    pub fn postback(&self, form: &HashMap<String, String>) -> Result<String> {
        self.page(PageCoordinator::new())?.render_postback(form)
    }

    pub fn callback(&self, request: &CallbackRequest) -> Result<CallbackResponse> {
        let id = WidgetId::new(request.target.as_str())
            .map_err(|_| WebError::UnknownTarget(request.target.clone()))?;
        let coordinator = PageCoordinator::for_callback(CallbackTarget {
            id,
            payload: request.payload.clone(),
        });
        self.page(coordinator)?
            .render_callback(&request.state, &request.form)
    }
}
