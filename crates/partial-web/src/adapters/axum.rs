use crate::error::WebError;
use crate::host::PageHost;
use crate::page::DEFAULT_CALLBACK_URL;
use crate::response::{CallbackRequest, CallbackResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::collections::HashMap;
use std::sync::Arc;

/// Serves a [`PageHost`] over axum: the document on `GET /`, native postbacks
/// on `POST /`, and partial callbacks as JSON on `POST /callback`.
#[derive(Clone)]
pub struct AxumPartialAdapter {
    host: PageHost,
}

impl AxumPartialAdapter {
    pub fn new(host: PageHost) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &PageHost {
        &self.host
    }

    pub fn render_page(&self) -> Response {
        match self.host.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => page_failure(e),
        }
    }

    pub fn handle_postback(&self, form: &HashMap<String, String>) -> Response {
        match self.host.postback(form) {
            Ok(html) => Html(html).into_response(),
            Err(e) => page_failure(e),
        }
    }

    pub fn handle_callback(&self, request: CallbackRequest) -> Response {
        match self.host.callback(&request) {
            Ok(response) => Json(response).into_response(),
            Err(e) => {
                let status = if e.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                tracing::warn!(target_widget = %request.target, status = %status, "callback failed: {e}");
                (status, Json(CallbackResponse::failure(e.to_string()))).into_response()
            }
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(serve_page).post(serve_postback))
            .route(DEFAULT_CALLBACK_URL, post(serve_callback))
            .with_state(Arc::new(self))
    }
}

fn page_failure(e: WebError) -> Response {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::error!(status = %status, "page render failed: {e}");
    (status, format!("page render failed: {e}")).into_response()
}

async fn serve_page(State(adapter): State<Arc<AxumPartialAdapter>>) -> Response {
    adapter.render_page()
}

async fn serve_postback(
    State(adapter): State<Arc<AxumPartialAdapter>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    adapter.handle_postback(&form)
}

async fn serve_callback(
    State(adapter): State<Arc<AxumPartialAdapter>>,
    Json(request): Json<CallbackRequest>,
) -> Response {
    adapter.handle_callback(request)
}
