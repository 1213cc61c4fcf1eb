#[cfg(feature = "axum")]
pub mod adapters;
mod checkbox_list;
pub mod error;
pub mod host;
mod html;
pub mod list;
pub mod page;
pub mod response;

#[cfg(feature = "axum")]
pub use adapters::axum::AxumPartialAdapter;
pub use checkbox_list::CheckBoxList;
pub use error::{Result, WebError};
pub use host::{PageFactory, PageHost};
pub use list::{CheckBoxListRenderer, ListItem, RepeatLayout};
pub use page::{
    Controls, DEFAULT_CALLBACK_URL, EVENT_TARGET_FIELD, EventKind, Page, PageEvent, PageHandler,
    PostedSelection, STATE_FIELD,
};
pub use response::{CallbackRequest, CallbackResponse};

pub const PARTIAL_RUNTIME_JS: &str = include_str!("partial-runtime.js");
