//! Partial core crate.
//!
//! Primitives for widgets that refresh their own rendered fragment through an
//! out-of-band callback instead of a full page submission:
//!
//! - `marker`: begin/end markers around a widget fragment and a nesting-safe
//!   locator for the bracketed region.
//! - `script`: client invocation composition and the trigger plan that keeps
//!   exactly one submission path active per user action.
//! - `signing`: HMAC sealing of the state that round-trips through the
//!   client.
//! - `visibility`: explicit visibility that survives the state round-trip.
//! - `coordinator`: the registration/capture boundary a page pipeline drives.
//! - `widget`: the `Partial` decorator composing all of the above around a
//!   native renderer.
//!
//! Everything here is request-scoped and synchronous. Widgets and the
//! coordinator of one request share state through `Rc`/`RefCell` and are not
//! meant to cross threads; the hosting pipeline is expected to serialize
//! requests per client session.

pub mod coordinator;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod marker;
pub mod script;
pub mod signing;
pub mod state;
pub mod visibility;
pub mod widget;

pub use coordinator::{CallbackTarget, Coordinator, PageCoordinator, UpdatableControl};
pub use error::{PartialError, Result};
pub use identity::WidgetId;
pub use lifecycle::Phase;
pub use marker::{MarkerTag, MarkerWriter, RenderContext, locate_region, replace_region};
pub use script::{
    CallbackInvocation, CallbackScriptEmitter, ClientHook, EventHandlers, NativeSubmit,
    TriggerPlan,
};
pub use signing::StateKey;
pub use state::{CallbackConfig, PageState, WidgetState};
pub use visibility::{NativeVisibility, VisibilityStore};
pub use widget::{NativeControl, Partial};
