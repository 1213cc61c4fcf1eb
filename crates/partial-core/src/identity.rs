use crate::error::{PartialError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identity of a widget instance on a page.
///
/// The same value keys persisted state, is embedded in markers, and routes
/// callbacks, so it has to be reproducible between the request that rendered
/// the page and any later callback against it. It is validated once on
/// construction and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PartialError::EmptyIdentity);
        }
        if !raw.chars().all(is_identity_char) {
            return Err(PartialError::InvalidIdentity(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Element id of the marker wrapping this widget's fragment.
    pub fn marker_id(&self) -> String {
        format!("partial_{}__", self.0)
    }
}

fn is_identity_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$' | ':')
}

impl TryFrom<String> for WidgetId {
    type Error = PartialError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for WidgetId {
    type Error = PartialError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<WidgetId> for String {
    fn from(id: WidgetId) -> Self {
        id.0
    }
}

impl AsRef<str> for WidgetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for WidgetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
