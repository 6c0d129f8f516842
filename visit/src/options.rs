use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// How a visit manipulates the navigation stack.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum VisitAction {
    /// Push a new entry. Also the fallback for unrecognized wire values.
    #[default]
    Advance,
    /// Replace the current entry.
    Replace,
    /// Restore a previously rendered entry (back/forward navigation).
    Restore,
}

impl VisitAction {
    /// Parses a wire value. Unrecognized strings fall back to `Advance` so a
    /// newer runtime never breaks an older native build.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "replace" => Self::Replace,
            "restore" => Self::Restore,
            _ => Self::Advance,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Replace => "replace",
            Self::Restore => "restore",
        }
    }
}

impl Serialize for VisitAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for VisitAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&value))
    }
}

/// A pre-supplied response for a visit, letting native code skip the
/// runtime's own fetch.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VisitResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "responseHTML", default, skip_serializing_if = "Option::is_none")]
    pub response_html: Option<String>,
}

impl VisitResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Parameters for a single visit.
///
/// Wire field names (`action`, `snapshotHTML`, `response`) are part of the
/// bridge contract and must stay stable; the runtime-side script is
/// versioned independently of this crate.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct VisitOptions {
    #[serde(default)]
    pub action: VisitAction,
    #[serde(rename = "snapshotHTML", default, skip_serializing_if = "Option::is_none")]
    pub snapshot_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<VisitResponse>,
}

impl VisitOptions {
    pub fn advance() -> Self {
        Self::default()
    }

    pub fn replace() -> Self {
        Self {
            action: VisitAction::Replace,
            ..Self::default()
        }
    }

    pub fn restore() -> Self {
        Self {
            action: VisitAction::Restore,
            ..Self::default()
        }
    }

    /// Whether native code already holds a response body the runtime should
    /// load directly instead of fetching.
    pub fn has_pre_supplied_response(&self) -> bool {
        self.response
            .as_ref()
            .map(|response| response.response_html.is_some())
            .unwrap_or(false)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
