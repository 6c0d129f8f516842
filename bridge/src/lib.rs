use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use visit::VisitOptions;

/// Message exchanged with the in-page adapter: a method name plus
/// positional, JSON-encoded arguments.
///
/// Method names, argument order, and JSON field names are the one place
/// where wire compatibility matters; the runtime-side script and this crate
/// are versioned independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl BridgeMessage {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Renders the script that delivers this message into the embedded page.
    pub fn to_script(&self) -> Result<String, BridgeError> {
        let json = serde_json::to_string(self)?;
        Ok(format!("window.voyageNative.receive({json});"))
    }
}

/// Command issued by the session to the in-page adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    VisitLocation {
        location: String,
        options: VisitOptions,
        restoration_identifier: String,
    },
    IssueRequest { identifier: String },
    ChangeHistory { identifier: String },
    LoadCachedSnapshot { identifier: String },
    LoadResponse { identifier: String },
    CancelVisit { identifier: String },
}

impl BridgeCommand {
    /// The adapter method this command invokes. Wire-stable.
    pub fn method(&self) -> &'static str {
        match self {
            Self::VisitLocation { .. } => "visitLocationWithOptionsAndRestorationIdentifier",
            Self::IssueRequest { .. } => "issueRequestForVisit",
            Self::ChangeHistory { .. } => "changeHistoryForVisit",
            Self::LoadCachedSnapshot { .. } => "loadCachedSnapshotForVisit",
            Self::LoadResponse { .. } => "loadResponseForVisit",
            Self::CancelVisit { .. } => "cancelVisit",
        }
    }

    /// The identifier argument, for commands scoped to one visit.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::VisitLocation { .. } => None,
            Self::IssueRequest { identifier }
            | Self::ChangeHistory { identifier }
            | Self::LoadCachedSnapshot { identifier }
            | Self::LoadResponse { identifier }
            | Self::CancelVisit { identifier } => Some(identifier),
        }
    }

    pub fn into_message(self) -> Result<BridgeMessage, BridgeError> {
        let method = self.method();
        let args = match self {
            Self::VisitLocation {
                location,
                options,
                restoration_identifier,
            } => vec![
                Value::String(location),
                serde_json::to_value(&options)?,
                Value::String(restoration_identifier),
            ],
            Self::IssueRequest { identifier }
            | Self::ChangeHistory { identifier }
            | Self::LoadCachedSnapshot { identifier }
            | Self::LoadResponse { identifier }
            | Self::CancelVisit { identifier } => vec![Value::String(identifier)],
        };
        Ok(BridgeMessage::new(method, args))
    }
}

/// Event reported by the in-page adapter.
///
/// Per-visit events carry the runtime-assigned identifier and are guarded by
/// the session against stale visits; `PageInvalidated`, `BridgeReady`, and
/// `PageLoadFailed` are global.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    VisitProposed {
        location: String,
        options: VisitOptions,
    },
    VisitStarted {
        identifier: String,
        has_cached_snapshot: bool,
        location: String,
    },
    VisitRequestStarted { identifier: String },
    VisitRequestCompleted { identifier: String },
    VisitRequestFailed {
        identifier: String,
        status_code: u16,
    },
    VisitRequestFinished { identifier: String },
    VisitRendered { identifier: String },
    VisitCompleted {
        identifier: String,
        restoration_identifier: String,
    },
    FormSubmissionStarted { location: String },
    FormSubmissionFinished { location: String },
    PageInvalidated,
    BridgeReady { ready: bool },
    PageLoadFailed,
}

impl BridgeEvent {
    /// Decodes an incoming adapter message.
    ///
    /// Unknown names and malformed arguments decode to errors, never panic:
    /// the runtime is not trusted to match this crate's version.
    pub fn from_message(message: &BridgeMessage) -> Result<Self, BridgeError> {
        let event = match message.name.as_str() {
            "visitProposedToLocation" => Self::VisitProposed {
                location: string_arg(message, 0)?,
                options: options_arg(message, 1)?,
            },
            "visitStarted" => Self::VisitStarted {
                identifier: string_arg(message, 0)?,
                has_cached_snapshot: bool_arg(message, 1)?,
                location: string_arg(message, 2)?,
            },
            "visitRequestStarted" => Self::VisitRequestStarted {
                identifier: string_arg(message, 0)?,
            },
            "visitRequestCompleted" => Self::VisitRequestCompleted {
                identifier: string_arg(message, 0)?,
            },
            "visitRequestFailedWithStatusCode" => Self::VisitRequestFailed {
                identifier: string_arg(message, 0)?,
                status_code: status_arg(message, 1)?,
            },
            "visitRequestFinished" => Self::VisitRequestFinished {
                identifier: string_arg(message, 0)?,
            },
            "visitRendered" => Self::VisitRendered {
                identifier: string_arg(message, 0)?,
            },
            "visitCompleted" => Self::VisitCompleted {
                identifier: string_arg(message, 0)?,
                restoration_identifier: string_arg(message, 1)?,
            },
            "formSubmissionStarted" => Self::FormSubmissionStarted {
                location: string_arg(message, 0)?,
            },
            "formSubmissionFinished" => Self::FormSubmissionFinished {
                location: string_arg(message, 0)?,
            },
            "pageInvalidated" => Self::PageInvalidated,
            "turboIsReady" => Self::BridgeReady {
                ready: bool_arg(message, 0)?,
            },
            "pageLoadFailed" => Self::PageLoadFailed,
            other => return Err(BridgeError::UnknownMessage(other.to_string())),
        };
        Ok(event)
    }
}

/// Decode/encode failure at the bridge boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unknown bridge message `{0}`")]
    UnknownMessage(String),
    #[error("malformed argument {index} for `{name}`")]
    MalformedArg { name: String, index: usize },
    #[error("bridge codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

fn arg<'a>(message: &'a BridgeMessage, index: usize) -> Result<&'a Value, BridgeError> {
    message.args.get(index).ok_or_else(|| BridgeError::MalformedArg {
        name: message.name.clone(),
        index,
    })
}

fn string_arg(message: &BridgeMessage, index: usize) -> Result<String, BridgeError> {
    arg(message, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BridgeError::MalformedArg {
            name: message.name.clone(),
            index,
        })
}

fn bool_arg(message: &BridgeMessage, index: usize) -> Result<bool, BridgeError> {
    arg(message, index)?
        .as_bool()
        .ok_or_else(|| BridgeError::MalformedArg {
            name: message.name.clone(),
            index,
        })
}

fn status_arg(message: &BridgeMessage, index: usize) -> Result<u16, BridgeError> {
    arg(message, index)?
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .ok_or_else(|| BridgeError::MalformedArg {
            name: message.name.clone(),
            index,
        })
}

fn options_arg(message: &BridgeMessage, index: usize) -> Result<VisitOptions, BridgeError> {
    let value = arg(message, index)?;
    serde_json::from_value(value.clone()).map_err(|_| BridgeError::MalformedArg {
        name: message.name.clone(),
        index,
    })
}

/// Abstraction over the embedded browser view that hosts the adapter.
///
/// Exactly one session owns a runtime instance; it is never shared between
/// sessions or driven concurrently.
pub trait WebRuntime {
    /// Delivers a command to the in-page adapter.
    fn send(&self, command: BridgeCommand);
}

/// No-op runtime used during scaffolding and as a safe default.
#[derive(Debug, Default)]
pub struct NoopWebRuntime;

impl WebRuntime for NoopWebRuntime {
    fn send(&self, _command: BridgeCommand) {}
}
