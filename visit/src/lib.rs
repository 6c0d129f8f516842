use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

mod error;
mod options;

pub use error::{HttpError, SslError, VisitError, WebResourceError};
pub use options::{VisitAction, VisitOptions, VisitResponse};

/// Stable identifier for a native destination (screen).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DestinationId(u64);

impl DestinationId {
    /// Creates a new `DestinationId` from a raw numeric value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generator for in-process destination identifiers.
///
/// Identifiers are opaque to the web runtime; it only ever echoes them back
/// through restoration bookkeeping.
#[derive(Debug)]
pub struct DestinationIdGenerator {
    next: Cell<u64>,
}

impl DestinationIdGenerator {
    pub fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    /// Returns the next destination id in sequence.
    pub fn next(&self) -> DestinationId {
        let id = self.next.get();
        self.next.set(id + 1);
        DestinationId::new(id)
    }
}

impl Default for DestinationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback contract between the session and the native screen that
/// requested a visit.
///
/// Every method has a safe no-op default so concrete screens implement only
/// the subset they care about. Callbacks are only delivered while the visit
/// owning them is current; a superseded visit never reaches its destination
/// again.
pub trait VisitDestination {
    /// The session accepted the visit request. Invoked synchronously, before
    /// any command reaches the runtime, so the UI can show progress at once.
    fn on_visit_location_started(&self, _location: &str) {}

    /// The runtime assigned an identifier and began the visit.
    fn on_visit_started(&self, _identifier: &str, _has_cached_snapshot: bool, _location: &str) {}

    /// The runtime proposed a follow-up navigation (e.g. a link tap inside
    /// the page). The host decides whether and how to navigate.
    fn on_visit_proposed(&self, _location: &str, _options: &VisitOptions) {}

    /// The visit's network request failed. No automatic retry happens; the
    /// destination decides what to show and whether to retry.
    fn on_request_failed(&self, _has_cached_snapshot: bool, _error: &VisitError) {}

    /// The page rendered. Delivered only after the native layer has had a
    /// chance to repaint, so screenshots never capture stale content.
    fn on_visit_rendered(&self) {}

    /// The visit completed. `completed_offline` is set when the response was
    /// served from an offline cache.
    fn on_visit_completed(&self, _completed_offline: bool) {}

    /// The runtime requires a full page reload to recover.
    fn on_page_invalidated(&self) {}

    /// Whether this destination is still eligible to receive callbacks.
    fn is_active(&self) -> bool {
        true
    }
}

/// One attempted navigation, tracked from request through completion or
/// supersession.
pub struct Visit {
    /// Target URL. Immutable for the life of the visit.
    pub location: String,
    /// The native screen that requested this visit.
    pub destination: DestinationId,
    /// Restore from a cached snapshot when the runtime has one.
    pub restore_with_cached_snapshot: bool,
    /// The visit is a forced reload of the current location.
    pub reload: bool,
    /// Runtime-assigned identifier. Empty until `visitStarted` arrives; the
    /// runtime is the source of truth here.
    pub identifier: String,
    /// Whether the runtime reported a cached snapshot for this location.
    pub has_cached_snapshot: bool,
    /// Set once if the response was served from an offline cache.
    pub completed_offline: bool,
    /// Action plus optional pre-supplied response/snapshot.
    pub options: VisitOptions,
    /// Callback to the requesting destination. Cleared on supersession.
    pub callback: Option<Rc<dyn VisitDestination>>,
}

impl Visit {
    pub fn new(
        location: impl Into<String>,
        destination: DestinationId,
        options: VisitOptions,
        callback: Rc<dyn VisitDestination>,
    ) -> Self {
        let restore_with_cached_snapshot = options.action == VisitAction::Restore;
        Self {
            location: location.into(),
            destination,
            restore_with_cached_snapshot,
            reload: false,
            identifier: String::new(),
            has_cached_snapshot: false,
            completed_offline: false,
            options,
            callback: Some(callback),
        }
    }

    /// Drops the callback so no further events reach the destination. Late
    /// runtime events for this visit become no-ops.
    pub fn supersede(&mut self) {
        self.callback = None;
    }

    /// Whether a runtime event carrying `identifier` belongs to this visit.
    /// An empty identifier never matches; the runtime has not assigned one.
    pub fn matches(&self, identifier: &str) -> bool {
        !self.identifier.is_empty() && self.identifier == identifier
    }

    /// Returns the callback if the destination is still active.
    pub fn active_callback(&self) -> Option<Rc<dyn VisitDestination>> {
        self.callback
            .as_ref()
            .filter(|callback| callback.is_active())
            .cloned()
    }
}

impl fmt::Debug for Visit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visit")
            .field("location", &self.location)
            .field("destination", &self.destination)
            .field("identifier", &self.identifier)
            .field("reload", &self.reload)
            .field("restore_with_cached_snapshot", &self.restore_with_cached_snapshot)
            .field("completed_offline", &self.completed_offline)
            .field("options", &self.options)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
