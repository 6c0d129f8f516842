use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use bridge::{BridgeCommand, BridgeEvent, WebRuntime};
use cache::{MemoryPressure, ScreenshotStore};
use config::{NavContext, PathConfiguration, PathProperties};
use visit::{DestinationId, Visit, VisitDestination, VisitError, VisitOptions};

mod frame;

pub use frame::{FrameQueue, FrameScheduler};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionState {
    /// Bridge not yet installed in the embedded runtime.
    NotReady,
    /// A full page load is in progress.
    ColdBooting,
    /// Bridge installed; no visit awaiting runtime events.
    Ready,
    /// A specific visit is awaiting request/render/complete events.
    VisitInFlight(String),
}

/// Owns one embedded browser view and one current visit, translating native
/// navigation requests into runtime commands and runtime events into
/// ordered, deduplicated destination callbacks.
///
/// All state mutation happens on a single logical thread (the UI thread);
/// interior mutability replaces locking. Network-bound work belongs to the
/// runtime and the host's workers, which marshal results back here as
/// events. Every per-visit event is guarded by identifier matching, so late
/// events from a superseded visit are silently dropped.
pub struct Session {
    runtime: Rc<dyn WebRuntime>,
    frames: Rc<dyn FrameScheduler>,
    path_configuration: RefCell<PathConfiguration>,
    screenshots: ScreenshotStore,
    state: RefCell<SessionState>,
    current_visit: RefCell<Option<Visit>>,
    restoration_identifiers: RefCell<HashMap<DestinationId, String>>,
    is_ready: Cell<bool>,
    visit_pending: Cell<bool>,
    load_failure_reported: Cell<bool>,
    form_submission_in_flight: Cell<bool>,
}

impl Session {
    pub fn new(
        runtime: Rc<dyn WebRuntime>,
        frames: Rc<dyn FrameScheduler>,
        path_configuration: PathConfiguration,
    ) -> Self {
        Self {
            runtime,
            frames,
            path_configuration: RefCell::new(path_configuration),
            screenshots: ScreenshotStore::default(),
            state: RefCell::new(SessionState::NotReady),
            current_visit: RefCell::new(None),
            restoration_identifiers: RefCell::new(HashMap::new()),
            is_ready: Cell::new(false),
            visit_pending: Cell::new(false),
            load_failure_reported: Cell::new(false),
            form_submission_in_flight: Cell::new(false),
        }
    }

    // ---- Native-side operations -------------------------------------------

    /// Requests a visit to `location`, superseding any visit in flight.
    ///
    /// Safe to call in any state. The destination hears
    /// `on_visit_location_started` synchronously so it can show progress
    /// before any command reaches the runtime. While the bridge is not
    /// ready the visit is queued and issued on the ready signal.
    pub fn visit_location(
        &self,
        location: &str,
        options: VisitOptions,
        destination: DestinationId,
        callback: Rc<dyn VisitDestination>,
    ) {
        {
            let mut current = self.current_visit.borrow_mut();
            if let Some(previous) = current.as_mut() {
                debug!("superseding visit {} to {}", previous.identifier, previous.location);
                previous.supersede();
            }
            *current = Some(Visit::new(location, destination, options, Rc::clone(&callback)));
        }

        callback.on_visit_location_started(location);

        if !self.is_ready.get() {
            debug!("bridge not ready, queueing visit to {location}");
            self.visit_pending.set(true);
            return;
        }
        self.issue_current_visit();
    }

    /// Cancels the visit in flight, best-effort. The runtime may still emit
    /// trailing events; the identifier guard drops them.
    pub fn cancel_visit(&self) {
        let identifier = {
            let mut current = self.current_visit.borrow_mut();
            let Some(visit) = current.as_mut() else {
                return;
            };
            visit.supersede();
            visit.identifier.clone()
        };
        if !identifier.is_empty() {
            self.runtime.send(BridgeCommand::CancelVisit { identifier });
        }
        self.visit_pending.set(false);
    }

    /// Marks the session as cold-booting a full page load. The host drives
    /// the actual page load; the session waits for a fresh ready signal.
    pub fn cold_boot(&self) {
        self.is_ready.set(false);
        self.load_failure_reported.set(false);
        *self.state.borrow_mut() = SessionState::ColdBooting;
    }

    /// Resets to a guaranteed-fresh state: bridge not ready, current visit
    /// identifier cleared, restoration identifiers and screenshots dropped.
    /// Idempotent.
    pub fn reset(&self) {
        self.is_ready.set(false);
        self.visit_pending.set(false);
        self.load_failure_reported.set(false);
        self.form_submission_in_flight.set(false);
        if let Some(visit) = self.current_visit.borrow_mut().as_mut() {
            visit.identifier.clear();
            visit.supersede();
        }
        self.restoration_identifiers.borrow_mut().clear();
        self.screenshots.clear();
        *self.state.borrow_mut() = SessionState::NotReady;
    }

    /// Flags the visit as served from the offline cache. Called by the
    /// host's request interceptor; carried through to `on_visit_completed`.
    pub fn mark_visit_completed_offline(&self, identifier: &str) {
        self.with_current_visit(identifier, |visit| visit.completed_offline = true);
    }

    // ---- Runtime events ---------------------------------------------------

    /// Dispatches a decoded bridge event to the matching handler.
    pub fn handle_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::VisitProposed { location, options } => {
                self.visit_proposed(&location, options)
            }
            BridgeEvent::VisitStarted {
                identifier,
                has_cached_snapshot,
                location,
            } => self.visit_started(&identifier, has_cached_snapshot, &location),
            BridgeEvent::VisitRequestStarted { identifier } => {
                self.visit_request_started(&identifier)
            }
            BridgeEvent::VisitRequestCompleted { identifier } => {
                self.visit_request_completed(&identifier)
            }
            BridgeEvent::VisitRequestFailed {
                identifier,
                status_code,
            } => self.visit_request_failed(&identifier, status_code),
            BridgeEvent::VisitRequestFinished { identifier } => {
                self.visit_request_finished(&identifier)
            }
            BridgeEvent::VisitRendered { identifier } => self.visit_rendered(&identifier),
            BridgeEvent::VisitCompleted {
                identifier,
                restoration_identifier,
            } => self.visit_completed(&identifier, &restoration_identifier),
            BridgeEvent::FormSubmissionStarted { location } => {
                debug!("form submission started for {location}");
                self.form_submission_in_flight.set(true);
            }
            BridgeEvent::FormSubmissionFinished { location } => {
                debug!("form submission finished for {location}");
                self.form_submission_in_flight.set(false);
            }
            BridgeEvent::PageInvalidated => self.page_invalidated(),
            BridgeEvent::BridgeReady { ready } => self.bridge_ready(ready),
            BridgeEvent::PageLoadFailed => self.bridge_ready(false),
        }
    }

    /// The runtime reported whether a recognized navigation library is
    /// installed. A negative report surfaces a load failure to the current
    /// destination exactly once; the native layer decides whether to cold
    /// boot again.
    pub fn bridge_ready(&self, ready: bool) {
        if ready {
            self.is_ready.set(true);
            self.load_failure_reported.set(false);
            {
                let mut state = self.state.borrow_mut();
                if matches!(*state, SessionState::NotReady | SessionState::ColdBooting) {
                    *state = SessionState::Ready;
                }
            }
            if self.visit_pending.replace(false) {
                self.issue_current_visit();
            }
            return;
        }

        self.is_ready.set(false);
        if !self.load_failure_reported.replace(true) {
            let callback = self
                .current_visit
                .borrow()
                .as_ref()
                .and_then(Visit::active_callback);
            if let Some(callback) = callback {
                callback.on_request_failed(false, &VisitError::LoadFailure);
            }
        }
    }

    /// The in-page adapter proposed a navigation. Forwarded to the current
    /// destination, which consults the route table and decides.
    pub fn visit_proposed(&self, location: &str, options: VisitOptions) {
        let callback = self
            .current_visit
            .borrow()
            .as_ref()
            .and_then(Visit::active_callback);
        match callback {
            Some(callback) => callback.on_visit_proposed(location, &options),
            None => debug!("dropping visit proposal to {location}: no active destination"),
        }
    }

    /// The runtime assigned an identifier and started the visit. The runtime
    /// is the source of truth for identifiers; whatever it assigns becomes
    /// the current visit's identifier.
    pub fn visit_started(&self, identifier: &str, has_cached_snapshot: bool, location: &str) {
        let (callback, commands) = {
            let mut current = self.current_visit.borrow_mut();
            let Some(current_visit) = current.as_mut() else {
                debug!("ignoring visitStarted {identifier}: no current visit");
                return;
            };
            current_visit.identifier = identifier.to_string();
            current_visit.has_cached_snapshot = has_cached_snapshot;

            let mut commands = Vec::with_capacity(3);
            if current_visit.options.has_pre_supplied_response() {
                // Native code already fetched content; skip the runtime's
                // own request and load the supplied response directly.
                commands.push(BridgeCommand::LoadResponse {
                    identifier: identifier.to_string(),
                });
            } else {
                commands.push(BridgeCommand::IssueRequest {
                    identifier: identifier.to_string(),
                });
            }
            commands.push(BridgeCommand::ChangeHistory {
                identifier: identifier.to_string(),
            });
            if has_cached_snapshot && current_visit.restore_with_cached_snapshot {
                commands.push(BridgeCommand::LoadCachedSnapshot {
                    identifier: identifier.to_string(),
                });
            }
            (current_visit.active_callback(), commands)
        };

        *self.state.borrow_mut() = SessionState::VisitInFlight(identifier.to_string());

        if let Some(callback) = callback {
            callback.on_visit_started(identifier, has_cached_snapshot, location);
        }
        for command in commands {
            self.runtime.send(command);
        }
    }

    pub fn visit_request_started(&self, identifier: &str) {
        self.with_current_visit(identifier, |visit| {
            debug!("request started for visit {} to {}", visit.identifier, visit.location);
        });
    }

    /// The visit's request completed; tell the runtime to load the response.
    pub fn visit_request_completed(&self, identifier: &str) {
        let matched = self
            .with_current_visit(identifier, |visit| visit.identifier.clone())
            .is_some();
        if matched {
            self.runtime.send(BridgeCommand::LoadResponse {
                identifier: identifier.to_string(),
            });
        }
    }

    /// The visit's request failed. Classifies the status code and notifies
    /// the destination; no automatic retry.
    pub fn visit_request_failed(&self, identifier: &str, status_code: u16) {
        let callback = self.with_current_visit(identifier, |visit| {
            (visit.has_cached_snapshot, visit.active_callback())
        });
        if let Some((has_cached_snapshot, Some(callback))) = callback {
            let error = VisitError::from_status_code(status_code);
            callback.on_request_failed(has_cached_snapshot, &error);
        }
    }

    pub fn visit_request_finished(&self, identifier: &str) {
        self.with_current_visit(identifier, |visit| {
            debug!("request finished for visit {}", visit.identifier);
        });
    }

    /// The page rendered. Notification is deferred past the next repaints so
    /// the destination never observes stale pixels.
    pub fn visit_rendered(&self, identifier: &str) {
        let callback = self
            .with_current_visit(identifier, |visit| visit.active_callback())
            .flatten();
        if let Some(callback) = callback {
            self.frames.post_after_repaint(Box::new(move || {
                if callback.is_active() {
                    callback.on_visit_rendered();
                }
            }));
        }
    }

    /// The visit completed. Records the destination's restoration identifier
    /// (overwriting any prior value), then notifies after the repaint delay.
    pub fn visit_completed(&self, identifier: &str, restoration_identifier: &str) {
        let completed = self.with_current_visit(identifier, |visit| {
            (visit.destination, visit.completed_offline, visit.active_callback())
        });
        let Some((destination, completed_offline, callback)) = completed else {
            return;
        };

        if restoration_identifier.is_empty() {
            debug!("visit {identifier} completed without a restoration identifier");
        } else {
            self.restoration_identifiers
                .borrow_mut()
                .insert(destination, restoration_identifier.to_string());
        }
        *self.state.borrow_mut() = SessionState::Ready;

        if let Some(callback) = callback {
            self.frames.post_after_repaint(Box::new(move || {
                if callback.is_active() {
                    callback.on_visit_completed(completed_offline);
                }
            }));
        }
    }

    /// The runtime needs a full page reload (e.g. a non-compatible response
    /// was loaded). Global event: not identifier-guarded.
    pub fn page_invalidated(&self) {
        self.is_ready.set(false);
        self.load_failure_reported.set(false);
        *self.state.borrow_mut() = SessionState::ColdBooting;
        let callback = self
            .current_visit
            .borrow()
            .as_ref()
            .and_then(Visit::active_callback);
        if let Some(callback) = callback {
            callback.on_page_invalidated();
        }
    }

    // ---- Path configuration -----------------------------------------------

    /// Merged path properties for a location.
    pub fn path_properties(&self, location: &str) -> PathProperties {
        self.path_configuration.borrow().properties(location)
    }

    /// Whether the location presents in a modal context.
    pub fn is_modal(&self, location: &str) -> bool {
        self.path_properties(location).context() == NavContext::Modal
    }

    /// Swaps in a freshly loaded configuration (e.g. from a remote refresh).
    /// Replacing the configuration discards its lookup cache wholesale.
    pub fn set_path_configuration(&self, configuration: PathConfiguration) {
        *self.path_configuration.borrow_mut() = configuration;
    }

    // ---- Screenshots ------------------------------------------------------

    /// Caches a screenshot for a destination. Failures degrade to "no
    /// screenshot available" and are never surfaced.
    pub fn cache_screenshot(&self, destination: DestinationId, bytes: Vec<u8>) {
        self.screenshots.put(destination, bytes);
    }

    /// Removes and returns the screenshot cached for a destination.
    pub fn take_screenshot(&self, destination: DestinationId) -> Option<Vec<u8>> {
        self.screenshots.take(destination)
    }

    /// Feeds a memory pressure signal through to the screenshot store.
    pub fn set_memory_pressure(&self, pressure: MemoryPressure) {
        self.screenshots.trim(pressure);
    }

    // ---- Introspection ----------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready.get()
    }

    pub fn visit_pending(&self) -> bool {
        self.visit_pending.get()
    }

    pub fn form_submission_in_flight(&self) -> bool {
        self.form_submission_in_flight.get()
    }

    /// The current visit's identifier, empty until the runtime assigns one.
    pub fn current_visit_identifier(&self) -> String {
        self.current_visit
            .borrow()
            .as_ref()
            .map(|visit| visit.identifier.clone())
            .unwrap_or_default()
    }

    pub fn current_visit_location(&self) -> Option<String> {
        self.current_visit
            .borrow()
            .as_ref()
            .map(|visit| visit.location.clone())
    }

    /// The restoration identifier recorded for a destination, if any.
    pub fn restoration_identifier(&self, destination: DestinationId) -> Option<String> {
        self.restoration_identifiers
            .borrow()
            .get(&destination)
            .cloned()
    }

    // ---- Internals --------------------------------------------------------

    fn issue_current_visit(&self) {
        let command = {
            let current = self.current_visit.borrow();
            let Some(current_visit) = current.as_ref() else {
                return;
            };
            let restoration_identifier = self
                .restoration_identifiers
                .borrow()
                .get(&current_visit.destination)
                .cloned()
                .unwrap_or_default();
            BridgeCommand::VisitLocation {
                location: current_visit.location.clone(),
                options: current_visit.options.clone(),
                restoration_identifier,
            }
        };
        self.runtime.send(command);
    }

    /// Runs `f` against the current visit when `identifier` matches it.
    /// Stale identifiers are expected under normal races and dropped with at
    /// most a debug log.
    fn with_current_visit<R>(
        &self,
        identifier: &str,
        f: impl FnOnce(&mut Visit) -> R,
    ) -> Option<R> {
        let mut current = self.current_visit.borrow_mut();
        match current.as_mut() {
            Some(current_visit) if current_visit.matches(identifier) => Some(f(current_visit)),
            _ => {
                debug!("ignoring event for stale visit {identifier}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::NoopWebRuntime;

    struct RecordingRuntime {
        commands: RefCell<Vec<BridgeCommand>>,
    }

    impl RecordingRuntime {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                commands: RefCell::new(Vec::new()),
            })
        }

        fn drain(&self) -> Vec<BridgeCommand> {
            self.commands.borrow_mut().drain(..).collect()
        }
    }

    impl WebRuntime for RecordingRuntime {
        fn send(&self, command: BridgeCommand) {
            self.commands.borrow_mut().push(command);
        }
    }

    struct RecordingDestination {
        events: RefCell<Vec<String>>,
        active: Cell<bool>,
    }

    impl RecordingDestination {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                events: RefCell::new(Vec::new()),
                active: Cell::new(true),
            })
        }

        fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }
    }

    impl VisitDestination for RecordingDestination {
        fn on_visit_location_started(&self, location: &str) {
            self.events.borrow_mut().push(format!("location_started:{location}"));
        }

        fn on_visit_started(&self, identifier: &str, has_cached_snapshot: bool, _location: &str) {
            self.events
                .borrow_mut()
                .push(format!("started:{identifier}:{has_cached_snapshot}"));
        }

        fn on_request_failed(&self, has_cached_snapshot: bool, error: &VisitError) {
            self.events
                .borrow_mut()
                .push(format!("request_failed:{has_cached_snapshot}:{error}"));
        }

        fn on_visit_rendered(&self) {
            self.events.borrow_mut().push("rendered".to_string());
        }

        fn on_visit_completed(&self, completed_offline: bool) {
            self.events
                .borrow_mut()
                .push(format!("completed:{completed_offline}"));
        }

        fn on_page_invalidated(&self) {
            self.events.borrow_mut().push("page_invalidated".to_string());
        }

        fn is_active(&self) -> bool {
            self.active.get()
        }
    }

    fn ready_session(runtime: Rc<RecordingRuntime>, frames: Rc<FrameQueue>) -> Session {
        let session = Session::new(runtime, frames, PathConfiguration::default());
        session.bridge_ready(true);
        session
    }

    #[test]
    fn visit_before_ready_is_queued_then_flushed() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = Session::new(
            Rc::clone(&runtime) as Rc<dyn WebRuntime>,
            Rc::clone(&frames) as Rc<dyn FrameScheduler>,
            PathConfiguration::default(),
        );
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        assert!(session.visit_pending());
        assert!(runtime.drain().is_empty());
        // Progress shows immediately, before any runtime round trip.
        assert_eq!(destination.events(), vec!["location_started:https://example.com/a"]);

        session.bridge_ready(true);
        assert!(!session.visit_pending());
        let commands = runtime.drain();
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            &commands[0],
            BridgeCommand::VisitLocation { location, restoration_identifier, .. }
                if location == "https://example.com/a" && restoration_identifier.is_empty()
        ));
    }

    #[test]
    fn visit_started_adopts_runtime_identifier_and_issues_request() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        runtime.drain();

        session.visit_started("v1", false, "https://example.com/a");
        assert_eq!(session.current_visit_identifier(), "v1");
        assert_eq!(session.state(), SessionState::VisitInFlight("v1".to_string()));

        let commands = runtime.drain();
        assert_eq!(
            commands,
            vec![
                BridgeCommand::IssueRequest { identifier: "v1".into() },
                BridgeCommand::ChangeHistory { identifier: "v1".into() },
            ]
        );
    }

    #[test]
    fn pre_supplied_response_skips_the_fetch() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        let options = VisitOptions {
            response: Some(visit::VisitResponse {
                status_code: 200,
                response_html: Some("<html>cached</html>".to_string()),
            }),
            ..VisitOptions::default()
        };
        session.visit_location(
            "https://example.com/a",
            options,
            DestinationId::new(1),
            destination,
        );
        runtime.drain();

        session.visit_started("v1", false, "https://example.com/a");
        let commands = runtime.drain();
        assert_eq!(
            commands,
            vec![
                BridgeCommand::LoadResponse { identifier: "v1".into() },
                BridgeCommand::ChangeHistory { identifier: "v1".into() },
            ]
        );
    }

    #[test]
    fn restore_visit_with_cached_snapshot_loads_it() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));

        session.visit_location(
            "https://example.com/a",
            VisitOptions::restore(),
            DestinationId::new(1),
            RecordingDestination::new(),
        );
        runtime.drain();

        session.visit_started("v1", true, "https://example.com/a");
        let commands = runtime.drain();
        assert_eq!(
            commands,
            vec![
                BridgeCommand::IssueRequest { identifier: "v1".into() },
                BridgeCommand::ChangeHistory { identifier: "v1".into() },
                BridgeCommand::LoadCachedSnapshot { identifier: "v1".into() },
            ]
        );
    }

    #[test]
    fn stale_identifier_events_are_no_ops() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", false, "https://example.com/a");
        runtime.drain();
        let before = destination.events();

        session.visit_request_completed("stale");
        session.visit_rendered("stale");
        session.visit_completed("stale", "restore-9");
        frames.pump();
        frames.pump();

        assert!(runtime.drain().is_empty());
        assert_eq!(destination.events(), before);
        assert_eq!(session.current_visit_identifier(), "v1");
        assert_eq!(session.restoration_identifier(DestinationId::new(1)), None);
    }

    #[test]
    fn request_completed_loads_the_response() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            RecordingDestination::new(),
        );
        session.visit_started("v1", false, "https://example.com/a");
        runtime.drain();

        session.visit_request_completed("v1");
        assert_eq!(
            runtime.drain(),
            vec![BridgeCommand::LoadResponse { identifier: "v1".into() }]
        );
    }

    #[test]
    fn request_failure_classifies_and_notifies_without_retry() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", true, "https://example.com/a");
        runtime.drain();

        session.visit_request_failed("v1", 404);
        assert_eq!(
            destination.events().last().unwrap(),
            "request_failed:true:404 not found"
        );
        assert!(runtime.drain().is_empty());
    }

    #[test]
    fn rendered_and_completed_are_deferred_past_the_repaint() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", false, "https://example.com/a");

        session.visit_rendered("v1");
        session.visit_completed("v1", "restore-1");
        let synchronous = destination.events();
        assert!(!synchronous.contains(&"rendered".to_string()));
        assert!(!synchronous.iter().any(|event| event.starts_with("completed")));

        frames.pump();
        frames.pump();
        let events = destination.events();
        assert!(events.contains(&"rendered".to_string()));
        assert!(events.contains(&"completed:false".to_string()));
    }

    #[test]
    fn inactive_destination_receives_no_deferred_callbacks() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", false, "https://example.com/a");
        session.visit_rendered("v1");

        // Destination torn down between the event and the repaint.
        destination.active.set(false);
        frames.pump();
        frames.pump();
        assert!(!destination.events().contains(&"rendered".to_string()));
    }

    #[test]
    fn completed_records_restoration_identifier_for_the_next_visit() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = DestinationId::new(7);

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            destination,
            RecordingDestination::new(),
        );
        session.visit_started("x", false, "https://example.com/a");
        session.visit_completed("x", "restore-123");
        runtime.drain();
        assert_eq!(
            session.restoration_identifier(destination),
            Some("restore-123".to_string())
        );

        session.visit_location(
            "https://example.com/a",
            VisitOptions::restore(),
            destination,
            RecordingDestination::new(),
        );
        let commands = runtime.drain();
        assert!(matches!(
            &commands[0],
            BridgeCommand::VisitLocation { restoration_identifier, .. }
                if restoration_identifier == "restore-123"
        ));
    }

    #[test]
    fn load_failure_reports_exactly_once() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", false, "https://example.com/a");
        runtime.drain();

        session.bridge_ready(false);
        session.bridge_ready(false);
        let failures = destination
            .events()
            .iter()
            .filter(|event| event.starts_with("request_failed"))
            .count();
        assert_eq!(failures, 1);
        assert!(!session.visit_pending());
        assert!(!session.is_ready());
    }

    #[test]
    fn reset_is_idempotent() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            RecordingDestination::new(),
        );
        session.visit_started("v1", false, "https://example.com/a");
        session.visit_completed("v1", "restore-1");
        session.cache_screenshot(DestinationId::new(1), vec![0; 8]);

        session.reset();
        session.reset();

        assert!(!session.is_ready());
        assert!(!session.visit_pending());
        assert_eq!(session.current_visit_identifier(), "");
        assert_eq!(session.restoration_identifier(DestinationId::new(1)), None);
        assert_eq!(session.take_screenshot(DestinationId::new(1)), None);
        assert_eq!(session.state(), SessionState::NotReady);
    }

    #[test]
    fn page_invalidated_forces_a_cold_boot() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.page_invalidated();

        assert!(!session.is_ready());
        assert_eq!(session.state(), SessionState::ColdBooting);
        assert!(destination.events().contains(&"page_invalidated".to_string()));
    }

    #[test]
    fn cancel_visit_sends_cancel_and_silences_the_destination() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", false, "https://example.com/a");
        runtime.drain();
        let before = destination.events();

        session.cancel_visit();
        assert_eq!(
            runtime.drain(),
            vec![BridgeCommand::CancelVisit { identifier: "v1".into() }]
        );

        // Trailing events after cancellation are dropped.
        session.visit_rendered("v1");
        frames.pump();
        frames.pump();
        assert_eq!(destination.events(), before);
    }

    #[test]
    fn offline_completion_is_carried_to_the_destination() {
        let runtime = RecordingRuntime::new();
        let frames = Rc::new(FrameQueue::new());
        let session = ready_session(Rc::clone(&runtime), Rc::clone(&frames));
        let destination = RecordingDestination::new();

        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            Rc::clone(&destination) as Rc<dyn VisitDestination>,
        );
        session.visit_started("v1", false, "https://example.com/a");
        session.mark_visit_completed_offline("v1");
        session.visit_completed("v1", "restore-1");
        frames.pump();
        frames.pump();
        assert!(destination.events().contains(&"completed:true".to_string()));
    }

    #[test]
    fn works_against_the_noop_runtime() {
        let frames = Rc::new(FrameQueue::new());
        let session = Session::new(
            Rc::new(NoopWebRuntime),
            frames,
            PathConfiguration::default(),
        );
        session.bridge_ready(true);
        session.visit_location(
            "https://example.com/a",
            VisitOptions::advance(),
            DestinationId::new(1),
            RecordingDestination::new(),
        );
        assert_eq!(session.state(), SessionState::Ready);
    }
}
