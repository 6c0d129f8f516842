//! Voyage lets a server-rendered web application drive native navigation.
//!
//! A [`Session`] owns one embedded browser view and coordinates the visit
//! protocol with the in-page adapter; native screens implement
//! [`VisitDestination`] to receive lifecycle callbacks, a [`RouteTable`]
//! decides which native screen handles a location, and a
//! [`PathConfiguration`] maps URL patterns to presentation properties.

mod navigator;

pub use navigator::RouteTable;

pub use bridge::{
    BridgeCommand, BridgeError, BridgeEvent, BridgeMessage, NoopWebRuntime, WebRuntime,
};
pub use cache::{MemoryPressure, MemoryPressureMonitor, MemoryPressureThresholds, ScreenshotStore};
pub use config::{
    load_file, ConfigError, NavContext, PathConfiguration, PathProperties, Presentation,
    RemoteConfigHandle, RemoteConfigLoader, RemoteFetcher,
};
pub use session::{FrameQueue, FrameScheduler, Session, SessionState};
pub use visit::{
    DestinationId, DestinationIdGenerator, HttpError, SslError, Visit, VisitAction,
    VisitDestination, VisitError, VisitOptions, VisitResponse, WebResourceError,
};
