pub mod geometry;
pub mod host;
pub mod launcher;
pub mod locator;
pub mod platform;
pub mod pubsub;
pub mod registry;
pub mod session;
pub mod watcher;
pub mod window_system;

pub use geometry::{GeometryEngine, GeometryOutcome, Offset};
pub use launcher::{LaunchOutcome, Launcher, ProcessSpawner};
pub use locator::{FilterSpec, WindowFilter};
pub use platform::{Backend, Platform};
pub use registry::SessionRegistry;
pub use session::{LifecycleState, Session, SessionContext, SessionOptions, SessionParams};
