use crate::events::{DisplayInfo, WindowGeometry, WindowId};
use crate::services::pubsub::EventHub;
use std::sync::Arc;

/// Notification that the host window changed its geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Resized,
    Moved,
}

/// Everything the geometry engine needs to know about the host at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSnapshot {
    pub content_bounds: WindowGeometry,
    pub display: DisplayInfo,
    pub zoom_factor: f64,
}

/// The single host window, supplied by the surrounding application shell.
///
/// Read-only to the embedding core apart from `restore`, which the
/// activation side channel uses to surface a minimized host.
pub trait HostWindow: Send + Sync {
    fn handle(&self) -> WindowId;
    fn content_bounds(&self) -> WindowGeometry;
    /// Monitor under the host window
    fn display(&self) -> DisplayInfo;
    fn zoom_factor(&self) -> f64;
    fn is_minimized(&self) -> bool;
    fn restore(&self);
    fn events(&self) -> &EventHub<HostEvent>;

    fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            content_bounds: self.content_bounds(),
            display: self.display(),
            zoom_factor: self.zoom_factor(),
        }
    }
}

/// Host handle passed explicitly into sessions and the geometry engine
pub type HostWindowContext = Arc<dyn HostWindow>;
