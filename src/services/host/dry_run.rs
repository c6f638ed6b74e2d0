use crate::events::{DisplayInfo, WindowGeometry, WindowId};
use crate::services::pubsub::EventHub;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::info;

use super::r#trait::{HostEvent, HostWindow};

/// Эмулируемое окно-хост с фиксированной геометрией
pub struct DryRunHost {
    handle: WindowId,
    content: RwLock<WindowGeometry>,
    display: RwLock<DisplayInfo>,
    zoom_factor: RwLock<f64>,
    minimized: AtomicBool,
    restores: AtomicU32,
    events: EventHub<HostEvent>,
}

impl DryRunHost {
    pub fn new(content: WindowGeometry, display: DisplayInfo) -> Self {
        let monitor = display.bounds;
        info!("[DRY RUN] Окно-хост: {} на мониторе {}", content, monitor);
        Self {
            handle: WindowId(1),
            content: RwLock::new(content),
            display: RwLock::new(display),
            zoom_factor: RwLock::new(1.0),
            minimized: AtomicBool::new(false),
            restores: AtomicU32::new(0),
            events: EventHub::new(),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        {
            let mut content = self.content.write();
            content.width = width;
            content.height = height;
        }
        self.events.publish(&HostEvent::Resized);
    }

    pub fn move_to(&self, x: i32, y: i32) {
        {
            let mut content = self.content.write();
            content.x = x;
            content.y = y;
        }
        self.events.publish(&HostEvent::Moved);
    }

    pub fn set_display(&self, display: DisplayInfo) {
        *self.display.write() = display;
    }

    pub fn set_zoom_factor(&self, zoom_factor: f64) {
        *self.zoom_factor.write() = zoom_factor;
    }

    pub fn set_minimized(&self, minimized: bool) {
        self.minimized.store(minimized, Ordering::SeqCst);
    }

    pub fn restore_count(&self) -> u32 {
        self.restores.load(Ordering::SeqCst)
    }
}

impl HostWindow for DryRunHost {
    fn handle(&self) -> WindowId {
        self.handle
    }

    fn content_bounds(&self) -> WindowGeometry {
        *self.content.read()
    }

    fn display(&self) -> DisplayInfo {
        *self.display.read()
    }

    fn zoom_factor(&self) -> f64 {
        *self.zoom_factor.read()
    }

    fn is_minimized(&self) -> bool {
        self.minimized.load(Ordering::SeqCst)
    }

    fn restore(&self) {
        self.minimized.store(false, Ordering::SeqCst);
        self.restores.fetch_add(1, Ordering::SeqCst);
    }

    fn events(&self) -> &EventHub<HostEvent> {
        &self.events
    }
}
