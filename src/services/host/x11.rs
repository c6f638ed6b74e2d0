use crate::config::HostConfig;
use crate::error::{EmbedError, Result};
use crate::events::{DisplayInfo, WindowGeometry, WindowId};
use crate::services::geometry::display_matching;
use crate::services::locator;
use crate::services::pubsub::EventHub;
use crate::services::window_system::{WindowControl, X11WindowSystem};
use crate::warn_on_err;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

use super::r#trait::{HostEvent, HostWindow};

/// Окно-хост X11, найденное по идентификатору или паттерну заголовка.
///
/// Геометрия кэшируется и обновляется наблюдателем через `refresh()`.
pub struct X11HostWindow {
    system: Arc<X11WindowSystem>,
    handle: WindowId,
    displays: Vec<DisplayInfo>,
    zoom_factor: f64,
    bounds: RwLock<WindowGeometry>,
    events: EventHub<HostEvent>,
}

impl X11HostWindow {
    pub fn locate(
        system: Arc<X11WindowSystem>,
        config: &HostConfig,
        displays: Vec<DisplayInfo>,
    ) -> Result<Self> {
        let handle = match config.handle {
            Some(raw) => WindowId(raw),
            None => {
                if config.title_pattern.is_empty() {
                    return EmbedError::bad_request("host.title_pattern или host.handle обязателен");
                }
                let pattern = config.title_pattern.clone();
                let filter = move |w: &crate::events::WindowInfo| w.matches_pattern(&pattern);
                locator::locate(&*system, &filter)?
                    .map(|w| w.id)
                    .ok_or_else(|| {
                        EmbedError::Platform(format!(
                            "Окно-хост '{}' не найдено",
                            config.title_pattern
                        ))
                    })?
            }
        };

        let bounds = system.bounds(handle)?;
        info!("Окно-хост {} найдено: {}", handle, bounds);

        Ok(Self {
            system,
            handle,
            displays,
            zoom_factor: config.zoom_factor,
            bounds: RwLock::new(bounds),
            events: EventHub::new(),
        })
    }

    /// Перечитать геометрию хоста и оповестить подписчиков об изменении
    pub fn refresh(&self) -> Result<Option<HostEvent>> {
        let current = self.system.bounds(self.handle)?;
        let event = {
            let mut cached = self.bounds.write();
            let event = if current.width != cached.width || current.height != cached.height {
                Some(HostEvent::Resized)
            } else if current.x != cached.x || current.y != cached.y {
                Some(HostEvent::Moved)
            } else {
                None
            };
            *cached = current;
            event
        };

        if let Some(event) = event {
            debug!("Окно-хост: {:?} -> {}", event, current);
            self.events.publish(&event);
        }
        Ok(event)
    }
}

impl HostWindow for X11HostWindow {
    fn handle(&self) -> WindowId {
        self.handle
    }

    fn content_bounds(&self) -> WindowGeometry {
        *self.bounds.read()
    }

    fn display(&self) -> DisplayInfo {
        let bounds = self.content_bounds();
        display_matching(&self.displays, &bounds)
            .copied()
            .unwrap_or_else(|| DisplayInfo::new(bounds, 1.0))
    }

    fn zoom_factor(&self) -> f64 {
        self.zoom_factor
    }

    fn is_minimized(&self) -> bool {
        self.system.is_minimized(self.handle).unwrap_or(false)
    }

    fn restore(&self) {
        warn_on_err!(self.system.restore(self.handle), "Не удалось восстановить окно-хост");
    }

    fn events(&self) -> &EventHub<HostEvent> {
        &self.events
    }
}
