use crate::error::{EmbedError, Result};
use crate::events::{WindowGeometry, WindowId, WindowInfo};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use super::r#trait::{WindowControl, WindowDirectory};

/// Ширина, до которой оконная система "сворачивает" окно
pub const DRY_RUN_MINIMIZED_WIDTH: u32 = 160;

/// Состояние эмулируемого окна
#[derive(Debug, Clone, PartialEq)]
pub struct FakeWindow {
    pub info: WindowInfo,
    pub owner: Option<WindowId>,
    pub opacity: f32,
    pub transparent: bool,
    pub minimized: bool,
    pub raised: u32,
    pub set_bounds_calls: u32,
    pub scale_factor: f64,
    restore_geometry: Option<WindowGeometry>,
}

impl FakeWindow {
    fn new(info: WindowInfo) -> Self {
        Self {
            info,
            owner: None,
            opacity: 1.0,
            transparent: false,
            minimized: false,
            raised: 0,
            set_bounds_calls: 0,
            scale_factor: 1.0,
            restore_geometry: None,
        }
    }
}

/// In-memory window system used by `--dry-run` and tests.
///
/// Enumeration order is insertion order.
pub struct DryRunWindowSystem {
    next_id: AtomicU64,
    windows: RwLock<Vec<FakeWindow>>,
}

impl Default for DryRunWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunWindowSystem {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0x100),
            windows: RwLock::new(Vec::new()),
        }
    }

    /// Добавить окно и вернуть его снимок с присвоенным идентификатором
    pub fn add_window(
        &self,
        title: &str,
        path: impl Into<PathBuf>,
        geometry: WindowGeometry,
    ) -> WindowInfo {
        let id = WindowId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let info = WindowInfo::new(id, title)
            .with_path(path)
            .with_pid(id.0 as u32)
            .with_geometry(geometry);

        info!("[DRY RUN] Новое окно: {}", info);
        self.windows.write().push(FakeWindow::new(info.clone()));
        info
    }

    pub fn remove_window(&self, id: WindowId) -> bool {
        let mut windows = self.windows.write();
        let before = windows.len();
        windows.retain(|w| w.info.id != id);
        let removed = windows.len() != before;
        if removed {
            info!("[DRY RUN] Окно {} закрыто", id);
        }
        removed
    }

    pub fn window(&self, id: WindowId) -> Option<FakeWindow> {
        self.windows.read().iter().find(|w| w.info.id == id).cloned()
    }

    /// Свернуть окно так, как это делает оконная система: ширина становится
    /// служебной, исходная геометрия запоминается для восстановления
    pub fn minimize(&self, id: WindowId) {
        self.update(id, |w| {
            if !w.minimized {
                w.restore_geometry = Some(w.info.geometry);
                w.info.geometry = WindowGeometry::new(-32000, -32000, DRY_RUN_MINIMIZED_WIDTH, 28);
                w.minimized = true;
            }
        });
    }

    /// Minimize the way X11 does: the window keeps its size
    pub fn iconify(&self, id: WindowId) {
        self.update(id, |w| w.minimized = true);
    }

    pub fn set_scale_factor(&self, id: WindowId, scale_factor: f64) {
        self.update(id, |w| w.scale_factor = scale_factor);
    }

    fn update<F: FnOnce(&mut FakeWindow)>(&self, id: WindowId, f: F) -> bool {
        match self.windows.write().iter_mut().find(|w| w.info.id == id) {
            Some(window) => {
                f(window);
                true
            }
            None => false,
        }
    }

    fn mutate<F: FnOnce(&mut FakeWindow)>(&self, id: WindowId, f: F) -> Result<()> {
        if self.update(id, f) {
            Ok(())
        } else {
            Err(EmbedError::WindowGone(id))
        }
    }
}

impl WindowDirectory for DryRunWindowSystem {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self.windows.read().iter().map(|w| w.info.clone()).collect())
    }
}

impl WindowControl for DryRunWindowSystem {
    fn bounds(&self, id: WindowId) -> Result<WindowGeometry> {
        self.window(id)
            .map(|w| w.info.geometry)
            .ok_or(EmbedError::WindowGone(id))
    }

    fn set_bounds(&self, id: WindowId, bounds: WindowGeometry) -> Result<()> {
        self.mutate(id, |w| {
            w.info.geometry = bounds;
            w.set_bounds_calls += 1;
        })
    }

    fn set_owner(&self, id: WindowId, owner: Option<WindowId>) -> Result<()> {
        self.mutate(id, |w| w.owner = owner)
    }

    fn set_opacity(&self, id: WindowId, opacity: f32) -> Result<()> {
        self.mutate(id, |w| w.opacity = opacity)
    }

    fn set_transparency(&self, id: WindowId, transparent: bool) -> Result<()> {
        self.mutate(id, |w| w.transparent = transparent)
    }

    fn bring_to_top(&self, id: WindowId) -> Result<()> {
        self.mutate(id, |w| w.raised += 1)
    }

    fn restore(&self, id: WindowId) -> Result<()> {
        self.mutate(id, |w| {
            if let Some(geometry) = w.restore_geometry.take() {
                w.info.geometry = geometry;
            }
            w.minimized = false;
        })
    }

    fn is_minimized(&self, id: WindowId) -> Result<bool> {
        self.window(id)
            .map(|w| w.minimized)
            .ok_or(EmbedError::WindowGone(id))
    }

    fn scale_factor(&self, id: WindowId) -> Result<f64> {
        self.window(id)
            .map(|w| w.scale_factor)
            .ok_or(EmbedError::WindowGone(id))
    }
}
