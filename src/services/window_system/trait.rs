use crate::error::Result;
use crate::events::{WindowGeometry, WindowId, WindowInfo};

/// Read-only view over the current top-level windows.
///
/// Pure query surface: every call enumerates the OS state again, nothing is
/// cached between calls.
pub trait WindowDirectory: Send + Sync {
    /// Enumerate windows in the order the OS reports them
    fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    fn find_window(&self, id: WindowId) -> Result<Option<WindowInfo>> {
        Ok(self.list_windows()?.into_iter().find(|w| w.id == id))
    }

    /// Does `id` still refer to a live top-level window
    fn is_alive(&self, id: WindowId) -> Result<bool> {
        Ok(self.find_window(id)?.is_some())
    }
}

/// Mutations applied to a single native window.
pub trait WindowControl: Send + Sync {
    fn bounds(&self, id: WindowId) -> Result<WindowGeometry>;
    fn set_bounds(&self, id: WindowId, bounds: WindowGeometry) -> Result<()>;
    /// `Some(owner)` makes the window follow the owner's focus and stacking;
    /// `None` makes it independent again
    fn set_owner(&self, id: WindowId, owner: Option<WindowId>) -> Result<()>;
    fn set_opacity(&self, id: WindowId, opacity: f32) -> Result<()>;
    fn set_transparency(&self, id: WindowId, transparent: bool) -> Result<()>;
    fn bring_to_top(&self, id: WindowId) -> Result<()>;
    fn restore(&self, id: WindowId) -> Result<()>;
    fn is_minimized(&self, id: WindowId) -> Result<bool>;
    /// Scale factor of the monitor the window currently lives on
    fn scale_factor(&self, id: WindowId) -> Result<f64>;
}

/// Full backend: directory plus control
pub trait WindowSystem: WindowDirectory + WindowControl {}

impl<T: WindowDirectory + WindowControl + ?Sized> WindowSystem for T {}
