//! Geometry engine: where the embedded window goes.
//!
//! The host reports its content area in its own (possibly DPI-virtualised)
//! coordinates. The embedded application may run with a different scale
//! factor, so the host rectangle is converted through the ratio between the
//! monitor's reported bounds and its native bounds as seen by the embedded
//! application.

use crate::config::GeometryConfig;
use crate::error::Result;
use crate::events::{DisplayInfo, WindowGeometry, WindowId};
use crate::services::host::HostSnapshot;
use crate::services::window_system::WindowControl;
use serde::{Deserialize, Serialize};

/// Left/top/right/bottom insets applied to the host content area
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offset {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Offset {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    fn plus(&self, other: &Offset) -> Offset {
        Offset::new(
            self.left + other.left,
            self.top + other.top,
            self.right + other.right,
            self.bottom + other.bottom,
        )
    }
}

/// Result of a geometry update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryOutcome {
    Applied(WindowGeometry),
    /// Window is minimized and intended hidden: left alone until shown
    SkippedMinimized,
    /// A scale ratio resolved to zero; bounds untouched
    SkippedDegenerate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryEngine {
    /// Approximation of the host's own decorations around the content panel
    margins: Offset,
    minimized_width: u32,
}

impl GeometryEngine {
    pub fn new(margins: Offset, minimized_width: u32) -> Self {
        Self { margins, minimized_width }
    }

    pub fn from_config(config: &GeometryConfig) -> Self {
        Self::new(
            Offset::new(
                config.margin_left,
                config.margin_top,
                config.margin_right,
                config.margin_bottom,
            ),
            config.minimized_width,
        )
    }

    /// Bounds for the embedded window, or `None` when any ratio degenerates.
    pub fn compute(
        &self,
        host: &HostSnapshot,
        app_scale: f64,
        offset: &Offset,
    ) -> Option<WindowGeometry> {
        if !(app_scale.is_finite() && app_scale > 0.0) {
            return None;
        }
        if !(host.zoom_factor.is_finite() && host.zoom_factor > 0.0) {
            return None;
        }

        let display = &host.display;
        let reported_w = f64::from(display.bounds.width);
        let reported_h = f64::from(display.bounds.height);

        // Размер монитора в пикселях встраиваемого приложения
        let native_w = (reported_w * display.scale_factor / app_scale).floor();
        let native_h = (reported_h * display.scale_factor / app_scale).floor();
        if native_w <= 0.0 || native_h <= 0.0 {
            return None;
        }

        let ratio_w = reported_w / native_w;
        let ratio_h = reported_h / native_h;
        if !(ratio_w > 0.0 && ratio_h > 0.0) {
            return None;
        }

        let inset = self.margins.plus(offset);
        let zoom = host.zoom_factor;
        let (left, top) = (inset.left * zoom, inset.top * zoom);
        let (right, bottom) = (inset.right * zoom, inset.bottom * zoom);

        let content = &host.content_bounds;
        let x = (f64::from(content.x) + left) / ratio_w;
        let y = (f64::from(content.y) + top) / ratio_h;
        let width = ((f64::from(content.width) - left - right) / ratio_w).max(0.0);
        let height = ((f64::from(content.height) - top - bottom) / ratio_h).max(0.0);

        Some(WindowGeometry::new(
            x.round() as i32,
            y.round() as i32,
            width.round() as u32,
            height.round() as u32,
        ))
    }

    /// Recompute and apply bounds to `id`. Idempotent: every call works from
    /// current state only.
    pub fn apply<C>(
        &self,
        control: &C,
        id: WindowId,
        host: &HostSnapshot,
        offset: &Offset,
        is_shown: bool,
    ) -> Result<GeometryOutcome>
    where
        C: WindowControl + ?Sized,
    {
        // Свёрнутое окно X11 сохраняет настоящую ширину, поэтому кроме
        // ширины-метки спрашиваем состояние у оконной системы
        let current = control.bounds(id)?;
        let minimized = current.width == self.minimized_width || control.is_minimized(id)?;
        if minimized {
            if !is_shown {
                return Ok(GeometryOutcome::SkippedMinimized);
            }
            control.restore(id)?;
        }

        let app_scale = control.scale_factor(id)?;
        match self.compute(host, app_scale, offset) {
            Some(bounds) => {
                control.set_bounds(id, bounds)?;
                Ok(GeometryOutcome::Applied(bounds))
            }
            None => Ok(GeometryOutcome::SkippedDegenerate),
        }
    }
}

/// Monitor with the largest overlap with `bounds`; the first monitor when
/// nothing overlaps.
pub fn display_matching<'a>(
    displays: &'a [DisplayInfo],
    bounds: &WindowGeometry,
) -> Option<&'a DisplayInfo> {
    let mut best: Option<(&DisplayInfo, u64)> = None;
    for display in displays {
        let overlap = display.bounds.intersection_area(bounds);
        match best {
            Some((_, area)) if overlap <= area => {}
            _ => best = Some((display, overlap)),
        }
    }
    best.map(|(display, _)| display)
}
