use crate::error::{EmbedError, Result};
use crate::events::{DisplayInfo, WindowGeometry, WindowId, WindowInfo};
use crate::services::geometry::display_matching;
use crate::utils::process::{tool_available, run_tool};
use std::path::PathBuf;
use tracing::{debug, info};

use super::r#trait::{WindowControl, WindowDirectory};

/// Бэкенд X11 поверх wmctrl / xdotool / xprop
pub struct X11WindowSystem {
    displays: Vec<DisplayInfo>,
}

impl X11WindowSystem {
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        info!("Инициализация X11WindowSystem ({} мониторов)", displays.len());
        Self { displays }
    }

    pub fn test(&self) -> Result<()> {
        for (tool, args) in [
            ("wmctrl", &["-m"][..]),
            ("xdotool", &["version"][..]),
            ("xprop", &["-version"][..]),
        ] {
            if !tool_available(tool, args) {
                return Err(EmbedError::Platform(format!("{} недоступен", tool)));
            }
        }
        debug!("=== wmctrl, xdotool и xprop работают ===");
        Ok(())
    }

    /// Активное окно по данным xdotool
    pub fn active_window(&self) -> Result<Option<WindowId>> {
        let stdout = run_tool("xdotool", &["getactivewindow"])?;
        Ok(stdout.trim().parse::<u64>().ok().map(WindowId))
    }

    fn hex(id: WindowId) -> String {
        format!("0x{:x}", id.0)
    }

    fn wm_state(id: WindowId, action: &str, properties: &str) -> Result<()> {
        let arg = format!("{},{}", action, properties);
        run_tool("wmctrl", &["-i", "-r", &Self::hex(id), "-b", &arg]).map(|_| ())
    }
}

/// Разобрать строку `wmctrl -lpG`:
/// `0x03a00007  0 12345  10 20 800 600 host Title words`
pub(crate) fn parse_wmctrl_line(line: &str) -> Option<WindowInfo> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 8 {
        return None;
    }

    let id = u64::from_str_radix(parts[0].trim_start_matches("0x"), 16).ok()?;
    let pid: u32 = parts[2].parse().ok()?;
    let x: i32 = parts[3].parse().ok()?;
    let y: i32 = parts[4].parse().ok()?;
    let width: u32 = parts[5].parse().ok()?;
    let height: u32 = parts[6].parse().ok()?;
    let title = parts.get(8..).map(|rest| rest.join(" ")).unwrap_or_default();

    let mut window = WindowInfo::new(WindowId(id), title)
        .with_geometry(WindowGeometry::new(x, y, width, height));
    if pid != 0 {
        window = window.with_pid(pid);
    }
    Some(window)
}

/// Разобрать вывод `xdotool getwindowgeometry --shell`
pub(crate) fn parse_shell_geometry(output: &str) -> Option<WindowGeometry> {
    let mut geometry = WindowGeometry::default();
    let mut seen = 0;

    for line in output.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "X" => geometry.x = value.trim().parse().ok()?,
            "Y" => geometry.y = value.trim().parse().ok()?,
            "WIDTH" => geometry.width = value.trim().parse().ok()?,
            "HEIGHT" => geometry.height = value.trim().parse().ok()?,
            _ => continue,
        }
        seen += 1;
    }

    (seen == 4).then_some(geometry)
}

fn executable_path(pid: u32) -> PathBuf {
    std::fs::read_link(format!("/proc/{}/exe", pid)).unwrap_or_default()
}

impl WindowDirectory for X11WindowSystem {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let stdout = run_tool("wmctrl", &["-lpG"])?;

        let windows = stdout
            .lines()
            .filter_map(parse_wmctrl_line)
            .map(|window| match window.pid {
                Some(pid) => window.with_path(executable_path(pid)),
                None => window,
            })
            .collect();

        Ok(windows)
    }
}

impl WindowControl for X11WindowSystem {
    fn bounds(&self, id: WindowId) -> Result<WindowGeometry> {
        let stdout = run_tool("xdotool", &["getwindowgeometry", "--shell", &id.0.to_string()])
            .map_err(|_| EmbedError::WindowGone(id))?;
        parse_shell_geometry(&stdout)
            .ok_or_else(|| EmbedError::Platform(format!("Не удалось разобрать геометрию окна {}", id)))
    }

    fn set_bounds(&self, id: WindowId, bounds: WindowGeometry) -> Result<()> {
        let spec = format!("0,{},{},{},{}", bounds.x, bounds.y, bounds.width, bounds.height);
        run_tool("wmctrl", &["-i", "-r", &Self::hex(id), "-e", &spec]).map(|_| ())
    }

    fn set_owner(&self, id: WindowId, owner: Option<WindowId>) -> Result<()> {
        let target = Self::hex(id);
        match owner {
            Some(owner) => run_tool(
                "xprop",
                &[
                    "-id",
                    &target,
                    "-f",
                    "WM_TRANSIENT_FOR",
                    "32x",
                    "-set",
                    "WM_TRANSIENT_FOR",
                    &Self::hex(owner),
                ],
            ),
            None => run_tool("xprop", &["-id", &target, "-remove", "WM_TRANSIENT_FOR"]),
        }
        .map(|_| ())
    }

    fn set_opacity(&self, id: WindowId, opacity: f32) -> Result<()> {
        let value = (f64::from(opacity.clamp(0.0, 1.0)) * f64::from(u32::MAX)).round() as u32;
        run_tool(
            "xprop",
            &[
                "-id",
                &Self::hex(id),
                "-f",
                "_NET_WM_WINDOW_OPACITY",
                "32c",
                "-set",
                "_NET_WM_WINDOW_OPACITY",
                &value.to_string(),
            ],
        )
        .map(|_| ())
    }

    // Прозрачное окно не должно светиться в панели задач и пейджере
    fn set_transparency(&self, id: WindowId, transparent: bool) -> Result<()> {
        let action = if transparent { "add" } else { "remove" };
        Self::wm_state(id, action, "skip_taskbar,skip_pager")
    }

    fn bring_to_top(&self, id: WindowId) -> Result<()> {
        run_tool("xdotool", &["windowraise", &id.0.to_string()]).map(|_| ())
    }

    fn restore(&self, id: WindowId) -> Result<()> {
        Self::wm_state(id, "remove", "hidden")?;
        run_tool("xdotool", &["windowmap", &id.0.to_string()]).map(|_| ())
    }

    fn is_minimized(&self, id: WindowId) -> Result<bool> {
        let stdout = run_tool("xprop", &["-id", &Self::hex(id), "_NET_WM_STATE"])?;
        Ok(stdout.contains("_NET_WM_STATE_HIDDEN"))
    }

    fn scale_factor(&self, id: WindowId) -> Result<f64> {
        let bounds = self.bounds(id)?;
        Ok(display_matching(&self.displays, &bounds)
            .map(|display| display.scale_factor)
            .unwrap_or(1.0))
    }
}
