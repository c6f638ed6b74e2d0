use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Идентификатор окна верхнего уровня в оконной системе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Геометрия окна
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Площадь пересечения двух прямоугольников (0, если не пересекаются)
    pub fn intersection_area(&self, other: &WindowGeometry) -> u64 {
        let left = i64::from(self.x).max(i64::from(other.x));
        let top = i64::from(self.y).max(i64::from(other.y));
        let right = (i64::from(self.x) + i64::from(self.width))
            .min(i64::from(other.x) + i64::from(other.width));
        let bottom = (i64::from(self.y) + i64::from(self.height))
            .min(i64::from(other.y) + i64::from(other.height));

        if right <= left || bottom <= top {
            return 0;
        }
        ((right - left) * (bottom - top)) as u64
    }
}

impl fmt::Display for WindowGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Монитор: логические границы и коэффициент масштабирования
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub bounds: WindowGeometry,
    pub scale_factor: f64,
}

impl DisplayInfo {
    pub fn new(bounds: WindowGeometry, scale_factor: f64) -> Self {
        Self { bounds, scale_factor }
    }
}

/// Информация о нативном окне верхнего уровня.
///
/// Снимок, полученный из каталога окон: не кэшируется дольше одной проверки.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
    pub path: PathBuf,
    pub pid: Option<u32>,
    pub geometry: WindowGeometry,
}

impl WindowInfo {
    pub fn new(id: WindowId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            path: PathBuf::new(),
            pid: None,
            geometry: WindowGeometry::default(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_geometry(mut self, geometry: WindowGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn area(&self) -> u64 {
        self.geometry.area()
    }

    pub fn has_path(&self, path: &Path) -> bool {
        !path.as_os_str().is_empty() && self.path == path
    }

    /// Проверить, соответствует ли заголовок окна паттерну (регистронезависимо)
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if pattern.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&pattern.to_lowercase())
    }

    /// Проверить, соответствует ли окно любому из паттернов
    pub fn matches_any_pattern(&self, patterns: &[String]) -> bool {
        if patterns.is_empty() {
            return true; // Пустой список паттернов означает "любое окно"
        }

        patterns.iter().any(|pattern| self.matches_pattern(pattern))
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.as_os_str().is_empty() {
            write!(f, "\"{}\" [{}]", self.title, self.id)
        } else {
            write!(f, "\"{}\" ({}) [{}]", self.title, self.path.display(), self.id)
        }
    }
}
