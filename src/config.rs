use crate::events::{DisplayInfo, WindowGeometry};
use crate::services::locator::FilterSpec;
use crate::services::session::SessionOptions;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub polling: PollingConfig,
    pub geometry: GeometryConfig,
    pub host: HostConfig,
    pub displays: Vec<DisplayConfig>,
    pub sessions: Vec<SessionConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub liveness_interval_ms: u64,
    pub activation_interval_ms: u64,
    pub host_interval_ms: u64,
}

/// Отступы, приближающие декорации хоста вокруг панели содержимого
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub margin_left: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub minimized_width: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    pub title_pattern: String,
    pub zoom_factor: f64,
    pub handle: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
}

/// Сессия, создаваемая при запуске
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub identity: String,
    pub app_name: String,
    #[serde(default)]
    pub exe_path: PathBuf,
    #[serde(default)]
    pub window_path: Option<PathBuf>,
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default)]
    pub options: SessionOptions,
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_displays() -> Vec<DisplayConfig> {
    vec![DisplayConfig {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
        scale_factor: 1.0,
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            polling: PollingConfig::default(),
            geometry: GeometryConfig::default(),
            host: HostConfig::default(),
            displays: default_displays(),
            sessions: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            filter: "window_embed=info".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_ms: 10_000,
            liveness_interval_ms: 1000,
            activation_interval_ms: 250,
            host_interval_ms: 100,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            margin_left: 70.0,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            minimized_width: 160,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title_pattern: String::new(),
            zoom_factor: 1.0,
            handle: None,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn activation_interval(&self) -> Duration {
        Duration::from_millis(self.activation_interval_ms)
    }

    pub fn host_interval(&self) -> Duration {
        Duration::from_millis(self.host_interval_ms)
    }
}

impl DisplayConfig {
    pub fn to_display(&self) -> DisplayInfo {
        DisplayInfo::new(
            WindowGeometry::new(self.x, self.y, self.width, self.height),
            self.scale_factor,
        )
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WEMBED_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn displays(&self) -> Vec<DisplayInfo> {
        self.displays.iter().map(DisplayConfig::to_display).collect()
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация интервалов опроса
        let polling = &self.polling;
        for (name, value) in [
            ("interval_ms", polling.interval_ms),
            ("liveness_interval_ms", polling.liveness_interval_ms),
            ("activation_interval_ms", polling.activation_interval_ms),
            ("host_interval_ms", polling.host_interval_ms),
        ] {
            if value < 10 {
                anyhow::bail!("polling.{} должно быть минимум 10", name);
            }
        }
        if polling.timeout_ms < polling.interval_ms {
            anyhow::bail!("polling.timeout_ms не может быть меньше polling.interval_ms");
        }

        // Валидация геометрии
        let geometry = &self.geometry;
        for (name, value) in [
            ("margin_left", geometry.margin_left),
            ("margin_top", geometry.margin_top),
            ("margin_right", geometry.margin_right),
            ("margin_bottom", geometry.margin_bottom),
        ] {
            if !value.is_finite() {
                anyhow::bail!("geometry.{} должно быть конечным числом", name);
            }
        }

        if !(self.host.zoom_factor.is_finite() && self.host.zoom_factor > 0.0) {
            anyhow::bail!("host.zoom_factor должно быть больше 0");
        }

        // Валидация мониторов
        if self.displays.is_empty() {
            anyhow::bail!("Должен быть описан хотя бы один монитор");
        }
        for (i, display) in self.displays.iter().enumerate() {
            if display.width == 0 || display.height == 0 {
                anyhow::bail!("Монитор #{} имеет нулевой размер", i + 1);
            }
            if !(display.scale_factor.is_finite() && display.scale_factor > 0.0) {
                anyhow::bail!("Монитор #{}: scale_factor должно быть больше 0", i + 1);
            }
        }

        // Валидация сессий
        let mut identities = HashSet::new();
        for (i, session) in self.sessions.iter().enumerate() {
            if session.identity.trim().is_empty() {
                anyhow::bail!("Пустой identity в сессии #{}", i + 1);
            }
            if !identities.insert(session.identity.as_str()) {
                anyhow::bail!("Повторяющийся identity '{}' в сессии #{}", session.identity, i + 1);
            }
            if session.app_name.trim().is_empty() {
                anyhow::bail!("Пустой app_name в сессии '{}'", session.identity);
            }
            session
                .filter
                .validate()
                .with_context(|| format!("Некорректный фильтр в сессии '{}'", session.identity))?;
        }

        Ok(())
    }
}
