//! Platform assembly: picks the X11 or dry-run backend and wires the
//! window system, host, spawner and watchers into a `SessionContext`.

use crate::config::Config;
use crate::error::Result;
use crate::events::{DisplayInfo, WindowGeometry, WindowInfo};
use crate::services::geometry::GeometryEngine;
use crate::services::host::{DryRunHost, HostWindow, HostWindowContext, X11HostWindow};
use crate::services::launcher::{DryRunSpawner, Launcher, ProcessSpawner, SystemSpawner};
use crate::services::pubsub::EventHub;
use crate::services::session::{SessionContext, SessionTiming};
use crate::services::watcher::{
    DryRunActivationWatcher, HostBoundsWatcher, WatcherTrait, X11ActivationWatcher,
};
use crate::services::window_system::{DryRunWindowSystem, WindowSystem, X11WindowSystem};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type Watcher = Box<dyn WatcherTrait + Send>;

/// Concrete window-system backend
pub enum Backend {
    X11(Arc<X11WindowSystem>),
    DryRun(Arc<DryRunWindowSystem>),
}

impl Backend {
    pub fn new(config: &Config, dry_run: bool) -> Result<Self> {
        if dry_run {
            warn!("Режим сухого запуска - нативные окна не затрагиваются");
            return Ok(Backend::DryRun(Arc::new(Self::seeded_dry_run())));
        }

        let system = X11WindowSystem::new(config.displays());
        system.test()?;
        Ok(Backend::X11(Arc::new(system)))
    }

    fn seeded_dry_run() -> DryRunWindowSystem {
        let system = DryRunWindowSystem::new();
        for (title, path) in [
            ("Terminal - dry_run", "/usr/bin/terminal"),
            ("Browser - dry_run", "/usr/bin/browser"),
            ("Editor - dry_run", "/usr/bin/editor"),
        ] {
            system.add_window(title, path, WindowGeometry::new(100, 100, 1024, 768));
        }
        system
    }

    pub fn system(&self) -> Arc<dyn WindowSystem> {
        match self {
            Backend::X11(system) => Arc::clone(system) as Arc<dyn WindowSystem>,
            Backend::DryRun(system) => Arc::clone(system) as Arc<dyn WindowSystem>,
        }
    }

    pub fn activation_watcher(&self, hub: Arc<EventHub<WindowInfo>>, config: &Config) -> Watcher {
        match self {
            Backend::X11(system) => Box::new(X11ActivationWatcher::new(
                Arc::clone(system),
                hub,
                config.polling.activation_interval(),
            )) as Watcher,
            Backend::DryRun(system) => {
                Box::new(DryRunActivationWatcher::new(Arc::clone(system), hub)) as Watcher
            }
        }
    }

    /// Host window plus the watcher (if any) that keeps its geometry current
    pub fn host(&self, config: &Config) -> Result<(HostWindowContext, Option<Watcher>)> {
        match self {
            Backend::X11(system) => {
                let host = Arc::new(X11HostWindow::locate(
                    Arc::clone(system),
                    &config.host,
                    config.displays(),
                )?);
                let watcher: Watcher = Box::new(HostBoundsWatcher::new(
                    Arc::clone(&host),
                    config.polling.host_interval(),
                ));
                let host: HostWindowContext = host;
                Ok((host, Some(watcher)))
            }
            Backend::DryRun(_) => {
                let display = config.displays().into_iter().next().unwrap_or_else(|| {
                    DisplayInfo::new(WindowGeometry::new(0, 0, 1920, 1080), 1.0)
                });
                let host = DryRunHost::new(WindowGeometry::new(0, 0, 1280, 800), display);
                host.set_zoom_factor(config.host.zoom_factor);
                let host: HostWindowContext = Arc::new(host);
                Ok((host, None))
            }
        }
    }

    pub fn spawner(&self) -> Arc<dyn ProcessSpawner> {
        match self {
            Backend::X11(_) => Arc::new(SystemSpawner::new()) as Arc<dyn ProcessSpawner>,
            Backend::DryRun(system) => Arc::new(
                DryRunSpawner::new(Arc::clone(system)).with_startup_delay(Duration::from_millis(1500)),
            ) as Arc<dyn ProcessSpawner>,
        }
    }
}

/// Everything `run` needs: the shared session context and the watchers to spawn
pub struct Platform {
    pub context: SessionContext,
    pub watchers: Vec<Watcher>,
}

impl Platform {
    pub fn assemble(backend: &Backend, config: &Config) -> Result<Self> {
        let activation = Arc::new(EventHub::new());
        let (host, host_watcher) = backend.host(config)?;

        let mut watchers = vec![backend.activation_watcher(Arc::clone(&activation), config)];
        watchers.extend(host_watcher);

        let context = SessionContext {
            system: backend.system(),
            host,
            activation,
            launcher: Arc::new(Launcher::new(backend.spawner())),
            geometry: GeometryEngine::from_config(&config.geometry),
            timing: SessionTiming::from_config(&config.polling),
        };

        info!(
            "Платформа готова: хост {}, наблюдателей {}",
            context.host.handle(),
            watchers.len()
        );
        Ok(Self { context, watchers })
    }
}
