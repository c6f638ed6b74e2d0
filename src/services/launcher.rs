use crate::events::WindowGeometry;
use crate::services::window_system::DryRunWindowSystem;
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Process-spawn primitive
pub trait ProcessSpawner: Send + Sync {
    /// Start `exe` with no arguments. With `tie_to_host` the child must not
    /// outlive the host; otherwise it is fully detached.
    fn spawn(&self, exe: &Path, tie_to_host: bool) -> io::Result<u32>;

    /// Terminate children started with `tie_to_host`
    fn terminate_tied(&self) {}
}

/// Реальный запуск процессов через std::process
#[derive(Default)]
pub struct SystemSpawner {
    tied: Mutex<Vec<Child>>,
}

impl SystemSpawner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, exe: &Path, tie_to_host: bool) -> io::Result<u32> {
        let mut cmd = Command::new(exe);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if !tie_to_host {
                // Собственная группа процессов: сигналы хоста не доходят до потомка
                cmd.process_group(0);
            }
        }

        let child = cmd.spawn()?;
        let pid = child.id();
        if tie_to_host {
            self.tied.lock().push(child);
        }
        Ok(pid)
    }

    fn terminate_tied(&self) {
        let children: Vec<Child> = self.tied.lock().drain(..).collect();
        for mut child in children {
            let pid = child.id();
            match child.kill() {
                Ok(()) => {
                    let _ = child.wait();
                    info!("Дочерний процесс {} завершён вместе с хостом", pid);
                }
                // Процесс уже завершился сам
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => warn!("Не удалось завершить дочерний процесс {}: {}", pid, e),
            }
        }
    }
}

/// Dry-run spawner: "launching" an executable materialises a fake window
/// for it in the in-memory window system.
pub struct DryRunSpawner {
    system: Arc<DryRunWindowSystem>,
    materialize: bool,
    startup_delay: Duration,
    failure: Option<io::ErrorKind>,
    spawned: Mutex<Vec<PathBuf>>,
}

impl DryRunSpawner {
    pub fn new(system: Arc<DryRunWindowSystem>) -> Self {
        Self {
            system,
            materialize: true,
            startup_delay: Duration::ZERO,
            failure: None,
            spawned: Mutex::new(Vec::new()),
        }
    }

    /// Процесс "запускается", но окно так и не появляется
    pub fn without_windows(mut self) -> Self {
        self.materialize = false;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn failing_with(mut self, kind: io::ErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.spawned.lock().clone()
    }

    fn materialize_window(system: &DryRunWindowSystem, exe: &Path) {
        let title = exe
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dry_run".to_string());
        system.add_window(&title, exe, WindowGeometry::new(200, 200, 1024, 768));
    }
}

impl ProcessSpawner for DryRunSpawner {
    fn spawn(&self, exe: &Path, tie_to_host: bool) -> io::Result<u32> {
        info!("[DRY RUN] Запуск {} (привязан к хосту: {})", exe.display(), tie_to_host);
        self.spawned.lock().push(exe.to_path_buf());

        if let Some(kind) = self.failure {
            return Err(io::Error::from(kind));
        }

        if self.materialize {
            if self.startup_delay.is_zero() {
                Self::materialize_window(&self.system, exe);
            } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let system = Arc::clone(&self.system);
                let exe = exe.to_path_buf();
                let delay = self.startup_delay;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    Self::materialize_window(&system, &exe);
                });
            }
        }

        Ok(4242)
    }
}

/// Result of one launch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Empty executable path: the caller launches externally
    Skipped,
    Launched(u32),
    MissingExecutable,
    Failed(String),
}

impl LaunchOutcome {
    pub fn attempted(&self) -> bool {
        !matches!(self, LaunchOutcome::Skipped)
    }
}

pub struct Launcher {
    spawner: Arc<dyn ProcessSpawner>,
}

impl Launcher {
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self { spawner }
    }

    pub fn launch(&self, app_name: &str, exe: &Path, close_on_exit: bool) -> LaunchOutcome {
        if exe.to_string_lossy().trim().is_empty() {
            return LaunchOutcome::Skipped;
        }

        info!("{}: запуск нового экземпляра {}", app_name, exe.display());
        match self.spawner.spawn(exe, close_on_exit) {
            Ok(pid) => {
                info!("{}: процесс запущен (pid {})", app_name, pid);
                LaunchOutcome::Launched(pid)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{}: исполняемый файл {} не найден", app_name, exe.display());
                LaunchOutcome::MissingExecutable
            }
            Err(e) => {
                error!("{}: не удалось запустить {}: {}", app_name, exe.display(), e);
                LaunchOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn shutdown(&self) {
        self.spawner.terminate_tied();
    }
}
