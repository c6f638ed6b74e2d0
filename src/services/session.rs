//! Session: the full life of one embedded window.
//!
//! Idle -> Locating -> Attached <-> Detached, and Attached/Detached -> Lost
//! when the native window disappears. A lost session behaves like an idle
//! one: the caller issues `wait_for_window` again to relocate.
//!
//! Timers (locate polling, liveness) are tokio tasks owned by the session;
//! host and activation notifications arrive through `EventHub`
//! subscriptions the session holds by id. `cleanup` cancels all of them.
//! Events are delivered to the sink only after the state lock is released.

use crate::config::{PollingConfig, SessionConfig};
use crate::debug_if_enabled;
use crate::error::{EmbedError, Result};
use crate::events::{EventSink, SessionEvent, SessionEventKind, WindowId, WindowInfo};
use crate::services::geometry::{GeometryEngine, Offset};
use crate::services::host::{HostEvent, HostWindowContext};
use crate::services::launcher::{LaunchOutcome, Launcher};
use crate::services::locator::{self, WindowFilter};
use crate::services::pubsub::{EventHub, SubscriptionId};
use crate::services::window_system::WindowSystem;
use crate::warn_on_err;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Idle,
    Locating,
    Attached,
    Detached,
    Lost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    #[serde(alias = "closeOnExit")]
    pub close_on_exit: bool,
    #[serde(alias = "isCurrentlyShown")]
    pub is_currently_shown: bool,
    #[serde(alias = "locateOnStartup")]
    pub locate_on_startup: bool,
    #[serde(alias = "openOnStartup")]
    pub open_on_startup: bool,
    pub offset: Offset,
}

/// Caller-supplied parameters of one session
#[derive(Clone)]
pub struct SessionParams {
    pub app_name: String,
    /// Empty means "never auto-launch"
    pub exe_path: PathBuf,
    /// Path of the window to track when it differs from the launched process
    pub window_path: Option<PathBuf>,
    pub filter: WindowFilter,
    pub sink: Arc<dyn EventSink>,
    pub options: SessionOptions,
}

impl SessionParams {
    pub fn new(
        app_name: impl Into<String>,
        exe_path: impl Into<PathBuf>,
        filter: WindowFilter,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            exe_path: exe_path.into(),
            window_path: None,
            filter,
            sink,
            options: SessionOptions::default(),
        }
    }

    pub fn from_config(config: &SessionConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            app_name: config.app_name.clone(),
            exe_path: config.exe_path.clone(),
            window_path: config.window_path.clone(),
            filter: config.filter.clone().into_filter(),
            sink,
            options: config.options,
        }
    }

    pub fn with_window_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.window_path = Some(path.into());
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return EmbedError::bad_request("appName не может быть пустым");
        }
        let offset = &self.options.offset;
        if ![offset.left, offset.top, offset.right, offset.bottom]
            .iter()
            .all(|v| v.is_finite())
        {
            return EmbedError::bad_request("offset должен состоять из конечных чисел");
        }
        Ok(())
    }

    /// Path compared against activated windows
    pub fn target_path(&self) -> &Path {
        self.window_path.as_deref().unwrap_or(&self.exe_path)
    }
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("app_name", &self.app_name)
            .field("exe_path", &self.exe_path)
            .field("window_path", &self.window_path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub poll_interval: Duration,
    pub locate_timeout: Duration,
    pub liveness_interval: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl SessionTiming {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            poll_interval: config.interval(),
            locate_timeout: config.timeout(),
            liveness_interval: config.liveness_interval(),
        }
    }
}

/// Collaborators shared by every session of one host
#[derive(Clone)]
pub struct SessionContext {
    pub system: Arc<dyn WindowSystem>,
    pub host: HostWindowContext,
    pub activation: Arc<EventHub<WindowInfo>>,
    pub launcher: Arc<Launcher>,
    pub geometry: GeometryEngine,
    pub timing: SessionTiming,
}

struct SessionState {
    lifecycle: LifecycleState,
    window: Option<WindowInfo>,
    is_shown: bool,
    retired: bool,
    locate_task: Option<JoinHandle<()>>,
    liveness_task: Option<JoinHandle<()>>,
    host_subscription: Option<SubscriptionId>,
    activation_subscription: Option<SubscriptionId>,
}

impl SessionState {
    fn new(is_shown: bool) -> Self {
        Self {
            lifecycle: LifecycleState::Idle,
            window: None,
            is_shown,
            retired: false,
            locate_task: None,
            liveness_task: None,
            host_subscription: None,
            activation_subscription: None,
        }
    }

    fn attached_window(&self) -> Option<WindowId> {
        match self.lifecycle {
            LifecycleState::Attached => self.window.as_ref().map(|w| w.id),
            _ => None,
        }
    }
}

struct SessionInner {
    identity: String,
    params: SessionParams,
    ctx: SessionContext,
    state: Mutex<SessionState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachKind {
    Found,
    Reattach,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(identity: impl Into<String>, params: SessionParams, ctx: SessionContext) -> Self {
        let is_shown = params.options.is_currently_shown;
        let session = Self {
            inner: Arc::new(SessionInner {
                identity: identity.into(),
                params,
                ctx,
                state: Mutex::new(SessionState::new(is_shown)),
            }),
        };

        info!(
            "{}: сессия '{}' создана (exe: '{}')",
            session.app_name(),
            session.identity(),
            session.inner.params.exe_path.display()
        );

        session.subscribe_activation();
        session
    }

    /// Apply the startup options: locate (and maybe launch) right away or
    /// wait for `wait_for_window`. Called once the session is reachable by
    /// its identity, since the first locate may emit `window-found`
    /// synchronously.
    pub fn start(&self) {
        let options = self.inner.params.options;
        if options.locate_on_startup || options.open_on_startup {
            self.start_locating(options.open_on_startup);
        } else {
            debug!("{}: ожидаем команды wait-for-window", self.app_name());
        }
    }

    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    pub fn app_name(&self) -> &str {
        &self.inner.params.app_name
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.lock().lifecycle
    }

    pub fn window(&self) -> Option<WindowInfo> {
        self.inner.state.lock().window.clone()
    }

    pub fn is_shown(&self) -> bool {
        self.inner.state.lock().is_shown
    }

    pub fn is_retired(&self) -> bool {
        self.inner.state.lock().retired
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner.state.lock().liveness_task.is_some()
    }

    /// Start (or restart after loss / timeout) the locate cycle
    pub fn wait_for_window(&self) {
        self.start_locating(true);
    }

    pub fn show(&self) {
        let event = {
            let mut st = self.inner.state.lock();
            if st.retired {
                return;
            }
            st.is_shown = true;
            if let Some(id) = st.attached_window() {
                self.apply_show(id);
                self.update_geometry(&st);
            }
            self.event(SessionEventKind::Show)
        };
        self.dispatch(vec![event]);
    }

    pub fn hide(&self) {
        let event = {
            let mut st = self.inner.state.lock();
            if st.retired {
                return;
            }
            st.is_shown = false;
            if let Some(id) = st.attached_window() {
                self.apply_hide(id);
            }
            self.event(SessionEventKind::Hide)
        };
        self.dispatch(vec![event]);
    }

    /// Release OS ownership while keeping the window tracked
    pub fn detach(&self) {
        let mut st = self.inner.state.lock();
        if st.retired {
            return;
        }
        let Some(id) = st.attached_window() else {
            debug!("{}: detach пропущен, состояние {:?}", self.app_name(), st.lifecycle);
            return;
        };

        warn_on_err!(
            self.inner.ctx.system.set_owner(id, None),
            "{}: не удалось снять владельца окна {}",
            self.app_name(),
            id
        );
        st.lifecycle = LifecycleState::Detached;
        self.unsubscribe_host(&mut st);
        self.apply_show(id);
        info!("{}: окно {} откреплено от хоста", self.app_name(), id);
    }

    pub fn reattach(&self) {
        let events = {
            let mut st = self.inner.state.lock();
            if st.retired || st.lifecycle != LifecycleState::Detached {
                debug!("{}: reattach пропущен, состояние {:?}", self.app_name(), st.lifecycle);
                return;
            }
            let Some(window) = st.window.clone() else {
                return;
            };
            self.attach_locked(&mut st, window, AttachKind::Reattach)
        };
        self.dispatch(events);
    }

    /// Recompute geometry; no-op unless attached
    pub fn resize(&self) {
        let st = self.inner.state.lock();
        self.update_geometry(&st);
    }

    /// Stop every timer and drop every subscription. Idempotent.
    pub fn cleanup(&self) {
        let mut st = self.inner.state.lock();
        let first = !st.retired;
        st.retired = true;

        if let Some(task) = st.locate_task.take() {
            task.abort();
        }
        if let Some(task) = st.liveness_task.take() {
            task.abort();
        }
        self.unsubscribe_host(&mut st);
        if let Some(id) = st.activation_subscription.take() {
            self.inner.ctx.activation.unsubscribe(id);
        }

        if first {
            info!("{}: сессия '{}' остановлена", self.app_name(), self.identity());
        }
    }

    /// Give the window back to the OS (no owner, visible), then clean up.
    /// Used when the host shuts down.
    pub fn release(&self) {
        {
            let st = self.inner.state.lock();
            if let (Some(window), LifecycleState::Attached | LifecycleState::Detached) =
                (st.window.as_ref(), st.lifecycle)
            {
                warn_on_err!(
                    self.inner.ctx.system.set_owner(window.id, None),
                    "{}: не удалось освободить окно {}",
                    self.app_name(),
                    window.id
                );
                self.apply_show(window.id);
            }
        }
        self.cleanup();
    }

    fn start_locating(&self, allow_launch: bool) {
        let started = Instant::now();
        {
            let mut st = self.inner.state.lock();
            if st.retired {
                return;
            }
            match st.lifecycle {
                LifecycleState::Idle | LifecycleState::Lost => {}
                other => {
                    debug!("{}: поиск окна пропущен, состояние {:?}", self.app_name(), other);
                    return;
                }
            }
            st.lifecycle = LifecycleState::Locating;
        }
        info!("{}: поиск окна", self.app_name());

        // Первая попытка сразу: уже запущенный экземпляр находится без ожидания
        if let Some(window) = self.try_locate() {
            self.complete_locate(window);
            return;
        }

        let task = tokio::spawn(Self::poll_for_window(
            Arc::downgrade(&self.inner),
            allow_launch,
            started,
            self.inner.ctx.timing,
        ));

        let mut st = self.inner.state.lock();
        if st.lifecycle == LifecycleState::Locating && !st.retired {
            st.locate_task = Some(task);
        } else {
            task.abort();
        }
    }

    async fn poll_for_window(
        weak: Weak<SessionInner>,
        allow_launch: bool,
        started: Instant,
        timing: SessionTiming,
    ) {
        let mut attempt: u32 = 1;
        loop {
            tokio::time::sleep(timing.poll_interval).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let session = Session { inner };
            if !session.is_locating() {
                return;
            }

            if attempt == 1 && allow_launch {
                session.launch_instance();
            }

            debug_if_enabled!("{}: попытка #{} поиска окна", session.app_name(), attempt);
            if let Some(window) = session.try_locate() {
                session.complete_locate(window);
                return;
            }

            if started.elapsed() >= timing.locate_timeout {
                session.locate_timed_out();
                return;
            }
            attempt += 1;
        }
    }

    fn is_locating(&self) -> bool {
        let st = self.inner.state.lock();
        !st.retired && st.lifecycle == LifecycleState::Locating
    }

    fn try_locate(&self) -> Option<WindowInfo> {
        match locator::locate(&*self.inner.ctx.system, &*self.inner.params.filter) {
            Ok(found) => found,
            Err(e) => {
                warn!("{}: не удалось получить список окон: {}", self.app_name(), e);
                None
            }
        }
    }

    fn launch_instance(&self) {
        let params = &self.inner.params;
        let outcome = self.inner.ctx.launcher.launch(
            &params.app_name,
            &params.exe_path,
            params.options.close_on_exit,
        );

        let mut events = Vec::new();
        if outcome.attempted() {
            events.push(self.event(SessionEventKind::NewInstance));
        }
        if outcome == LaunchOutcome::MissingExecutable {
            events.push(self.event(SessionEventKind::NewInstanceFailed));
        }
        self.dispatch(events);
    }

    fn complete_locate(&self, window: WindowInfo) {
        let events = {
            let mut st = self.inner.state.lock();
            if st.retired || st.lifecycle != LifecycleState::Locating {
                return;
            }
            // Задача опроса завершается сама, handle просто отпускаем
            st.locate_task.take();
            self.attach_locked(&mut st, window, AttachKind::Found)
        };
        self.dispatch(events);
    }

    fn locate_timed_out(&self) {
        let event = {
            let mut st = self.inner.state.lock();
            if st.retired || st.lifecycle != LifecycleState::Locating {
                return;
            }
            st.lifecycle = LifecycleState::Idle;
            st.locate_task.take();
            warn!(
                "{}: окно не найдено за {:?}",
                self.app_name(),
                self.inner.ctx.timing.locate_timeout
            );
            self.event(SessionEventKind::WindowNotFound)
        };
        self.dispatch(vec![event]);
    }

    fn attach_locked(
        &self,
        st: &mut SessionState,
        window: WindowInfo,
        kind: AttachKind,
    ) -> Vec<SessionEvent> {
        let ctx = &self.inner.ctx;
        let id = window.id;
        match kind {
            AttachKind::Found => info!("{}: окно найдено {}", self.app_name(), window),
            AttachKind::Reattach => info!("{}: окно {} снова прикреплено", self.app_name(), id),
        }

        st.window = Some(window.clone());
        st.lifecycle = LifecycleState::Attached;

        if matches!(ctx.system.is_minimized(id), Ok(true)) {
            warn_on_err!(
                ctx.system.restore(id),
                "{}: не удалось развернуть окно {}",
                self.app_name(),
                id
            );
        }

        self.restart_liveness(st, id);

        if st.is_shown {
            self.apply_show(id);
        } else {
            self.apply_hide(id);
        }

        warn_on_err!(
            ctx.system.set_owner(id, Some(ctx.host.handle())),
            "{}: не удалось назначить владельца окну {}",
            self.app_name(),
            id
        );

        self.update_geometry(st);
        self.subscribe_host(st);

        match kind {
            AttachKind::Found => {
                vec![self.event(SessionEventKind::WindowFound).with_window(window)]
            }
            AttachKind::Reattach => Vec::new(),
        }
    }

    fn restart_liveness(&self, st: &mut SessionState, id: WindowId) {
        // Старый монитор останавливаем до запуска нового
        if let Some(task) = st.liveness_task.take() {
            task.abort();
        }
        st.liveness_task = Some(tokio::spawn(Self::monitor_liveness(
            Arc::downgrade(&self.inner),
            self.inner.ctx.timing.liveness_interval,
            id,
        )));
    }

    async fn monitor_liveness(weak: Weak<SessionInner>, period: Duration, id: WindowId) {
        loop {
            tokio::time::sleep(period).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !(Session { inner }).check_liveness(id) {
                return;
            }
        }
    }

    /// Returns `false` once monitoring of `id` should stop
    fn check_liveness(&self, id: WindowId) -> bool {
        {
            let st = self.inner.state.lock();
            if st.retired || st.window.as_ref().map(|w| w.id) != Some(id) {
                return false;
            }
        }

        match self.inner.ctx.system.is_alive(id) {
            Ok(true) => true,
            Ok(false) => {
                self.handle_lost(id);
                false
            }
            Err(e) => {
                // Перечисление окон может временно сбоить, это ещё не потеря окна
                debug!("{}: проверка окна {} не удалась: {}", self.app_name(), id, e);
                true
            }
        }
    }

    fn handle_lost(&self, id: WindowId) {
        let event = {
            let mut st = self.inner.state.lock();
            if st.retired || st.window.as_ref().map(|w| w.id) != Some(id) {
                return;
            }
            let window = st.window.take();
            st.lifecycle = LifecycleState::Lost;
            st.liveness_task.take();
            self.unsubscribe_host(&mut st);
            warn!("{}: окно {} потеряно", self.app_name(), id);

            let event = self.event(SessionEventKind::LostWindow);
            match window {
                Some(window) => event.with_window(window),
                None => event,
            }
        };
        self.dispatch(vec![event]);
    }

    fn update_geometry(&self, st: &SessionState) {
        let Some(id) = st.attached_window() else {
            return;
        };
        let ctx = &self.inner.ctx;
        let snapshot = ctx.host.snapshot();

        match ctx.geometry.apply(
            &*ctx.system,
            id,
            &snapshot,
            &self.inner.params.options.offset,
            st.is_shown,
        ) {
            Ok(outcome) => debug_if_enabled!("{}: геометрия {:?}", self.app_name(), outcome),
            Err(e) => warn!("{}: не удалось обновить геометрию окна {}: {}", self.app_name(), id, e),
        }
    }

    fn apply_show(&self, id: WindowId) {
        let system = &self.inner.ctx.system;
        warn_on_err!(system.set_opacity(id, 1.0), "{}: set_opacity", self.app_name());
        warn_on_err!(system.set_transparency(id, false), "{}: set_transparency", self.app_name());
        warn_on_err!(system.bring_to_top(id), "{}: bring_to_top", self.app_name());
    }

    fn apply_hide(&self, id: WindowId) {
        let system = &self.inner.ctx.system;
        warn_on_err!(system.set_transparency(id, true), "{}: set_transparency", self.app_name());
        warn_on_err!(system.set_opacity(id, 0.0), "{}: set_opacity", self.app_name());
    }

    fn subscribe_host(&self, st: &mut SessionState) {
        self.unsubscribe_host(st);
        let weak = Arc::downgrade(&self.inner);
        let id = self.inner.ctx.host.events().subscribe(move |event: &HostEvent| {
            if let Some(inner) = weak.upgrade() {
                let session = Session { inner };
                debug_if_enabled!("{}: событие хоста {:?}", session.app_name(), event);
                session.resize();
            }
        });
        st.host_subscription = Some(id);
    }

    fn unsubscribe_host(&self, st: &mut SessionState) {
        if let Some(id) = st.host_subscription.take() {
            self.inner.ctx.host.events().unsubscribe(id);
        }
    }

    fn subscribe_activation(&self) {
        let weak = Arc::downgrade(&self.inner);
        let id = self.inner.ctx.activation.subscribe(move |window: &WindowInfo| {
            if let Some(inner) = weak.upgrade() {
                (Session { inner }).on_window_activated(window);
            }
        });
        self.inner.state.lock().activation_subscription = Some(id);
    }

    /// The user activated the embedded application by other means (taskbar,
    /// alt-tab): surface the host and ask the caller to swap to this session.
    fn on_window_activated(&self, window: &WindowInfo) {
        if !window.has_path(self.inner.params.target_path()) || self.is_retired() {
            return;
        }

        let host = &self.inner.ctx.host;
        if host.is_minimized() {
            info!("{}: разворачиваем окно-хост", self.app_name());
            host.restore();
        }
        let event = self
            .event(SessionEventKind::RequestSwap)
            .with_window(window.clone());
        self.dispatch(vec![event]);
    }

    fn event(&self, kind: SessionEventKind) -> SessionEvent {
        SessionEvent::new(self.inner.identity.clone(), kind)
    }

    fn dispatch(&self, events: Vec<SessionEvent>) {
        for event in events {
            debug!("{}: событие {}", self.app_name(), event);
            self.inner.params.sink.emit(event);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.inner.identity)
            .field("app_name", &self.inner.params.app_name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DisplayInfo, WindowGeometry};
    use crate::test_support::Fixture;
    use std::io;

    const CALC: &str = "/usr/bin/calc";

    fn started(identity: &str, params: SessionParams, ctx: SessionContext) -> Session {
        let session = Session::new(identity, params, ctx);
        session.start();
        session
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn locate_now() -> SessionOptions {
        SessionOptions {
            locate_on_startup: true,
            ..SessionOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn running_window_is_found_immediately_without_launch() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));

        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());

        assert_eq!(session.state(), LifecycleState::Attached);
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::WindowFound]);
        assert!(fx.spawner.spawned().is_empty());

        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(fake.info.geometry, WindowGeometry::new(170, 50, 930, 800));
        assert_eq!(fake.owner, Some(fx.host_handle()));
        // По умолчанию окно скрыто
        assert!(fake.transparent);
        assert_eq!(fake.opacity, 0.0);
        assert!(session.is_monitoring());
        assert_eq!(fx.host_subscribers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_match_emits_single_not_found_after_timeout() {
        let fx = Fixture::new();
        fx.system.add_window("Browser", "/usr/bin/browser", WindowGeometry::new(0, 0, 800, 600));

        let session = started("calc", fx.params("", "calc"), fx.ctx());
        assert_eq!(session.state(), LifecycleState::Idle);

        session.wait_for_window();
        assert_eq!(session.state(), LifecycleState::Locating);

        advance(9_500).await;
        assert!(fx.sink.kinds().is_empty());

        advance(1_000).await;
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::WindowNotFound]);
        assert_eq!(session.state(), LifecycleState::Idle);

        advance(30_000).await;
        assert_eq!(fx.sink.count(SessionEventKind::WindowNotFound), 1);
        assert_eq!(fx.sink.count(SessionEventKind::WindowFound), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn launcher_runs_once_after_first_failed_check() {
        let fx = Fixture::with_spawner(|s| s.without_windows());
        let options = SessionOptions {
            open_on_startup: true,
            ..SessionOptions::default()
        };

        let _session = started("calc", fx.params(CALC, "calc").with_options(options), fx.ctx());
        assert!(fx.spawner.spawned().is_empty());

        advance(1_500).await;
        assert_eq!(fx.spawner.spawned().len(), 1);
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::NewInstance]);

        advance(10_000).await;
        assert_eq!(fx.spawner.spawned().len(), 1);
        assert_eq!(
            fx.sink.kinds(),
            vec![SessionEventKind::NewInstance, SessionEventKind::WindowNotFound]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn launched_window_is_found_when_it_appears() {
        let fx = Fixture::with_spawner(|s| s.with_startup_delay(Duration::from_millis(2_500)));
        let options = SessionOptions {
            open_on_startup: true,
            ..SessionOptions::default()
        };

        let session = started("calc", fx.params(CALC, "calc").with_options(options), fx.ctx());

        advance(3_000).await;
        assert_eq!(session.state(), LifecycleState::Locating);

        advance(2_000).await;
        assert_eq!(session.state(), LifecycleState::Attached);
        assert_eq!(
            fx.sink.kinds(),
            vec![SessionEventKind::NewInstance, SessionEventKind::WindowFound]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_executable_is_reported_and_polling_continues() {
        let fx = Fixture::with_spawner(|s| s.failing_with(io::ErrorKind::NotFound));
        let session = started("calc", fx.params(CALC, "calc"), fx.ctx());
        session.wait_for_window();

        advance(1_500).await;
        assert_eq!(
            fx.sink.kinds(),
            vec![SessionEventKind::NewInstance, SessionEventKind::NewInstanceFailed]
        );
        assert_eq!(session.state(), LifecycleState::Locating);

        // Окно, запущенное пользователем вручную, всё равно находится
        fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        advance(1_000).await;
        assert_eq!(session.state(), LifecycleState::Attached);
    }

    #[tokio::test(start_paused = true)]
    async fn attaches_to_largest_candidate() {
        let fx = Fixture::new();
        fx.system.add_window("Calc tooltip", CALC, WindowGeometry::new(0, 0, 100, 20));
        let main = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 640, 480));
        fx.system.add_window("Calc twin", CALC, WindowGeometry::new(0, 0, 640, 480));

        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());

        assert_eq!(session.window().unwrap().id, main.id);
    }

    #[tokio::test(start_paused = true)]
    async fn detach_then_reattach_restores_single_subscription() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());
        assert_eq!(fx.host_subscribers(), 1);

        session.detach();
        assert_eq!(session.state(), LifecycleState::Detached);
        assert_eq!(fx.host_subscribers(), 0);
        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(fake.owner, None);
        assert_eq!(fake.opacity, 1.0);
        assert!(!fake.transparent);
        assert!(session.is_monitoring());

        session.reattach();
        assert_eq!(session.state(), LifecycleState::Attached);
        assert_eq!(fx.host_subscribers(), 1);
        assert_eq!(fx.system.window(calc.id).unwrap().owner, Some(fx.host_handle()));

        session.detach();
        session.reattach();
        assert_eq!(fx.host_subscribers(), 1);
        assert_eq!(fx.sink.count(SessionEventKind::WindowFound), 1);
        // Скрытость сохраняется при повторном прикреплении
        assert!(fx.system.window(calc.id).unwrap().transparent);
    }

    #[tokio::test(start_paused = true)]
    async fn geometry_is_untouched_while_detached_or_unattached() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));

        let idle = started("idle", fx.params("", "nothing"), fx.ctx());
        idle.resize();

        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());
        session.detach();
        let calls = fx.system.window(calc.id).unwrap().set_bounds_calls;

        fx.host.resize(1600, 900);
        session.resize();
        session.show();

        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(fake.set_bounds_calls, calls);
        assert_eq!(fake.info.geometry, WindowGeometry::new(170, 50, 930, 800));
    }

    #[tokio::test(start_paused = true)]
    async fn host_resize_recomputes_bounds() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        let _session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());

        fx.host.resize(1200, 900);
        assert_eq!(
            fx.system.window(calc.id).unwrap().info.geometry,
            WindowGeometry::new(170, 50, 1130, 900)
        );

        fx.host.move_to(0, 0);
        assert_eq!(
            fx.system.window(calc.id).unwrap().info.geometry,
            WindowGeometry::new(70, 0, 1130, 900)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn show_and_hide_toggle_native_visibility() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());
        let raised = fx.system.window(calc.id).unwrap().raised;

        session.show();
        let fake = fx.system.window(calc.id).unwrap();
        assert!(session.is_shown());
        assert_eq!(fake.opacity, 1.0);
        assert!(!fake.transparent);
        assert_eq!(fake.raised, raised + 1);

        session.hide();
        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(fake.opacity, 0.0);
        assert!(fake.transparent);
        assert_eq!(
            fx.sink.kinds(),
            vec![
                SessionEventKind::WindowFound,
                SessionEventKind::Show,
                SessionEventKind::Hide
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn intended_visibility_applies_once_window_is_found() {
        let fx = Fixture::new();
        let session = started("calc", fx.params("", "calc"), fx.ctx());

        session.show();
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::Show]);

        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        session.wait_for_window();

        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(session.state(), LifecycleState::Attached);
        assert_eq!(fake.opacity, 1.0);
        assert!(!fake.transparent);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_window_returns_to_idle_and_can_relocate() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());
        session.show();

        fx.system.remove_window(calc.id);
        advance(1_500).await;

        assert_eq!(session.state(), LifecycleState::Lost);
        assert!(session.window().is_none());
        assert!(!session.is_monitoring());
        assert_eq!(fx.host_subscribers(), 0);
        let lost: Vec<SessionEvent> = fx
            .sink
            .events()
            .into_iter()
            .filter(|e| e.kind == SessionEventKind::LostWindow)
            .collect();
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].identity, "calc");
        assert_eq!(lost[0].window.as_ref().map(|w| w.id), Some(calc.id));

        // Без явного запроса повторный поиск не начинается
        let again = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        advance(5_000).await;
        assert_eq!(session.state(), LifecycleState::Lost);

        session.wait_for_window();
        assert_eq!(session.window().unwrap().id, again.id);
        assert_eq!(fx.sink.count(SessionEventKind::WindowFound), 2);
        assert!(session.is_shown());
        assert_eq!(fx.system.window(again.id).unwrap().opacity, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn minimized_window_is_restored_on_attach() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        fx.system.minimize(calc.id);

        let _session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());

        let fake = fx.system.window(calc.id).unwrap();
        assert!(!fake.minimized);
        assert_eq!(fake.info.geometry, WindowGeometry::new(170, 50, 930, 800));
    }

    #[tokio::test(start_paused = true)]
    async fn iconified_window_is_restored_when_shown() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());

        // X11 сворачивает окно, не меняя его ширину
        fx.system.iconify(calc.id);
        session.resize();
        assert!(fx.system.window(calc.id).unwrap().minimized);

        session.show();
        let fake = fx.system.window(calc.id).unwrap();
        assert!(!fake.minimized);
        assert_eq!(fake.info.geometry, WindowGeometry::new(170, 50, 930, 800));
    }

    #[tokio::test(start_paused = true)]
    async fn bounds_follow_scale_factors_and_zoom() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", CALC, WindowGeometry::new(0, 0, 300, 200));
        fx.system.set_scale_factor(calc.id, 1.5);
        fx.host
            .set_display(DisplayInfo::new(WindowGeometry::new(0, 0, 1920, 1080), 2.0));
        fx.host.set_zoom_factor(1.25);

        let session = started("calc", fx.params("", "calc").with_options(locate_now()), fx.ctx());

        // 1920 * 2.0 / 1.5 = 2560 точек приложения, отношение 0.75
        assert_eq!(
            fx.system.window(calc.id).unwrap().info.geometry,
            WindowGeometry::new(250, 67, 1217, 1067)
        );

        // Хост переехал на монитор без масштабирования: отношение 1.5
        fx.host
            .set_display(DisplayInfo::new(WindowGeometry::new(0, 0, 1920, 1080), 1.0));
        session.resize();
        assert_eq!(
            fx.system.window(calc.id).unwrap().info.geometry,
            WindowGeometry::new(125, 33, 608, 533)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn activating_embedded_app_requests_swap() {
        let fx = Fixture::new();
        let _session = started("calc", fx.params(CALC, "calc"), fx.ctx());
        fx.host.set_minimized(true);

        let other = WindowInfo::new(WindowId(99), "Browser").with_path("/usr/bin/browser");
        fx.activation.publish(&other);
        assert!(fx.sink.kinds().is_empty());

        let calc = WindowInfo::new(WindowId(100), "Calc").with_path(CALC);
        fx.activation.publish(&calc);
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::RequestSwap]);
        assert_eq!(fx.host.restore_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_path_override_is_used_for_activation() {
        let fx = Fixture::new();
        let params = fx.params("/opt/launcher/start", "calc").with_window_path(CALC);
        let _session = started("calc", params, fx.ctx());

        let launcher = WindowInfo::new(WindowId(5), "Launcher").with_path("/opt/launcher/start");
        fx.activation.publish(&launcher);
        assert!(fx.sink.kinds().is_empty());

        fx.activation.publish(&WindowInfo::new(WindowId(6), "Calc").with_path(CALC));
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::RequestSwap]);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_mid_polling_silences_session() {
        let fx = Fixture::with_spawner(|s| s.without_windows());
        let session = started("calc", fx.params(CALC, "calc"), fx.ctx());
        session.wait_for_window();
        assert_eq!(fx.activation.subscriber_count(), 1);

        advance(500).await;
        session.cleanup();
        session.cleanup();

        advance(30_000).await;
        assert!(fx.sink.kinds().is_empty());
        assert!(fx.spawner.spawned().is_empty());
        assert_eq!(fx.activation.subscriber_count(), 0);
        assert!(session.is_retired());

        // После остановки команды ничего не делают
        session.show();
        session.wait_for_window();
        assert!(fx.sink.kinds().is_empty());
    }

    #[test]
    fn params_validation() {
        let fx = Fixture::new();
        assert!(fx.params("", "calc").validate().is_ok());

        let mut blank = fx.params("", "calc");
        blank.app_name = "  ".to_string();
        assert!(matches!(blank.validate(), Err(EmbedError::BadRequest(_))));

        let mut nan = fx.params("", "calc");
        nan.options.offset.left = f64::NAN;
        assert!(nan.validate().is_err());
    }
}
