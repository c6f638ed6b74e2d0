//! Shared fixtures for session and registry tests

use crate::events::{DisplayInfo, EventSink, SessionEvent, SessionEventKind, WindowGeometry, WindowId, WindowInfo};
use crate::services::geometry::{GeometryEngine, Offset};
use crate::services::host::{DryRunHost, HostWindow};
use crate::services::launcher::{DryRunSpawner, Launcher};
use crate::services::locator::FilterSpec;
use crate::services::pubsub::EventHub;
use crate::services::session::{SessionContext, SessionParams, SessionTiming};
use crate::services::window_system::{DryRunWindowSystem, DRY_RUN_MINIMIZED_WIDTH};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sink that remembers every event it receives
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<SessionEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    pub(crate) fn count(&self, kind: SessionEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

pub(crate) struct Fixture {
    pub system: Arc<DryRunWindowSystem>,
    pub host: Arc<DryRunHost>,
    pub spawner: Arc<DryRunSpawner>,
    pub activation: Arc<EventHub<WindowInfo>>,
    pub sink: Arc<RecordingSink>,
    launcher: Arc<Launcher>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_spawner(|spawner| spawner)
    }

    pub(crate) fn with_spawner<F>(configure: F) -> Self
    where
        F: FnOnce(DryRunSpawner) -> DryRunSpawner,
    {
        let system = Arc::new(DryRunWindowSystem::new());
        let host = Arc::new(DryRunHost::new(
            WindowGeometry::new(100, 50, 1000, 800),
            DisplayInfo::new(WindowGeometry::new(0, 0, 1920, 1080), 1.0),
        ));
        let spawner = Arc::new(configure(DryRunSpawner::new(Arc::clone(&system))));
        let launcher = Arc::new(Launcher::new(spawner.clone()));

        Self {
            system,
            host,
            spawner,
            activation: Arc::new(EventHub::new()),
            sink: Arc::new(RecordingSink::default()),
            launcher,
        }
    }

    pub(crate) fn ctx(&self) -> SessionContext {
        SessionContext {
            system: self.system.clone(),
            host: self.host.clone(),
            activation: Arc::clone(&self.activation),
            launcher: Arc::clone(&self.launcher),
            geometry: GeometryEngine::new(Offset::new(70.0, 0.0, 0.0, 0.0), DRY_RUN_MINIMIZED_WIDTH),
            timing: SessionTiming::default(),
        }
    }

    /// Params with a title filter, delivering into the fixture's sink
    pub(crate) fn params(&self, exe: &str, title_pattern: &str) -> SessionParams {
        self.params_with_sink(exe, title_pattern, self.sink.clone())
    }

    pub(crate) fn params_with_sink(
        &self,
        exe: &str,
        title_pattern: &str,
        sink: Arc<dyn EventSink>,
    ) -> SessionParams {
        let filter = FilterSpec {
            title_patterns: vec![title_pattern.to_string()],
            path: None,
        };
        SessionParams::new("Calc", exe, filter.into_filter(), sink)
    }

    pub(crate) fn host_handle(&self) -> WindowId {
        self.host.handle()
    }

    pub(crate) fn host_subscribers(&self) -> usize {
        self.host.events().subscriber_count()
    }
}
