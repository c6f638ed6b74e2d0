//! Registry of live sessions keyed by caller identity.
//!
//! At most one session per identity. Adding under an existing identity
//! retires the previous session first, and commands for unknown
//! identities are silently ignored.

use crate::error::Result;
use crate::services::session::{Session, SessionContext, SessionParams};
use dashmap::DashMap;
use tracing::{debug, info};

pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    context: SessionContext,
}

impl SessionRegistry {
    pub fn new(context: SessionContext) -> Self {
        Self {
            sessions: DashMap::new(),
            context,
        }
    }

    /// Create a session under `identity`, replacing any existing one.
    /// Invalid params leave the registry untouched.
    pub fn add(&self, identity: &str, params: SessionParams) -> Result<()> {
        params.validate()?;

        if let Some((_, previous)) = self.sessions.remove(identity) {
            info!("Сессия '{}' заменяется новой", identity);
            previous.cleanup();
        }

        // Первый поиск может сразу отправить window-found, а обработчик
        // события вправе обратиться к реестру: запускаем уже после вставки
        let session = Session::new(identity, params, self.context.clone());
        self.sessions.insert(identity.to_string(), session.clone());
        session.start();
        Ok(())
    }

    pub fn get(&self, identity: &str) -> Option<Session> {
        self.sessions.get(identity).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, identity: &str) -> bool {
        match self.sessions.remove(identity) {
            Some((_, session)) => {
                session.cleanup();
                true
            }
            None => false,
        }
    }

    pub fn show(&self, identity: &str) -> bool {
        self.forward(identity, Session::show)
    }

    pub fn hide(&self, identity: &str) -> bool {
        self.forward(identity, Session::hide)
    }

    pub fn detach(&self, identity: &str) -> bool {
        self.forward(identity, Session::detach)
    }

    pub fn reattach(&self, identity: &str) -> bool {
        self.forward(identity, Session::reattach)
    }

    pub fn wait_for_window(&self, identity: &str) -> bool {
        self.forward(identity, Session::wait_for_window)
    }

    pub fn identities(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Hand every window back to the OS and stop tied child processes
    pub fn shutdown(&self) {
        let sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.sessions.clear();

        info!("Освобождаем {} сессий", sessions.len());
        for session in sessions {
            session.release();
        }
        self.context.launcher.shutdown();
    }

    /// Run `f` on a clone of the session, outside the map's shard lock,
    /// so the session may emit events that re-enter the registry.
    fn forward<F>(&self, identity: &str, f: F) -> bool
    where
        F: FnOnce(&Session),
    {
        match self.get(identity) {
            Some(session) => {
                f(&session);
                true
            }
            None => {
                debug!("Команда для неизвестной сессии '{}' проигнорирована", identity);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbedError;
    use crate::events::{SessionEvent, SessionEventKind, WindowGeometry};
    use crate::services::session::{LifecycleState, SessionOptions};
    use crate::test_support::{Fixture, RecordingSink};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn adding_twice_retires_previous_session() {
        let fx = Fixture::new();
        let registry = SessionRegistry::new(fx.ctx());
        let first_sink = Arc::new(RecordingSink::default());

        registry
            .add("calc", fx.params_with_sink("", "calc", first_sink.clone()))
            .unwrap();
        registry.wait_for_window("calc");
        let first = registry.get("calc").unwrap();

        registry.add("calc", fx.params("", "calc")).unwrap();
        registry.wait_for_window("calc");
        assert!(first.is_retired());
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(first_sink.kinds().is_empty());
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::WindowNotFound]);
        // Одна подписка на активацию: у новой сессии
        assert_eq!(fx.activation.subscriber_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_for_unknown_identity_are_ignored() {
        let fx = Fixture::new();
        let registry = SessionRegistry::new(fx.ctx());

        assert!(!registry.show("ghost"));
        assert!(!registry.hide("ghost"));
        assert!(!registry.detach("ghost"));
        assert!(!registry.reattach("ghost"));
        assert!(!registry.wait_for_window("ghost"));
        assert!(!registry.remove("ghost"));
        assert!(fx.sink.kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_params_leave_registry_untouched() {
        let fx = Fixture::new();
        let registry = SessionRegistry::new(fx.ctx());
        registry.add("calc", fx.params("", "calc")).unwrap();

        let mut bad = fx.params("", "calc");
        bad.app_name = String::new();
        let err = registry.add("calc", bad).unwrap_err();

        assert!(matches!(err, EmbedError::BadRequest(_)));
        assert!(!registry.get("calc").unwrap().is_retired());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_forwarded_by_identity() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", "/usr/bin/calc", WindowGeometry::new(0, 0, 300, 200));
        fx.system.add_window("Notes", "/usr/bin/notes", WindowGeometry::new(0, 0, 300, 200));
        let registry = SessionRegistry::new(fx.ctx());
        let notes_sink = Arc::new(RecordingSink::default());

        registry.add("calc", fx.params("", "calc")).unwrap();
        registry
            .add("notes", fx.params_with_sink("", "notes", notes_sink.clone()))
            .unwrap();

        registry.wait_for_window("calc");
        assert!(registry.show("calc"));

        assert_eq!(registry.get("calc").unwrap().state(), LifecycleState::Attached);
        assert_eq!(registry.get("notes").unwrap().state(), LifecycleState::Idle);
        assert_eq!(fx.system.window(calc.id).unwrap().opacity, 1.0);
        assert!(notes_sink.kinds().is_empty());

        let mut identities = registry.identities();
        identities.sort();
        assert_eq!(identities, vec!["calc".to_string(), "notes".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_windows_to_the_os() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", "/usr/bin/calc", WindowGeometry::new(0, 0, 300, 200));
        let registry = SessionRegistry::new(fx.ctx());
        let options = SessionOptions {
            locate_on_startup: true,
            ..SessionOptions::default()
        };

        registry
            .add("calc", fx.params("", "calc").with_options(options))
            .unwrap();
        let session = registry.get("calc").unwrap();
        assert!(fx.system.window(calc.id).unwrap().transparent);

        registry.shutdown();

        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(fake.owner, None);
        assert_eq!(fake.opacity, 1.0);
        assert!(!fake.transparent);
        assert!(registry.is_empty());
        assert!(session.is_retired());
        assert_eq!(fx.host_subscribers(), 0);
        assert_eq!(fx.activation.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_may_command_the_session_on_window_found() {
        let fx = Fixture::new();
        let calc = fx.system.add_window("Calc", "/usr/bin/calc", WindowGeometry::new(0, 0, 300, 200));
        let registry = Arc::new(SessionRegistry::new(fx.ctx()));
        let forwarded = Arc::new(AtomicBool::new(false));

        let weak: Weak<SessionRegistry> = Arc::downgrade(&registry);
        let flag = Arc::clone(&forwarded);
        let sink = Arc::new(move |event: SessionEvent| {
            if event.kind == SessionEventKind::WindowFound {
                if let Some(registry) = weak.upgrade() {
                    flag.store(registry.show(&event.identity), Ordering::SeqCst);
                }
            }
        });
        let options = SessionOptions {
            locate_on_startup: true,
            ..SessionOptions::default()
        };

        registry
            .add("calc", fx.params_with_sink("", "calc", sink).with_options(options))
            .unwrap();

        assert!(forwarded.load(Ordering::SeqCst));
        let session = registry.get("calc").unwrap();
        assert_eq!(session.state(), LifecycleState::Attached);
        assert!(session.is_shown());
        let fake = fx.system.window(calc.id).unwrap();
        assert_eq!(fake.opacity, 1.0);
        assert!(!fake.transparent);
    }
}
