//! Command surface: identity + command name + JSON payload in, `Response` out.

use crate::error::EmbedError;
use crate::events::EventSink;
use crate::services::locator::FilterSpec;
use crate::services::registry::SessionRegistry;
use crate::services::session::{SessionOptions, SessionParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "kebab-case")]
pub enum Response {
    Ok,
    BadRequest(String),
    NotImplemented(String),
}

/// Payload of `add-window`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWindowRequest {
    pub app_name: String,
    pub exe_path: PathBuf,
    #[serde(default)]
    pub window_path: Option<PathBuf>,
    pub filter: FilterSpec,
    #[serde(default)]
    pub options: SessionOptions,
}

/// One line of the stdin protocol
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    pub identity: String,
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

pub struct CommandHandler {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn EventSink>,
}

impl CommandHandler {
    /// `sink` receives the events of every session created through `add-window`
    pub fn new(registry: Arc<SessionRegistry>, sink: Arc<dyn EventSink>) -> Self {
        Self { registry, sink }
    }

    pub fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str::<CommandEnvelope>(line) {
            Ok(envelope) => self.handle(&envelope.identity, &envelope.command, &envelope.payload),
            Err(e) => Response::BadRequest(EmbedError::from(e).to_string()),
        }
    }

    pub fn handle(&self, identity: &str, command: &str, payload: &Value) -> Response {
        if identity.trim().is_empty() {
            return Response::BadRequest("identity не может быть пустым".to_string());
        }
        debug!("Команда '{}' для '{}'", command, identity);

        // Команды для неизвестных сессий молча игнорируются
        match command {
            "add-window" => self.add_window(identity, payload),
            "show" => {
                self.registry.show(identity);
                Response::Ok
            }
            "hide" => {
                self.registry.hide(identity);
                Response::Ok
            }
            "detach" => {
                self.registry.detach(identity);
                Response::Ok
            }
            "reattach" => {
                self.registry.reattach(identity);
                Response::Ok
            }
            "wait-for-window" => {
                self.registry.wait_for_window(identity);
                Response::Ok
            }
            other => {
                warn!("Неизвестная команда '{}'", other);
                Response::NotImplemented(other.to_string())
            }
        }
    }

    fn add_window(&self, identity: &str, payload: &Value) -> Response {
        let request = match AddWindowRequest::deserialize(payload) {
            Ok(request) => request,
            Err(e) => return Response::BadRequest(e.to_string()),
        };
        if let Err(e) = request.filter.validate() {
            return Response::BadRequest(e.to_string());
        }

        let mut params = SessionParams::new(
            request.app_name,
            request.exe_path,
            request.filter.into_filter(),
            Arc::clone(&self.sink),
        )
        .with_options(request.options);
        params.window_path = request.window_path;

        match self.registry.add(identity, params) {
            Ok(()) => Response::Ok,
            Err(EmbedError::BadRequest(message)) => Response::BadRequest(message),
            Err(e) => Response::BadRequest(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{SessionEventKind, WindowGeometry};
    use crate::services::session::LifecycleState;
    use crate::test_support::Fixture;
    use serde_json::json;

    fn handler(fx: &Fixture) -> (CommandHandler, Arc<SessionRegistry>) {
        let registry = Arc::new(SessionRegistry::new(fx.ctx()));
        (CommandHandler::new(Arc::clone(&registry), fx.sink.clone()), registry)
    }

    #[tokio::test(start_paused = true)]
    async fn add_window_locates_running_instance() {
        let fx = Fixture::new();
        fx.system.add_window("Calc", "/usr/bin/calc", WindowGeometry::new(0, 0, 300, 200));
        let (handler, registry) = handler(&fx);

        let payload = json!({
            "appName": "Calculator",
            "exePath": "",
            "filter": { "titlePatterns": ["calc"] },
            "options": { "locateOnStartup": true, "isCurrentlyShown": true }
        });

        assert_eq!(handler.handle("calc", "add-window", &payload), Response::Ok);
        assert_eq!(registry.get("calc").unwrap().state(), LifecycleState::Attached);
        assert_eq!(fx.sink.kinds(), vec![SessionEventKind::WindowFound]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_add_window_creates_no_session() {
        let fx = Fixture::new();
        let (handler, registry) = handler(&fx);

        let missing_exe = json!({ "appName": "Calc", "filter": { "titlePatterns": ["calc"] } });
        let empty_filter = json!({ "appName": "Calc", "exePath": "", "filter": {} });
        let blank_name = json!({ "appName": " ", "exePath": "", "filter": { "titlePatterns": ["calc"] } });

        for payload in [missing_exe, empty_filter, blank_name, json!("nope")] {
            assert!(matches!(
                handler.handle("calc", "add-window", &payload),
                Response::BadRequest(_)
            ));
        }
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn simple_commands_are_ok_even_for_unknown_identity() {
        let fx = Fixture::new();
        let (handler, _registry) = handler(&fx);

        for command in ["show", "hide", "detach", "reattach", "wait-for-window"] {
            assert_eq!(handler.handle("ghost", command, &Value::Null), Response::Ok);
        }
        assert_eq!(
            handler.handle("ghost", "resize", &Value::Null),
            Response::NotImplemented("resize".to_string())
        );
        assert!(fx.sink.kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stdin_lines_are_parsed() {
        let fx = Fixture::new();
        let (handler, _registry) = handler(&fx);

        assert_eq!(
            handler.handle_line(r#"{"identity": "calc", "command": "show"}"#),
            Response::Ok
        );
        assert!(matches!(handler.handle_line("{not json"), Response::BadRequest(_)));
        assert!(matches!(
            handler.handle_line(r#"{"identity": "", "command": "show"}"#),
            Response::BadRequest(_)
        ));
    }

    #[test]
    fn response_serialization() {
        assert_eq!(serde_json::to_string(&Response::Ok).unwrap(), r#"{"status":"ok"}"#);
        assert_eq!(
            serde_json::to_string(&Response::NotImplemented("x".into())).unwrap(),
            r#"{"status":"not-implemented","message":"x"}"#
        );
    }
}
