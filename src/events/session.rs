use crate::events::WindowInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Тип события жизненного цикла сессии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionEventKind {
    WindowFound,
    WindowNotFound,
    Show,
    Hide,
    LostWindow,
    NewInstance,
    NewInstanceFailed,
    RequestSwap,
}

impl SessionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WindowFound => "window-found",
            Self::WindowNotFound => "window-not-found",
            Self::Show => "show",
            Self::Hide => "hide",
            Self::LostWindow => "lost-window",
            Self::NewInstance => "new-instance",
            Self::NewInstanceFailed => "new-instance-failed",
            Self::RequestSwap => "request-swap",
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Событие, доставляемое вызывающей стороне через `EventSink`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub identity: String,
    pub kind: SessionEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowInfo>,
}

impl SessionEvent {
    pub fn new(identity: impl Into<String>, kind: SessionEventKind) -> Self {
        Self {
            identity: identity.into(),
            kind,
            window: None,
        }
    }

    pub fn with_window(mut self, window: WindowInfo) -> Self {
        self.window = Some(window);
        self
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "{} [{}]: {}", self.kind, self.identity, window),
            None => write!(f, "{} [{}]", self.kind, self.identity),
        }
    }
}

/// Receiver of session lifecycle notifications.
///
/// Called synchronously from the session after its internal lock is released,
/// so an implementation may issue further commands against the registry.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

impl<F> EventSink for F
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn emit(&self, event: SessionEvent) {
        self(event)
    }
}

/// Sink that forwards events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink(UnboundedSender<SessionEvent>);

impl ChannelSink {
    pub fn new(sender: UnboundedSender<SessionEvent>) -> Self {
        Self(sender)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SessionEvent) {
        // Получатель мог уже завершиться при остановке - событие просто теряется
        let _ = self.0.send(event);
    }
}
