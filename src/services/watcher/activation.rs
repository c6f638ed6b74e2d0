use crate::embed_error;
use crate::error::Result;
use crate::events::{WindowId, WindowInfo};
use crate::services::pubsub::EventHub;
use crate::services::window_system::{WindowDirectory, X11WindowSystem};
use std::sync::Arc;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, error, info, warn};

use super::r#trait::WatcherTrait;

/// Подряд идущих ошибок, после которых опрос приостанавливается
const MAX_FAILURES: u32 = 5;

/// Опрос активного окна X11: каждое переключение публикуется в хаб активации
pub struct X11ActivationWatcher {
    system: Arc<X11WindowSystem>,
    hub: Arc<EventHub<WindowInfo>>,
    period: Duration,
    current: Option<WindowId>,
    failures: u32,
}

impl X11ActivationWatcher {
    pub fn new(system: Arc<X11WindowSystem>, hub: Arc<EventHub<WindowInfo>>, period: Duration) -> Self {
        Self {
            system,
            hub,
            period,
            current: None,
            failures: 0,
        }
    }

    async fn poll(mut self) -> Result<()> {
        info!("Отслеживание активного окна X11 (интервал {:?})", self.period);
        let mut ticker = interval(self.period);

        loop {
            ticker.tick().await;

            match self.system.active_window() {
                Ok(active) => {
                    self.failures = 0;
                    if let Some(id) = active.filter(|id| Some(*id) != self.current) {
                        self.current = Some(id);
                        self.publish(id);
                    }
                }
                Err(e) => {
                    self.failures += 1;
                    warn!("Не удалось получить активное окно ({}/{}): {}", self.failures, MAX_FAILURES, e);
                    if self.failures >= MAX_FAILURES {
                        error!("xdotool не отвечает. Приостанавливаем отслеживание на 10 секунд");
                        sleep(Duration::from_secs(10)).await;
                        self.failures = 0;
                    }
                }
            }
        }
    }

    fn publish(&self, id: WindowId) {
        match self.system.find_window(id) {
            Ok(Some(window)) => {
                debug!("Смена активного окна на: {}", window);
                self.hub.publish(&window);
            }
            Ok(None) => debug!("Активное окно {} не входит в список окон верхнего уровня", id),
            Err(e) => warn!("Не удалось прочитать активное окно {}: {}", id, e),
        }
    }
}

#[async_trait::async_trait]
impl WatcherTrait for X11ActivationWatcher {
    fn name(&self) -> &'static str {
        "ActivationWatcher"
    }

    async fn run(self: Box<Self>) -> Result<()> {
        if self.period.is_zero() {
            return Err(embed_error!(internal, "нулевой интервал опроса активного окна"));
        }
        (*self).poll().await
    }
}
