use crate::error::Result;
use crate::events::WindowInfo;
use crate::services::pubsub::EventHub;
use crate::services::window_system::{DryRunWindowSystem, WindowDirectory};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use super::r#trait::WatcherTrait;

/// Эмуляция переключения окон: по кругу "активирует" окна dry-run системы
pub struct DryRunActivationWatcher {
    system: Arc<DryRunWindowSystem>,
    hub: Arc<EventHub<WindowInfo>>,
    period: Duration,
}

impl DryRunActivationWatcher {
    pub fn new(system: Arc<DryRunWindowSystem>, hub: Arc<EventHub<WindowInfo>>) -> Self {
        Self {
            system,
            hub,
            period: Duration::from_secs(10),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

#[async_trait::async_trait]
impl WatcherTrait for DryRunActivationWatcher {
    fn name(&self) -> &'static str {
        "DryRunActivationWatcher"
    }

    async fn run(self: Box<Self>) -> Result<()> {
        info!("Dry-run режим - активация окон эмулируется");

        let mut index = 0;
        let mut ticker = interval(self.period);
        // Первый тик срабатывает сразу, пропускаем его
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let windows = self.system.list_windows()?;
            if windows.is_empty() {
                debug!("Dry-run: нет окон для активации");
                continue;
            }

            let window = &windows[index % windows.len()];
            info!("Dry-run: эмулируем смену окна на: {}", window);
            self.hub.publish(window);
            index = (index + 1) % windows.len();
        }
    }
}
