use crate::error::Result;
use crate::services::host::X11HostWindow;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use super::r#trait::WatcherTrait;

/// Периодически перечитывает геометрию хоста; `refresh` сам оповещает
/// подписчиков, если окно сдвинулось или изменило размер
pub struct HostBoundsWatcher {
    host: Arc<X11HostWindow>,
    period: Duration,
}

impl HostBoundsWatcher {
    pub fn new(host: Arc<X11HostWindow>, period: Duration) -> Self {
        Self { host, period }
    }
}

#[async_trait::async_trait]
impl WatcherTrait for HostBoundsWatcher {
    fn name(&self) -> &'static str {
        "HostBoundsWatcher"
    }

    async fn run(self: Box<Self>) -> Result<()> {
        info!("Отслеживание геометрии окна-хоста (интервал {:?})", self.period);
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut failing = false;
        loop {
            ticker.tick().await;
            match self.host.refresh() {
                Ok(_) => failing = false,
                // Одно предупреждение на серию ошибок
                Err(e) if !failing => {
                    warn!("Не удалось прочитать геометрию окна-хоста: {}", e);
                    failing = true;
                }
                Err(_) => {}
            }
        }
    }
}
