use crate::error::Result;

/// Background watcher feeding platform changes into the embedding core.
///
/// Watchers run until the process exits; the caller spawns each one as a
/// tokio task and aborts it on shutdown.
#[async_trait::async_trait]
pub trait WatcherTrait {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>) -> Result<()>;
}
