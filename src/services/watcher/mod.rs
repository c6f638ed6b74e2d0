//! Watchers: responsibility and boundaries
//!
//! Each watcher observes one platform signal (the active window, the host
//! window's geometry) and republishes it through an `EventHub`. Watchers
//! never touch sessions directly; sessions subscribe to the hubs.

mod activation;
mod dry_run;
mod host_bounds;
mod r#trait;

pub use self::activation::X11ActivationWatcher;
pub use self::dry_run::DryRunActivationWatcher;
pub use self::host_bounds::HostBoundsWatcher;
pub use self::r#trait::WatcherTrait;
