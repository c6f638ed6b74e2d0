//! Window system backends: responsibility and boundaries
//!
//! This module answers "which top-level windows exist" and applies native
//! mutations to one window at a time. It knows nothing about sessions,
//! visibility intent or host geometry; those decisions belong to the Session.

mod dry_run;
mod r#trait;
mod x11;

pub use self::dry_run::{DryRunWindowSystem, FakeWindow, DRY_RUN_MINIMIZED_WIDTH};
pub use self::r#trait::{WindowControl, WindowDirectory, WindowSystem};
pub use self::x11::X11WindowSystem;
