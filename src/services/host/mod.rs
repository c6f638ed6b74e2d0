mod dry_run;
mod r#trait;
mod x11;

pub use self::dry_run::DryRunHost;
pub use self::r#trait::{HostEvent, HostSnapshot, HostWindow, HostWindowContext};
pub use self::x11::X11HostWindow;
