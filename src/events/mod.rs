pub mod session;
pub mod window;

pub use session::{ChannelSink, EventSink, SessionEvent, SessionEventKind};
pub use window::{DisplayInfo, WindowGeometry, WindowId, WindowInfo};
