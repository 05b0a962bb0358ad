mod commands;
mod events;
mod status;

pub use commands::DockCommand;
pub use events::DockEvent;
pub use status::{DockStatus, ScreenStatus, ViewStatus};
