mod api;
mod clipboard;
mod config;
mod logging;
mod session_store;

pub use api::*;
pub use clipboard::*;
pub use config::*;
pub use logging::*;
pub use session_store::*;
