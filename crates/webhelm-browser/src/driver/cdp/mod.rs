//! Chrome DevTools Protocol driver.
//!
//! Launches Chrome/Chromium/Edge with `--remote-debugging-port`, discovers
//! the browser WebSocket through `/json/version`, and attaches to a single
//! page target with a flattened session.

mod client;
mod error;
mod launcher;
mod page;
mod protocol;

pub use client::CdpClient;
pub use error::CdpError;
pub use launcher::CdpLauncher;
pub use page::CdpPage;
pub use protocol::*;
