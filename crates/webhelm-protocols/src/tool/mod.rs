//! Tool protocol definitions.
//!
//! Tools are how the agent drives the browser session.

mod context;
mod definition;
mod result;
mod traits;

pub use context::*;
pub use definition::*;
pub use result::*;
pub use traits::*;
