//! Web messenger adapter for the messaging session port.

mod protocol;
pub mod session;

pub use session::{MessengerSettings, WebMessengerSession};
