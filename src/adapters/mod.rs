//! Adapters implementing the messaging and completion ports.

pub mod messenger;
pub mod mock;
