#![forbid(unsafe_code)]

pub mod adapter;
pub mod command;
pub mod render;

pub use adapter::{ChannelAdapter, ChatTransport, TransportError};
pub use command::{CommandError, Inbound};
