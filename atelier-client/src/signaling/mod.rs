mod channel;
mod client;
mod ws;

pub use channel::*;
pub use client::*;
pub use ws::*;
