mod command;
mod registry;
mod session;
mod tile;

pub use command::*;
pub use registry::*;
pub use session::*;
pub use tile::*;
