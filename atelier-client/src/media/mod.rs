mod source;
mod surface;
mod track;

pub use source::*;
pub use surface::*;
pub use track::*;
