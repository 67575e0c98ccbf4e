mod address;
mod batch_source;
mod handler;
mod repository;

pub use address::*;
pub use batch_source::*;
pub use handler::*;
pub use repository::*;
