mod board;
mod drag;
mod error;
mod memory;
mod range;
mod remote;
mod store;
mod window;

pub use board::*;
pub use drag::*;
pub use error::*;
pub use memory::*;
pub use range::*;
pub use remote::*;
pub use store::*;
pub use window::*;
