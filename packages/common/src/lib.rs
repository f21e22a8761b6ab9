pub mod error;
pub mod result;
pub mod visitor;

pub use error::*;
pub use result::*;
pub use visitor::*;
