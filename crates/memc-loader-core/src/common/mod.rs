pub mod error;
pub mod parser;
pub mod proto;
pub mod types;

pub use error::*;
pub use parser::*;
pub use proto::*;
pub use types::*;
