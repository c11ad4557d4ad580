// Data models (structs)
pub mod job;
pub mod request;

pub use job::*;
pub use request::*;
