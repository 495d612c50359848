//! CSV format reading and writing operations.

mod read;
mod write;

pub use read::*;
pub(crate) use write::*;
