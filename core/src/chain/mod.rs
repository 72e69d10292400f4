pub mod definition;
pub mod execution;
pub mod split;

pub use definition::{ErrorHandler, TaskChain};
pub use split::SplitTaskChain;
