pub mod control;
pub mod holder;
pub mod task_data;

// Re-export key types for easier access from other catena modules (and lib.rs)
pub use control::{ChainControl, ExecutionMode};
pub use holder::TaskHolder;
pub use task_data::TaskData;
