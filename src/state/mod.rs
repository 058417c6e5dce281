//! State module for tracking crawl progress
//!
//! Progress is checkpointed per entity on the filesystem instead of in a
//! database, which lets a crashed or interrupted run resume exactly where it
//! stopped.
//!
//! # Components
//!
//! - `CategoryState`: pagination cursor and completion of one category
//! - `ProductState`: completion of one product within a category
//! - `CheckpointStore`: exists/load/save of states and the factories the
//!   crawler uses to decide whether a work item still has to run

mod category_state;
mod product_state;
mod store;

// Re-export main types
pub use category_state::CategoryState;
pub use product_state::ProductState;
pub use store::{Checkpoint, CheckpointError, CheckpointResult, CheckpointStore, CHECKPOINT_VERSION};

/// Replaces characters that would split a name into several path segments
pub fn sanitize_name(name: &str) -> String {
    name.replace(['/', '>', ':'], "_")
}
