//! Ephemeral, process-local storage for conversion results.
//!
//! - [`ResultStore`]: batch id → ordered converted artifacts, bounded by count and age
//! - [`SessionBindings`]: session token → the caller's most recent batch id
//!
//! Nothing here outlives the process.

mod results;
mod sessions;

pub use results::{start_sweep_task, Artifact, ResultStore};
pub use sessions::{start_cleanup_task, SessionBindings};
