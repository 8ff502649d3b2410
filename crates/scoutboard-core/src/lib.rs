// Library root for the pipeline board's domain layer: identities, list
// snapshots, the stage projection, the search cache, and the API seam that
// the orchestration crate drives.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod memory;
pub mod model;
pub mod projection;
pub mod search_cache;
pub mod store;
pub mod visibility;
