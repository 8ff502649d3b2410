// Library root: orchestration of the pipeline board (HTTP client, resync,
// transitions, search, and the event loop), re-exported for the binary and
// the integration tests.

pub mod app;
pub mod console;
pub mod http;
pub mod protocol;
pub mod search;
pub mod sync;
pub mod transition;
