#![doc = "JSON gateway over the scheduler, run store and progress journal. The embedded HTTP server handles framing; this crate decides routing, payloads and status codes, and resolves run files with traversal and symlink-escape protection."]

mod paths;
mod routes;

pub use paths::safe_resolve;
pub use routes::{ApiPayload, ApiRequest, ApiResponse, JobGateway, Method};
