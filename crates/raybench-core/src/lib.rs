#![deny(missing_docs)]
#![doc = "Shared primitives for the Raybench workbench: structured errors, canonical serialization, content hashing, run identifiers and atomic filesystem I/O."]

pub mod errors;
pub mod fsio;
pub mod hash;
pub mod provenance;
pub mod runid;
pub mod serde;

pub use errors::{ErrorInfo, RbError};
pub use hash::stable_hash_string;
pub use provenance::{utc_timestamp_millis, RunProvenance, SchemaVersion};
pub use runid::RunIdGenerator;
